use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::role::Role;

/// An admin account
///
/// `role` is always [`Role::Admin`] or [`Role::SuperAdmin`]. A superadmin has
/// `can_be_deleted == false` and may have no `created_by`; every other admin
/// records the admin that created it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub can_be_deleted: bool,
    pub created_by: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    /// A new, active regular admin created by `created_by`
    pub fn new_admin(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            email: normalize_email(&email.into()),
            password_hash: password_hash.into(),
            role: Role::Admin,
            can_be_deleted: true,
            created_by: Some(created_by.into()),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The bootstrap superadmin
    pub fn new_super_admin(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            email: normalize_email(&email.into()),
            password_hash: password_hash.into(),
            role: Role::SuperAdmin,
            can_be_deleted: false,
            created_by: None,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

/// Emails are compared case-insensitively; store them trimmed and lowercase
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
