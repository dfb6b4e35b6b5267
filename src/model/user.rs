use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::role::Role;

/// A reporting user, owned by one MDA
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub contact_email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub mda_id: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        contact_email: impl Into<String>,
        password_hash: impl Into<String>,
        mda_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into().trim().to_string(),
            name: name.into().trim().to_string(),
            contact_email: contact_email.into().trim().to_lowercase(),
            password_hash: password_hash.into(),
            role: Role::User,
            mda_id: mda_id.into(),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}
