//! Admin activity auditing
//!
//! Handlers describe what happened as an [`AuditEvent`]; the
//! [`ActivityLogger`] applies the recording policy, fills in actor and
//! client details and appends the entry to an [`ActivitySink`].

mod logger;

pub use logger::{ActivityLogger, RecordOutcome, should_record};

use crate::model::{Activity, ActivityAction, Admin, Mda, ResourceType, User};
use crate::store::{Database, StoreError, activities};

/// Append-only destination for activity entries
///
/// Called from the blocking pool.
pub trait ActivitySink: Send + Sync {
    fn append(&self, activity: &Activity) -> Result<(), StoreError>;
}

impl ActivitySink for Database {
    fn append(&self, activity: &Activity) -> Result<(), StoreError> {
        self.with_conn(|conn| activities::insert(conn, activity))
    }
}

/// What an admin did, before actor and client details are attached
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: ActivityAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub resource_name: Option<String>,
    pub details: Option<String>,
}

impl AuditEvent {
    /// LOGIN / LOGOUT of the acting admin
    pub fn session(action: ActivityAction) -> Self {
        Self {
            action,
            resource_type: ResourceType::Admin,
            resource_id: None,
            resource_name: None,
            details: None,
        }
    }

    pub fn resource(
        action: ActivityAction,
        resource_type: ResourceType,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            action,
            resource_type,
            resource_id: Some(id.into()),
            resource_name: Some(name.into()),
            details: None,
        }
    }

    pub fn mda(action: ActivityAction, mda: &Mda) -> Self {
        Self::resource(action, ResourceType::Mda, &mda.id, &mda.name)
    }

    pub fn user(action: ActivityAction, user: &User) -> Self {
        Self::resource(action, ResourceType::User, &user.id, &user.username)
    }

    pub fn admin(action: ActivityAction, admin: &Admin) -> Self {
        Self::resource(action, ResourceType::Admin, &admin.id, &admin.email)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
