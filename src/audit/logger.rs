use std::sync::Arc;

use chrono::Utc;

use super::{ActivitySink, AuditEvent};
use crate::auth::{AdminPrincipal, Role};
use crate::common::client::ClientInfo;
use crate::common::truncate_with_ellipsis;
use crate::model::{Activity, ActivityAction};
use crate::validation::validate_activity;

const MAX_DETAILS_BYTES: usize = 1000;

/// Result of a [`ActivityLogger::record`] call
///
/// Never an error: audit failures must not fail the request being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// The policy excludes this actor/action pair
    SkippedByPolicy,
    /// Invalid entry or sink failure, already logged
    Dropped,
}

/// Superadmin session events are not recorded; everything else is
pub fn should_record(role: Role, action: ActivityAction) -> bool {
    !(role == Role::SuperAdmin && action.is_session())
}

#[derive(Clone)]
pub struct ActivityLogger {
    sink: Arc<dyn ActivitySink>,
}

impl ActivityLogger {
    pub fn new(sink: Arc<dyn ActivitySink>) -> Self {
        Self { sink }
    }

    pub async fn record(
        &self,
        actor: &AdminPrincipal,
        event: AuditEvent,
        client: &ClientInfo,
    ) -> RecordOutcome {
        if !should_record(actor.role, event.action) {
            tracing::debug!(
                admin_id = %actor.id,
                action = event.action.as_str(),
                "Activity skipped by policy"
            );
            return RecordOutcome::SkippedByPolicy;
        }

        let activity = Activity {
            id: uuid::Uuid::new_v4().to_string(),
            admin_id: actor.id.clone(),
            admin_name: actor.name.clone(),
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            resource_name: event.resource_name,
            details: event
                .details
                .map(|d| truncate_with_ellipsis(&d, MAX_DETAILS_BYTES)),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            timestamp: Utc::now(),
        };

        let problems = validate_activity(&activity);
        if !problems.is_empty() {
            tracing::error!(
                admin_id = %activity.admin_id,
                action = activity.action.as_str(),
                resource_type = activity.resource_type.as_str(),
                ?problems,
                "Rejected invalid activity entry"
            );
            return RecordOutcome::Dropped;
        }

        let action = activity.action;
        let resource_type = activity.resource_type;
        let sink = self.sink.clone();
        match tokio::task::spawn_blocking(move || sink.append(&activity)).await {
            Ok(Ok(())) => RecordOutcome::Recorded,
            Ok(Err(e)) => {
                tracing::error!(
                    admin_id = %actor.id,
                    action = action.as_str(),
                    resource_type = resource_type.as_str(),
                    "Failed to record activity: {}",
                    e
                );
                RecordOutcome::Dropped
            }
            Err(e) => {
                tracing::error!("Activity write task failed: {}", e);
                RecordOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;
    use crate::store::{Database, Page, StoreError, activities};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<Activity>>);

    impl ActivitySink for MemorySink {
        fn append(&self, activity: &Activity) -> Result<(), StoreError> {
            self.0.lock().push(activity.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl ActivitySink for FailingSink {
        fn append(&self, _activity: &Activity) -> Result<(), StoreError> {
            Err(StoreError::Task("disk full".to_string()))
        }
    }

    fn principal(role: Role) -> AdminPrincipal {
        AdminPrincipal {
            id: "a-1".to_string(),
            name: "Ops".to_string(),
            email: "ops@mda.gov".to_string(),
            role,
        }
    }

    fn client() -> ClientInfo {
        ClientInfo {
            ip_address: Some("10.0.0.9".to_string()),
            peer_address: Some("10.0.0.9".to_string()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    #[test]
    fn test_policy() {
        assert!(!should_record(Role::SuperAdmin, ActivityAction::Login));
        assert!(!should_record(Role::SuperAdmin, ActivityAction::Logout));
        assert!(should_record(Role::SuperAdmin, ActivityAction::Delete));
        assert!(should_record(Role::Admin, ActivityAction::Login));
    }

    #[tokio::test]
    async fn test_records_with_actor_and_client() {
        let sink = Arc::new(MemorySink::default());
        let logger = ActivityLogger::new(sink.clone());

        let event = AuditEvent::resource(ActivityAction::Create, ResourceType::Mda, "m-1", "Works")
            .with_details("x".repeat(5000));
        let outcome = logger.record(&principal(Role::Admin), event, &client()).await;
        assert_eq!(outcome, RecordOutcome::Recorded);

        let entries = sink.0.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].admin_name, "Ops");
        assert_eq!(entries[0].ip_address.as_deref(), Some("10.0.0.9"));
        assert_eq!(entries[0].details.as_ref().unwrap().len(), MAX_DETAILS_BYTES);
    }

    #[tokio::test]
    async fn test_superadmin_login_is_skipped() {
        let sink = Arc::new(MemorySink::default());
        let logger = ActivityLogger::new(sink.clone());

        let outcome = logger
            .record(
                &principal(Role::SuperAdmin),
                AuditEvent::session(ActivityAction::Login),
                &client(),
            )
            .await;
        assert_eq!(outcome, RecordOutcome::SkippedByPolicy);
        assert!(sink.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let logger = ActivityLogger::new(Arc::new(FailingSink));
        let outcome = logger
            .record(
                &principal(Role::Admin),
                AuditEvent::session(ActivityAction::Logout),
                &client(),
            )
            .await;
        assert_eq!(outcome, RecordOutcome::Dropped);
    }

    #[tokio::test]
    async fn test_crud_without_resource_is_dropped() {
        let sink = Arc::new(MemorySink::default());
        let logger = ActivityLogger::new(sink.clone());

        let mut event = AuditEvent::session(ActivityAction::Delete);
        event.resource_type = ResourceType::User;
        let outcome = logger.record(&principal(Role::Admin), event, &client()).await;
        assert_eq!(outcome, RecordOutcome::Dropped);
        assert!(sink.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_database_sink() {
        let db = Database::open_in_memory().unwrap();
        let logger = ActivityLogger::new(Arc::new(db.clone()));

        logger
            .record(
                &principal(Role::Admin),
                AuditEvent::session(ActivityAction::Login),
                &client(),
            )
            .await;

        let (entries, total) = db
            .with_conn(|c| activities::list(c, &Default::default(), Page::new(None, None)))
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].action, ActivityAction::Login);
    }
}
