//! Admin API business logic
//!
//! Handlers authorize the caller first; every method here assumes the actor
//! holds the required permission. Mutations are audited after they succeed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::export::MdaWithUsers;
use super::types::{
    ActivityListQuery, ActivityListResponse, AdminListResponse, CreateAdminRequest,
    CreateMdaRequest, CreateUserRequest, ExportQuery, MdaDetail, MdaListQuery, MdaListResponse,
    MdaSummary, Pagination, ResetPasswordRequest, SetAdminStatusRequest, StatsResponse,
    UpdateMdaRequest, UpdateUserRequest, UserListQuery, UserListResponse, UserView,
};
use crate::audit::{ActivityLogger, AuditEvent};
use crate::auth::AdminPrincipal;
use crate::auth::password::hash_password;
use crate::common::client::ClientInfo;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::model::{ActivityAction, Admin, Mda, ResourceType, User};
use crate::store::activities::{self, ActivityFilter};
use crate::store::mdas::{self, MdaFilter};
use crate::store::users::{self, UserFilter};
use crate::store::{Database, Page, StoreError, admins};
use crate::validation::{
    ensure, validate_admin, validate_mda, validate_password, validate_user,
};

const RECENT_ACTIVITY_COUNT: u32 = 5;

/// Admin service
pub struct AdminService {
    db: Database,
    audit: ActivityLogger,
    bcrypt_cost: u32,
}

fn mda_index(conn: &rusqlite::Connection) -> Result<HashMap<String, MdaSummary>, StoreError> {
    let (all, _) = mdas::list(conn, &MdaFilter::default(), None)?;
    Ok(all.iter().map(|m| (m.id.clone(), MdaSummary::from(m))).collect())
}

fn with_mdas(users: Vec<User>, index: &HashMap<String, MdaSummary>) -> Vec<UserView> {
    users
        .into_iter()
        .map(|user| {
            let mda = index.get(&user.mda_id).cloned();
            UserView { user, mda }
        })
        .collect()
}

fn parse_time(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, FieldError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => DateTime::parse_from_rfc3339(v)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| FieldError::new(field, format!("{} must be an RFC 3339 timestamp", field))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AdminService {
    pub fn new(db: Database, audit: ActivityLogger, bcrypt_cost: u32) -> Self {
        Self {
            db,
            audit,
            bcrypt_cost,
        }
    }

    async fn ensure_mda_exists(&self, mda_id: &str) -> ApiResult<Mda> {
        let id = mda_id.to_string();
        self.db
            .call(move |conn| mdas::find_by_id(conn, &id))
            .await?
            .ok_or_else(|| ApiError::invalid("mdaId", "MDA not found"))
    }

    // ============ MDAs ============

    pub async fn list_mdas(&self, query: MdaListQuery) -> ApiResult<MdaListResponse> {
        let page = Page::new(query.page, query.limit);
        let filter = MdaFilter {
            search: non_empty(query.search),
            is_active: query.is_active,
        };
        let (mdas, total) = self
            .db
            .call(move |conn| mdas::list(conn, &filter, Some(page)))
            .await?;
        Ok(MdaListResponse {
            mdas,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn get_mda(&self, id: String) -> ApiResult<MdaDetail> {
        let found = self
            .db
            .call(move |conn| {
                let Some(mda) = mdas::find_by_id(conn, &id)? else {
                    return Ok(None);
                };
                let user_count = users::count_by_mda(conn, &id)?;
                Ok(Some(MdaDetail { mda, user_count }))
            })
            .await?;
        found.ok_or_else(|| ApiError::not_found("MDA"))
    }

    pub async fn create_mda(
        &self,
        actor: &AdminPrincipal,
        req: CreateMdaRequest,
        client: &ClientInfo,
    ) -> ApiResult<Mda> {
        let mut mda = Mda::new(req.name, req.reports);
        if let Some(is_active) = req.is_active {
            mda.is_active = is_active;
        }
        ensure(validate_mda(&mda))?;

        let record = mda.clone();
        self.db.call(move |conn| mdas::insert(conn, &record)).await?;

        tracing::info!(admin_id = %actor.id, mda_id = %mda.id, "MDA created");
        let event = AuditEvent::mda(ActivityAction::Create, &mda)
            .with_details(format!("Created MDA with {} report(s)", mda.reports.len()));
        self.audit.record(actor, event, client).await;
        Ok(mda)
    }

    pub async fn update_mda(
        &self,
        actor: &AdminPrincipal,
        id: String,
        req: UpdateMdaRequest,
        client: &ClientInfo,
    ) -> ApiResult<Mda> {
        let mut mda = self
            .db
            .call(move |conn| mdas::find_by_id(conn, &id))
            .await?
            .ok_or_else(|| ApiError::not_found("MDA"))?;

        let mut changed = Vec::new();
        if let Some(name) = req.name {
            mda.name = name.trim().to_string();
            changed.push("name");
        }
        if let Some(reports) = req.reports {
            mda.reports = reports;
            changed.push("reports");
        }
        if let Some(is_active) = req.is_active {
            mda.is_active = is_active;
            changed.push("isActive");
        }
        ensure(validate_mda(&mda))?;
        mda.updated_at = Utc::now();

        let record = mda.clone();
        self.db.call(move |conn| mdas::update(conn, &record)).await?;

        let event = AuditEvent::mda(ActivityAction::Update, &mda)
            .with_details(format!("Updated fields: {}", changed.join(", ")));
        self.audit.record(actor, event, client).await;
        Ok(mda)
    }

    /// Refused with 409 while users still reference the MDA
    pub async fn delete_mda(
        &self,
        actor: &AdminPrincipal,
        id: String,
        client: &ClientInfo,
    ) -> ApiResult<Mda> {
        // Check and delete under one lock so no user can be assigned in between
        let (mda, user_count) = self
            .db
            .call(move |conn| {
                let Some(mda) = mdas::find_by_id(conn, &id)? else {
                    return Err(StoreError::NotFound);
                };
                let count = users::count_by_mda(conn, &id)?;
                if count == 0 {
                    mdas::delete(conn, &id)?;
                }
                Ok((mda, count))
            })
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ApiError::not_found("MDA"),
                StoreError::InUse => {
                    ApiError::Conflict("Cannot delete MDA with assigned users".to_string())
                }
                other => other.into(),
            })?;

        if user_count > 0 {
            return Err(ApiError::Conflict(format!(
                "Cannot delete MDA with {} assigned user(s)",
                user_count
            )));
        }

        tracing::info!(admin_id = %actor.id, mda_id = %mda.id, "MDA deleted");
        self.audit
            .record(actor, AuditEvent::mda(ActivityAction::Delete, &mda), client)
            .await;
        Ok(mda)
    }

    // ============ Users ============

    pub async fn list_users(&self, query: UserListQuery) -> ApiResult<UserListResponse> {
        let page = Page::new(query.page, query.limit);
        let filter = UserFilter {
            search: non_empty(query.search),
            is_active: query.is_active,
            mda_id: non_empty(query.mda_id),
        };
        let (users, total) = self
            .db
            .call(move |conn| {
                let (users, total) = users::list(conn, &filter, Some(page))?;
                Ok((with_mdas(users, &mda_index(conn)?), total))
            })
            .await?;
        Ok(UserListResponse {
            users,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn get_user(&self, id: String) -> ApiResult<UserView> {
        let found = self
            .db
            .call(move |conn| {
                let Some(user) = users::find_by_id(conn, &id)? else {
                    return Ok(None);
                };
                let mda = mdas::find_by_id(conn, &user.mda_id)?;
                Ok(Some(UserView {
                    mda: mda.as_ref().map(MdaSummary::from),
                    user,
                }))
            })
            .await?;
        found.ok_or_else(|| ApiError::not_found("User"))
    }

    pub async fn create_user(
        &self,
        actor: &AdminPrincipal,
        req: CreateUserRequest,
        client: &ClientInfo,
    ) -> ApiResult<UserView> {
        let mut user = User::new(req.username, req.name, req.contact_email, "", req.mda_id);
        if let Some(is_active) = req.is_active {
            user.is_active = is_active;
        }
        let mut errors = validate_user(&user);
        errors.extend(validate_password("password", &req.password));
        ensure(errors)?;

        let mda = self.ensure_mda_exists(&user.mda_id).await?;
        user.password_hash = hash_password(&req.password, self.bcrypt_cost).await?;

        let record = user.clone();
        self.db.call(move |conn| users::insert(conn, &record)).await?;

        tracing::info!(admin_id = %actor.id, user_id = %user.id, "User created");
        let event = AuditEvent::user(ActivityAction::Create, &user)
            .with_details(format!("Assigned to MDA {}", mda.name));
        self.audit.record(actor, event, client).await;

        Ok(UserView {
            user,
            mda: Some(MdaSummary::from(&mda)),
        })
    }

    pub async fn update_user(
        &self,
        actor: &AdminPrincipal,
        id: String,
        req: UpdateUserRequest,
        client: &ClientInfo,
    ) -> ApiResult<UserView> {
        let mut user = self
            .db
            .call(move |conn| users::find_by_id(conn, &id))
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;

        let mut changed = Vec::new();
        if let Some(username) = req.username {
            user.username = username.trim().to_string();
            changed.push("username");
        }
        if let Some(name) = req.name {
            user.name = name.trim().to_string();
            changed.push("name");
        }
        if let Some(email) = req.contact_email {
            user.contact_email = email.trim().to_lowercase();
            changed.push("contactEmail");
        }
        if let Some(mda_id) = req.mda_id {
            user.mda_id = mda_id.trim().to_string();
            changed.push("mdaId");
        }
        if let Some(is_active) = req.is_active {
            user.is_active = is_active;
            changed.push("isActive");
        }
        ensure(validate_user(&user))?;
        let mda = self.ensure_mda_exists(&user.mda_id).await?;
        user.updated_at = Utc::now();

        let record = user.clone();
        self.db.call(move |conn| users::update(conn, &record)).await?;

        let event = AuditEvent::user(ActivityAction::Update, &user)
            .with_details(format!("Updated fields: {}", changed.join(", ")));
        self.audit.record(actor, event, client).await;

        Ok(UserView {
            user,
            mda: Some(MdaSummary::from(&mda)),
        })
    }

    pub async fn delete_user(
        &self,
        actor: &AdminPrincipal,
        id: String,
        client: &ClientInfo,
    ) -> ApiResult<User> {
        let lookup = id.clone();
        let user = self
            .db
            .call(move |conn| users::find_by_id(conn, &lookup))
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;

        self.db.call(move |conn| users::delete(conn, &id)).await?;

        tracing::info!(admin_id = %actor.id, user_id = %user.id, "User deleted");
        self.audit
            .record(actor, AuditEvent::user(ActivityAction::Delete, &user), client)
            .await;
        Ok(user)
    }

    pub async fn reset_user_password(
        &self,
        actor: &AdminPrincipal,
        id: String,
        req: ResetPasswordRequest,
        client: &ClientInfo,
    ) -> ApiResult<()> {
        ensure(validate_password("newPassword", &req.new_password))?;

        let lookup = id.clone();
        let user = self
            .db
            .call(move |conn| users::find_by_id(conn, &lookup))
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;

        let hash = hash_password(&req.new_password, self.bcrypt_cost).await?;
        self.db
            .call(move |conn| users::update_password(conn, &id, &hash))
            .await?;

        tracing::info!(admin_id = %actor.id, user_id = %user.id, "User password reset");
        let event = AuditEvent::user(ActivityAction::Update, &user).with_details("Password reset");
        self.audit.record(actor, event, client).await;
        Ok(())
    }

    // ============ Admins ============

    pub async fn list_admins(&self) -> ApiResult<AdminListResponse> {
        let admins = self.db.call(admins::list).await?;
        Ok(AdminListResponse { admins })
    }

    pub async fn create_admin(
        &self,
        actor: &AdminPrincipal,
        req: CreateAdminRequest,
        client: &ClientInfo,
    ) -> ApiResult<Admin> {
        let mut admin = Admin::new_admin(req.name.trim(), req.email, "", &actor.id);
        let mut errors = validate_admin(&admin);
        errors.extend(validate_password("password", &req.password));
        ensure(errors)?;

        admin.password_hash = hash_password(&req.password, self.bcrypt_cost).await?;

        let record = admin.clone();
        self.db.call(move |conn| admins::insert(conn, &record)).await?;

        tracing::info!(admin_id = %actor.id, new_admin_id = %admin.id, "Admin created");
        self.audit
            .record(actor, AuditEvent::admin(ActivityAction::Create, &admin), client)
            .await;
        Ok(admin)
    }

    async fn find_admin(&self, id: String) -> ApiResult<Admin> {
        self.db
            .call(move |conn| admins::find_by_id(conn, &id))
            .await?
            .ok_or_else(|| ApiError::not_found("Admin"))
    }

    pub async fn delete_admin(
        &self,
        actor: &AdminPrincipal,
        id: String,
        client: &ClientInfo,
    ) -> ApiResult<Admin> {
        let target = self.find_admin(id.clone()).await?;
        if target.is_super_admin() || !target.can_be_deleted {
            return Err(ApiError::Forbidden("The superadmin cannot be deleted".to_string()));
        }
        if target.id == actor.id {
            return Err(ApiError::Forbidden("You cannot delete your own account".to_string()));
        }

        self.db.call(move |conn| admins::delete(conn, &id)).await?;

        tracing::info!(admin_id = %actor.id, target_id = %target.id, "Admin deleted");
        self.audit
            .record(actor, AuditEvent::admin(ActivityAction::Delete, &target), client)
            .await;
        Ok(target)
    }

    pub async fn set_admin_status(
        &self,
        actor: &AdminPrincipal,
        id: String,
        req: SetAdminStatusRequest,
        client: &ClientInfo,
    ) -> ApiResult<Admin> {
        let mut target = self.find_admin(id.clone()).await?;
        if target.is_super_admin() {
            return Err(ApiError::Forbidden(
                "The superadmin cannot be deactivated".to_string(),
            ));
        }

        let is_active = req.is_active;
        self.db
            .call(move |conn| admins::set_active(conn, &id, is_active))
            .await?;
        target.is_active = is_active;
        target.updated_at = Utc::now();

        let verb = if is_active { "Activated" } else { "Deactivated" };
        tracing::info!(admin_id = %actor.id, target_id = %target.id, is_active, "Admin status changed");
        let event = AuditEvent::admin(ActivityAction::Update, &target)
            .with_details(format!("{} admin account", verb));
        self.audit.record(actor, event, client).await;
        Ok(target)
    }

    // ============ Activities & stats ============

    pub async fn list_activities(&self, query: ActivityListQuery) -> ApiResult<ActivityListResponse> {
        let mut errors = Vec::new();

        let action = match non_empty(query.action) {
            None => None,
            Some(v) => ActivityAction::parse(v.trim()).or_else(|| {
                errors.push(FieldError::new("action", "Unknown action"));
                None
            }),
        };
        let resource_type = match non_empty(query.resource_type) {
            None => None,
            Some(v) => ResourceType::parse(v.trim()).or_else(|| {
                errors.push(FieldError::new("resourceType", "Unknown resource type"));
                None
            }),
        };
        let from = parse_time("from", query.from.as_deref()).unwrap_or_else(|e| {
            errors.push(e);
            None
        });
        let to = parse_time("to", query.to.as_deref()).unwrap_or_else(|e| {
            errors.push(e);
            None
        });
        ensure(errors)?;

        let page = Page::new(query.page, query.limit);
        let filter = ActivityFilter {
            admin_id: non_empty(query.admin_id),
            action,
            resource_type,
            from,
            to,
        };
        let (activities, total) = self
            .db
            .call(move |conn| activities::list(conn, &filter, page))
            .await?;
        Ok(ActivityListResponse {
            activities,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn stats(&self) -> ApiResult<StatsResponse> {
        let since = Utc::now() - chrono::Duration::hours(24);
        Ok(self
            .db
            .call(move |conn| {
                Ok(StatsResponse {
                    users: users::count(conn)?.into(),
                    mdas: mdas::count(conn)?.into(),
                    admins: admins::count(conn)?.into(),
                    activities_last_24h: activities::count_since(conn, &since)?,
                    recent_activities: activities::recent(conn, RECENT_ACTIVITY_COUNT)?,
                })
            })
            .await?)
    }

    // ============ Export ============

    pub async fn export_users(&self, query: &ExportQuery) -> ApiResult<Vec<UserView>> {
        let filter = UserFilter {
            search: non_empty(query.search.clone()),
            is_active: query.is_active,
            mda_id: non_empty(query.mda_id.clone()),
        };
        Ok(self
            .db
            .call(move |conn| {
                let (users, _) = users::list(conn, &filter, None)?;
                Ok(with_mdas(users, &mda_index(conn)?))
            })
            .await?)
    }

    pub async fn export_mdas(&self, query: &ExportQuery) -> ApiResult<Vec<Mda>> {
        let filter = MdaFilter {
            search: non_empty(query.search.clone()),
            is_active: query.is_active,
        };
        let (mdas, _) = self
            .db
            .call(move |conn| mdas::list(conn, &filter, None))
            .await?;
        Ok(mdas)
    }

    /// MDAs filtered by `search`/`isActive` (or the single `mdaId`), each
    /// with all of its users
    pub async fn export_combined(&self, query: &ExportQuery) -> ApiResult<Vec<MdaWithUsers>> {
        let filter = MdaFilter {
            search: non_empty(query.search.clone()),
            is_active: query.is_active,
        };
        let only = non_empty(query.mda_id.clone());
        Ok(self
            .db
            .call(move |conn| {
                let (mdas, _) = mdas::list(conn, &filter, None)?;
                let (all_users, _) = users::list(conn, &UserFilter::default(), None)?;

                let mut by_mda: HashMap<String, Vec<User>> = HashMap::new();
                for user in all_users {
                    by_mda.entry(user.mda_id.clone()).or_default().push(user);
                }

                Ok(mdas
                    .into_iter()
                    .filter(|m| only.as_deref().is_none_or(|id| id == m.id))
                    .map(|mda| {
                        let users = by_mda.remove(&mda.id).unwrap_or_default();
                        MdaWithUsers { mda, users }
                    })
                    .collect())
            })
            .await?)
    }
}
