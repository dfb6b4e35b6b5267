//! Sign-in, self-service profile and public lookups

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;

use super::types::{
    AdminLoginRequest, AdminLoginResponse, ChangePasswordRequest, ProfileMda, ProfileView,
    PublicMda, UserLoginRequest, UserLoginResponse,
};
use crate::audit::{ActivityLogger, AuditEvent};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AdminPrincipal, PrincipalKind, TokenIssuer, UserPrincipal};
use crate::common::client::ClientInfo;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::model::admin::normalize_email;
use crate::model::{ActivityAction, Admin, User};
use crate::store::mdas::{self, MdaFilter};
use crate::store::{Database, admins, users};
use crate::validation::{ensure, validate_password};

const BAD_USER_CREDENTIALS: &str = "Invalid username or password";
const BAD_ADMIN_CREDENTIALS: &str = "Invalid email or password";
const DEACTIVATED: &str = "Account is deactivated";

/// Every listed field must be non-blank
fn require(fields: &[(&str, &str)]) -> ApiResult<()> {
    ensure(
        fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| FieldError::new(*field, format!("{} is required", field)))
            .collect(),
    )
}

pub struct AuthService {
    db: Database,
    tokens: Arc<TokenIssuer>,
    audit: ActivityLogger,
    bcrypt_cost: u32,
    /// Compared against when no account matches, so a miss costs one bcrypt
    /// verify like a wrong password does
    unknown_account_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        db: Database,
        tokens: Arc<TokenIssuer>,
        audit: ActivityLogger,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            db,
            tokens,
            audit,
            bcrypt_cost,
            unknown_account_hash: OnceCell::new(),
        }
    }

    async fn verify_unknown_account(&self, password: &str) -> ApiResult<()> {
        let filler = uuid::Uuid::new_v4().to_string();
        let hash = self
            .unknown_account_hash
            .get_or_try_init(|| hash_password(&filler, self.bcrypt_cost))
            .await?;
        verify_password(password, hash).await?;
        Ok(())
    }

    async fn profile(&self, user: User) -> ApiResult<ProfileView> {
        let mda_id = user.mda_id.clone();
        let mda = self
            .db
            .call(move |conn| mdas::find_by_id(conn, &mda_id))
            .await?;
        Ok(ProfileView {
            mda: mda.as_ref().map(ProfileMda::from),
            user,
        })
    }

    // ============ User session ============

    /// Credential check happens before the active check so a deactivated
    /// account is only revealed to someone who knows its password
    pub async fn user_login(&self, req: UserLoginRequest) -> ApiResult<UserLoginResponse> {
        require(&[("username", req.username.as_str()), ("password", req.password.as_str())])?;

        let username = req.username.trim().to_string();
        let found = self
            .db
            .call(move |conn| users::find_by_username(conn, &username))
            .await?;
        let Some(mut user) = found else {
            self.verify_unknown_account(&req.password).await?;
            tracing::warn!("User login failed: unknown username");
            return Err(ApiError::Unauthenticated(BAD_USER_CREDENTIALS.to_string()));
        };

        if !verify_password(&req.password, &user.password_hash).await? {
            tracing::warn!(username = %user.username, "User login failed: wrong password");
            return Err(ApiError::Unauthenticated(BAD_USER_CREDENTIALS.to_string()));
        }
        if !user.is_active {
            return Err(ApiError::Forbidden(DEACTIVATED.to_string()));
        }

        let now = Utc::now();
        let id = user.id.clone();
        self.db
            .call(move |conn| users::record_login(conn, &id, &now))
            .await?;
        user.last_login = Some(now);

        let issued = self.tokens.issue(PrincipalKind::User, &user.id, user.role)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(UserLoginResponse {
            token: issued.token,
            expires_in: issued.expires_in,
            user: self.profile(user).await?,
        })
    }

    pub async fn current_user(&self, principal: &UserPrincipal) -> ApiResult<ProfileView> {
        let id = principal.id.clone();
        let user = self
            .db
            .call(move |conn| users::find_by_id(conn, &id))
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;
        self.profile(user).await
    }

    pub async fn change_password(
        &self,
        principal: &UserPrincipal,
        req: ChangePasswordRequest,
    ) -> ApiResult<()> {
        let mut errors = Vec::new();
        if req.current_password.is_empty() {
            errors.push(FieldError::new(
                "currentPassword",
                "currentPassword is required",
            ));
        }
        errors.extend(validate_password("newPassword", &req.new_password));
        ensure(errors)?;

        let id = principal.id.clone();
        let user = self
            .db
            .call(move |conn| users::find_by_id(conn, &id))
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;

        if !verify_password(&req.current_password, &user.password_hash).await? {
            return Err(ApiError::invalid(
                "currentPassword",
                "Current password is incorrect",
            ));
        }

        let hash = hash_password(&req.new_password, self.bcrypt_cost).await?;
        let id = user.id.clone();
        self.db
            .call(move |conn| users::update_password(conn, &id, &hash))
            .await?;

        tracing::info!(user_id = %user.id, "User changed password");
        Ok(())
    }

    // ============ Admin session ============

    pub async fn admin_login(
        &self,
        req: AdminLoginRequest,
        client: &ClientInfo,
    ) -> ApiResult<AdminLoginResponse> {
        require(&[("email", req.email.as_str()), ("password", req.password.as_str())])?;

        let email = normalize_email(&req.email);
        let found = self
            .db
            .call(move |conn| admins::find_by_email(conn, &email))
            .await?;
        let Some(mut admin) = found else {
            self.verify_unknown_account(&req.password).await?;
            tracing::warn!("Admin login failed: unknown email");
            return Err(ApiError::Unauthenticated(BAD_ADMIN_CREDENTIALS.to_string()));
        };

        if !verify_password(&req.password, &admin.password_hash).await? {
            tracing::warn!(admin_id = %admin.id, "Admin login failed: wrong password");
            return Err(ApiError::Unauthenticated(BAD_ADMIN_CREDENTIALS.to_string()));
        }
        if !admin.is_active {
            tracing::warn!(admin_id = %admin.id, "Deactivated admin attempted login");
            return Err(ApiError::Forbidden(DEACTIVATED.to_string()));
        }

        let now = Utc::now();
        let id = admin.id.clone();
        self.db
            .call(move |conn| admins::record_login(conn, &id, &now))
            .await?;
        admin.last_login = Some(now);

        let issued = self
            .tokens
            .issue(PrincipalKind::Admin, &admin.id, admin.role)?;
        tracing::info!(admin_id = %admin.id, role = %admin.role, "Admin logged in");

        self.audit
            .record(
                &AdminPrincipal::from(&admin),
                AuditEvent::session(ActivityAction::Login),
                client,
            )
            .await;

        Ok(AdminLoginResponse {
            token: issued.token,
            expires_in: issued.expires_in,
            admin,
        })
    }

    /// Tokens are stateless; logout only leaves an audit trail
    pub async fn admin_logout(&self, principal: &AdminPrincipal, client: &ClientInfo) {
        tracing::info!(admin_id = %principal.id, "Admin logged out");
        self.audit
            .record(principal, AuditEvent::session(ActivityAction::Logout), client)
            .await;
    }

    pub async fn current_admin(&self, principal: &AdminPrincipal) -> ApiResult<Admin> {
        let id = principal.id.clone();
        self.db
            .call(move |conn| admins::find_by_id(conn, &id))
            .await?
            .ok_or_else(|| ApiError::not_found("Admin"))
    }

    // ============ Public ============

    pub async fn public_mdas(&self) -> ApiResult<Vec<PublicMda>> {
        let filter = MdaFilter {
            search: None,
            is_active: Some(true),
        };
        let (mdas, _) = self
            .db
            .call(move |conn| mdas::list(conn, &filter, None))
            .await?;
        Ok(mdas
            .into_iter()
            .map(|m| PublicMda {
                id: m.id,
                name: m.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::MIN_BCRYPT_COST;

    fn service() -> AuthService {
        let db = Database::open_in_memory().unwrap();
        let audit = ActivityLogger::new(Arc::new(db.clone()));
        AuthService::new(
            db,
            Arc::new(TokenIssuer::new("test-secret", 3600)),
            audit,
            MIN_BCRYPT_COST,
        )
    }

    #[tokio::test]
    async fn test_unknown_username_still_verifies_a_hash() {
        let auth = service();
        assert!(auth.unknown_account_hash.get().is_none());

        let err = auth
            .user_login(UserLoginRequest {
                username: "nobody".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(ref m) if m == BAD_USER_CREDENTIALS));
        let hash = auth.unknown_account_hash.get().unwrap();
        assert!(hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_unknown_admin_email_still_verifies_a_hash() {
        let auth = service();
        let err = auth
            .admin_login(
                AdminLoginRequest {
                    email: "ghost@mda.gov".to_string(),
                    password: "whatever".to_string(),
                },
                &ClientInfo::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(ref m) if m == BAD_ADMIN_CREDENTIALS));
        assert!(auth.unknown_account_hash.get().is_some());
    }
}
