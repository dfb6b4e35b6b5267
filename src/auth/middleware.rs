//! Per-request principal resolution
//!
//! Both middlewares run the same pipeline, in this order:
//! bearer token → namespace verification (401) → record lookup (401) →
//! active check (403). The resolved principal is stored in the request
//! extensions; handlers take it as an extractor and call
//! [`AdminPrincipal::authorize`] / [`UserPrincipal::authorize`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use super::role::{Permission, Role};
use super::token::{PrincipalKind, TokenError};
use crate::app::AppState;
use crate::common::auth::extract_bearer_token;
use crate::error::ApiError;
use crate::model::{Admin, User};
use crate::store::{admins, users};

const PRINCIPAL_GONE: &str = "Invalid token: principal no longer exists";
const DEACTIVATED: &str = "Account is deactivated";

/// Authenticated admin of the current request
#[derive(Debug, Clone)]
pub struct AdminPrincipal {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AdminPrincipal {
    pub fn authorize(&self, permission: Permission) -> Result<(), ApiError> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                admin_id = %self.id,
                role = %self.role,
                ?permission,
                "Permission denied"
            );
            Err(ApiError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }
}

impl From<&Admin> for AdminPrincipal {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id.clone(),
            name: admin.name.clone(),
            email: admin.email.clone(),
            role: admin.role,
        }
    }
}

/// Authenticated user of the current request
#[derive(Debug, Clone)]
pub struct UserPrincipal {
    pub id: String,
    pub username: String,
    pub name: String,
    pub mda_id: String,
    pub role: Role,
}

impl UserPrincipal {
    pub fn authorize(&self, permission: Permission) -> Result<(), ApiError> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }
}

impl From<&User> for UserPrincipal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            mda_id: user.mda_id.clone(),
            role: user.role,
        }
    }
}

/// Admin-namespace authentication
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let claims = state.tokens.verify(PrincipalKind::Admin, token)?;

    let admin = state
        .db
        .call(move |conn| admins::find_by_id(conn, &claims.sub))
        .await?
        .ok_or_else(|| ApiError::Unauthenticated(PRINCIPAL_GONE.to_string()))?;

    if !admin.is_active {
        tracing::warn!(admin_id = %admin.id, "Deactivated admin rejected");
        return Err(ApiError::Forbidden(DEACTIVATED.to_string()));
    }

    request.extensions_mut().insert(AdminPrincipal::from(&admin));
    Ok(next.run(request).await)
}

/// User-namespace authentication
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let claims = state.tokens.verify(PrincipalKind::User, token)?;

    let user = state
        .db
        .call(move |conn| users::find_by_id(conn, &claims.sub))
        .await?
        .ok_or_else(|| ApiError::Unauthenticated(PRINCIPAL_GONE.to_string()))?;

    if !user.is_active {
        tracing::warn!(user_id = %user.id, "Deactivated user rejected");
        return Err(ApiError::Forbidden(DEACTIVATED.to_string()));
    }

    request.extensions_mut().insert(UserPrincipal::from(&user));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AdminPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminPrincipal>()
            .cloned()
            .ok_or_else(|| TokenError::Missing.into())
    }
}

impl<S> FromRequestParts<S> for UserPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserPrincipal>()
            .cloned()
            .ok_or_else(|| TokenError::Missing.into())
    }
}
