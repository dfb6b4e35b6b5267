//! Auth, profile and public HTTP handlers

use axum::{Json, extract::State};
use chrono::Utc;

use super::types::{
    AdminLoginRequest, AdminLoginResponse, ChangePasswordRequest, HealthResponse, InfoResponse,
    ProfileView, PublicMda, UserLoginRequest, UserLoginResponse,
};
use crate::admin::types::SuccessResponse;
use crate::app::AppState;
use crate::auth::{AdminPrincipal, Permission, UserPrincipal};
use crate::common::client::ClientInfo;
use crate::common::extract::AppJson;
use crate::error::ApiResult;
use crate::model::Admin;

// ============ User session ============

/// POST /api/auth/login
pub async fn user_login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserLoginRequest>,
) -> ApiResult<Json<UserLoginResponse>> {
    Ok(Json(state.auth.user_login(payload).await?))
}

/// GET /api/auth/me
pub async fn user_me(
    State(state): State<AppState>,
    principal: UserPrincipal,
) -> ApiResult<Json<ProfileView>> {
    principal.authorize(Permission::ViewOwnProfile)?;
    Ok(Json(state.auth.current_user(&principal).await?))
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    principal: UserPrincipal,
) -> ApiResult<Json<ProfileView>> {
    principal.authorize(Permission::ViewOwnProfile)?;
    Ok(Json(state.auth.current_user(&principal).await?))
}

/// PUT /api/profile/password
pub async fn change_password(
    State(state): State<AppState>,
    principal: UserPrincipal,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    principal.authorize(Permission::ChangeOwnPassword)?;
    state.auth.change_password(&principal, payload).await?;
    Ok(Json(SuccessResponse::new("Password changed successfully")))
}

// ============ Admin session ============

/// POST /api/auth/admin/login
pub async fn admin_login(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(payload): AppJson<AdminLoginRequest>,
) -> ApiResult<Json<AdminLoginResponse>> {
    Ok(Json(state.auth.admin_login(payload, &client).await?))
}

/// POST /api/auth/admin/logout
pub async fn admin_logout(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    client: ClientInfo,
) -> Json<SuccessResponse> {
    state.auth.admin_logout(&principal, &client).await;
    Json(SuccessResponse::new("Logged out successfully"))
}

/// GET /api/auth/admin/me
pub async fn admin_me(
    State(state): State<AppState>,
    principal: AdminPrincipal,
) -> ApiResult<Json<Admin>> {
    Ok(Json(state.auth.current_admin(&principal).await?))
}

// ============ Public ============

/// GET /api/public/mdas
pub async fn public_mdas(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicMda>>> {
    Ok(Json(state.auth.public_mdas().await?))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.db.ping().await {
        "connected"
    } else {
        "unavailable"
    };
    Json(HealthResponse {
        status: "ok",
        database,
        timestamp: Utc::now(),
    })
}

/// GET /info
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
    })
}
