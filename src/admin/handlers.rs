//! Admin API HTTP handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::Response,
};

use super::export::{
    ExportFormat, combined_csv, csv_response, json_response, mdas_csv, users_csv,
};
use super::types::{
    ActivityListQuery, ActivityListResponse, AdminListResponse, CreateAdminRequest,
    CreateMdaRequest, CreateUserRequest, ExportQuery, MdaDetail, MdaListQuery, MdaListResponse,
    ResetPasswordRequest, SetAdminStatusRequest, StatsResponse, SuccessResponse,
    UpdateMdaRequest, UpdateUserRequest, UserListQuery, UserListResponse, UserView,
};
use crate::app::AppState;
use crate::auth::{AdminPrincipal, Permission};
use crate::common::client::ClientInfo;
use crate::common::extract::{AppJson, AppPath, AppQuery};
use crate::error::ApiResult;
use crate::model::{Admin, Mda};

// ============ MDAs ============

/// GET /api/admin/mdas
pub async fn list_mdas(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    AppQuery(query): AppQuery<MdaListQuery>,
) -> ApiResult<Json<MdaListResponse>> {
    actor.authorize(Permission::ManageMdas)?;
    Ok(Json(state.admin.list_mdas(query).await?))
}

/// GET /api/admin/mdas/{id}
pub async fn get_mda(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    AppPath(id): AppPath<String>,
) -> ApiResult<Json<MdaDetail>> {
    actor.authorize(Permission::ManageMdas)?;
    Ok(Json(state.admin.get_mda(id).await?))
}

/// POST /api/admin/mdas
pub async fn create_mda(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppJson(payload): AppJson<CreateMdaRequest>,
) -> ApiResult<(StatusCode, Json<Mda>)> {
    actor.authorize(Permission::ManageMdas)?;
    let mda = state.admin.create_mda(&actor, payload, &client).await?;
    Ok((StatusCode::CREATED, Json(mda)))
}

/// PUT /api/admin/mdas/{id}
pub async fn update_mda(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppPath(id): AppPath<String>,
    AppJson(payload): AppJson<UpdateMdaRequest>,
) -> ApiResult<Json<Mda>> {
    actor.authorize(Permission::ManageMdas)?;
    Ok(Json(state.admin.update_mda(&actor, id, payload, &client).await?))
}

/// DELETE /api/admin/mdas/{id}
pub async fn delete_mda(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppPath(id): AppPath<String>,
) -> ApiResult<Json<SuccessResponse>> {
    actor.authorize(Permission::ManageMdas)?;
    let mda = state.admin.delete_mda(&actor, id, &client).await?;
    Ok(Json(SuccessResponse::new(format!("MDA {} deleted", mda.name))))
}

// ============ Users ============

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    AppQuery(query): AppQuery<UserListQuery>,
) -> ApiResult<Json<UserListResponse>> {
    actor.authorize(Permission::ManageUsers)?;
    Ok(Json(state.admin.list_users(query).await?))
}

/// GET /api/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    AppPath(id): AppPath<String>,
) -> ApiResult<Json<UserView>> {
    actor.authorize(Permission::ManageUsers)?;
    Ok(Json(state.admin.get_user(id).await?))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    actor.authorize(Permission::ManageUsers)?;
    let user = state.admin.create_user(&actor, payload, &client).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppPath(id): AppPath<String>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> ApiResult<Json<UserView>> {
    actor.authorize(Permission::ManageUsers)?;
    Ok(Json(state.admin.update_user(&actor, id, payload, &client).await?))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppPath(id): AppPath<String>,
) -> ApiResult<Json<SuccessResponse>> {
    actor.authorize(Permission::ManageUsers)?;
    let user = state.admin.delete_user(&actor, id, &client).await?;
    Ok(Json(SuccessResponse::new(format!("User {} deleted", user.username))))
}

/// PUT /api/admin/users/{id}/reset-password
pub async fn reset_user_password(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppPath(id): AppPath<String>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    actor.authorize(Permission::ResetUserPasswords)?;
    state
        .admin
        .reset_user_password(&actor, id, payload, &client)
        .await?;
    Ok(Json(SuccessResponse::new("Password reset successfully")))
}

// ============ Admins (superadmin only) ============

/// GET /api/admin/admins
pub async fn list_admins(
    State(state): State<AppState>,
    actor: AdminPrincipal,
) -> ApiResult<Json<AdminListResponse>> {
    actor.authorize(Permission::ManageAdmins)?;
    Ok(Json(state.admin.list_admins().await?))
}

/// POST /api/admin/admins
pub async fn create_admin(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppJson(payload): AppJson<CreateAdminRequest>,
) -> ApiResult<(StatusCode, Json<Admin>)> {
    actor.authorize(Permission::ManageAdmins)?;
    let admin = state.admin.create_admin(&actor, payload, &client).await?;
    Ok((StatusCode::CREATED, Json(admin)))
}

/// DELETE /api/admin/admins/{id}
pub async fn delete_admin(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppPath(id): AppPath<String>,
) -> ApiResult<Json<SuccessResponse>> {
    actor.authorize(Permission::ManageAdmins)?;
    let admin = state.admin.delete_admin(&actor, id, &client).await?;
    Ok(Json(SuccessResponse::new(format!("Admin {} deleted", admin.email))))
}

/// PUT /api/admin/admins/{id}/status
pub async fn set_admin_status(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    client: ClientInfo,
    AppPath(id): AppPath<String>,
    AppJson(payload): AppJson<SetAdminStatusRequest>,
) -> ApiResult<Json<Admin>> {
    actor.authorize(Permission::ManageAdmins)?;
    Ok(Json(
        state
            .admin
            .set_admin_status(&actor, id, payload, &client)
            .await?,
    ))
}

// ============ Activities & stats ============

/// GET /api/admin/activities
pub async fn list_activities(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    AppQuery(query): AppQuery<ActivityListQuery>,
) -> ApiResult<Json<ActivityListResponse>> {
    actor.authorize(Permission::ViewActivities)?;
    Ok(Json(state.admin.list_activities(query).await?))
}

/// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<AppState>,
    actor: AdminPrincipal,
) -> ApiResult<Json<StatsResponse>> {
    actor.authorize(Permission::ViewDashboard)?;
    Ok(Json(state.admin.stats().await?))
}

// ============ Export ============

/// GET /api/admin/export/users
pub async fn export_users(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    AppQuery(query): AppQuery<ExportQuery>,
) -> ApiResult<Response> {
    actor.authorize(Permission::ExportData)?;
    let format = ExportFormat::parse(query.format.as_deref())?;
    let rows = state.admin.export_users(&query).await?;
    tracing::info!(admin_id = %actor.id, rows = rows.len(), ?format, "Users exported");

    Ok(match format {
        ExportFormat::Json => json_response(rows),
        ExportFormat::Csv => csv_response("users", users_csv(&rows)?),
    })
}

/// GET /api/admin/export/mdas
pub async fn export_mdas(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    AppQuery(query): AppQuery<ExportQuery>,
) -> ApiResult<Response> {
    actor.authorize(Permission::ExportData)?;
    let format = ExportFormat::parse(query.format.as_deref())?;
    let rows = state.admin.export_mdas(&query).await?;
    tracing::info!(admin_id = %actor.id, rows = rows.len(), ?format, "MDAs exported");

    Ok(match format {
        ExportFormat::Json => json_response(rows),
        ExportFormat::Csv => csv_response("mdas", mdas_csv(&rows)?),
    })
}

/// GET /api/admin/export/combined
pub async fn export_combined(
    State(state): State<AppState>,
    actor: AdminPrincipal,
    AppQuery(query): AppQuery<ExportQuery>,
) -> ApiResult<Response> {
    actor.authorize(Permission::ExportData)?;
    let format = ExportFormat::parse(query.format.as_deref())?;
    let rows = state.admin.export_combined(&query).await?;
    tracing::info!(admin_id = %actor.id, rows = rows.len(), ?format, "Combined export");

    Ok(match format {
        ExportFormat::Json => json_response(rows),
        ExportFormat::Csv => csv_response("combined", combined_csv(&rows)?),
    })
}

