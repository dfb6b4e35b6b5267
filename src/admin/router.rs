//! Admin API routes

use axum::{
    Router, middleware,
    routing::{get, put},
};

use super::handlers::{
    create_admin, create_mda, create_user, delete_admin, delete_mda, delete_user, export_combined,
    export_mdas, export_users, get_mda, get_stats, get_user, list_activities, list_admins,
    list_mdas, list_users, reset_user_password, set_admin_status, update_mda, update_user,
};
use crate::app::AppState;
use crate::auth::admin_auth_middleware;

/// Create the admin API router, mounted at `/api/admin`
///
/// # Endpoints
/// - `GET|POST /mdas`, `GET|PUT|DELETE /mdas/{id}`
/// - `GET|POST /users`, `GET|PUT|DELETE /users/{id}`
/// - `PUT /users/{id}/reset-password`
/// - `GET|POST /admins`, `DELETE /admins/{id}`, `PUT /admins/{id}/status` (superadmin)
/// - `GET /activities`, `GET /stats`
/// - `GET /export/{users,mdas,combined}?format=json|csv`
///
/// # Authentication
/// Every route requires an admin-namespace `Authorization: Bearer <token>`.
pub fn create_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/mdas", get(list_mdas).post(create_mda))
        .route(
            "/mdas/{id}",
            get(get_mda).put(update_mda).delete(delete_mda),
        )
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/reset-password", put(reset_user_password))
        .route("/admins", get(list_admins).post(create_admin))
        .route("/admins/{id}", axum::routing::delete(delete_admin))
        .route("/admins/{id}/status", put(set_admin_status))
        .route("/activities", get(list_activities))
        .route("/stats", get(get_stats))
        .route("/export/users", get(export_users))
        .route("/export/mdas", get(export_mdas))
        .route("/export/combined", get(export_combined))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
