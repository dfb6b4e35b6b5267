//! Auth, profile and public routes

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use super::handlers::{
    admin_login, admin_logout, admin_me, change_password, get_profile, public_mdas, user_login,
    user_me,
};
use crate::app::AppState;
use crate::auth::{admin_auth_middleware, user_auth_middleware};

/// `/api` routes outside `/api/admin`
///
/// # Endpoints
/// - `GET /api/public/mdas`
/// - `POST /api/auth/login`, `POST /api/auth/admin/login`
/// - `GET /api/auth/me`, `GET /api/profile`, `PUT /api/profile/password` (user token)
/// - `POST /api/auth/admin/logout`, `GET /api/auth/admin/me` (admin token)
pub fn create_api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/public/mdas", get(public_mdas))
        .route("/api/auth/login", post(user_login))
        .route("/api/auth/admin/login", post(admin_login));

    let user = Router::new()
        .route("/api/auth/me", get(user_me))
        .route("/api/profile", get(get_profile))
        .route("/api/profile/password", put(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    let admin = Router::new()
        .route("/api/auth/admin/logout", post(admin_logout))
        .route("/api/auth/admin/me", get(admin_me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    public.merge(user).merge(admin).with_state(state)
}
