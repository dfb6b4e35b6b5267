//! Application state and router assembly

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::get,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::admin::{AdminService, create_admin_router};
use crate::api::{AuthService, create_api_router, health, info};
use crate::audit::{ActivityLogger, ActivitySink};
use crate::auth::TokenIssuer;
use crate::common::rate_limit::{FixedWindowLimiter, rate_limit_middleware};
use crate::error::not_found_fallback;
use crate::model::Config;
use crate::store::Database;

/// State shared by every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
    pub audit: ActivityLogger,
    pub admin: Arc<AdminService>,
    pub auth: Arc<AuthService>,
    pub limiter: Arc<FixedWindowLimiter>,
}

impl AppState {
    /// Activities are written to `db`
    pub fn new(config: Config, db: Database) -> Self {
        let sink: Arc<dyn ActivitySink> = Arc::new(db.clone());
        Self::with_activity_sink(config, db, sink)
    }

    pub fn with_activity_sink(config: Config, db: Database, sink: Arc<dyn ActivitySink>) -> Self {
        let tokens = Arc::new(TokenIssuer::new(
            config.jwt_secret(),
            config.jwt_expires_in_secs,
        ));
        let audit = ActivityLogger::new(sink);
        let admin = AdminService::new(db.clone(), audit.clone(), config.bcrypt_rounds);
        let auth = AuthService::new(
            db.clone(),
            tokens.clone(),
            audit.clone(),
            config.bcrypt_rounds,
        );
        let limiter = FixedWindowLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        )
        .trust_forwarded_headers(config.trust_proxy);

        Self {
            config: Arc::new(config),
            db,
            tokens,
            audit,
            admin: Arc::new(admin),
            auth: Arc::new(auth),
            limiter: Arc::new(limiter),
        }
    }
}

/// CORS layer for the configured origins; `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the complete router
///
/// Every `/api` route is rate limited per client address; `/health` and
/// `/info` are not.
pub fn create_app(state: AppState) -> Router {
    let api = create_api_router(state.clone())
        .nest("/api/admin", create_admin_router(state.clone()))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .with_state(state.clone())
        .merge(api)
        .fallback(not_found_fallback)
        .layer(cors_layer(&state.config.cors_origins))
}
