//! Sign-in, self-service profile and public endpoints

mod handlers;
mod router;
mod service;
pub mod types;

pub use handlers::{health, info};
pub use router::create_api_router;
pub use service::AuthService;
