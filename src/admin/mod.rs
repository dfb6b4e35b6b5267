//! Admin API
//!
//! MDA, user and admin management, activity browsing, dashboard stats and
//! data export. Every route runs behind the admin-namespace middleware.

pub mod export;
mod handlers;
mod router;
mod service;
pub mod types;

pub use router::create_admin_router;
pub use service::AdminService;
