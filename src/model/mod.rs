//! Domain records and application configuration

pub mod activity;
pub mod admin;
pub mod config;
pub mod mda;
pub mod user;

pub use activity::{Activity, ActivityAction, ResourceType};
pub use admin::Admin;
pub use config::Config;
pub use mda::{Mda, Report};
pub use user::User;
