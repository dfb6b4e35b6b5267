//! MDA reporting admin API
//!
//! Dual-session (user / admin) REST backend for managing MDAs, their users,
//! admin accounts and the admin activity trail.

pub mod admin;
pub mod api;
pub mod app;
pub mod audit;
pub mod auth;
pub mod common;
pub mod error;
pub mod model;
pub mod seed;
pub mod session;
pub mod store;
pub mod validation;

pub use app::{AppState, create_app};
