//! Auth, profile and public request/response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Admin, Mda, Report, User};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// A user's MDA with only its active reports
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMda {
    pub id: String,
    pub name: String,
    pub reports: Vec<Report>,
}

impl From<&Mda> for ProfileMda {
    fn from(mda: &Mda) -> Self {
        Self {
            id: mda.id.clone(),
            name: mda.name.clone(),
            reports: mda.active_reports(),
        }
    }
}

/// The signed-in user as they see themselves
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    pub mda: Option<ProfileMda>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginResponse {
    pub token: String,
    /// Seconds
    pub expires_in: u64,
    pub user: ProfileView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub admin: Admin,
}

/// Entry of the public MDA picker
#[derive(Debug, Serialize)]
pub struct PublicMda {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: String,
}
