//! Admin API request and response types

use serde::{Deserialize, Serialize};

use crate::model::{Activity, Admin, Mda, Report, User};
use crate::store::Page;

// ============ Pagination ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: Page, total: u64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: total.div_ceil(page.limit as u64),
        }
    }
}

// ============ MDAs ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MdaListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

/// Missing fields deserialize to empty values so validation can report them
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMdaRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reports: Vec<Report>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMdaRequest {
    pub name: Option<String>,
    pub reports: Option<Vec<Report>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MdaListResponse {
    pub mdas: Vec<Mda>,
    pub pagination: Pagination,
}

/// MDA with the number of users assigned to it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MdaDetail {
    #[serde(flatten)]
    pub mda: Mda,
    pub user_count: u64,
}

// ============ Users ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub mda_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub mda_id: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub mda_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub new_password: String,
}

/// `{id, name}` reference to the MDA a user belongs to
#[derive(Debug, Clone, Serialize)]
pub struct MdaSummary {
    pub id: String,
    pub name: String,
}

impl From<&Mda> for MdaSummary {
    fn from(mda: &Mda) -> Self {
        Self {
            id: mda.id.clone(),
            name: mda.name.clone(),
        }
    }
}

/// User as shown to admins
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    /// None when the MDA row is missing
    pub mda: Option<MdaSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserView>,
    pub pagination: Pagination,
}

// ============ Admins ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAdminStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub admins: Vec<Admin>,
}

// ============ Activities & stats ============

/// `action` and `resourceType` are matched case-insensitively; `from` and
/// `to` are RFC 3339 timestamps
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub admin_id: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityListResponse {
    pub activities: Vec<Activity>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: u64,
    pub active: u64,
}

impl From<(u64, u64)> for Counts {
    fn from((total, active): (u64, u64)) -> Self {
        Self { total, active }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub users: Counts,
    pub mdas: Counts,
    pub admins: Counts,
    /// Activities in the last 24 hours
    pub activities_last_24h: u64,
    pub recent_activities: Vec<Activity>,
}

// ============ Export ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    /// `json` (default) or `csv`
    pub format: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub mda_id: Option<String>,
}

// ============ Common ============

/// Operation success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
