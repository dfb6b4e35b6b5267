use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "CREATE",
            ActivityAction::Update => "UPDATE",
            ActivityAction::Delete => "DELETE",
            ActivityAction::Login => "LOGIN",
            ActivityAction::Logout => "LOGOUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CREATE" => Some(ActivityAction::Create),
            "UPDATE" => Some(ActivityAction::Update),
            "DELETE" => Some(ActivityAction::Delete),
            "LOGIN" => Some(ActivityAction::Login),
            "LOGOUT" => Some(ActivityAction::Logout),
            _ => None,
        }
    }

    /// LOGIN / LOGOUT carry no target resource
    pub fn is_session(&self) -> bool {
        matches!(self, ActivityAction::Login | ActivityAction::Logout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    User,
    Mda,
    Admin,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::User => "USER",
            ResourceType::Mda => "MDA",
            ResourceType::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "USER" => Some(ResourceType::User),
            "MDA" => Some(ResourceType::Mda),
            "ADMIN" => Some(ResourceType::Admin),
            _ => None,
        }
    }
}

/// One entry of the append-only admin audit trail
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub admin_id: String,
    pub admin_name: String,
    pub action: ActivityAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub resource_name: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}
