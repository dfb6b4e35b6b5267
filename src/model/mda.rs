use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A report link published for an MDA
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Ministry, Department or Agency
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mda {
    pub id: String,
    pub name: String,
    pub reports: Vec<Report>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mda {
    pub fn new(name: impl Into<String>, reports: Vec<Report>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into().trim().to_string(),
            reports,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reports visible to the MDA's users
    pub fn active_reports(&self) -> Vec<Report> {
        self.reports.iter().filter(|r| r.is_active).cloned().collect()
    }
}
