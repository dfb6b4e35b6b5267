//! Admin activity trail
//!
//! Append-only: there is no update or delete.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params, params_from_iter, types::ToSql};

use super::{Page, StoreError, from_db_time, to_db_time, where_sql};
use crate::model::{Activity, ActivityAction, ResourceType};

const COLUMNS: &str = "id, admin_id, admin_name, action, resource_type, resource_id, \
                       resource_name, details, ip_address, user_agent, timestamp";

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub admin_id: Option<String>,
    pub action: Option<ActivityAction>,
    pub resource_type: Option<ResourceType>,
    /// Inclusive lower bound
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub to: Option<DateTime<Utc>>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    let action: String = row.get(3)?;
    let resource_type: String = row.get(4)?;
    Ok(Activity {
        id: row.get(0)?,
        admin_id: row.get(1)?,
        admin_name: row.get(2)?,
        action: ActivityAction::parse(&action).ok_or_else(|| invalid_text(3, &action))?,
        resource_type: ResourceType::parse(&resource_type)
            .ok_or_else(|| invalid_text(4, &resource_type))?,
        resource_id: row.get(5)?,
        resource_name: row.get(6)?,
        details: row.get(7)?,
        ip_address: row.get(8)?,
        user_agent: row.get(9)?,
        timestamp: from_db_time(10, row.get(10)?)?,
    })
}

fn invalid_text(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unknown value: {}", value).into(),
    )
}

pub fn insert(conn: &Connection, activity: &Activity) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO activities ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)", COLUMNS),
        params![
            activity.id,
            activity.admin_id,
            activity.admin_name,
            activity.action.as_str(),
            activity.resource_type.as_str(),
            activity.resource_id,
            activity.resource_name,
            activity.details,
            activity.ip_address,
            activity.user_agent,
            to_db_time(&activity.timestamp),
        ],
    )?;
    Ok(())
}

/// Filtered activities, newest first, with the unpaginated total
pub fn list(
    conn: &Connection,
    filter: &ActivityFilter,
    page: Page,
) -> Result<(Vec<Activity>, u64), StoreError> {
    let mut clauses = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(ref admin_id) = filter.admin_id {
        clauses.push(format!("admin_id = ?{}", params.len() + 1));
        params.push(Box::new(admin_id.clone()));
    }
    if let Some(action) = filter.action {
        clauses.push(format!("action = ?{}", params.len() + 1));
        params.push(Box::new(action.as_str()));
    }
    if let Some(resource_type) = filter.resource_type {
        clauses.push(format!("resource_type = ?{}", params.len() + 1));
        params.push(Box::new(resource_type.as_str()));
    }
    if let Some(ref from) = filter.from {
        clauses.push(format!("timestamp >= ?{}", params.len() + 1));
        params.push(Box::new(to_db_time(from)));
    }
    if let Some(ref to) = filter.to {
        clauses.push(format!("timestamp <= ?{}", params.len() + 1));
        params.push(Box::new(to_db_time(to)));
    }
    let where_clause = where_sql(&clauses);

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM activities {}", where_clause),
        params_from_iter(params.iter().map(|p| p.as_ref())),
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {} FROM activities {} ORDER BY timestamp DESC, rowid DESC LIMIT ?{} OFFSET ?{}",
        COLUMNS,
        where_clause,
        params.len() + 1,
        params.len() + 2
    );
    params.push(Box::new(page.limit as i64));
    params.push(Box::new(page.offset() as i64));

    let mut stmt = conn.prepare(&sql)?;
    let activities = stmt
        .query_map(params_from_iter(params.iter().map(|p| p.as_ref())), from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((activities, total))
}

/// The `limit` most recent activities
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<Activity>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM activities ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
        COLUMNS
    ))?;
    let activities = stmt
        .query_map([limit as i64], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(activities)
}

pub fn count_since(conn: &Connection, since: &DateTime<Utc>) -> Result<u64, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM activities WHERE timestamp >= ?1",
        [to_db_time(since)],
        |row| row.get(0),
    )?)
}
