//! MDA records
//!
//! Reports are stored as a JSON array column alongside the MDA row.

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::ToSql};

use super::{Page, StoreError, from_db_time, like_pattern, to_db_time, where_sql};
use crate::model::{Mda, Report};

const COLUMNS: &str = "id, name, reports, is_active, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct MdaFilter {
    /// Matches the MDA name
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Mda> {
    let reports: String = row.get(2)?;
    let reports: Vec<Report> = serde_json::from_str(&reports).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Mda {
        id: row.get(0)?,
        name: row.get(1)?,
        reports,
        is_active: row.get(3)?,
        created_at: from_db_time(4, row.get(4)?)?,
        updated_at: from_db_time(5, row.get(5)?)?,
    })
}

pub fn insert(conn: &Connection, mda: &Mda) -> Result<(), StoreError> {
    let reports = serde_json::to_string(&mda.reports)?;
    conn.execute(
        &format!("INSERT INTO mdas ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", COLUMNS),
        params![
            mda.id,
            mda.name,
            reports,
            mda.is_active,
            to_db_time(&mda.created_at),
            to_db_time(&mda.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Mda>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM mdas WHERE id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?)
}

/// Filtered MDAs ordered by name, with the unpaginated total
pub fn list(
    conn: &Connection,
    filter: &MdaFilter,
    page: Option<Page>,
) -> Result<(Vec<Mda>, u64), StoreError> {
    let mut clauses = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        clauses.push(format!("name LIKE ?{} ESCAPE '\\'", params.len() + 1));
        params.push(Box::new(like_pattern(search)));
    }
    if let Some(is_active) = filter.is_active {
        clauses.push(format!("is_active = ?{}", params.len() + 1));
        params.push(Box::new(is_active));
    }
    let where_clause = where_sql(&clauses);

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM mdas {}", where_clause),
        params_from_iter(params.iter().map(|p| p.as_ref())),
        |row| row.get(0),
    )?;

    let mut sql = format!("SELECT {} FROM mdas {} ORDER BY name ASC", COLUMNS, where_clause);
    if let Some(page) = page {
        sql.push_str(&format!(" LIMIT ?{} OFFSET ?{}", params.len() + 1, params.len() + 2));
        params.push(Box::new(page.limit as i64));
        params.push(Box::new(page.offset() as i64));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mdas = stmt
        .query_map(params_from_iter(params.iter().map(|p| p.as_ref())), from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((mdas, total))
}

pub fn update(conn: &Connection, mda: &Mda) -> Result<(), StoreError> {
    let reports = serde_json::to_string(&mda.reports)?;
    let changed = conn.execute(
        "UPDATE mdas SET name = ?2, reports = ?3, is_active = ?4, updated_at = ?5 WHERE id = ?1",
        params![mda.id, mda.name, reports, mda.is_active, to_db_time(&mda.updated_at)],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> Result<(), StoreError> {
    let changed = conn.execute("DELETE FROM mdas WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// (total, active)
pub fn count(conn: &Connection) -> Result<(u64, u64), StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM mdas",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}
