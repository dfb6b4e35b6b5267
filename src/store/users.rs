//! User records

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::ToSql};

use super::{Page, StoreError, from_db_time, from_db_time_opt, like_pattern, to_db_time, where_sql};
use crate::auth::role::Role;
use crate::model::User;

const COLUMNS: &str = "id, username, name, contact_email, password_hash, role, mda_id, \
                       is_active, last_login, created_at, updated_at";

/// List / export filter
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Matches username, name or contact email
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub mda_id: Option<String>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        contact_email: row.get(3)?,
        password_hash: row.get(4)?,
        role: Role::parse(&role).unwrap_or(Role::User),
        mda_id: row.get(6)?,
        is_active: row.get(7)?,
        last_login: from_db_time_opt(8, row.get(8)?)?,
        created_at: from_db_time(9, row.get(9)?)?,
        updated_at: from_db_time(10, row.get(10)?)?,
    })
}

pub fn insert(conn: &Connection, user: &User) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)", COLUMNS),
        params![
            user.id,
            user.username,
            user.name,
            user.contact_email,
            user.password_hash,
            user.role.as_str(),
            user.mda_id,
            user.is_active,
            user.last_login.as_ref().map(to_db_time),
            to_db_time(&user.created_at),
            to_db_time(&user.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<User>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?)
}

/// Case-insensitive lookup
pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", COLUMNS),
            [username.trim()],
            from_row,
        )
        .optional()?)
}

fn filter_clauses(filter: &UserFilter) -> (Vec<String>, Vec<Box<dyn ToSql>>) {
    let mut clauses = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let n = params.len() + 1;
        clauses.push(format!(
            "(username LIKE ?{n} ESCAPE '\\' OR name LIKE ?{n} ESCAPE '\\' OR contact_email LIKE ?{n} ESCAPE '\\')"
        ));
        params.push(Box::new(like_pattern(search)));
    }
    if let Some(is_active) = filter.is_active {
        clauses.push(format!("is_active = ?{}", params.len() + 1));
        params.push(Box::new(is_active));
    }
    if let Some(ref mda_id) = filter.mda_id {
        clauses.push(format!("mda_id = ?{}", params.len() + 1));
        params.push(Box::new(mda_id.clone()));
    }
    (clauses, params)
}

/// Filtered users, newest first, with the unpaginated total
///
/// `page == None` returns every match (used by export).
pub fn list(
    conn: &Connection,
    filter: &UserFilter,
    page: Option<Page>,
) -> Result<(Vec<User>, u64), StoreError> {
    let (clauses, mut params) = filter_clauses(filter);
    let where_clause = where_sql(&clauses);

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM users {}", where_clause),
        params_from_iter(params.iter().map(|p| p.as_ref())),
        |row| row.get(0),
    )?;

    let mut sql = format!(
        "SELECT {} FROM users {} ORDER BY created_at DESC, username ASC",
        COLUMNS, where_clause
    );
    if let Some(page) = page {
        sql.push_str(&format!(" LIMIT ?{} OFFSET ?{}", params.len() + 1, params.len() + 2));
        params.push(Box::new(page.limit as i64));
        params.push(Box::new(page.offset() as i64));
    }

    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map(params_from_iter(params.iter().map(|p| p.as_ref())), from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((users, total))
}

/// Persist every mutable field of `user`
pub fn update(conn: &Connection, user: &User) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE users SET username = ?2, name = ?3, contact_email = ?4, mda_id = ?5, \
         is_active = ?6, updated_at = ?7 WHERE id = ?1",
        params![
            user.id,
            user.username,
            user.name,
            user.contact_email,
            user.mda_id,
            user.is_active,
            to_db_time(&user.updated_at),
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn update_password(conn: &Connection, id: &str, password_hash: &str) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, password_hash, to_db_time(&chrono::Utc::now())],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn record_login(
    conn: &Connection,
    id: &str,
    at: &chrono::DateTime<chrono::Utc>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE users SET last_login = ?2 WHERE id = ?1",
        params![id, to_db_time(at)],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> Result<(), StoreError> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn count_by_mda(conn: &Connection, mda_id: &str) -> Result<u64, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM users WHERE mda_id = ?1",
        [mda_id],
        |row| row.get(0),
    )?)
}

/// (total, active)
pub fn count(conn: &Connection) -> Result<(u64, u64), StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM users",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}
