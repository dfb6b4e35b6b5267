//! Admin records

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{StoreError, from_db_time, from_db_time_opt, to_db_time};
use crate::auth::role::Role;
use crate::model::Admin;

const COLUMNS: &str = "id, name, email, password_hash, role, can_be_deleted, created_by, \
                       is_active, last_login, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Admin> {
    let role: String = row.get(4)?;
    Ok(Admin {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::parse(&role).unwrap_or(Role::Admin),
        can_be_deleted: row.get(5)?,
        created_by: row.get(6)?,
        is_active: row.get(7)?,
        last_login: from_db_time_opt(8, row.get(8)?)?,
        created_at: from_db_time(9, row.get(9)?)?,
        updated_at: from_db_time(10, row.get(10)?)?,
    })
}

pub fn insert(conn: &Connection, admin: &Admin) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO admins ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)", COLUMNS),
        params![
            admin.id,
            admin.name,
            admin.email,
            admin.password_hash,
            admin.role.as_str(),
            admin.can_be_deleted,
            admin.created_by,
            admin.is_active,
            admin.last_login.as_ref().map(to_db_time),
            to_db_time(&admin.created_at),
            to_db_time(&admin.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Admin>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM admins WHERE id = ?1", COLUMNS),
            [id],
            from_row,
        )
        .optional()?)
}

/// Case-insensitive lookup
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Admin>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM admins WHERE email = ?1", COLUMNS),
            [email.trim()],
            from_row,
        )
        .optional()?)
}

/// All admins, superadmins first, then oldest first
pub fn list(conn: &Connection) -> Result<Vec<Admin>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM admins ORDER BY role = 'superadmin' DESC, created_at ASC",
        COLUMNS
    ))?;
    let admins = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(admins)
}

pub fn record_login(
    conn: &Connection,
    id: &str,
    at: &chrono::DateTime<chrono::Utc>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE admins SET last_login = ?2 WHERE id = ?1",
        params![id, to_db_time(at)],
    )?;
    Ok(())
}

pub fn set_active(conn: &Connection, id: &str, is_active: bool) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE admins SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, is_active, to_db_time(&chrono::Utc::now())],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Hard delete; superadmin rows are never removed
pub fn delete(conn: &Connection, id: &str) -> Result<(), StoreError> {
    let changed = conn.execute(
        "DELETE FROM admins WHERE id = ?1 AND can_be_deleted = 1 AND role != 'superadmin'",
        [id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// (total, active)
pub fn count(conn: &Connection) -> Result<(u64, u64), StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM admins",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}
