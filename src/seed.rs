//! Superadmin bootstrap

use anyhow::Context;

use crate::auth::password::hash_password;
use crate::model::admin::normalize_email;
use crate::model::{Admin, Config};
use crate::store::{Database, admins};
use crate::validation::{ensure, validate_admin, validate_password};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// No superadmin credentials configured
    NotConfigured,
    /// An admin with the configured email already exists
    AlreadyPresent,
    Created { id: String },
}

/// Create the configured superadmin unless an admin with that email exists
///
/// Existing records are never modified.
pub async fn ensure_super_admin(db: &Database, config: &Config) -> anyhow::Result<SeedOutcome> {
    let (Some(email), Some(password)) = (
        config.super_admin_email.as_deref(),
        config.super_admin_password.as_deref(),
    ) else {
        return Ok(SeedOutcome::NotConfigured);
    };

    let email = normalize_email(email);
    let lookup = email.clone();
    if db
        .call(move |conn| admins::find_by_email(conn, &lookup))
        .await?
        .is_some()
    {
        tracing::debug!(email = %email, "Superadmin already present");
        return Ok(SeedOutcome::AlreadyPresent);
    }

    let mut admin = Admin::new_super_admin(config.super_admin_name.trim(), &email, "");
    let mut errors = validate_admin(&admin);
    errors.extend(validate_password("superAdminPassword", password));
    ensure(errors).map_err(|e| anyhow::anyhow!("Invalid superadmin configuration: {:?}", e))?;

    admin.password_hash = hash_password(password, config.bcrypt_rounds)
        .await
        .context("Failed to hash superadmin password")?;

    let id = admin.id.clone();
    db.call(move |conn| admins::insert(conn, &admin))
        .await
        .context("Failed to create superadmin")?;

    tracing::info!(admin_id = %id, email = %email, "Superadmin created");
    Ok(SeedOutcome::Created { id })
}
