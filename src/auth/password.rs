//! Password hashing
//!
//! bcrypt is CPU-bound, so both directions run on the blocking thread pool.

/// Lowest cost bcrypt accepts
pub const MIN_BCRYPT_COST: u32 = 4;
/// Highest cost bcrypt accepts
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Password hashing task failed: {0}")]
    Task(String),
}

/// Hash `password` with the given bcrypt cost
pub async fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, cost).map_err(|e| PasswordError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| PasswordError::Task(e.to_string()))?
}

/// Compare `password` with a stored hash
///
/// An unparseable stored hash counts as a mismatch and is logged.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || match bcrypt::verify(password, &hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        }
    })
    .await
    .map_err(|e| PasswordError::Task(e.to_string()))
}
