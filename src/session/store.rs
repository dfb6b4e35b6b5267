//! Client-side session state for the user and admin slots

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::storage::{StorageError, TokenStorage};
use crate::auth::PrincipalKind;

pub const USER_TOKEN_KEY: &str = "userToken";
pub const ADMIN_TOKEN_KEY: &str = "adminToken";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Token is not a valid {} session token", .0.as_str())]
    InvalidToken(PrincipalKind),
    #[error("Token has expired")]
    Expired,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A slot whose token expired while the session was running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpired {
    pub kind: PrincipalKind,
    pub redirect_to: &'static str,
}

impl SessionExpired {
    fn for_kind(kind: PrincipalKind) -> Self {
        Self {
            kind,
            redirect_to: login_path(kind),
        }
    }
}

/// Sign-in page of each slot
pub fn login_path(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::User => "/login",
        PrincipalKind::Admin => "/admin/login",
    }
}

#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    kind: PrincipalKind,
    exp: i64,
}

/// Read `kind` and `exp` without checking the signature
///
/// The client never holds the signing secret; the server still verifies
/// every request.
fn peek_claims(token: &str) -> Option<UnverifiedClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}

/// Whether `token` is a live token of `kind` at `now` (Unix seconds)
fn is_live(token: &str, kind: PrincipalKind, now: i64) -> Result<(), SessionError> {
    let claims = peek_claims(token).ok_or(SessionError::InvalidToken(kind))?;
    if claims.kind != kind {
        return Err(SessionError::InvalidToken(kind));
    }
    if claims.exp <= now {
        return Err(SessionError::Expired);
    }
    Ok(())
}

struct Slot {
    key: &'static str,
    token: Option<String>,
}

impl Slot {
    fn new(kind: PrincipalKind) -> Self {
        let key = match kind {
            PrincipalKind::User => USER_TOKEN_KEY,
            PrincipalKind::Admin => ADMIN_TOKEN_KEY,
        };
        Self { key, token: None }
    }
}

/// Two independent sessions persisted through a [`TokenStorage`]
pub struct SessionStore {
    storage: Arc<dyn TokenStorage>,
    user: Slot,
    admin: Slot,
}

impl SessionStore {
    /// Load both slots, purging any stored token that is not live at `now`
    pub fn initialize(storage: Arc<dyn TokenStorage>, now: i64) -> Self {
        let mut store = Self {
            storage,
            user: Slot::new(PrincipalKind::User),
            admin: Slot::new(PrincipalKind::Admin),
        };
        for kind in [PrincipalKind::User, PrincipalKind::Admin] {
            let key = store.slot(kind).key;
            store.slot_mut(kind).token = store.storage.get(key);
        }
        store.check_validity(now);
        store
    }

    fn slot(&self, kind: PrincipalKind) -> &Slot {
        match kind {
            PrincipalKind::User => &self.user,
            PrincipalKind::Admin => &self.admin,
        }
    }

    fn slot_mut(&mut self, kind: PrincipalKind) -> &mut Slot {
        match kind {
            PrincipalKind::User => &mut self.user,
            PrincipalKind::Admin => &mut self.admin,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.token.is_some()
    }

    pub fn is_admin_authenticated(&self) -> bool {
        self.admin.token.is_some()
    }

    pub fn user_token(&self) -> Option<&str> {
        self.user.token.as_deref()
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin.token.as_deref()
    }

    fn set_token(&mut self, kind: PrincipalKind, token: &str, now: i64) -> Result<(), SessionError> {
        is_live(token, kind, now)?;
        let key = self.slot(kind).key;
        // Slot changes only once the token is stored
        self.storage.set(key, token)?;
        self.slot_mut(kind).token = Some(token.to_string());
        Ok(())
    }

    fn clear(&mut self, kind: PrincipalKind) -> Result<(), SessionError> {
        let slot = self.slot_mut(kind);
        let key = slot.key;
        slot.token = None;
        self.storage.remove(key)?;
        Ok(())
    }

    /// Store the token returned by a user sign-in
    pub fn set_user_token(&mut self, token: &str, now: i64) -> Result<(), SessionError> {
        self.set_token(PrincipalKind::User, token, now)
    }

    /// Store the token returned by an admin sign-in
    pub fn set_admin_token(&mut self, token: &str, now: i64) -> Result<(), SessionError> {
        self.set_token(PrincipalKind::Admin, token, now)
    }

    pub fn clear_user(&mut self) -> Result<(), SessionError> {
        self.clear(PrincipalKind::User)
    }

    pub fn clear_admin(&mut self) -> Result<(), SessionError> {
        self.clear(PrincipalKind::Admin)
    }

    /// Purge every slot whose token is no longer live at `now`
    pub fn check_validity(&mut self, now: i64) -> Vec<SessionExpired> {
        let mut expired = Vec::new();
        for kind in [PrincipalKind::User, PrincipalKind::Admin] {
            let Some(token) = self.slot(kind).token.as_deref() else {
                continue;
            };
            if let Err(reason) = is_live(token, kind, now) {
                tracing::info!(kind = kind.as_str(), "Session ended: {}", reason);
                if let Err(e) = self.clear(kind) {
                    tracing::warn!(kind = kind.as_str(), "Failed to purge session token: {}", e);
                }
                expired.push(SessionExpired::for_kind(kind));
            }
        }
        expired
    }
}

/// Re-check both slots every `interval` and stream the expiries
///
/// The task stops once the receiver is dropped.
pub fn spawn_validity_watch(
    store: Arc<Mutex<SessionStore>>,
    interval: Duration,
) -> mpsc::Receiver<SessionExpired> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            let expired = store.lock().check_validity(now);
            for event in expired {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            if tx.is_closed() {
                return;
            }
        }
    });
    rx
}
