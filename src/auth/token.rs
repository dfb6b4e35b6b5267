//! Session token issuing and validation
//!
//! User and admin tokens live in separate namespaces: each kind signs with its
//! own key derived from the configured secret, so a token issued for one kind
//! never verifies as the other.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::role::Role;

/// Which session namespace a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Admin,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Admin => "admin",
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id
    pub sub: String,
    pub kind: PrincipalKind,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expires at (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("No token provided")]
    Missing,
    #[error("Invalid token format")]
    Malformed,
    #[error("Invalid or expired token")]
    Expired,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Invalid token for this route")]
    WrongKind,
    #[error("Failed to sign token: {0}")]
    Encoding(String),
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

#[derive(Clone)]
struct NamespaceKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl NamespaceKeys {
    fn derive(secret: &str, kind: PrincipalKind) -> Self {
        let key = derive_secret_key(secret, kind);
        Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
        }
    }
}

/// Signing key of one namespace: SHA-256(secret ":" kind)
fn derive_secret_key(secret: &str, kind: PrincipalKind) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(kind.as_str().as_bytes());
    hasher.finalize().to_vec()
}

/// Issues and validates tokens for both principal kinds
#[derive(Clone)]
pub struct TokenIssuer {
    user: NamespaceKeys,
    admin: NamespaceKeys,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            user: NamespaceKeys::derive(secret, PrincipalKind::User),
            admin: NamespaceKeys::derive(secret, PrincipalKind::Admin),
            ttl_secs,
        }
    }

    fn keys(&self, kind: PrincipalKind) -> &NamespaceKeys {
        match kind {
            PrincipalKind::User => &self.user,
            PrincipalKind::Admin => &self.admin,
        }
    }

    /// Sign a token for `subject` valid from now
    pub fn issue(
        &self,
        kind: PrincipalKind,
        subject: &str,
        role: Role,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(kind, subject, role, chrono::Utc::now().timestamp())
    }

    /// Sign a token as if issued at `now` (Unix seconds)
    pub fn issue_at(
        &self,
        kind: PrincipalKind,
        subject: &str,
        role: Role,
        now: i64,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            kind,
            role,
            iat: now,
            exp: now + self.ttl_secs as i64,
        };

        let token = encode(&Header::default(), &claims, &self.keys(kind).encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl_secs,
        })
    }

    /// Verify signature, expiry and namespace of `token`
    pub fn verify(&self, kind: PrincipalKind, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            },
        )?;

        if data.claims.kind != kind {
            return Err(TokenError::WrongKind);
        }
        Ok(data.claims)
    }
}
