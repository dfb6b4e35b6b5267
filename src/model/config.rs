use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

/// Application configuration
///
/// Loaded from a camelCase JSON file, then overridden field by field from the
/// process environment (see [`Config::apply_env_overrides`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file (`:memory:` for an ephemeral database)
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// bcrypt cost factor
    #[serde(default = "default_bcrypt_rounds")]
    pub bcrypt_rounds: u32,

    /// Signing secret shared by both token namespaces (required to start)
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds
    #[serde(default = "default_jwt_expires_in_secs")]
    pub jwt_expires_in_secs: u64,

    #[serde(default = "default_super_admin_name")]
    pub super_admin_name: String,

    /// Bootstrap superadmin email; no superadmin is seeded when unset
    #[serde(default)]
    pub super_admin_email: Option<String>,

    #[serde(default)]
    pub super_admin_password: Option<String>,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: u32,

    /// Rate limit on `X-Forwarded-For` / `X-Real-IP` instead of the peer
    /// address; only safe behind a proxy that sets them
    #[serde(default)]
    pub trust_proxy: bool,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// Config file path (runtime metadata, never serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_database_path() -> String {
    "mda.db".to_string()
}

fn default_bcrypt_rounds() -> u32 {
    12
}

fn default_jwt_expires_in_secs() -> u64 {
    24 * 60 * 60
}

fn default_super_admin_name() -> String {
    "Super Admin".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_rate_limit_window_secs() -> u64 {
    15 * 60
}

fn default_rate_limit_max() -> u32 {
    100
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            bcrypt_rounds: default_bcrypt_rounds(),
            jwt_secret: None,
            jwt_expires_in_secs: default_jwt_expires_in_secs(),
            super_admin_name: default_super_admin_name(),
            super_admin_email: None,
            super_admin_password: None,
            cors_origins: default_cors_origins(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max: default_rate_limit_max(),
            trust_proxy: false,
            environment: default_environment(),
            config_path: None,
        }
    }
}

impl Config {
    /// Default config file path
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Config file path, if the config came from one
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Apply overrides from the environment
    ///
    /// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.port = v.parse().with_context(|| format!("Invalid PORT: {}", v))?;
        }
        if let Some(v) = lookup("DATABASE_PATH") {
            self.database_path = v;
        }
        if let Some(v) = lookup("BCRYPT_ROUNDS") {
            self.bcrypt_rounds = v
                .parse()
                .with_context(|| format!("Invalid BCRYPT_ROUNDS: {}", v))?;
        }
        if let Some(v) = lookup("JWT_SECRET") {
            self.jwt_secret = Some(v);
        }
        if let Some(v) = lookup("JWT_EXPIRES_IN") {
            self.jwt_expires_in_secs = v
                .parse()
                .with_context(|| format!("Invalid JWT_EXPIRES_IN: {}", v))?;
        }
        if let Some(v) = lookup("SUPER_ADMIN_NAME") {
            self.super_admin_name = v;
        }
        if let Some(v) = lookup("SUPER_ADMIN_EMAIL") {
            self.super_admin_email = Some(v);
        }
        if let Some(v) = lookup("SUPER_ADMIN_PASSWORD") {
            self.super_admin_password = Some(v);
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup("RATE_LIMIT_WINDOW") {
            self.rate_limit_window_secs = v
                .parse()
                .with_context(|| format!("Invalid RATE_LIMIT_WINDOW: {}", v))?;
        }
        if let Some(v) = lookup("RATE_LIMIT_MAX") {
            self.rate_limit_max = v
                .parse()
                .with_context(|| format!("Invalid RATE_LIMIT_MAX: {}", v))?;
        }
        if let Some(v) = lookup("TRUST_PROXY") {
            self.trust_proxy = v
                .parse()
                .with_context(|| format!("Invalid TRUST_PROXY: {}", v))?;
        }
        if let Some(v) = lookup("APP_ENV") {
            self.environment = v;
        }
        Ok(())
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.jwt_secret.as_deref() {
            None | Some("") => bail!("jwtSecret is not configured (set JWT_SECRET)"),
            _ => {}
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_rounds) {
            bail!(
                "bcryptRounds must be between {} and {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            );
        }
        if self.jwt_expires_in_secs == 0 {
            bail!("jwtExpiresInSecs must be positive");
        }
        if self.super_admin_email.is_some() != self.super_admin_password.is_some() {
            bail!("superAdminEmail and superAdminPassword must be configured together");
        }
        Ok(())
    }

    /// The signing secret; only valid after [`Config::validate`] succeeded
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or_default()
    }
}
