mod auth;
mod basic;
mod workspace;

pub use auth::AuthConfig;
pub use basic::BasicConfig;
pub use workspace::WorkspaceConfig;

use crate::error::CodeboxError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Access token settings (see `auth` table in config.toml).
    #[serde(default)]
    pub auth: AuthConfig,

    /// Workspace image and paths (see `workspace` table in config.toml).
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "CODEBOX_";
const DEFAULT_ENV_NAME: &str = "localhost";
/// One year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

impl Config {
    /// Builds a Figment that merges defaults, `config.toml` (if present) and the environment.
    ///
    /// Env vars use the `CODEBOX_` prefix with `__` between table and key
    /// (`CODEBOX_AUTH__JWT_SECRET`). A bare `FRONTEND_URL` is also honored.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().filter_map(|key| {
                (key == "frontend_url").then(|| "basic.frontend_url".into())
            }))
    }

    /// Extracts the merged configuration and validates required fields.
    pub fn load() -> Result<Self, CodeboxError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, CodeboxError> {
        let cfg: Self = figment
            .extract()
            .map_err(|e| CodeboxError::Config(format!("failed to extract configuration: {e}")))?;
        if cfg.auth.jwt_secret.trim().is_empty() {
            return Err(CodeboxError::Config(
                "auth.jwt_secret must be set and non-empty".to_string(),
            ));
        }
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&cfg.auth.token_ttl_minutes) {
            return Err(CodeboxError::Config(format!(
                "auth.token_ttl_minutes must be between 1 and {MAX_TOKEN_TTL_MINUTES}"
            )));
        }
        Ok(cfg)
    }
}

/// Loads `.env.<ENV>` (then `.env`) into the process environment.
///
/// `ENV` selects the file; the lowercase `env` spelling is accepted too and
/// `localhost` is the fallback. Variables already set are never overridden.
/// Returns the environment file that was found, if any.
pub fn load_env_files() -> Option<PathBuf> {
    let env_name = std::env::var("ENV")
        .or_else(|_| std::env::var("env"))
        .unwrap_or_else(|_| DEFAULT_ENV_NAME.to_string());
    let path = PathBuf::from(format!(".env.{env_name}"));
    let loaded = dotenvy::from_path(&path).ok().map(|_| path);
    dotenvy::dotenv().ok();
    loaded
}
