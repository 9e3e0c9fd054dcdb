use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Bearer token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HMAC secret for signing access tokens (required, non-empty).
    /// TOML: `auth.jwt_secret`. Env: `CODEBOX_AUTH__JWT_SECRET`.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub jwt_secret: String,

    /// Access token lifetime in minutes.
    /// TOML: `auth.token_ttl_minutes`. Default: `30`.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // No insecure default. `Config::load()` enforces non-empty.
            jwt_secret: String::new(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

fn default_token_ttl_minutes() -> i64 {
    30
}

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for auth.jwt_secret",
        )),
    }
}
