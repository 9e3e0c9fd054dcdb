use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CodeboxError;

/// Access token payload. `sub` is the user's email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            // Out-of-range lifetimes surface as an error from `issue`.
            ttl: Duration::try_minutes(ttl_minutes).unwrap_or(Duration::MAX),
        }
    }

    pub fn issue(&self, email: &str) -> Result<String, CodeboxError> {
        let now = Utc::now();
        let exp = now.checked_add_signed(self.ttl).ok_or_else(|| {
            CodeboxError::UnexpectedError("token expiry out of range".to_string())
        })?;
        self.issue_with_expiry(email, now.timestamp(), exp.timestamp())
    }

    fn issue_with_expiry(&self, email: &str, iat: i64, exp: i64) -> Result<String, CodeboxError> {
        let claims = Claims {
            sub: email.to_string(),
            iat,
            exp,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Returns the claims of a valid, unexpired token; `None` otherwise.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "rejected bearer token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let svc = TokenService::new("secret", 30);
        let token = svc.issue("ada@example.com").unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "ada@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenService::new("one", 30).issue("ada@example.com").unwrap();
        assert!(TokenService::new("two", 30).verify(&token).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new("secret", 30);
        let past = Utc::now().timestamp() - 3600;
        let token = svc
            .issue_with_expiry("ada@example.com", past - 60, past)
            .unwrap();
        assert!(svc.verify(&token).is_none());
    }

    #[test]
    fn oversized_ttl_fails_to_issue() {
        for ttl in [1_000_000_000_000, i64::MAX] {
            let err = TokenService::new("secret", ttl)
                .issue("ada@example.com")
                .unwrap_err();
            assert!(matches!(err, CodeboxError::UnexpectedError(_)), "{err:?}");
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(TokenService::new("secret", 30).verify("not.a.jwt").is_none());
    }
}
