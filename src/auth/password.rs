use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::CodeboxError;

/// Hash a password into an argon2 PHC string on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, CodeboxError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CodeboxError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| CodeboxError::UnexpectedError(format!("hash task failed: {e}")))?
}

/// Check a password against a stored PHC string. A malformed stored hash is an error,
/// a mismatch is `Ok(false)`.
pub async fn verify_password(password: String, stored: String) -> Result<bool, CodeboxError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored).map_err(|e| CodeboxError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| CodeboxError::UnexpectedError(format!("verify task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(
            verify_password("correct horse".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn garbage_hash_is_an_error() {
        let res = verify_password("pw".to_string(), "not-a-hash".to_string()).await;
        assert!(matches!(res, Err(CodeboxError::PasswordHash(_))));
    }
}
