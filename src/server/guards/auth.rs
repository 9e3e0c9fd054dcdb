use crate::db::DbUser;
use crate::error::CodeboxError;
use crate::server::state::CodeboxState;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

fn extract_header_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// WebSocket upgrades from a browser cannot carry headers, so `?token=` is accepted too.
fn extract_query_token(query: Option<&str>) -> Option<String> {
    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    })
}

/// The authenticated account behind the request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub DbUser);

impl FromRequestParts<CodeboxState> for CurrentUser {
    type Rejection = CodeboxError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &CodeboxState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_header_token(&parts.headers)
            .or_else(|| extract_query_token(parts.uri.query()))
            .ok_or(CodeboxError::InvalidCredentials)?;

        let claims = state
            .tokens
            .verify(&token)
            .ok_or(CodeboxError::InvalidCredentials)?;

        let user = state
            .db
            .get_user_by_email(&claims.sub)
            .await?
            .ok_or(CodeboxError::UserNotFound)?;

        if !user.is_active {
            return Err(CodeboxError::InvalidCredentials);
        }
        Ok(CurrentUser(user))
    }
}
