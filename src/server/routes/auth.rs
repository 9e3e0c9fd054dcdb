use crate::auth::{MIN_PASSWORD_LEN, hash_password, verify_password};
use crate::db::{DbUser, UserCreate, normalize_email};
use crate::error::CodeboxError;
use crate::server::guards::CurrentUser;
use crate::server::state::CodeboxState;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn router() -> Router<CodeboxState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(issue_token))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// OAuth2 password-grant form.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// POST /auth/register
async fn register(
    State(state): State<CodeboxState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DbUser>), CodeboxError> {
    let Json(req) = payload?;

    let email = normalize_email(&req.email);
    if !email.contains('@') {
        return Err(CodeboxError::InvalidRequest(
            "email must be a valid address".to_string(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CodeboxError::InvalidRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hashed_password = hash_password(req.password).await?;
    let full_name = req
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let id = state
        .db
        .create_user(UserCreate {
            email: email.clone(),
            full_name,
            hashed_password,
        })
        .await?;

    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| CodeboxError::UnexpectedError(format!("user {id} vanished after insert")))?;

    info!(user_id = id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/token
async fn issue_token(
    State(state): State<CodeboxState>,
    form: Result<Form<TokenForm>, FormRejection>,
) -> Result<Json<TokenResponse>, CodeboxError> {
    let Form(form) = form?;

    let Some(user) = state.db.get_user_by_email(&form.username).await? else {
        return Err(CodeboxError::InvalidCredentials);
    };
    if !user.is_active || !verify_password(form.password, user.hashed_password.clone()).await? {
        return Err(CodeboxError::InvalidCredentials);
    }

    let access_token = state.tokens.issue(&user.email)?;
    info!(user_id = user.id, "access token issued");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// GET /auth/me
async fn me(CurrentUser(user): CurrentUser) -> Json<DbUser> {
    Json(user)
}
