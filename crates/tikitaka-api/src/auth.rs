use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use rand_core::OsRng;
use serde_json::json;
use tracing::info;

use tikitaka_db::models::NewUser;
use tikitaka_types::api::{LoginRequest, RegisterRequest};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::middleware::bearer_token;
use crate::token::TokenError;

pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if state.db.email_or_username_taken(&req.email, &req.username).await? {
        return Err(ApiError::conflict("Email or username already in use"));
    }
    if !state.db.team_exists(req.team_id).await? {
        return Err(ApiError::bad_request("Invalid team"));
    }

    let password_hash = hash_password(&req.password)?;
    let full_name = req.display_name();

    let user_id = state
        .db
        .create_user(&NewUser {
            email: &req.email,
            password_hash: &password_hash,
            username: &req.username,
            team_id: req.team_id,
            full_name: &full_name,
            first_name: req.first_name.as_deref(),
            last_name: req.last_name.as_deref(),
        })
        .await
        .map_err(|e| ApiError::unique_conflict(e, "Email or username already in use"))?;

    let token = state.tokens.issue(user_id, &req.email, &req.username)?;
    let user = state
        .db
        .active_account(user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {user_id} missing after insert"))?;

    info!("Registered user {} ({})", req.username, user_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "token": token,
            "user": user,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .credentials_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
    let (user, password_hash) = row.into_account();

    if !verify_password(&req.password, &password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = state.tokens.issue(user.id, &user.email, &user.username)?;
    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}

pub async fn verify_token(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers).ok_or_else(|| ApiError::unauthorized("Token not provided"))?;
    let claims = state.tokens.verify(token).map_err(|_| ApiError::unauthorized("Invalid token"))?;

    let user = state
        .db
        .active_account(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Token is valid",
        "user": user,
    })))
}

/// Re-sign a valid or expired token. The signature must still check out.
pub async fn refresh_token(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers).ok_or_else(|| ApiError::unauthorized("Token not provided"))?;
    let token = state.tokens.refresh(token).map_err(|e| match e {
        TokenError::Expired | TokenError::Invalid => ApiError::unauthorized("Could not refresh token"),
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Token refreshed successfully",
        "token": token,
    })))
}

/// Argon2id hash in PHC string format.
pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// False for a wrong password and for unparseable stored hashes.
pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}
