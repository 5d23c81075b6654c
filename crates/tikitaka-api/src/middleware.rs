use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use tikitaka_db::models::Identity;

use crate::AppState;
use crate::error::ApiError;
use crate::token::TokenError;

/// Identity of the caller on routes where authentication is optional.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Identity>);

impl Viewer {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|identity| identity.id)
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject the request unless it carries a valid token for an active user.
/// On success the user's [`Identity`] is attached to the request.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or_else(|| ApiError::unauthorized("Access token required"))?;
    let identity = authenticate(&state, token).await?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Attach a [`Viewer`] and continue, whether or not authentication succeeds.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let identity = match bearer_token(req.headers()) {
        Some(token) => match authenticate(&state, token).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!("Ignoring credentials on optional route: {}", e);
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(Viewer(identity));
    next.run(req).await
}

async fn authenticate(state: &AppState, token: &str) -> Result<Identity, ApiError> {
    let claims = state.tokens.verify(token).map_err(|e| match e {
        TokenError::Expired => ApiError::token_expired(),
        TokenError::Invalid => ApiError::invalid_token(),
    })?;

    state
        .db
        .active_identity(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not valid or inactive"))
}
