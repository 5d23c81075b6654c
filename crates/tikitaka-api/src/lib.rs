pub mod auth;
pub mod comments;
pub mod error;
pub mod extract;
pub mod media;
pub mod middleware;
pub mod notifications;
pub mod notify;
pub mod posts;
pub mod teams;
pub mod token;
pub mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::services::ServeDir;

use tikitaka_db::Database;

use crate::error::ApiError;
use crate::media::{MediaStore, PUBLIC_PREFIX};
use crate::middleware::{optional_auth, require_auth};
use crate::notify::Notifier;
use crate::token::TokenConfig;

/// Request bodies above this are rejected before any handler runs. Leaves
/// headroom over the largest upload (10 MB) for multipart framing.
pub const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenConfig,
    pub media: MediaStore,
    pub notifier: Notifier,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenConfig, media: MediaStore) -> AppState {
        let notifier = Notifier::new(db.clone());
        Arc::new(Self {
            db,
            tokens,
            media,
            notifier,
        })
    }
}

/// The whole HTTP surface: `/api/*`, static `/uploads` and the service root.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify-token", post(auth::verify_token))
        .route("/api/auth/refresh-token", post(auth::refresh_token))
        .route("/api/teams", get(teams::list_teams))
        .route("/api/teams/search", get(teams::search_teams))
        .route("/api/teams/confederation/{confederation}", get(teams::by_confederation))
        .route("/api/teams/stats/popular", get(teams::popular_teams))
        .route("/api/teams/stats/active", get(teams::active_teams))
        .route("/api/teams/{id}", get(teams::get_team))
        .route("/api/teams/{id}/posts", get(teams::team_posts))
        .route("/api/teams/{id}/fans", get(teams::team_fans))
        .route("/api/users/search", get(users::search_users))
        .route("/api/users/{id}", get(users::get_user))
        .with_state(state.clone());

    let optional_routes = Router::new()
        .route("/api/posts", get(posts::feed))
        .route("/api/posts/user/{user_id}", get(posts::user_posts))
        .route("/api/comments/post/{post_id}", get(comments::list_comments))
        .layer(from_fn_with_state(state.clone(), optional_auth))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/posts", post(posts::create_post))
        .route("/api/posts/drafts", get(posts::drafts))
        .route("/api/posts/favorites", get(posts::favorites))
        .route("/api/posts/upload", post(posts::upload_image))
        .route("/api/posts/{id}", put(posts::update_post).delete(posts::delete_post))
        .route("/api/posts/{id}/like", post(posts::toggle_like))
        .route("/api/posts/{id}/favorite", post(posts::toggle_favorite))
        .route("/api/comments/post/{post_id}", post(comments::create_comment))
        .route("/api/comments/{id}", put(comments::update_comment).delete(comments::delete_comment))
        .route("/api/comments/{id}/like", post(comments::toggle_like))
        .route("/api/users/profile", get(users::own_profile).put(users::update_profile))
        .route("/api/users/change-password", put(users::change_password))
        .route("/api/users/upload-avatar", post(users::upload_avatar))
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/read-all", put(notifications::mark_all_read))
        .route("/api/notifications/{id}/read", put(notifications::mark_read))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    Router::new()
        .route("/", get(service_info))
        .merge(public_routes)
        .merge(optional_routes)
        .merge(protected_routes)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(state.media.root()))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

async fn service_info() -> impl IntoResponse {
    Json(json!({
        "message": "Tikitaka API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
