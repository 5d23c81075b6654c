/// Database row types. Views that go straight into JSON responses derive
/// `Serialize`; rows carrying secrets (password hashes) do not.
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;

// -- Users --

/// Minimal identity of an authenticated, active user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub team_id: i64,
}

/// Account view returned by the auth routes.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AccountView {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub team_id: i64,
    pub team_name: String,
    pub team_logo: Option<String>,
    pub team_flag: Option<String>,
}

/// Account row including the password hash, used only for login.
#[derive(Debug, Clone, FromRow)]
pub struct CredentialsRow {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub team_id: i64,
    pub team_name: String,
    pub team_logo: Option<String>,
    pub team_flag: Option<String>,
}

impl CredentialsRow {
    pub fn into_account(self) -> (AccountView, String) {
        (
            AccountView {
                id: self.id,
                email: self.email,
                username: self.username,
                full_name: self.full_name,
                profile_image: self.profile_image,
                team_id: self.team_id,
                team_name: self.team_name,
                team_logo: self.team_logo,
                team_flag: self.team_flag,
            },
            self.password,
        )
    }
}

/// Profile with activity counters. `email` is only filled for the owner.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProfileView {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub username: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub team_id: i64,
    pub team_name: String,
    pub team_logo: Option<String>,
    pub posts_count: i64,
    pub favorites_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub team_name: String,
    pub team_logo: Option<String>,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub username: &'a str,
    pub team_id: i64,
    pub full_name: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// Fields a profile update may touch. `None` leaves the column alone.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub team_id: Option<i64>,
    pub bio: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.full_name.is_none()
            && self.team_id.is_none()
            && self.bio.is_none()
    }
}

// -- Teams --

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeamStats {
    pub id: i64,
    pub name: String,
    pub logo_url: Option<String>,
    pub flag_url: Option<String>,
    pub confederation: String,
    pub fans_count: i64,
    pub posts_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActiveTeam {
    pub id: i64,
    pub name: String,
    pub logo_url: Option<String>,
    pub flag_url: Option<String>,
    pub confederation: String,
    pub fans_count: i64,
    pub recent_posts_count: i64,
}

/// A team supporter with the number of published posts about the team.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Fan {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posts_count: i64,
}

// -- Posts --

/// Post joined with author, team and social counters. `is_liked` and
/// `is_favorited` are viewer-relative and filled in after the query.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostView {
    pub id: i64,
    pub content: String,
    pub image_url: Option<String>,
    pub team_id: i64,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub team_name: String,
    pub team_logo: Option<String>,
    pub likes_count: i64,
    pub favorites_count: i64,
    #[sqlx(default)]
    pub is_liked: bool,
    #[sqlx(default)]
    pub is_favorited: bool,
}

/// Ownership and state of a post, used before mutations.
#[derive(Debug, Clone, FromRow)]
pub struct PostMeta {
    pub id: i64,
    pub user_id: i64,
    pub is_draft: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DraftView {
    pub id: i64,
    pub content: String,
    pub image_url: Option<String>,
    pub team_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub team_name: String,
    pub team_logo: Option<String>,
}

pub struct NewPost<'a> {
    pub user_id: i64,
    pub team_id: i64,
    pub content: &'a str,
    pub image_url: Option<&'a str>,
    pub is_draft: bool,
}

pub struct PostChanges<'a> {
    pub content: &'a str,
    pub team_id: i64,
    pub is_draft: bool,
    pub image_url: Option<&'a str>,
}

/// Optional restrictions on the public feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedFilter {
    pub team_id: Option<i64>,
    pub author_id: Option<i64>,
}

// -- Comments --

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub likes_count: i64,
    #[sqlx(default)]
    pub is_liked: bool,
}

// -- Notifications --

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: Json<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
