#![allow(dead_code)]

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use tikitaka_api::media::MediaStore;
use tikitaka_api::token::{DEFAULT_TOKEN_TTL, TokenConfig};
use tikitaka_api::{AppState, AppStateInner, router};
use tikitaka_db::Database;
use tikitaka_db::models::NotificationRow;

pub const SECRET: &str = "integration-test-secret";
pub const ARGENTINA: i64 = 1;
pub const SPAIN: i64 = 6;

const BOUNDARY: &str = "tikitaka-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

/// A registered user and their token.
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let media = MediaStore::new(uploads.path().to_path_buf()).await.unwrap();
        let state = AppStateInner::new(db, TokenConfig::new(SECRET, DEFAULT_TOKEN_TTL), media);

        Self {
            router: router(state.clone()),
            state,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// POST a single-file multipart body.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        field: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn register(&self, username: &str, team_id: i64) -> TestUser {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "email": format!("{username}@example.com"),
                    "password": "secret123",
                    "username": username,
                    "team_id": team_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        TestUser {
            id: body["user"]["id"].as_i64().unwrap(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn create_post(&self, user: &TestUser, content: &str, is_draft: bool) -> i64 {
        let (status, body) = self
            .post(
                "/api/posts",
                Some(&user.token),
                json!({ "content": content, "team_id": ARGENTINA, "is_draft": is_draft }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post failed: {body}");
        body["post"]["id"].as_i64().unwrap()
    }
}

/// Give fire-and-forget notification tasks time to land.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Poll until `user_id` has at least `expected` notifications, or give up
/// after about a second and return whatever is there.
pub async fn wait_for_notifications(app: &TestApp, user_id: i64, expected: usize) -> Vec<NotificationRow> {
    for _ in 0..50 {
        let rows = app.state.db.notifications_for(user_id, 50, 0).await.unwrap();
        if rows.len() >= expected {
            return rows;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    app.state.db.notifications_for(user_id, 50, 0).await.unwrap()
}
