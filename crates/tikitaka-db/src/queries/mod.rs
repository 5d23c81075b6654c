pub mod comments;
pub mod notifications;
pub mod posts;
pub mod relations;
pub mod teams;
pub mod users;

/// Build a `LIKE` pattern matching `term` anywhere, with `%`, `_` and the
/// escape character itself escaped. Use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::Database;
    use crate::models::{NewPost, NewUser};

    pub const ARGENTINA: i64 = 1;
    pub const SPAIN: i64 = 6;

    pub async fn db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    pub async fn user(db: &Database, username: &str, team_id: i64) -> i64 {
        let email = format!("{username}@example.com");
        db.create_user(&NewUser {
            email: &email,
            password_hash: "not-a-real-hash",
            username,
            team_id,
            full_name: username,
            first_name: None,
            last_name: None,
        })
        .await
        .unwrap()
    }

    pub async fn post(db: &Database, user_id: i64, team_id: i64, content: &str, is_draft: bool) -> i64 {
        db.create_post(&NewPost {
            user_id,
            team_id,
            content,
            image_url: None,
            is_draft,
        })
        .await
        .unwrap()
    }
}
