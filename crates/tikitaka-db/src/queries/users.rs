use anyhow::{Result, bail};
use sqlx::{QueryBuilder, Sqlite};

use crate::Database;
use crate::models::{AccountView, CredentialsRow, Identity, NewUser, ProfileChanges, ProfileView, UserSummary};
use crate::queries::contains_pattern;

const ACCOUNT_SELECT: &str = "
    SELECT u.id, u.email, u.username, u.full_name, u.profile_image, u.team_id,
           t.name AS team_name, t.logo_url AS team_logo, t.flag_url AS team_flag
    FROM users u
    JOIN teams t ON u.team_id = t.id";

const PROFILE_COLUMNS: &str = "
           u.username, u.full_name, u.bio, u.profile_image, u.created_at, u.team_id,
           t.name AS team_name, t.logo_url AS team_logo,
           (SELECT COUNT(*) FROM posts p WHERE p.user_id = u.id AND p.is_draft = 0) AS posts_count,
           (SELECT COUNT(*) FROM user_favorites f WHERE f.user_id = u.id) AS favorites_count
    FROM users u
    JOIN teams t ON u.team_id = t.id
    WHERE u.id = ?";

impl Database {
    // -- Accounts --

    pub async fn email_or_username_taken(&self, email: &str, username: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ? OR username = ? LIMIT 1")
            .bind(email)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn username_taken_by_other(&self, username: &str, user_id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ? AND id != ? LIMIT 1")
            .bind(username)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert a user and return the new id.
    pub async fn create_user(&self, user: &NewUser<'_>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO users (email, password, username, team_id, full_name, first_name, last_name)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.username)
        .bind(user.team_id)
        .bind(user.full_name)
        .bind(user.first_name)
        .bind(user.last_name)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Account view of an active user.
    pub async fn active_account(&self, user_id: i64) -> Result<Option<AccountView>> {
        let sql = format!("{ACCOUNT_SELECT} WHERE u.id = ? AND u.is_active = 1");
        let row = sqlx::query_as::<_, AccountView>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Login lookup: active users only.
    pub async fn credentials_by_email(&self, email: &str) -> Result<Option<CredentialsRow>> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            "SELECT u.id, u.email, u.password, u.username, u.full_name, u.profile_image, u.team_id,
                    t.name AS team_name, t.logo_url AS team_logo, t.flag_url AS team_flag
             FROM users u
             JOIN teams t ON u.team_id = t.id
             WHERE u.email = ? AND u.is_active = 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Identity attached to authenticated requests. Inactive users have none.
    pub async fn active_identity(&self, user_id: i64) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, Identity>(
            "SELECT id, email, username, full_name, profile_image, team_id
             FROM users
             WHERE id = ? AND is_active = 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_user_active(&self, user_id: i64, active: bool) -> Result<()> {
        sqlx::query("UPDATE users SET is_active = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(active)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn full_name(&self, user_id: i64) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT full_name FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(name,)| name))
    }

    // -- Profiles --

    /// Profile with counters. The email is only selected for the owner's view.
    pub async fn profile(&self, user_id: i64, include_email: bool) -> Result<Option<ProfileView>> {
        let email = if include_email { "u.email" } else { "NULL" };
        let sql = format!("SELECT u.id, {email} AS email, {PROFILE_COLUMNS}");
        let row = sqlx::query_as::<_, ProfileView>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Apply a partial profile update. The SET clause only names the
    /// supplied fields. Returns the number of rows touched.
    pub async fn update_profile(&self, user_id: i64, changes: &ProfileChanges) -> Result<u64> {
        if changes.is_empty() {
            bail!("profile update without fields");
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut set = qb.separated(", ");
        if let Some(username) = &changes.username {
            set.push("username = ").push_bind_unseparated(username.clone());
        }
        if let Some(full_name) = &changes.full_name {
            set.push("full_name = ").push_bind_unseparated(full_name.clone());
        }
        if let Some(team_id) = changes.team_id {
            set.push("team_id = ").push_bind_unseparated(team_id);
        }
        if let Some(bio) = &changes.bio {
            set.push("bio = ").push_bind_unseparated(bio.clone());
        }
        set.push("updated_at = CURRENT_TIMESTAMP");
        qb.push(" WHERE id = ").push_bind(user_id);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn password_hash(&self, user_id: i64) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT password FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(hash,)| hash))
    }

    pub async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Current avatar path; outer `None` when the user does not exist.
    pub async fn profile_image(&self, user_id: i64) -> Result<Option<Option<String>>> {
        let row: Option<(Option<String>,)> = sqlx::query_as("SELECT profile_image FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(image,)| image))
    }

    pub async fn set_profile_image(&self, user_id: i64, image_url: &str) -> Result<()> {
        sqlx::query("UPDATE users SET profile_image = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(image_url)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Substring search on username or full name, at most 20 results.
    pub async fn search_users(&self, term: &str) -> Result<Vec<UserSummary>> {
        let pattern = contains_pattern(term);
        let rows = sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.username, u.full_name, u.profile_image,
                    t.name AS team_name, t.logo_url AS team_logo
             FROM users u
             JOIN teams t ON u.team_id = t.id
             WHERE u.is_active = 1
               AND (u.username LIKE ? ESCAPE '\\' OR u.full_name LIKE ? ESCAPE '\\')
             ORDER BY u.username
             LIMIT 20",
        )
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::is_unique_violation;
    use crate::models::{NewUser, ProfileChanges};
    use crate::queries::test_support::{self, ARGENTINA, SPAIN};

    fn account<'a>(email: &'a str, username: &'a str, team_id: i64) -> NewUser<'a> {
        NewUser {
            email,
            password_hash: "not-a-real-hash",
            username,
            team_id,
            full_name: username,
            first_name: None,
            last_name: None,
        }
    }

    #[tokio::test]
    async fn duplicate_accounts_surface_as_unique_violations() {
        let db = test_support::db().await;
        let messi = test_support::user(&db, "messi", ARGENTINA).await;

        let err = db.create_user(&account("messi@example.com", "lionel", ARGENTINA)).await.unwrap_err();
        assert!(is_unique_violation(&err));

        let other = test_support::user(&db, "aguero", ARGENTINA).await;
        let changes = ProfileChanges {
            username: Some("messi".into()),
            ..Default::default()
        };
        let err = db.update_profile(other, &changes).await.unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(db.profile(messi, false).await.unwrap().unwrap().username, "messi");

        // A foreign key failure is not a uniqueness problem
        let err = db.create_user(&account("new@example.com", "newbie", 999)).await.unwrap_err();
        assert!(!is_unique_violation(&err));
    }

    #[tokio::test]
    async fn inactive_users_have_no_identity() {
        let db = test_support::db().await;
        let id = test_support::user(&db, "riquelme", ARGENTINA).await;

        assert_eq!(db.active_identity(id).await.unwrap().unwrap().username, "riquelme");

        db.set_user_active(id, false).await.unwrap();
        assert!(db.active_identity(id).await.unwrap().is_none());
        assert!(db.credentials_by_email("riquelme@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_update_touches_only_supplied_fields() {
        let db = test_support::db().await;
        let id = test_support::user(&db, "xavi", SPAIN).await;

        let changes = ProfileChanges {
            bio: Some("Tiki-taka".into()),
            ..Default::default()
        };
        assert_eq!(db.update_profile(id, &changes).await.unwrap(), 1);

        let profile = db.profile(id, true).await.unwrap().unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Tiki-taka"));
        assert_eq!(profile.username, "xavi");
        assert_eq!(profile.team_id, SPAIN);
        assert_eq!(profile.email.as_deref(), Some("xavi@example.com"));

        let changes = ProfileChanges {
            username: Some("xavi6".into()),
            team_id: Some(ARGENTINA),
            ..Default::default()
        };
        db.update_profile(id, &changes).await.unwrap();
        let profile = db.profile(id, false).await.unwrap().unwrap();
        assert_eq!(profile.username, "xavi6");
        assert_eq!(profile.team_name, "Argentina");
        assert_eq!(profile.bio.as_deref(), Some("Tiki-taka"));
        assert!(profile.email.is_none());
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let db = test_support::db().await;
        let id = test_support::user(&db, "iniesta", SPAIN).await;
        assert!(db.update_profile(id, &ProfileChanges::default()).await.is_err());
    }

    #[tokio::test]
    async fn uniqueness_checks() {
        let db = test_support::db().await;
        let puyol = test_support::user(&db, "puyol", SPAIN).await;
        let pique = test_support::user(&db, "pique", SPAIN).await;

        assert!(db.email_or_username_taken("other@example.com", "puyol").await.unwrap());
        assert!(db.email_or_username_taken("pique@example.com", "someone").await.unwrap());
        assert!(!db.email_or_username_taken("new@example.com", "new").await.unwrap());

        assert!(db.username_taken_by_other("puyol", pique).await.unwrap());
        assert!(!db.username_taken_by_other("puyol", puyol).await.unwrap());
    }

    #[tokio::test]
    async fn search_matches_substrings_literally() {
        let db = test_support::db().await;
        test_support::user(&db, "messi10", ARGENTINA).await;
        test_support::user(&db, "di_maria", ARGENTINA).await;
        test_support::user(&db, "dimaria", ARGENTINA).await;

        let found = db.search_users("ssi").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].team_name, "Argentina");

        let found = db.search_users("i_m").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "di_maria");
    }
}
