use anyhow::Result;

use crate::Database;
use crate::models::{ActiveTeam, Fan, TeamStats};
use crate::queries::contains_pattern;

const TEAM_STATS_SELECT: &str = "
    SELECT t.id, t.name, t.logo_url, t.flag_url, t.confederation,
           (SELECT COUNT(*) FROM users u WHERE u.team_id = t.id) AS fans_count,
           (SELECT COUNT(*) FROM posts p WHERE p.team_id = t.id AND p.is_draft = 0) AS posts_count
    FROM teams t";

impl Database {
    pub async fn team_exists(&self, team_id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM teams WHERE id = ?")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn team_name(&self, team_id: i64) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM teams WHERE id = ?")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(name,)| name))
    }

    /// Every team, ordered by confederation then name.
    pub async fn list_teams(&self) -> Result<Vec<TeamStats>> {
        let sql = format!("{TEAM_STATS_SELECT} ORDER BY t.confederation, t.name");
        let rows = sqlx::query_as::<_, TeamStats>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn team(&self, team_id: i64) -> Result<Option<TeamStats>> {
        let sql = format!("{TEAM_STATS_SELECT} WHERE t.id = ?");
        let row = sqlx::query_as::<_, TeamStats>(&sql)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn teams_in_confederation(&self, confederation: &str) -> Result<Vec<TeamStats>> {
        let sql = format!("{TEAM_STATS_SELECT} WHERE t.confederation = ? ORDER BY t.name");
        let rows = sqlx::query_as::<_, TeamStats>(&sql)
            .bind(confederation)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Substring search on team name, most supported first, at most 20.
    pub async fn search_teams(&self, term: &str) -> Result<Vec<TeamStats>> {
        let sql = format!(
            "{TEAM_STATS_SELECT} WHERE t.name LIKE ? ESCAPE '\\' ORDER BY fans_count DESC, t.name LIMIT 20"
        );
        let rows = sqlx::query_as::<_, TeamStats>(&sql)
            .bind(contains_pattern(term))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn popular_teams(&self, limit: i64) -> Result<Vec<TeamStats>> {
        let sql = format!("{TEAM_STATS_SELECT} ORDER BY fans_count DESC, posts_count DESC, t.name LIMIT ?");
        let rows = sqlx::query_as::<_, TeamStats>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Teams ranked by published posts created in the last `days` days.
    pub async fn active_teams(&self, days: i64, limit: i64) -> Result<Vec<ActiveTeam>> {
        let rows = sqlx::query_as::<_, ActiveTeam>(
            "SELECT t.id, t.name, t.logo_url, t.flag_url, t.confederation,
                    (SELECT COUNT(*) FROM users u WHERE u.team_id = t.id) AS fans_count,
                    COUNT(p.id) AS recent_posts_count
             FROM teams t
             LEFT JOIN posts p ON p.team_id = t.id
                 AND p.is_draft = 0
                 AND p.created_at >= datetime('now', ?)
             GROUP BY t.id, t.name, t.logo_url, t.flag_url, t.confederation
             ORDER BY recent_posts_count DESC, fans_count DESC, t.name
             LIMIT ?",
        )
        .bind(format!("-{days} days"))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Supporters of a team ranked by their published posts about it.
    pub async fn team_fans(&self, team_id: i64, limit: i64, offset: i64) -> Result<Vec<Fan>> {
        let rows = sqlx::query_as::<_, Fan>(
            "SELECT u.id, u.username, u.full_name, u.profile_image, u.created_at,
                    (SELECT COUNT(*) FROM posts p
                     WHERE p.user_id = u.id AND p.team_id = ? AND p.is_draft = 0) AS posts_count
             FROM users u
             WHERE u.team_id = ?
             ORDER BY posts_count DESC, u.created_at DESC, u.id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(team_id)
        .bind(team_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::test_support::{self, ARGENTINA, SPAIN};

    #[tokio::test]
    async fn seeded_directory_is_grouped_by_confederation() {
        let db = test_support::db().await;
        let teams = db.list_teams().await.unwrap();
        assert!(teams.len() >= 20);

        let confederations: Vec<&str> = teams.iter().map(|t| t.confederation.as_str()).collect();
        let mut sorted = confederations.clone();
        sorted.sort();
        assert_eq!(confederations, sorted);

        let conmebol = db.teams_in_confederation("CONMEBOL").await.unwrap();
        assert!(conmebol.iter().any(|t| t.name == "Argentina"));
        assert!(conmebol.iter().all(|t| t.confederation == "CONMEBOL"));
    }

    #[tokio::test]
    async fn counters_ignore_drafts() {
        let db = test_support::db().await;
        let fan = test_support::user(&db, "kempes", ARGENTINA).await;
        test_support::post(&db, fan, ARGENTINA, "Campeones", false).await;
        test_support::post(&db, fan, ARGENTINA, "draft", true).await;

        let team = db.team(ARGENTINA).await.unwrap().unwrap();
        assert_eq!(team.fans_count, 1);
        assert_eq!(team.posts_count, 1);

        let fans = db.team_fans(ARGENTINA, 20, 0).await.unwrap();
        assert_eq!(fans.len(), 1);
        assert_eq!(fans[0].posts_count, 1);

        let popular = db.popular_teams(1).await.unwrap();
        assert_eq!(popular[0].id, ARGENTINA);

        let active = db.active_teams(7, 3).await.unwrap();
        assert_eq!(active[0].id, ARGENTINA);
        assert_eq!(active[0].recent_posts_count, 1);
    }

    #[tokio::test]
    async fn search_and_lookup() {
        let db = test_support::db().await;
        let found = db.search_teams("pai").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, SPAIN);

        assert!(db.team_exists(SPAIN).await.unwrap());
        assert!(!db.team_exists(9999).await.unwrap());
        assert!(db.team(9999).await.unwrap().is_none());
    }
}
