//! Per-user toggles on posts and comments: likes, favorites and comment likes
//! share the same shape (a `(user_id, target_id)` pair with a uniqueness
//! constraint), so they share one implementation.

use std::collections::HashSet;

use anyhow::Result;
use sqlx::{QueryBuilder, Sqlite};

use crate::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    PostLike,
    PostFavorite,
    CommentLike,
}

impl Relation {
    fn table(self) -> &'static str {
        match self {
            Relation::PostLike => "post_likes",
            Relation::PostFavorite => "user_favorites",
            Relation::CommentLike => "comment_likes",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            Relation::PostLike | Relation::PostFavorite => "post_id",
            Relation::CommentLike => "comment_id",
        }
    }
}

/// State after a toggle: whether the pair now exists, and the target's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub active: bool,
    pub count: i64,
}

impl Database {
    /// Flip the relation between `user_id` and `target_id`. The insert is
    /// `OR IGNORE` so two concurrent toggles cannot produce a duplicate pair.
    pub async fn toggle_relation(&self, relation: Relation, user_id: i64, target_id: i64) -> Result<ToggleOutcome> {
        let table = relation.table();
        let column = relation.target_column();

        let existing: Option<(i64,)> =
            sqlx::query_as(&format!("SELECT id FROM {table} WHERE user_id = ? AND {column} = ?"))
                .bind(user_id)
                .bind(target_id)
                .fetch_optional(&self.pool)
                .await?;

        let active = match existing {
            Some((id,)) => {
                sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                false
            }
            None => {
                sqlx::query(&format!("INSERT OR IGNORE INTO {table} (user_id, {column}) VALUES (?, ?)"))
                    .bind(user_id)
                    .bind(target_id)
                    .execute(&self.pool)
                    .await?;
                true
            }
        };

        let count = self.relation_count(relation, target_id).await?;
        Ok(ToggleOutcome { active, count })
    }

    pub async fn relation_count(&self, relation: Relation, target_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            relation.table(),
            relation.target_column()
        ))
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Which of `target_ids` the user has marked. One query for the whole batch.
    pub async fn marked_targets(&self, relation: Relation, user_id: i64, target_ids: &[i64]) -> Result<HashSet<i64>> {
        if target_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let column = relation.target_column();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {column} FROM {} WHERE user_id = ",
            relation.table()
        ));
        qb.push_bind(user_id);
        qb.push(format!(" AND {column} IN ("));
        let mut ids = qb.separated(", ");
        for id in target_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        let rows: Vec<(i64,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
