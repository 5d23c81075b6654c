use anyhow::Result;

use crate::Database;
use crate::models::CommentView;

const COMMENT_VIEW_SELECT: &str = "
    SELECT c.id, c.post_id, c.content, c.created_at, c.updated_at,
           u.id AS user_id, u.username, u.full_name, u.profile_image,
           (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS likes_count
    FROM comments c
    JOIN users u ON c.user_id = u.id";

impl Database {
    /// Comments on a post, oldest first.
    pub async fn comments_for_post(&self, post_id: i64, limit: i64, offset: i64) -> Result<Vec<CommentView>> {
        let sql = format!(
            "{COMMENT_VIEW_SELECT}
             WHERE c.post_id = ?
             ORDER BY c.created_at ASC, c.id ASC
             LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, CommentView>(&sql)
            .bind(post_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count_comments(&self, post_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn create_comment(&self, post_id: i64, user_id: i64, content: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO comments (post_id, user_id, content) VALUES (?, ?, ?)")
            .bind(post_id)
            .bind(user_id)
            .bind(content)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_comment(&self, comment_id: i64) -> Result<Option<CommentView>> {
        let sql = format!("{COMMENT_VIEW_SELECT} WHERE c.id = ?");
        let row = sqlx::query_as::<_, CommentView>(&sql)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Author of a comment, or `None` when it does not exist.
    pub async fn comment_author(&self, comment_id: i64) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM comments WHERE id = ?")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(user_id,)| user_id))
    }

    pub async fn update_comment(&self, comment_id: i64, content: &str) -> Result<()> {
        sqlx::query("UPDATE comments SET content = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(content)
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a comment together with its likes, in one transaction.
    pub async fn delete_comment(&self, comment_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comment_likes WHERE comment_id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::Relation;
    use crate::queries::test_support::{self, ARGENTINA};

    #[tokio::test]
    async fn comments_are_listed_oldest_first() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "mascherano", ARGENTINA).await;
        let post = test_support::post(&db, author, ARGENTINA, "Jefecito", false).await;

        let first = db.create_comment(post, author, "first").await.unwrap();
        let second = db.create_comment(post, author, "second").await.unwrap();

        let comments = db.comments_for_post(post, 20, 0).await.unwrap();
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(comments[0].username, "mascherano");
        assert_eq!(db.count_comments(post).await.unwrap(), 2);

        let page_two = db.comments_for_post(post, 1, 1).await.unwrap();
        assert_eq!(page_two[0].id, second);
    }

    #[tokio::test]
    async fn edit_changes_content_only() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "cambiasso", ARGENTINA).await;
        let post = test_support::post(&db, author, ARGENTINA, "Golazo", false).await;
        let comment = db.create_comment(post, author, "typo").await.unwrap();

        db.update_comment(comment, "fixed").await.unwrap();
        let view = db.find_comment(comment).await.unwrap().unwrap();
        assert_eq!(view.content, "fixed");
        assert_eq!(view.post_id, post);
        assert_eq!(db.comment_author(comment).await.unwrap(), Some(author));
    }

    #[tokio::test]
    async fn delete_removes_comment_likes() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "saviola", ARGENTINA).await;
        let post = test_support::post(&db, author, ARGENTINA, "Conejito", false).await;
        let comment = db.create_comment(post, author, "yes").await.unwrap();
        db.toggle_relation(Relation::CommentLike, author, comment).await.unwrap();

        assert!(db.delete_comment(comment).await.unwrap());
        assert!(db.find_comment(comment).await.unwrap().is_none());
        assert_eq!(db.relation_count(Relation::CommentLike, comment).await.unwrap(), 0);
        assert!(!db.delete_comment(comment).await.unwrap());
    }
}
