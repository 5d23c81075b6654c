use anyhow::Result;
use sqlx::{QueryBuilder, Sqlite};

use crate::Database;
use crate::models::{DraftView, FeedFilter, NewPost, PostChanges, PostMeta, PostView};

const POST_VIEW_SELECT: &str = "
    SELECT p.id, p.content, p.image_url, p.team_id, p.is_draft, p.created_at, p.updated_at,
           u.id AS user_id, u.username, u.full_name, u.profile_image,
           t.name AS team_name, t.logo_url AS team_logo,
           (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count,
           (SELECT COUNT(*) FROM user_favorites f WHERE f.post_id = p.id) AS favorites_count
    FROM posts p
    JOIN users u ON p.user_id = u.id
    JOIN teams t ON p.team_id = t.id";

impl Database {
    /// Published posts, newest first, optionally narrowed to a team or author.
    pub async fn feed(&self, filter: FeedFilter, limit: i64, offset: i64) -> Result<Vec<PostView>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(POST_VIEW_SELECT);
        qb.push(" WHERE p.is_draft = 0");
        if let Some(team_id) = filter.team_id {
            qb.push(" AND p.team_id = ").push_bind(team_id);
        }
        if let Some(author_id) = filter.author_id {
            qb.push(" AND p.user_id = ").push_bind(author_id);
        }
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build_query_as::<PostView>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn count_feed(&self, filter: FeedFilter) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE p.is_draft = 0");
        if let Some(team_id) = filter.team_id {
            qb.push(" AND p.team_id = ").push_bind(team_id);
        }
        if let Some(author_id) = filter.author_id {
            qb.push(" AND p.user_id = ").push_bind(author_id);
        }

        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Whether any post other than `excluding` already references `image_url`.
    pub async fn image_in_use(&self, image_url: &str, excluding: Option<i64>) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM posts WHERE image_url = ? AND id != ? LIMIT 1")
            .bind(image_url)
            .bind(excluding.unwrap_or(0))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Published posts the user has favorited, most recently favorited first.
    pub async fn favorite_posts(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<PostView>> {
        let sql = format!(
            "{POST_VIEW_SELECT}
             JOIN user_favorites fav ON fav.post_id = p.id
             WHERE fav.user_id = ? AND p.is_draft = 0
             ORDER BY fav.created_at DESC, fav.id DESC
             LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, PostView>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn drafts_of(&self, user_id: i64) -> Result<Vec<DraftView>> {
        let rows = sqlx::query_as::<_, DraftView>(
            "SELECT p.id, p.content, p.image_url, p.team_id, p.created_at, p.updated_at,
                    t.name AS team_name, t.logo_url AS team_logo
             FROM posts p
             JOIN teams t ON p.team_id = t.id
             WHERE p.user_id = ? AND p.is_draft = 1
             ORDER BY p.updated_at DESC, p.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Full view of a single post, drafts included.
    pub async fn find_post(&self, post_id: i64) -> Result<Option<PostView>> {
        let sql = format!("{POST_VIEW_SELECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, PostView>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn post_meta(&self, post_id: i64) -> Result<Option<PostMeta>> {
        let row = sqlx::query_as::<_, PostMeta>("SELECT id, user_id, is_draft, image_url FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create_post(&self, post: &NewPost<'_>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO posts (user_id, team_id, content, image_url, is_draft)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post.user_id)
        .bind(post.team_id)
        .bind(post.content)
        .bind(post.image_url)
        .bind(post.is_draft)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrite the editable fields of a post and bump `updated_at`.
    pub async fn update_post(&self, post_id: i64, changes: &PostChanges<'_>) -> Result<()> {
        sqlx::query(
            "UPDATE posts
             SET content = ?, team_id = ?, is_draft = ?, image_url = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(changes.content)
        .bind(changes.team_id)
        .bind(changes.is_draft)
        .bind(changes.image_url)
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a post. Likes, favorites, comments and comment likes cascade.
    pub async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::Relation;
    use crate::models::{FeedFilter, NewPost, PostChanges};
    use crate::queries::test_support::{self, ARGENTINA, SPAIN};

    #[tokio::test]
    async fn drafts_never_reach_the_feed() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "zanetti", ARGENTINA).await;
        let published = test_support::post(&db, author, ARGENTINA, "Published", false).await;
        let draft = test_support::post(&db, author, ARGENTINA, "Draft", true).await;

        let feed = db.feed(FeedFilter::default(), 10, 0).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, published);
        assert_eq!(db.count_feed(FeedFilter::default()).await.unwrap(), 1);

        let drafts = db.drafts_of(author).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, draft);

        let by_author = FeedFilter { author_id: Some(author), ..Default::default() };
        assert_eq!(db.feed(by_author, 10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn feed_is_newest_first_and_filters_by_team() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "raul", SPAIN).await;
        let first = test_support::post(&db, author, SPAIN, "first", false).await;
        let second = test_support::post(&db, author, ARGENTINA, "second", false).await;
        let third = test_support::post(&db, author, SPAIN, "third", false).await;

        let feed = db.feed(FeedFilter::default(), 10, 0).await.unwrap();
        let ids: Vec<i64> = feed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![third, second, first]);

        let spain = FeedFilter { team_id: Some(SPAIN), ..Default::default() };
        let ids: Vec<i64> = db.feed(spain, 10, 0).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![third, first]);
        assert_eq!(db.count_feed(spain).await.unwrap(), 2);

        let page_two = db.feed(FeedFilter::default(), 2, 2).await.unwrap();
        assert_eq!(page_two.len(), 1);
        assert_eq!(page_two[0].id, first);
    }

    #[tokio::test]
    async fn update_overwrites_fields() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "villa", SPAIN).await;
        let id = db
            .create_post(&NewPost {
                user_id: author,
                team_id: SPAIN,
                content: "before",
                image_url: Some("/uploads/posts/post-1.png"),
                is_draft: true,
            })
            .await
            .unwrap();

        db.update_post(
            id,
            &PostChanges {
                content: "after",
                team_id: ARGENTINA,
                is_draft: false,
                image_url: None,
            },
        )
        .await
        .unwrap();

        let post = db.find_post(id).await.unwrap().unwrap();
        assert_eq!(post.content, "after");
        assert_eq!(post.team_name, "Argentina");
        assert!(!post.is_draft);
        assert!(post.image_url.is_none());
    }

    #[tokio::test]
    async fn image_in_use_ignores_the_excluded_post() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "morientes", SPAIN).await;
        let url = "/uploads/posts/post-9.png";
        let id = db
            .create_post(&NewPost {
                user_id: author,
                team_id: SPAIN,
                content: "con foto",
                image_url: Some(url),
                is_draft: false,
            })
            .await
            .unwrap();

        assert!(db.image_in_use(url, None).await.unwrap());
        assert!(!db.image_in_use(url, Some(id)).await.unwrap());
        assert!(!db.image_in_use("/uploads/posts/other.png", None).await.unwrap());
    }

    #[tokio::test]
    async fn delete_cascades_to_reactions_and_comments() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "torres", SPAIN).await;
        let post = test_support::post(&db, author, SPAIN, "Final", false).await;
        db.toggle_relation(Relation::PostLike, author, post).await.unwrap();
        db.toggle_relation(Relation::PostFavorite, author, post).await.unwrap();
        db.create_comment(post, author, "nice").await.unwrap();

        assert!(db.delete_post(post).await.unwrap());
        assert!(db.post_meta(post).await.unwrap().is_none());
        assert_eq!(db.relation_count(Relation::PostLike, post).await.unwrap(), 0);
        assert_eq!(db.relation_count(Relation::PostFavorite, post).await.unwrap(), 0);
        assert_eq!(db.count_comments(post).await.unwrap(), 0);
        assert!(!db.delete_post(post).await.unwrap());
    }

    #[tokio::test]
    async fn favorites_list_skips_drafts() {
        let db = test_support::db().await;
        let author = test_support::user(&db, "silva", SPAIN).await;
        let fan = test_support::user(&db, "alonso", SPAIN).await;
        let published = test_support::post(&db, author, SPAIN, "visible", false).await;
        let draft = test_support::post(&db, author, SPAIN, "hidden", true).await;

        db.toggle_relation(Relation::PostFavorite, fan, published).await.unwrap();
        db.toggle_relation(Relation::PostFavorite, fan, draft).await.unwrap();

        let favorites = db.favorite_posts(fan, 10, 0).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, published);
        assert_eq!(favorites[0].favorites_count, 1);
    }
}
