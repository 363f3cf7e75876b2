// Database Interface - storage operations for the social graph
// Single-row CRUD for users, posts, comments, replies, likes and follows, plus
// the streaming readers that feed joined rows into a materializer.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::core::{EntityId, Timestamp};
use crate::domains::feed::materializer::Materializer;
use crate::domains::feed::query_builder::{CommentQuery, PostQuery, ReplyQuery};
use crate::domains::feed::rows::{CommentReplyRow, PostCommentRow, ReplyRow};
use crate::error::{AppError, AppResult};
use crate::infrastructure::sqlite_database::SqliteDatabase;
use crate::models::{CommentRecord, PostRecord, ReplyRecord, UserRecord};

/// Storage contract shared by the PostgreSQL and SQLite backends.
#[async_trait]
pub trait SocialDatabase: Send + Sync {
    /// Create tables and indexes if they do not exist.
    async fn initialize(&self) -> AppResult<()>;
    async fn health_check(&self) -> AppResult<()>;

    // Joined readers. Rows are pushed into the sink as they arrive; the
    // cursor is released when the call returns, on success or error.
    async fn stream_post_rows(
        &self,
        query: &PostQuery,
        sink: &mut Materializer<PostCommentRow>,
    ) -> AppResult<()>;
    async fn stream_comment_rows(
        &self,
        query: &CommentQuery,
        sink: &mut Materializer<CommentReplyRow>,
    ) -> AppResult<()>;
    async fn fetch_reply_rows(&self, query: &ReplyQuery) -> AppResult<Vec<ReplyRow>>;

    // Users
    async fn insert_user(&self, user: &UserRecord) -> AppResult<()>;
    async fn get_user(&self, id: EntityId) -> AppResult<Option<UserRecord>>;

    // Posts
    async fn insert_post(&self, post: &PostRecord) -> AppResult<()>;
    async fn get_post(&self, id: EntityId) -> AppResult<Option<PostRecord>>;
    async fn update_post_content(
        &self,
        id: EntityId,
        content: &str,
        updated_at: Timestamp,
    ) -> AppResult<bool>;
    async fn delete_post(&self, id: EntityId) -> AppResult<bool>;

    // Comments
    async fn insert_comment(&self, comment: &CommentRecord) -> AppResult<()>;
    async fn get_comment(&self, id: EntityId) -> AppResult<Option<CommentRecord>>;
    async fn update_comment_content(
        &self,
        id: EntityId,
        content: &str,
        updated_at: Timestamp,
    ) -> AppResult<bool>;
    async fn delete_comment(&self, id: EntityId) -> AppResult<bool>;

    // Replies
    async fn insert_reply(&self, reply: &ReplyRecord) -> AppResult<()>;
    async fn get_reply(&self, id: EntityId) -> AppResult<Option<ReplyRecord>>;
    async fn update_reply_message(
        &self,
        id: EntityId,
        message: &str,
        updated_at: Timestamp,
    ) -> AppResult<bool>;
    async fn delete_reply(&self, id: EntityId) -> AppResult<bool>;

    // Likes. Insert returns false when the like already existed.
    async fn insert_post_like(
        &self,
        user_id: EntityId,
        post_id: EntityId,
        created_at: Timestamp,
    ) -> AppResult<bool>;
    async fn delete_post_like(&self, user_id: EntityId, post_id: EntityId) -> AppResult<bool>;
    async fn insert_comment_like(
        &self,
        user_id: EntityId,
        comment_id: EntityId,
        created_at: Timestamp,
    ) -> AppResult<bool>;
    async fn delete_comment_like(&self, user_id: EntityId, comment_id: EntityId)
        -> AppResult<bool>;

    // Follows: `user_id` follows `follow_id`.
    async fn insert_follow(
        &self,
        user_id: EntityId,
        follow_id: EntityId,
        created_at: Timestamp,
    ) -> AppResult<bool>;
    async fn delete_follow(&self, user_id: EntityId, follow_id: EntityId) -> AppResult<bool>;
    async fn list_followers(&self, user_id: EntityId) -> AppResult<Vec<UserRecord>>;
    async fn list_following(&self, user_id: EntityId) -> AppResult<Vec<UserRecord>>;
}

/// Schema shared by both backends. Ids are application-generated snowflakes,
/// timestamps are Unix milliseconds. `posts.search_text` is the content
/// lowercased on write, so search folds case the same way on every backend.
pub(crate) const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id BIGINT PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        search_text TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id BIGINT PRIMARY KEY,
        post_id BIGINT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS replies (
        id BIGINT PRIMARY KEY,
        comment_id BIGINT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        message TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS post_likes (
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        post_id BIGINT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        created_at BIGINT NOT NULL,
        PRIMARY KEY (user_id, post_id)
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS comment_likes (
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        comment_id BIGINT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
        created_at BIGINT NOT NULL,
        PRIMARY KEY (user_id, comment_id)
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS follows (
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        follow_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at BIGINT NOT NULL,
        PRIMARY KEY (user_id, follow_id),
        CHECK (user_id <> follow_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC, id DESC)",
    "CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_replies_comment ON replies(comment_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_post_likes_post ON post_likes(post_id)",
    "CREATE INDEX IF NOT EXISTS idx_comment_likes_comment ON comment_likes(comment_id)",
    "CREATE INDEX IF NOT EXISTS idx_follows_follow ON follows(follow_id)",
];

/// Generates the `SocialDatabase` impl for a backend struct with a `pool`
/// field. Statements are shared; only the driver differs.
macro_rules! impl_social_database {
    ($backend:ty, $db:ty) => {
        #[async_trait::async_trait]
        impl $crate::infrastructure::database::SocialDatabase for $backend {
            async fn initialize(&self) -> $crate::error::AppResult<()> {
                for statement in $crate::infrastructure::database::SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await.map_err(|e| {
                        $crate::error::AppError::DatabaseError(format!(
                            "Failed to initialize schema: {}",
                            e
                        ))
                    })?;
                }
                Ok(())
            }

            async fn health_check(&self) -> $crate::error::AppResult<()> {
                sqlx::query("SELECT 1")
                    .execute(&self.pool)
                    .await
                    .map_err(|e| {
                        $crate::error::AppError::DatabaseError(format!(
                            "Database health check failed: {}",
                            e
                        ))
                    })?;
                Ok(())
            }

            async fn stream_post_rows(
                &self,
                query: &$crate::domains::feed::query_builder::PostQuery,
                sink: &mut $crate::domains::feed::materializer::Materializer<
                    $crate::domains::feed::rows::PostCommentRow,
                >,
            ) -> $crate::error::AppResult<()> {
                use futures::TryStreamExt;

                let mut qb = query.build::<$db>();
                let mut rows = qb
                    .build_query_as::<$crate::domains::feed::rows::PostCommentRow>()
                    .fetch(&self.pool);
                while let Some(row) = rows.try_next().await? {
                    sink.push(row)?;
                }
                Ok(())
            }

            async fn stream_comment_rows(
                &self,
                query: &$crate::domains::feed::query_builder::CommentQuery,
                sink: &mut $crate::domains::feed::materializer::Materializer<
                    $crate::domains::feed::rows::CommentReplyRow,
                >,
            ) -> $crate::error::AppResult<()> {
                use futures::TryStreamExt;

                let mut qb = query.build::<$db>();
                let mut rows = qb
                    .build_query_as::<$crate::domains::feed::rows::CommentReplyRow>()
                    .fetch(&self.pool);
                while let Some(row) = rows.try_next().await? {
                    sink.push(row)?;
                }
                Ok(())
            }

            async fn fetch_reply_rows(
                &self,
                query: &$crate::domains::feed::query_builder::ReplyQuery,
            ) -> $crate::error::AppResult<Vec<$crate::domains::feed::rows::ReplyRow>> {
                let mut qb = query.build::<$db>();
                Ok(qb
                    .build_query_as::<$crate::domains::feed::rows::ReplyRow>()
                    .fetch_all(&self.pool)
                    .await?)
            }

            async fn insert_user(
                &self,
                user: &$crate::models::UserRecord,
            ) -> $crate::error::AppResult<()> {
                sqlx::query(
                    "INSERT INTO users (id, name, last_name, username, email, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.last_name)
                .bind(&user.username)
                .bind(&user.email)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(&self.pool)
                .await?;
                Ok(())
            }

            async fn get_user(
                &self,
                id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<Option<$crate::models::UserRecord>> {
                Ok(sqlx::query_as(
                    "SELECT id, name, last_name, username, email, created_at, updated_at
                     FROM users WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?)
            }

            async fn insert_post(
                &self,
                post: &$crate::models::PostRecord,
            ) -> $crate::error::AppResult<()> {
                sqlx::query(
                    "INSERT INTO posts (id, user_id, content, search_text, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(post.id)
                .bind(post.user_id)
                .bind(&post.content)
                .bind(post.content.to_lowercase())
                .bind(post.created_at)
                .bind(post.updated_at)
                .execute(&self.pool)
                .await?;
                Ok(())
            }

            async fn get_post(
                &self,
                id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<Option<$crate::models::PostRecord>> {
                Ok(sqlx::query_as(
                    "SELECT id, user_id, content, created_at, updated_at FROM posts WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?)
            }

            async fn update_post_content(
                &self,
                id: $crate::core::EntityId,
                content: &str,
                updated_at: $crate::core::Timestamp,
            ) -> $crate::error::AppResult<bool> {
                let result = sqlx::query(
                    "UPDATE posts SET content = $1, search_text = $2, updated_at = $3 WHERE id = $4",
                )
                .bind(content)
                .bind(content.to_lowercase())
                .bind(updated_at)
                .bind(id)
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn delete_post(
                &self,
                id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<bool> {
                let result = sqlx::query("DELETE FROM posts WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn insert_comment(
                &self,
                comment: &$crate::models::CommentRecord,
            ) -> $crate::error::AppResult<()> {
                sqlx::query(
                    "INSERT INTO comments (id, post_id, user_id, content, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(comment.id)
                .bind(comment.post_id)
                .bind(comment.user_id)
                .bind(&comment.content)
                .bind(comment.created_at)
                .bind(comment.updated_at)
                .execute(&self.pool)
                .await?;
                Ok(())
            }

            async fn get_comment(
                &self,
                id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<Option<$crate::models::CommentRecord>> {
                Ok(sqlx::query_as(
                    "SELECT id, post_id, user_id, content, created_at, updated_at
                     FROM comments WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?)
            }

            async fn update_comment_content(
                &self,
                id: $crate::core::EntityId,
                content: &str,
                updated_at: $crate::core::Timestamp,
            ) -> $crate::error::AppResult<bool> {
                let result =
                    sqlx::query("UPDATE comments SET content = $1, updated_at = $2 WHERE id = $3")
                        .bind(content)
                        .bind(updated_at)
                        .bind(id)
                        .execute(&self.pool)
                        .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn delete_comment(
                &self,
                id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<bool> {
                let result = sqlx::query("DELETE FROM comments WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn insert_reply(
                &self,
                reply: &$crate::models::ReplyRecord,
            ) -> $crate::error::AppResult<()> {
                sqlx::query(
                    "INSERT INTO replies (id, comment_id, user_id, message, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(reply.id)
                .bind(reply.comment_id)
                .bind(reply.user_id)
                .bind(&reply.message)
                .bind(reply.created_at)
                .bind(reply.updated_at)
                .execute(&self.pool)
                .await?;
                Ok(())
            }

            async fn get_reply(
                &self,
                id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<Option<$crate::models::ReplyRecord>> {
                Ok(sqlx::query_as(
                    "SELECT id, comment_id, user_id, message, created_at, updated_at
                     FROM replies WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?)
            }

            async fn update_reply_message(
                &self,
                id: $crate::core::EntityId,
                message: &str,
                updated_at: $crate::core::Timestamp,
            ) -> $crate::error::AppResult<bool> {
                let result =
                    sqlx::query("UPDATE replies SET message = $1, updated_at = $2 WHERE id = $3")
                        .bind(message)
                        .bind(updated_at)
                        .bind(id)
                        .execute(&self.pool)
                        .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn delete_reply(
                &self,
                id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<bool> {
                let result = sqlx::query("DELETE FROM replies WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn insert_post_like(
                &self,
                user_id: $crate::core::EntityId,
                post_id: $crate::core::EntityId,
                created_at: $crate::core::Timestamp,
            ) -> $crate::error::AppResult<bool> {
                let result = sqlx::query(
                    "INSERT INTO post_likes (user_id, post_id, created_at) VALUES ($1, $2, $3)
                     ON CONFLICT DO NOTHING",
                )
                .bind(user_id)
                .bind(post_id)
                .bind(created_at)
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn delete_post_like(
                &self,
                user_id: $crate::core::EntityId,
                post_id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<bool> {
                let result =
                    sqlx::query("DELETE FROM post_likes WHERE user_id = $1 AND post_id = $2")
                        .bind(user_id)
                        .bind(post_id)
                        .execute(&self.pool)
                        .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn insert_comment_like(
                &self,
                user_id: $crate::core::EntityId,
                comment_id: $crate::core::EntityId,
                created_at: $crate::core::Timestamp,
            ) -> $crate::error::AppResult<bool> {
                let result = sqlx::query(
                    "INSERT INTO comment_likes (user_id, comment_id, created_at) VALUES ($1, $2, $3)
                     ON CONFLICT DO NOTHING",
                )
                .bind(user_id)
                .bind(comment_id)
                .bind(created_at)
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn delete_comment_like(
                &self,
                user_id: $crate::core::EntityId,
                comment_id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<bool> {
                let result =
                    sqlx::query("DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2")
                        .bind(user_id)
                        .bind(comment_id)
                        .execute(&self.pool)
                        .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn insert_follow(
                &self,
                user_id: $crate::core::EntityId,
                follow_id: $crate::core::EntityId,
                created_at: $crate::core::Timestamp,
            ) -> $crate::error::AppResult<bool> {
                let result = sqlx::query(
                    "INSERT INTO follows (user_id, follow_id, created_at) VALUES ($1, $2, $3)
                     ON CONFLICT DO NOTHING",
                )
                .bind(user_id)
                .bind(follow_id)
                .bind(created_at)
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn delete_follow(
                &self,
                user_id: $crate::core::EntityId,
                follow_id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<bool> {
                let result =
                    sqlx::query("DELETE FROM follows WHERE user_id = $1 AND follow_id = $2")
                        .bind(user_id)
                        .bind(follow_id)
                        .execute(&self.pool)
                        .await?;
                Ok(result.rows_affected() > 0)
            }

            async fn list_followers(
                &self,
                user_id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<Vec<$crate::models::UserRecord>> {
                Ok(sqlx::query_as(
                    "SELECT u.id, u.name, u.last_name, u.username, u.email, u.created_at, u.updated_at
                     FROM follows f JOIN users u ON u.id = f.user_id
                     WHERE f.follow_id = $1
                     ORDER BY f.created_at DESC, u.id DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?)
            }

            async fn list_following(
                &self,
                user_id: $crate::core::EntityId,
            ) -> $crate::error::AppResult<Vec<$crate::models::UserRecord>> {
                Ok(sqlx::query_as(
                    "SELECT u.id, u.name, u.last_name, u.username, u.email, u.created_at, u.updated_at
                     FROM follows f JOIN users u ON u.id = f.follow_id
                     WHERE f.user_id = $1
                     ORDER BY f.created_at DESC, u.id DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?)
            }
        }
    };
}

pub(crate) use impl_social_database;

/// PostgreSQL implementation of the social database
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e)))?;
        Ok(Self::new(pool))
    }
}

impl_social_database!(PostgresDatabase, sqlx::Postgres);

/// Open the backend named by the URL scheme and make sure the schema exists.
pub async fn connect_database(config: &Config) -> AppResult<Arc<dyn SocialDatabase>> {
    let url = config.database.url.as_str();
    let max_connections = config.database.max_connections;

    let database: Arc<dyn SocialDatabase> =
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            info!("Connecting to PostgreSQL (max_connections={})", max_connections);
            Arc::new(PostgresDatabase::connect(url, max_connections).await?)
        } else if url.starts_with("sqlite:") {
            info!("Connecting to SQLite at {}", url);
            Arc::new(SqliteDatabase::connect(url, max_connections).await?)
        } else {
            return Err(AppError::ConfigurationError(format!(
                "Unsupported DATABASE_URL scheme: {}",
                url
            )));
        };

    database.initialize().await?;
    info!("Database schema ready");
    Ok(database)
}
