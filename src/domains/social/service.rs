// SocialGraphService - validated writes to the social graph
// Generates ids and timestamps, checks that referenced rows exist and that
// only an author can edit or delete their own content.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::{EntityId, Timestamp};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialDatabase;
use crate::infrastructure::id_generator::IdGenerator;
use crate::models::{CommentRecord, NewUser, PostRecord, ReplyRecord, UserRecord};

#[derive(Clone)]
pub struct SocialGraphService {
    db: Arc<dyn SocialDatabase>,
    ids: Arc<IdGenerator>,
}

fn non_empty(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn ensure_owner(actor: EntityId, owner: EntityId, what: &str) -> AppResult<()> {
    if actor != owner {
        return Err(AppError::Forbidden(format!(
            "User {} does not own {}",
            actor, what
        )));
    }
    Ok(())
}

impl SocialGraphService {
    pub fn new(db: Arc<dyn SocialDatabase>, ids: Arc<IdGenerator>) -> Self {
        Self { db, ids }
    }

    fn next_id(&self) -> EntityId {
        EntityId::new(self.ids.next_id())
    }

    // Users

    #[instrument(skip(self, user), fields(username = %user.username))]
    pub async fn create_user(&self, user: NewUser) -> AppResult<UserRecord> {
        non_empty(&user.name, "name")?;
        non_empty(&user.username, "username")?;
        non_empty(&user.email, "email")?;

        let now = Timestamp::now();
        let record = UserRecord {
            id: self.next_id(),
            name: user.name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_user(&record).await?;
        info!("Created user {}", record.id);
        Ok(record)
    }

    pub async fn get_user(&self, id: EntityId) -> AppResult<Option<UserRecord>> {
        self.db.get_user(id).await
    }

    async fn require_user(&self, id: EntityId) -> AppResult<UserRecord> {
        self.db
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    // Posts

    #[instrument(skip(self, content))]
    pub async fn create_post(&self, author: EntityId, content: &str) -> AppResult<PostRecord> {
        non_empty(content, "content")?;
        self.require_user(author).await?;

        let now = Timestamp::now();
        let record = PostRecord {
            id: self.next_id(),
            user_id: author,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_post(&record).await?;
        Ok(record)
    }

    pub async fn get_post(&self, id: EntityId) -> AppResult<Option<PostRecord>> {
        self.db.get_post(id).await
    }

    async fn require_post(&self, id: EntityId) -> AppResult<PostRecord> {
        self.db
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    #[instrument(skip(self, content))]
    pub async fn update_post(
        &self,
        actor: EntityId,
        id: EntityId,
        content: &str,
    ) -> AppResult<PostRecord> {
        non_empty(content, "content")?;
        let mut post = self.require_post(id).await?;
        ensure_owner(actor, post.user_id, "post")?;

        let now = Timestamp::now();
        if !self.db.update_post_content(id, content, now).await? {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }
        post.content = content.to_string();
        post.updated_at = now;
        Ok(post)
    }

    /// Deletes the post with its comments, replies and likes.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, actor: EntityId, id: EntityId) -> AppResult<()> {
        let post = self.require_post(id).await?;
        ensure_owner(actor, post.user_id, "post")?;
        self.db.delete_post(id).await?;
        Ok(())
    }

    // Comments

    #[instrument(skip(self, content))]
    pub async fn create_comment(
        &self,
        author: EntityId,
        post_id: EntityId,
        content: &str,
    ) -> AppResult<CommentRecord> {
        non_empty(content, "content")?;
        self.require_user(author).await?;
        self.require_post(post_id).await?;

        let now = Timestamp::now();
        let record = CommentRecord {
            id: self.next_id(),
            post_id,
            user_id: author,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_comment(&record).await?;
        Ok(record)
    }

    pub async fn get_comment(&self, id: EntityId) -> AppResult<Option<CommentRecord>> {
        self.db.get_comment(id).await
    }

    async fn require_comment(&self, id: EntityId) -> AppResult<CommentRecord> {
        self.db
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }

    #[instrument(skip(self, content))]
    pub async fn update_comment(
        &self,
        actor: EntityId,
        id: EntityId,
        content: &str,
    ) -> AppResult<CommentRecord> {
        non_empty(content, "content")?;
        let mut comment = self.require_comment(id).await?;
        ensure_owner(actor, comment.user_id, "comment")?;

        let now = Timestamp::now();
        if !self.db.update_comment_content(id, content, now).await? {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }
        comment.content = content.to_string();
        comment.updated_at = now;
        Ok(comment)
    }

    #[instrument(skip(self))]
    pub async fn delete_comment(&self, actor: EntityId, id: EntityId) -> AppResult<()> {
        let comment = self.require_comment(id).await?;
        ensure_owner(actor, comment.user_id, "comment")?;
        self.db.delete_comment(id).await?;
        Ok(())
    }

    // Replies

    #[instrument(skip(self, message))]
    pub async fn create_reply(
        &self,
        author: EntityId,
        comment_id: EntityId,
        message: &str,
    ) -> AppResult<ReplyRecord> {
        non_empty(message, "message")?;
        self.require_user(author).await?;
        self.require_comment(comment_id).await?;

        let now = Timestamp::now();
        let record = ReplyRecord {
            id: self.next_id(),
            comment_id,
            user_id: author,
            message: message.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_reply(&record).await?;
        Ok(record)
    }

    pub async fn get_reply(&self, id: EntityId) -> AppResult<Option<ReplyRecord>> {
        self.db.get_reply(id).await
    }

    async fn require_reply(&self, id: EntityId) -> AppResult<ReplyRecord> {
        self.db
            .get_reply(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reply {} not found", id)))
    }

    #[instrument(skip(self, message))]
    pub async fn update_reply(
        &self,
        actor: EntityId,
        id: EntityId,
        message: &str,
    ) -> AppResult<ReplyRecord> {
        non_empty(message, "message")?;
        let mut reply = self.require_reply(id).await?;
        ensure_owner(actor, reply.user_id, "reply")?;

        let now = Timestamp::now();
        if !self.db.update_reply_message(id, message, now).await? {
            return Err(AppError::NotFound(format!("Reply {} not found", id)));
        }
        reply.message = message.to_string();
        reply.updated_at = now;
        Ok(reply)
    }

    #[instrument(skip(self))]
    pub async fn delete_reply(&self, actor: EntityId, id: EntityId) -> AppResult<()> {
        let reply = self.require_reply(id).await?;
        ensure_owner(actor, reply.user_id, "reply")?;
        self.db.delete_reply(id).await?;
        Ok(())
    }

    // Likes. Each returns whether a row changed.

    #[instrument(skip(self))]
    pub async fn like_post(&self, user: EntityId, post_id: EntityId) -> AppResult<bool> {
        self.require_user(user).await?;
        self.require_post(post_id).await?;
        self.db.insert_post_like(user, post_id, Timestamp::now()).await
    }

    #[instrument(skip(self))]
    pub async fn unlike_post(&self, user: EntityId, post_id: EntityId) -> AppResult<bool> {
        self.db.delete_post_like(user, post_id).await
    }

    #[instrument(skip(self))]
    pub async fn like_comment(&self, user: EntityId, comment_id: EntityId) -> AppResult<bool> {
        self.require_user(user).await?;
        self.require_comment(comment_id).await?;
        self.db
            .insert_comment_like(user, comment_id, Timestamp::now())
            .await
    }

    #[instrument(skip(self))]
    pub async fn unlike_comment(&self, user: EntityId, comment_id: EntityId) -> AppResult<bool> {
        self.db.delete_comment_like(user, comment_id).await
    }

    // Follows

    #[instrument(skip(self))]
    pub async fn follow(&self, user: EntityId, target: EntityId) -> AppResult<bool> {
        if user == target {
            return Err(AppError::BadRequest("Users cannot follow themselves".to_string()));
        }
        self.require_user(user).await?;
        self.require_user(target).await?;
        self.db.insert_follow(user, target, Timestamp::now()).await
    }

    #[instrument(skip(self))]
    pub async fn unfollow(&self, user: EntityId, target: EntityId) -> AppResult<bool> {
        self.db.delete_follow(user, target).await
    }

    pub async fn followers_of(&self, user: EntityId) -> AppResult<Vec<UserRecord>> {
        self.db.list_followers(user).await
    }

    pub async fn following_of(&self, user: EntityId) -> AppResult<Vec<UserRecord>> {
        self.db.list_following(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_database::SqliteDatabase;

    async fn service() -> SocialGraphService {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        SocialGraphService::new(Arc::new(db), Arc::new(IdGenerator::new(1).unwrap()))
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            name: "Test".into(),
            last_name: "User".into(),
            username: username.into(),
            email: format!("{}@example.com", username),
        }
    }

    #[tokio::test]
    async fn test_only_author_can_edit_post() {
        let svc = service().await;
        let ada = svc.create_user(new_user("ada")).await.unwrap();
        let alan = svc.create_user(new_user("alan")).await.unwrap();
        let post = svc.create_post(ada.id, "first").await.unwrap();

        let err = svc.update_post(alan.id, post.id, "hijack").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = svc.delete_post(alan.id, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = svc.update_post(ada.id, post.id, "edited").await.unwrap();
        assert_eq!(updated.content, "edited");
        svc.delete_post(ada.id, post.id).await.unwrap();
        assert!(svc.get_post(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_is_not_found() {
        let svc = service().await;
        let ada = svc.create_user(new_user("ada")).await.unwrap();

        let err = svc
            .create_comment(ada.id, EntityId::new(12345), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_follow_rules() {
        let svc = service().await;
        let ada = svc.create_user(new_user("ada")).await.unwrap();
        let alan = svc.create_user(new_user("alan")).await.unwrap();

        assert!(matches!(
            svc.follow(ada.id, ada.id).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(svc.follow(ada.id, alan.id).await.unwrap());
        assert!(!svc.follow(ada.id, alan.id).await.unwrap());
        assert_eq!(svc.following_of(ada.id).await.unwrap()[0].id, alan.id);
        assert_eq!(svc.followers_of(alan.id).await.unwrap()[0].id, ada.id);

        assert!(svc.unfollow(ada.id, alan.id).await.unwrap());
        assert!(svc.following_of(ada.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected() {
        let svc = service().await;
        let ada = svc.create_user(new_user("ada")).await.unwrap();
        assert!(matches!(
            svc.create_post(ada.id, "   ").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_reply_lifecycle() {
        let svc = service().await;
        let ada = svc.create_user(new_user("ada")).await.unwrap();
        let post = svc.create_post(ada.id, "post").await.unwrap();
        let comment = svc.create_comment(ada.id, post.id, "comment").await.unwrap();
        let reply = svc.create_reply(ada.id, comment.id, "reply").await.unwrap();

        let edited = svc.update_reply(ada.id, reply.id, "edited").await.unwrap();
        assert_eq!(edited.message, "edited");

        svc.delete_comment(ada.id, comment.id).await.unwrap();
        assert!(svc.get_reply(reply.id).await.unwrap().is_none());
    }
}
