// Flat row shapes produced by the aggregation queries, and their conversion
// into feed entities. Child columns are nullable because children are
// left-joined; aggregate and flag columns never are.

use sqlx::FromRow;

use crate::core::{EntityId, Timestamp};
use crate::domains::feed::materializer::{JoinedRow, Nest};
use crate::domains::feed::models::{Author, Comment, Post, Reply};
use crate::error::{AppError, AppResult};

fn required<T>(value: Option<T>, column: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::MalformedRow(format!("column {} is NULL", column)))
}

fn count(value: i64, column: &str) -> AppResult<u64> {
    u64::try_from(value)
        .map_err(|_| AppError::MalformedRow(format!("column {} is negative: {}", column, value)))
}

#[derive(Debug, Clone, FromRow)]
pub struct PostColumns {
    pub post_id: EntityId,
    pub post_content: String,
    pub post_created_at: Timestamp,
    pub post_updated_at: Timestamp,
    pub post_author_id: EntityId,
    pub post_author_name: String,
    pub post_author_last_name: String,
    pub post_author_username: String,
    pub post_like_count: i64,
    pub post_comment_count: i64,
    pub post_is_liked: bool,
    pub post_is_following: bool,
}

impl PostColumns {
    pub fn to_post(&self) -> AppResult<Post> {
        Ok(Post {
            id: self.post_id,
            content: self.post_content.clone(),
            author: Author {
                id: self.post_author_id,
                name: self.post_author_name.clone(),
                last_name: self.post_author_last_name.clone(),
                username: self.post_author_username.clone(),
            },
            created_at: self.post_created_at,
            updated_at: self.post_updated_at,
            like_count: count(self.post_like_count, "post_like_count")?,
            comment_count: count(self.post_comment_count, "post_comment_count")?,
            is_liked_by_viewer: self.post_is_liked,
            is_author_followed_by_viewer: self.post_is_following,
            comments: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentColumns {
    pub comment_id: Option<EntityId>,
    pub comment_post_id: Option<EntityId>,
    pub comment_content: Option<String>,
    pub comment_created_at: Option<Timestamp>,
    pub comment_updated_at: Option<Timestamp>,
    pub comment_author_id: Option<EntityId>,
    pub comment_author_name: Option<String>,
    pub comment_author_last_name: Option<String>,
    pub comment_author_username: Option<String>,
    pub comment_like_count: i64,
    pub comment_reply_count: i64,
    pub comment_is_liked: bool,
    pub comment_is_following: bool,
}

impl CommentColumns {
    pub fn is_present(&self) -> bool {
        self.comment_id.is_some()
    }

    pub fn to_comment(&self) -> AppResult<Comment> {
        Ok(Comment {
            id: required(self.comment_id, "comment_id")?,
            post_id: required(self.comment_post_id, "comment_post_id")?,
            content: required(self.comment_content.clone(), "comment_content")?,
            author: Author {
                id: required(self.comment_author_id, "comment_author_id")?,
                name: required(self.comment_author_name.clone(), "comment_author_name")?,
                last_name: required(
                    self.comment_author_last_name.clone(),
                    "comment_author_last_name",
                )?,
                username: required(
                    self.comment_author_username.clone(),
                    "comment_author_username",
                )?,
            },
            created_at: required(self.comment_created_at, "comment_created_at")?,
            updated_at: required(self.comment_updated_at, "comment_updated_at")?,
            like_count: count(self.comment_like_count, "comment_like_count")?,
            reply_count: count(self.comment_reply_count, "comment_reply_count")?,
            is_liked_by_viewer: self.comment_is_liked,
            is_author_followed_by_viewer: self.comment_is_following,
            replies: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReplyColumns {
    pub reply_id: Option<EntityId>,
    pub reply_comment_id: Option<EntityId>,
    pub reply_message: Option<String>,
    pub reply_created_at: Option<Timestamp>,
    pub reply_updated_at: Option<Timestamp>,
    pub reply_author_id: Option<EntityId>,
    pub reply_author_name: Option<String>,
    pub reply_author_last_name: Option<String>,
    pub reply_author_username: Option<String>,
}

impl ReplyColumns {
    pub fn is_present(&self) -> bool {
        self.reply_id.is_some()
    }

    pub fn into_reply(self) -> AppResult<Reply> {
        Ok(Reply {
            id: required(self.reply_id, "reply_id")?,
            comment_id: required(self.reply_comment_id, "reply_comment_id")?,
            message: required(self.reply_message, "reply_message")?,
            author: Author {
                id: required(self.reply_author_id, "reply_author_id")?,
                name: required(self.reply_author_name, "reply_author_name")?,
                last_name: required(self.reply_author_last_name, "reply_author_last_name")?,
                username: required(self.reply_author_username, "reply_author_username")?,
            },
            created_at: required(self.reply_created_at, "reply_created_at")?,
            updated_at: required(self.reply_updated_at, "reply_updated_at")?,
        })
    }
}

/// One (post, comment?) pair from a post read.
#[derive(Debug, Clone, FromRow)]
pub struct PostCommentRow {
    #[sqlx(flatten)]
    pub post: PostColumns,
    #[sqlx(flatten)]
    pub comment: CommentColumns,
}

/// One (comment, reply?) pair from a comments-of-post read.
#[derive(Debug, Clone, FromRow)]
pub struct CommentReplyRow {
    #[sqlx(flatten)]
    pub comment: CommentColumns,
    #[sqlx(flatten)]
    pub reply: ReplyColumns,
}

/// Replies-of-comment rows have no child level.
pub type ReplyRow = ReplyColumns;

impl Nest<Comment> for Post {
    fn nest(&mut self, child: Comment) {
        self.comments.push(child);
    }
}

impl Nest<Reply> for Comment {
    fn nest(&mut self, child: Reply) {
        self.replies.push(child);
    }
}

impl JoinedRow for PostCommentRow {
    type Child = Comment;
    type Parent = Post;

    fn parent_key(&self) -> AppResult<i64> {
        Ok(self.post.post_id.value())
    }

    fn parent(&self) -> AppResult<Post> {
        self.post.to_post()
    }

    fn into_child(self) -> AppResult<Option<Comment>> {
        if self.comment.is_present() {
            self.comment.to_comment().map(Some)
        } else {
            Ok(None)
        }
    }
}

impl JoinedRow for CommentReplyRow {
    type Child = Reply;
    type Parent = Comment;

    fn parent_key(&self) -> AppResult<i64> {
        required(self.comment.comment_id, "comment_id").map(EntityId::value)
    }

    fn parent(&self) -> AppResult<Comment> {
        self.comment.to_comment()
    }

    fn into_child(self) -> AppResult<Option<Reply>> {
        if self.reply.is_present() {
            self.reply.into_reply().map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::feed::materializer::Materializer;

    fn post_columns(id: i64, likes: i64) -> PostColumns {
        PostColumns {
            post_id: EntityId::new(id),
            post_content: format!("post {}", id),
            post_created_at: Timestamp::new(1_000 + id),
            post_updated_at: Timestamp::new(1_000 + id),
            post_author_id: EntityId::new(1),
            post_author_name: "Ada".into(),
            post_author_last_name: "Lovelace".into(),
            post_author_username: "ada".into(),
            post_like_count: likes,
            post_comment_count: 0,
            post_is_liked: false,
            post_is_following: true,
        }
    }

    fn comment_columns(id: Option<i64>) -> CommentColumns {
        CommentColumns {
            comment_id: id.map(EntityId::new),
            comment_post_id: id.map(|_| EntityId::new(1)),
            comment_content: id.map(|i| format!("comment {}", i)),
            comment_created_at: id.map(Timestamp::new),
            comment_updated_at: id.map(Timestamp::new),
            comment_author_id: id.map(|_| EntityId::new(2)),
            comment_author_name: id.map(|_| "Alan".to_string()),
            comment_author_last_name: id.map(|_| "Turing".to_string()),
            comment_author_username: id.map(|_| "alan".to_string()),
            comment_like_count: 0,
            comment_reply_count: 0,
            comment_is_liked: false,
            comment_is_following: false,
        }
    }

    #[test]
    fn test_post_without_comments_materializes_with_empty_list() {
        let mut m = Materializer::new();
        m.push(PostCommentRow {
            post: post_columns(1, 3),
            comment: comment_columns(None),
        })
        .unwrap();

        let posts = m.into_entities();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].like_count, 3);
        assert!(posts[0].comments.is_empty());
        assert!(posts[0].is_author_followed_by_viewer);
    }

    #[test]
    fn test_comments_nest_under_their_post() {
        let mut m = Materializer::new();
        for c in [10, 11] {
            m.push(PostCommentRow {
                post: post_columns(1, 0),
                comment: comment_columns(Some(c)),
            })
            .unwrap();
        }

        let posts = m.into_entities();
        assert_eq!(posts.len(), 1);
        let ids: Vec<i64> = posts[0].comments.iter().map(|c| c.id.value()).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(posts[0].comments[0].author.username, "alan");
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let err = post_columns(1, -1).to_post().unwrap_err();
        assert!(matches!(err, AppError::MalformedRow(_)));
    }

    #[test]
    fn test_partial_child_is_malformed() {
        let mut comment = comment_columns(Some(5));
        comment.comment_author_username = None;

        let row = PostCommentRow {
            post: post_columns(1, 0),
            comment,
        };
        assert!(matches!(row.into_child(), Err(AppError::MalformedRow(_))));
    }
}
