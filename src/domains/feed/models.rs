// Feed entities - the nested, viewer-relative shapes returned to callers

use serde::Serialize;

use crate::core::{EntityId, Timestamp};

/// Public projection of a user. Never carries email or credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: EntityId,
    pub name: String,
    pub last_name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: EntityId,
    pub content: String,
    pub author: Author,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_liked_by_viewer: bool,
    pub is_author_followed_by_viewer: bool,
    /// Oldest first. Empty when the post has no comments.
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: EntityId,
    pub post_id: EntityId,
    pub content: String,
    pub author: Author,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub like_count: u64,
    pub reply_count: u64,
    pub is_liked_by_viewer: bool,
    pub is_author_followed_by_viewer: bool,
    /// Only populated by the comments-of-post read; nested post reads leave
    /// this empty and expose `reply_count` instead.
    pub replies: Vec<Reply>,
}

/// Replies are leaves: no likes, no viewer flags, no children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub id: EntityId,
    pub comment_id: EntityId,
    pub message: String,
    pub author: Author,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
