// Storage records - one struct per table, as written and read by the single-row CRUD paths

use serde::Serialize;
use sqlx::FromRow;

use crate::core::{EntityId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct UserRecord {
    pub id: EntityId,
    pub name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PostRecord {
    pub id: EntityId,
    pub user_id: EntityId,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CommentRecord {
    pub id: EntityId,
    pub post_id: EntityId,
    pub user_id: EntityId,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ReplyRecord {
    pub id: EntityId,
    pub comment_id: EntityId,
    pub user_id: EntityId,
    pub message: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields a caller supplies when registering a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}
