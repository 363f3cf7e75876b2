// Feed domain - aggregation queries, row materialization and read assemblers

pub mod materializer;
pub mod models;
pub mod pagination;
pub mod query_builder;
pub mod rows;
pub mod service;

pub use models::{Author, Comment, Post, Reply};
pub use pagination::{ListParams, Pagination, Search, DEFAULT_LIMIT, MAX_LIMIT};
pub use query_builder::{CommentQuery, PostQuery, PostScope, ReplyQuery};
pub use service::FeedService;
