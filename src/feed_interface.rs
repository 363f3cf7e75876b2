// Feed HTTP interface - read-only routes over the feed assemblers

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    core::EntityId,
    domains::feed::{Comment, ListParams, Post, Reply},
    error::{AppError, AppResult},
    infrastructure::middleware::{rate_limit_middleware, viewer_context_middleware, Vc},
};

fn parse_id(raw: &str, what: &str) -> AppResult<EntityId> {
    raw.parse::<EntityId>()
        .ok()
        .filter(|id| id.is_valid())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {} id: {}", what, raw)))
}

fn found<T>(value: Option<T>, what: &str) -> AppResult<Json<T>> {
    value
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No {} found", what)))
}

pub async fn get_feed_handler(
    State(state): State<AppState>,
    vc: Vc,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Post>>> {
    let posts = state
        .feed
        .get_feed(&vc, params.pagination(), &params.search())
        .await?;
    found(posts, "posts in feed")
}

pub async fn list_posts_handler(
    State(state): State<AppState>,
    vc: Vc,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Post>>> {
    let posts = state
        .feed
        .get_posts(&vc, params.pagination(), &params.search())
        .await?;
    found(posts, "posts")
}

pub async fn get_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    let post_id = parse_id(&id, "post")?;
    let post = state.feed.get_post_detail(post_id, &vc).await?;
    found(post, "post")
}

pub async fn get_post_comments_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Comment>>> {
    let post_id = parse_id(&id, "post")?;
    let comments = state.feed.get_comments_by_post(post_id, &vc).await?;
    found(comments, "comments")
}

pub async fn get_user_posts_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Post>>> {
    let author = parse_id(&id, "user")?;
    let posts = state
        .feed
        .get_posts_by_user(author, &vc, params.pagination(), &params.search())
        .await?;
    found(posts, "posts")
}

pub async fn get_comment_replies_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Reply>>> {
    let comment_id = parse_id(&id, "comment")?;
    let replies = state.feed.get_replies_by_comment(comment_id).await?;
    found(replies, "replies")
}

pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.database.health_check().await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Routes are relative; the caller nests them under `/api/v1`.
pub fn create_feed_router(state: AppState) -> Router {
    let viewer_routes = Router::new()
        .route("/feed", get(get_feed_handler))
        .route("/posts", get(list_posts_handler))
        .route("/posts/{id}", get(get_post_handler))
        .route("/posts/{id}/comments", get(get_post_comments_handler))
        .route("/users/{id}/posts", get(get_user_posts_handler))
        .route("/comments/{id}/replies", get(get_comment_replies_handler))
        .route_layer(middleware::from_fn(viewer_context_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .merge(viewer_routes)
        .route("/health", get(health_handler))
        .with_state(state)
}
