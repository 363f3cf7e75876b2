use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use social_feed::{
    app_state::AppState,
    config::Config,
    core::EntityId,
    feed_interface::create_feed_router,
    infrastructure::{middleware::VIEWER_HEADER, SocialDatabase, SqliteDatabase},
    models::NewUser,
};

async fn setup(burst: &str) -> (AppState, Router) {
    let db: Arc<dyn SocialDatabase> = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
    let burst = burst.to_string();
    let config = Config::from_lookup(move |key| match key {
        "RATE_LIMIT_BURST" => Some(burst.clone()),
        _ => None,
    })
    .unwrap();
    let state = AppState::with_database(config, db).unwrap();
    let app = Router::new().nest("/api/v1", create_feed_router(state.clone()));
    (state, app)
}

async fn user(state: &AppState, username: &str) -> EntityId {
    state
        .social
        .create_user(NewUser {
            name: "Name".into(),
            last_name: "Last".into(),
            username: username.into(),
            email: format!("{}@example.com", username),
        })
        .await
        .unwrap()
        .id
}

async fn get(app: &Router, uri: &str, viewer: Option<EntityId>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(viewer) = viewer {
        request = request.header(VIEWER_HEADER, viewer.to_string());
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_missing_viewer_is_unauthorized() {
    let (_, app) = setup("100").await;

    let (status, body) = get(&app, "/api/v1/feed", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn test_empty_feed_is_not_found() {
    let (state, app) = setup("100").await;
    let loner = user(&state, "loner").await;

    let (status, body) = get(&app, "/api/v1/feed", Some(loner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_feed_json_shape() {
    let (state, app) = setup("100").await;
    let a = user(&state, "a").await;
    let b = user(&state, "b").await;
    state.social.follow(a, b).await.unwrap();
    let p = state.social.create_post(b, "hello feed").await.unwrap();
    state.social.create_comment(a, p.id, "nice").await.unwrap();
    state.social.like_post(a, p.id).await.unwrap();

    let (status, body) = get(&app, "/api/v1/feed?limit=10&offset=0&search=HELLO", Some(a)).await;
    assert_eq!(status, StatusCode::OK);

    let posts = body.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post["id"], p.id.to_string());
    assert_eq!(post["content"], "hello feed");
    assert_eq!(post["author"]["username"], "b");
    assert!(post["author"].get("email").is_none());
    assert_eq!(post["like_count"], 1);
    assert_eq!(post["comment_count"], 1);
    assert_eq!(post["is_liked_by_viewer"], true);
    assert_eq!(post["is_author_followed_by_viewer"], true);
    assert!(post["created_at"].as_str().unwrap().ends_with('Z'));
    assert_eq!(post["comments"][0]["content"], "nice");
}

#[tokio::test]
async fn test_post_detail_routes() {
    let (state, app) = setup("100").await;
    let a = user(&state, "a").await;
    let p = state.social.create_post(a, "detail").await.unwrap();
    let c = state.social.create_comment(a, p.id, "comment").await.unwrap();
    state.social.create_reply(a, c.id, "reply").await.unwrap();

    let (status, body) = get(&app, &format!("/api/v1/posts/{}", p.id), Some(a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comments"][0]["reply_count"], 1);

    let (status, body) = get(&app, &format!("/api/v1/posts/{}/comments", p.id), Some(a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["replies"][0]["message"], "reply");

    let (status, body) = get(&app, &format!("/api/v1/comments/{}/replies", c.id), Some(a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = get(&app, &format!("/api/v1/users/{}/posts", a), Some(a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], p.id.to_string());

    let (status, _) = get(&app, "/api/v1/posts/123456", Some(a)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/api/v1/posts/not-a-number", Some(a)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limit_after_burst() {
    let (state, app) = setup("3").await;
    let a = user(&state, "a").await;
    state.social.create_post(a, "post").await.unwrap();

    for _ in 0..3 {
        let (status, _) = get(&app, "/api/v1/posts", Some(a)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = get(&app, "/api/v1/posts", Some(a)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], 429);
}

#[tokio::test]
async fn test_unparseable_window_uses_defaults() {
    let (state, app) = setup("100").await;
    let a = user(&state, "a").await;
    state.social.create_post(a, "first").await.unwrap();
    state.social.create_post(a, "second").await.unwrap();

    let (status, body) = get(&app, "/api/v1/posts?limit=abc&offset=xyz", Some(a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["content"], "second");

    let (status, body) = get(&app, "/api/v1/posts?limit=1&offset=", Some(a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let db: Arc<dyn SocialDatabase> =
        Arc::new(SqliteDatabase::connect("sqlite::memory:", 1).await.unwrap());
    let config = Config::from_lookup(|_| None).unwrap();
    let state = AppState::with_database(config, db).unwrap();
    let app = Router::new().nest("/api/v1", create_feed_router(state));
    let viewer = Some(EntityId::new(1));

    for uri in ["/api/v1/posts/5", "/api/v1/feed", "/api/v1/posts/5/comments"] {
        let (status, body) = get(&app, uri, viewer).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(body["status"], 500);
        assert_eq!(body["error"], "Internal server error");
    }
}

#[tokio::test]
async fn test_health() {
    let (_, app) = setup("1").await;

    let (status, body) = get(&app, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
