// Social Feed Server - read API over the aggregation engine

use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use social_feed::{app_state::AppState, config::Config, feed_interface::create_feed_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("social_feed=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let address = config.server_address();

    let app_state = AppState::new(config).await?;

    let app = Router::new()
        .nest("/api/v1", create_feed_router(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&address).await?;
    info!("Social feed server listening on http://{}", listener.local_addr()?);
    info!("  GET /api/v1/feed                    - Posts by followed authors");
    info!("  GET /api/v1/posts                   - All posts");
    info!("  GET /api/v1/posts/{{id}}              - Post with comments");
    info!("  GET /api/v1/posts/{{id}}/comments     - Comments with replies");
    info!("  GET /api/v1/users/{{id}}/posts        - Posts by one author");
    info!("  GET /api/v1/comments/{{id}}/replies   - Replies of a comment");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
