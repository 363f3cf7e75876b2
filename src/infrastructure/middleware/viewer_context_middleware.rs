// ViewerContext Middleware - resolves the viewer for every request
// Identity is asserted by an upstream authenticator through the
// `x-viewer-id` header; this layer only parses it and injects the context.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use std::sync::Arc;

use crate::core::EntityId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::ViewerContext;

pub const VIEWER_HEADER: &str = "x-viewer-id";

/// Creates a request-scoped `ViewerContext` and stores it in the request
/// extensions for the `Vc` extractor. Missing or malformed identity is 401.
pub async fn viewer_context_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = extract_viewer_id(request.headers())?;
    let viewer_context = Arc::new(ViewerContext::new(user_id));

    tracing::debug!(
        viewer = %viewer_context.user_id,
        request_id = %viewer_context.request_id,
        "viewer resolved"
    );
    request.extensions_mut().insert(viewer_context);

    Ok(next.run(request).await)
}

fn extract_viewer_id(headers: &HeaderMap) -> AppResult<EntityId> {
    let raw = headers
        .get(VIEWER_HEADER)
        .ok_or_else(|| AppError::Unauthorized("Missing viewer identity".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed viewer identity".to_string()))?;

    let id: EntityId = raw
        .parse()
        .map_err(|_| AppError::Unauthorized("Malformed viewer identity".to_string()))?;
    if !id.is_valid() {
        return Err(AppError::Unauthorized("Malformed viewer identity".to_string()));
    }
    Ok(id)
}
