use uuid::Uuid;

use crate::core::EntityId;

/// The identity on whose behalf a read is performed. Viewer-relative flags
/// (`is_liked_by_viewer`, `is_author_followed_by_viewer`) are computed
/// against `user_id`.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user_id: EntityId,
    pub request_id: String,
}

impl ViewerContext {
    pub fn new(user_id: EntityId) -> Self {
        Self::with_request_id(user_id, format!("req-{}", Uuid::new_v4()))
    }

    pub fn with_request_id(user_id: EntityId, request_id: String) -> Self {
        ViewerContext {
            user_id,
            request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = ViewerContext::new(EntityId::new(1));
        let b = ViewerContext::new(EntityId::new(1));
        assert!(a.request_id.starts_with("req-"));
        assert_ne!(a.request_id, b.request_id);
    }
}
