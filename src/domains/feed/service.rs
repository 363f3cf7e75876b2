// FeedService - viewer-relative read assemblers
// Each operation builds one aggregation query, streams its rows through a
// materializer and returns the nested entities. An empty result is `None`.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::EntityId;
use crate::domains::feed::materializer::Materializer;
use crate::domains::feed::models::{Comment, Post, Reply};
use crate::domains::feed::pagination::{Pagination, Search};
use crate::domains::feed::query_builder::{CommentQuery, PostQuery, ReplyQuery};
use crate::error::AppResult;
use crate::infrastructure::database::SocialDatabase;
use crate::infrastructure::viewer::ViewerContext;

#[derive(Clone)]
pub struct FeedService {
    db: Arc<dyn SocialDatabase>,
}

impl FeedService {
    pub fn new(db: Arc<dyn SocialDatabase>) -> Self {
        Self { db }
    }

    /// Posts by authors the viewer follows, newest first, with comments.
    #[instrument(skip(self, viewer, search), fields(viewer = %viewer.user_id))]
    pub async fn get_feed(
        &self,
        viewer: &ViewerContext,
        pagination: Pagination,
        search: &Search,
    ) -> AppResult<Option<Vec<Post>>> {
        let query = PostQuery::feed(viewer.user_id, pagination, search.clone());
        self.assemble_posts(query).await
    }

    /// Posts by every author, same shape as the feed.
    #[instrument(skip(self, viewer, search), fields(viewer = %viewer.user_id))]
    pub async fn get_posts(
        &self,
        viewer: &ViewerContext,
        pagination: Pagination,
        search: &Search,
    ) -> AppResult<Option<Vec<Post>>> {
        let query = PostQuery::everyone(viewer.user_id, pagination, search.clone());
        self.assemble_posts(query).await
    }

    #[instrument(skip(self, viewer, search), fields(viewer = %viewer.user_id))]
    pub async fn get_posts_by_user(
        &self,
        author: EntityId,
        viewer: &ViewerContext,
        pagination: Pagination,
        search: &Search,
    ) -> AppResult<Option<Vec<Post>>> {
        let query = PostQuery::by_author(author, viewer.user_id, pagination, search.clone());
        self.assemble_posts(query).await
    }

    /// One post with all of its comments.
    #[instrument(skip(self, viewer), fields(viewer = %viewer.user_id))]
    pub async fn get_post_detail(
        &self,
        post_id: EntityId,
        viewer: &ViewerContext,
    ) -> AppResult<Option<Post>> {
        let query = PostQuery::detail(post_id, viewer.user_id);
        let posts = self.assemble_posts(query).await?;
        Ok(posts.and_then(|posts| posts.into_iter().next()))
    }

    /// Comments of a post, oldest first, each with its replies.
    #[instrument(skip(self, viewer), fields(viewer = %viewer.user_id))]
    pub async fn get_comments_by_post(
        &self,
        post_id: EntityId,
        viewer: &ViewerContext,
    ) -> AppResult<Option<Vec<Comment>>> {
        let query = CommentQuery::for_post(post_id, viewer.user_id);

        let mut materializer = Materializer::new();
        self.db.stream_comment_rows(&query, &mut materializer).await?;
        debug!(
            rows = materializer.rows_seen(),
            comments = materializer.len(),
            "comments assembled"
        );
        Ok(materializer.into_non_empty())
    }

    /// Replies of a comment, oldest first. Replies carry no viewer flags.
    #[instrument(skip(self))]
    pub async fn get_replies_by_comment(
        &self,
        comment_id: EntityId,
    ) -> AppResult<Option<Vec<Reply>>> {
        let query = ReplyQuery::for_comment(comment_id);

        let rows = self.db.fetch_reply_rows(&query).await?;
        let replies = rows
            .into_iter()
            .map(|row| row.into_reply())
            .collect::<AppResult<Vec<_>>>()?;
        debug!(replies = replies.len(), "replies assembled");

        if replies.is_empty() {
            Ok(None)
        } else {
            Ok(Some(replies))
        }
    }

    async fn assemble_posts(&self, query: PostQuery) -> AppResult<Option<Vec<Post>>> {
        let mut materializer = Materializer::new();
        self.db.stream_post_rows(&query, &mut materializer).await?;
        debug!(
            scope = ?query.scope(),
            rows = materializer.rows_seen(),
            posts = materializer.len(),
            "posts assembled"
        );
        Ok(materializer.into_non_empty())
    }
}
