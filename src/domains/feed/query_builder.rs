// Aggregation query builder
//
// Every read is one statement: a windowed base set (filtered, ordered and
// paginated before any join), left-joined to per-parent aggregate counts, to
// the viewer's like set and follow set, and to one child level. Absent
// children and absent aggregates come back as NULL / COALESCE(.., 0) so a
// parent row is never dropped by a join.

use sqlx::database::HasArguments;
use sqlx::{Database, Encode, QueryBuilder, Type};

use crate::core::EntityId;
use crate::domains::feed::pagination::{Pagination, Search};

/// Which posts make up the base window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Every post.
    Everyone,
    /// Posts whose author the viewer follows.
    FollowedBy,
    /// Posts by one author.
    Author(EntityId),
    /// Exactly one post, no pagination and no search.
    Single(EntityId),
}

/// The viewer is bound once, into this CTE, and every viewer-relative set
/// selects from it.
const VIEWER_ID: &str = "(SELECT id FROM current_viewer)";

/// Shared projection for every post read: the post with its author,
/// aggregates and viewer flags, plus at most one comment per row with the
/// comment's own author, aggregates and viewer flags.
const POST_PROJECTION: &str = r#"
    p.id AS post_id,
    p.content AS post_content,
    p.created_at AS post_created_at,
    p.updated_at AS post_updated_at,
    pu.id AS post_author_id,
    pu.name AS post_author_name,
    pu.last_name AS post_author_last_name,
    pu.username AS post_author_username,
    COALESCE(plc.total, 0) AS post_like_count,
    COALESCE(pcc.total, 0) AS post_comment_count,
    (vpl.post_id IS NOT NULL) AS post_is_liked,
    (vpf.follow_id IS NOT NULL) AS post_is_following,
    c.id AS comment_id,
    c.post_id AS comment_post_id,
    c.content AS comment_content,
    c.created_at AS comment_created_at,
    c.updated_at AS comment_updated_at,
    cu.id AS comment_author_id,
    cu.name AS comment_author_name,
    cu.last_name AS comment_author_last_name,
    cu.username AS comment_author_username,
    COALESCE(clc.total, 0) AS comment_like_count,
    COALESCE(crc.total, 0) AS comment_reply_count,
    (vcl.comment_id IS NOT NULL) AS comment_is_liked,
    (vcf.follow_id IS NOT NULL) AS comment_is_following"#;

const POST_JOINS: &str = r#"
FROM windowed_posts AS p
JOIN users AS pu ON pu.id = p.user_id
LEFT JOIN post_like_counts AS plc ON plc.post_id = p.id
LEFT JOIN post_comment_counts AS pcc ON pcc.post_id = p.id
LEFT JOIN viewer_post_likes AS vpl ON vpl.post_id = p.id
LEFT JOIN viewer_follows AS vpf ON vpf.follow_id = p.user_id
LEFT JOIN windowed_comments AS c ON c.post_id = p.id
LEFT JOIN users AS cu ON cu.id = c.user_id
LEFT JOIN comment_like_counts AS clc ON clc.comment_id = c.id
LEFT JOIN comment_reply_counts AS crc ON crc.comment_id = c.id
LEFT JOIN viewer_comment_likes AS vcl ON vcl.comment_id = c.id
LEFT JOIN viewer_follows AS vcf ON vcf.follow_id = c.user_id
ORDER BY p.created_at DESC, p.id DESC, c.created_at ASC, c.id ASC"#;

/// Comment projection used when comments are the parent level.
const COMMENT_PROJECTION: &str = r#"
    c.id AS comment_id,
    c.post_id AS comment_post_id,
    c.content AS comment_content,
    c.created_at AS comment_created_at,
    c.updated_at AS comment_updated_at,
    cu.id AS comment_author_id,
    cu.name AS comment_author_name,
    cu.last_name AS comment_author_last_name,
    cu.username AS comment_author_username,
    COALESCE(clc.total, 0) AS comment_like_count,
    COALESCE(crc.total, 0) AS comment_reply_count,
    (vcl.comment_id IS NOT NULL) AS comment_is_liked,
    (vcf.follow_id IS NOT NULL) AS comment_is_following"#;

const REPLY_PROJECTION: &str = r#"
    r.id AS reply_id,
    r.comment_id AS reply_comment_id,
    r.message AS reply_message,
    r.created_at AS reply_created_at,
    r.updated_at AS reply_updated_at,
    ru.id AS reply_author_id,
    ru.name AS reply_author_name,
    ru.last_name AS reply_author_last_name,
    ru.username AS reply_author_username"#;

/// Posts with their comments, aggregates and viewer flags.
#[derive(Debug, Clone)]
pub struct PostQuery {
    scope: PostScope,
    viewer: EntityId,
    pagination: Pagination,
    search: Search,
}

impl PostQuery {
    pub fn feed(viewer: EntityId, pagination: Pagination, search: Search) -> Self {
        Self {
            scope: PostScope::FollowedBy,
            viewer,
            pagination,
            search,
        }
    }

    pub fn everyone(viewer: EntityId, pagination: Pagination, search: Search) -> Self {
        Self {
            scope: PostScope::Everyone,
            viewer,
            pagination,
            search,
        }
    }

    pub fn by_author(
        author: EntityId,
        viewer: EntityId,
        pagination: Pagination,
        search: Search,
    ) -> Self {
        Self {
            scope: PostScope::Author(author),
            viewer,
            pagination,
            search,
        }
    }

    pub fn detail(post_id: EntityId, viewer: EntityId) -> Self {
        Self {
            scope: PostScope::Single(post_id),
            viewer,
            pagination: Pagination::default(),
            search: Search::default(),
        }
    }

    pub fn scope(&self) -> PostScope {
        self.scope
    }

    /// Statement for this read, with every value pushed as a bind.
    pub fn build<'args, DB>(&self) -> QueryBuilder<'args, DB>
    where
        DB: Database,
        <DB as HasArguments<'args>>::Arguments: Default,
        i64: Encode<'args, DB> + Type<DB>,
        String: Encode<'args, DB> + Type<DB>,
    {
        let mut qb = QueryBuilder::new("WITH current_viewer AS (SELECT ");
        qb.push_bind(self.viewer.value());
        qb.push(
            r#" AS id),
windowed_posts AS (
    SELECT id, user_id, content, created_at, updated_at
    FROM posts
    WHERE "#,
        );

        match self.scope {
            PostScope::Single(post_id) => {
                qb.push("id = ");
                qb.push_bind(post_id.value());
                qb.push("\n    ORDER BY created_at DESC, id DESC");
            }
            scope => {
                // search_text holds the lowercased content
                qb.push("search_text LIKE ");
                qb.push_bind(self.search.like_pattern());
                qb.push(" ESCAPE '\\'");
                match scope {
                    PostScope::FollowedBy => {
                        qb.push("\n      AND user_id IN (SELECT follow_id FROM follows WHERE user_id = ");
                        qb.push(VIEWER_ID);
                        qb.push(")");
                    }
                    PostScope::Author(author) => {
                        qb.push("\n      AND user_id = ");
                        qb.push_bind(author.value());
                    }
                    _ => {}
                }
                qb.push("\n    ORDER BY created_at DESC, id DESC\n    LIMIT ");
                qb.push_bind(self.pagination.limit());
                qb.push(" OFFSET ");
                qb.push_bind(self.pagination.offset());
            }
        }

        qb.push(
            r#"
),
post_like_counts AS (
    SELECT post_id, COUNT(*) AS total FROM post_likes
    WHERE post_id IN (SELECT id FROM windowed_posts)
    GROUP BY post_id
),
post_comment_counts AS (
    SELECT post_id, COUNT(*) AS total FROM comments
    WHERE post_id IN (SELECT id FROM windowed_posts)
    GROUP BY post_id
),
windowed_comments AS (
    SELECT id, post_id, user_id, content, created_at, updated_at FROM comments
    WHERE post_id IN (SELECT id FROM windowed_posts)
),
comment_like_counts AS (
    SELECT comment_id, COUNT(*) AS total FROM comment_likes
    WHERE comment_id IN (SELECT id FROM windowed_comments)
    GROUP BY comment_id
),
comment_reply_counts AS (
    SELECT comment_id, COUNT(*) AS total FROM replies
    WHERE comment_id IN (SELECT id FROM windowed_comments)
    GROUP BY comment_id
),"#,
        );
        push_viewer_sets(&mut qb, true);
        qb.push("\nSELECT");
        qb.push(POST_PROJECTION);
        qb.push(POST_JOINS);
        qb
    }
}

/// Appends the viewer's like and follow sets, closing the `WITH` list.
fn push_viewer_sets<DB: Database>(qb: &mut QueryBuilder<'_, DB>, post_likes: bool) {
    if post_likes {
        qb.push("\nviewer_post_likes AS (\n    SELECT post_id FROM post_likes WHERE user_id = ");
        qb.push(VIEWER_ID);
        qb.push("\n),");
    }
    qb.push("\nviewer_comment_likes AS (\n    SELECT comment_id FROM comment_likes WHERE user_id = ");
    qb.push(VIEWER_ID);
    qb.push("\n),\nviewer_follows AS (\n    SELECT follow_id FROM follows WHERE user_id = ");
    qb.push(VIEWER_ID);
    qb.push("\n)");
}

/// All comments of one post, each with aggregates, viewer flags and replies.
#[derive(Debug, Clone, Copy)]
pub struct CommentQuery {
    post_id: EntityId,
    viewer: EntityId,
}

impl CommentQuery {
    pub fn for_post(post_id: EntityId, viewer: EntityId) -> Self {
        Self { post_id, viewer }
    }

    pub fn build<'args, DB>(&self) -> QueryBuilder<'args, DB>
    where
        DB: Database,
        <DB as HasArguments<'args>>::Arguments: Default,
        i64: Encode<'args, DB> + Type<DB>,
    {
        let mut qb = QueryBuilder::new("WITH current_viewer AS (SELECT ");
        qb.push_bind(self.viewer.value());
        qb.push(
            r#" AS id),
post_comments AS (
    SELECT id, post_id, user_id, content, created_at, updated_at FROM comments
    WHERE post_id = "#,
        );
        qb.push_bind(self.post_id.value());
        qb.push(
            r#"
),
comment_like_counts AS (
    SELECT comment_id, COUNT(*) AS total FROM comment_likes
    WHERE comment_id IN (SELECT id FROM post_comments)
    GROUP BY comment_id
),
comment_reply_counts AS (
    SELECT comment_id, COUNT(*) AS total FROM replies
    WHERE comment_id IN (SELECT id FROM post_comments)
    GROUP BY comment_id
),"#,
        );
        push_viewer_sets(&mut qb, false);
        qb.push("\nSELECT");
        qb.push(COMMENT_PROJECTION);
        qb.push(",");
        qb.push(REPLY_PROJECTION);
        qb.push(
            r#"
FROM post_comments AS c
JOIN users AS cu ON cu.id = c.user_id
LEFT JOIN comment_like_counts AS clc ON clc.comment_id = c.id
LEFT JOIN comment_reply_counts AS crc ON crc.comment_id = c.id
LEFT JOIN viewer_comment_likes AS vcl ON vcl.comment_id = c.id
LEFT JOIN viewer_follows AS vcf ON vcf.follow_id = c.user_id
LEFT JOIN replies AS r ON r.comment_id = c.id
LEFT JOIN users AS ru ON ru.id = r.user_id
ORDER BY c.created_at ASC, c.id ASC, r.created_at ASC, r.id ASC"#,
        );
        qb
    }
}

/// Replies of one comment with their authors. Replies are terminal: no
/// aggregates, no viewer flags.
#[derive(Debug, Clone, Copy)]
pub struct ReplyQuery {
    comment_id: EntityId,
}

impl ReplyQuery {
    pub fn for_comment(comment_id: EntityId) -> Self {
        Self { comment_id }
    }

    pub fn build<'args, DB>(&self) -> QueryBuilder<'args, DB>
    where
        DB: Database,
        <DB as HasArguments<'args>>::Arguments: Default,
        i64: Encode<'args, DB> + Type<DB>,
    {
        let mut qb = QueryBuilder::new("SELECT");
        qb.push(REPLY_PROJECTION);
        qb.push("\nFROM replies AS r\nJOIN users AS ru ON ru.id = r.user_id\nWHERE r.comment_id = ");
        qb.push_bind(self.comment_id.value());
        qb.push("\nORDER BY r.created_at ASC, r.id ASC");
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Postgres, Sqlite};

    fn viewer() -> EntityId {
        EntityId::new(10)
    }

    #[test]
    fn test_feed_query_windows_before_joining() {
        let qb = PostQuery::feed(viewer(), Pagination::new(5, 10), Search::new("hi"))
            .build::<Postgres>();
        let sql = qb.sql();

        let window_end = sql.find("post_like_counts AS").unwrap();
        let limit_at = sql.find("LIMIT $3 OFFSET $4").unwrap();
        assert!(limit_at < window_end, "pagination must apply inside the base window");
        assert!(sql.starts_with("WITH current_viewer AS (SELECT $1 AS id)"));
        assert!(sql.contains("search_text LIKE $2 ESCAPE '\\'"));
        assert!(sql.contains(
            "user_id IN (SELECT follow_id FROM follows WHERE user_id = (SELECT id FROM current_viewer))"
        ));
        assert!(!sql.contains("$5"));
    }

    #[test]
    fn test_viewer_bound_once_and_reused() {
        let qb = PostQuery::everyone(viewer(), Pagination::default(), Search::default())
            .build::<Sqlite>();
        let sql = qb.sql();

        assert_eq!(sql.matches("WHERE user_id = (SELECT id FROM current_viewer)").count(), 3);
        assert!(!sql.contains("user_id IN (SELECT follow_id"));
        // viewer, pattern, limit, offset
        assert_eq!(sql.matches('?').count(), 4);
    }

    #[test]
    fn test_author_scope() {
        let qb = PostQuery::by_author(
            EntityId::new(99),
            viewer(),
            Pagination::default(),
            Search::default(),
        )
        .build::<Postgres>();

        assert!(qb.sql().contains("AND user_id = $3"));
        assert!(qb.sql().contains("LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn test_detail_query_has_no_window_or_search() {
        let qb = PostQuery::detail(EntityId::new(7), viewer()).build::<Postgres>();
        let sql = qb.sql();

        assert!(sql.contains("WHERE id = $2"));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("LIKE"));
        assert!(!sql.contains("$3"));
    }

    #[test]
    fn test_post_ordering_is_stable() {
        let qb = PostQuery::everyone(viewer(), Pagination::default(), Search::default())
            .build::<Postgres>();

        assert!(qb.sql().contains("ORDER BY created_at DESC, id DESC"));
        assert!(qb
            .sql()
            .ends_with("ORDER BY p.created_at DESC, p.id DESC, c.created_at ASC, c.id ASC"));
    }

    #[test]
    fn test_children_are_left_joined() {
        let qb = PostQuery::everyone(viewer(), Pagination::default(), Search::default())
            .build::<Postgres>();

        for join in [
            "LEFT JOIN windowed_comments AS c",
            "LEFT JOIN users AS cu",
            "LEFT JOIN post_like_counts AS plc",
            "LEFT JOIN viewer_post_likes AS vpl",
            "LEFT JOIN viewer_follows AS vpf",
        ] {
            assert!(qb.sql().contains(join), "missing {}", join);
        }
        assert!(qb.sql().contains("COALESCE(plc.total, 0) AS post_like_count"));
    }

    #[test]
    fn test_comment_query() {
        let qb = CommentQuery::for_post(EntityId::new(3), viewer()).build::<Postgres>();
        let sql = qb.sql();

        assert!(sql.starts_with("WITH current_viewer AS (SELECT $1 AS id)"));
        assert!(sql.contains("WHERE post_id = $2"));
        assert!(sql.contains("comment_likes WHERE user_id = (SELECT id FROM current_viewer)"));
        assert!(!sql.contains("viewer_post_likes"));
        assert!(sql.contains("LEFT JOIN users AS ru ON ru.id = r.user_id"));
    }

    #[test]
    fn test_reply_query() {
        let qb = ReplyQuery::for_comment(EntityId::new(4)).build::<Sqlite>();

        assert!(qb.sql().contains("WHERE r.comment_id = ?"));
        assert!(qb.sql().ends_with("ORDER BY r.created_at ASC, r.id ASC"));
    }
}
