// Pagination window and search filter value objects

use serde::Deserialize;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// A window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    limit: i64,
    offset: i64,
}

impl Pagination {
    /// Limit is clamped to `1..=MAX_LIMIT`, offset to `>= 0`.
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset: offset.max(0),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// The window immediately after this one.
    pub fn next(&self) -> Self {
        Self::new(self.limit, self.offset + self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, 0)
    }
}

/// Case-insensitive substring filter on content. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Search {
    query: String,
}

impl Search {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Lowercased LIKE pattern for the query, matched against lowercased
    /// content with `ESCAPE '\'`. Wildcards typed by the user match literally.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.query.len() + 2);
        pattern.push('%');
        for c in self.query.to_lowercase().chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// Raw `limit`/`offset`/`search` query-string parameters. Defaulting happens
/// here, on the controller side, before the window reaches the assemblers.
/// A `limit` or `offset` that is not an integer falls back to its default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(
            parse_or(self.limit.as_deref(), DEFAULT_LIMIT),
            parse_or(self.offset.as_deref(), 0),
        )
    }

    pub fn search(&self) -> Search {
        Search::new(self.search.clone().unwrap_or_default())
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(default)
}
