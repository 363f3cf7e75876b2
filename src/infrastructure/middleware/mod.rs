// Request middleware: viewer identity and rate limiting

pub mod rate_limiter;
pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use rate_limiter::{rate_limit_middleware, RateLimiter};
pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::{viewer_context_middleware, VIEWER_HEADER};
