// Social Feed - viewer-relative feed and engagement aggregation

// Core types and primitives
pub mod core;

// Infrastructure - database, id generation, viewer context, middleware
pub mod infrastructure;

// Domain-Driven Organization - feed reads and social graph writes
pub mod domains;

// Storage records
pub mod models;

// Application wiring
pub mod app_state;
pub mod config;
pub mod feed_interface;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
