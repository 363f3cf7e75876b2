// Core infrastructure modules
pub mod database;        // Database interface and PostgreSQL implementation
pub mod sqlite_database; // SQLite implementation (in-memory testing, local runs)
pub mod id_generator;    // Snowflake id generation
pub mod viewer;          // Viewer context
pub mod middleware;      // Viewer resolution and rate limiting

pub use database::{connect_database, PostgresDatabase, SocialDatabase};
pub use id_generator::IdGenerator;
pub use sqlite_database::SqliteDatabase;
pub use viewer::ViewerContext;
