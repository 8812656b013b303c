/// Database connection management and schema migrations
pub mod database;

/// Environment-driven application settings
pub mod environment;

/// Supplier seed file loading from config.toml
pub mod suppliers;
