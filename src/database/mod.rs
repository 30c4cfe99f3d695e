/*!
 * Relational store access.
 *
 * - `connection`: shared SQLite handle with async-safe access
 * - `schema`: column discovery and table creation
 * - `source`: ordered source reads and target lookups
 * - `import`: loading a reviewed CSV into a table
 * - `seed`: seeding the city table from the lookup service
 */

pub mod connection;
pub mod import;
pub mod schema;
pub mod seed;
pub mod source;

// Re-export main types
pub use connection::DatabaseConnection;
pub use source::RecordSource;
