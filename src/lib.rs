// Financials API - Core Library
// Storage, record schemas, handlers and router, shared by the server binary
// and the integration tests

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;

// Re-export commonly used types
pub use config::Config;
pub use db::{Collection, Document, DocumentStore, Filter, Sort, SqliteStore, StoreError, StoreResult};
pub use error::{ApiError, JsonBody};
pub use handlers::AppState;
pub use models::{cast_document, Expense, FieldKind, Record, Revenue, Task};
pub use repository::Repository;
pub use routes::app;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
