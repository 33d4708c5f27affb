//! ops-core: Shared infrastructure for the operations backend.
pub mod error;
pub mod middleware;
pub mod observability;
pub mod response;

pub use axum;
pub use mongodb;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
pub use validator;
