//! REST API implementation
//!
//! - types: shared state and response types
//! - extractors: JSON extractor with server-shaped rejections
//! - handlers: endpoint handlers
//! - router: route table and layers

mod extractors;
mod handlers;
mod router;
pub mod types;

pub use extractors::JsonExtractor;
pub use router::create_router;
pub use types::{AppState, HealthResponse, ModelsResponse, SignedQuery, UploadResponse};
