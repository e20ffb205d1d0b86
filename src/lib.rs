// Module declarations
pub mod config;
pub mod events;
pub mod files;
pub mod models;
pub mod parsers;
pub mod session;
pub mod utils;

// Re-export models and the main entry points
pub use files::{collection_key, merge, normalize};
pub use models::*;
pub use parsers::{extract_project, ingest, StreamState};
pub use session::{apply_to_collection, CancelHandle, GenerationError, GenerationSession, TransportError};
