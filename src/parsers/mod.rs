// Generation output parsers
//
// - `tags` - the block grammar and resumable marker scanners
// - `stream_decoder` - per-chunk progress tracking while a response streams in
// - `extractor` - final extraction of files and preview from a complete response

pub mod extractor;
pub mod stream_decoder;
pub mod tags;

pub use extractor::{extract_project, FALLBACK_FILE_NAME};
pub use stream_decoder::{ingest, StreamState};
