//! Log stream decoding for dockstream
//!
//! This crate turns the raw byte stream of one container's log tail into
//! structured events: line framing, timestamp prefix parsing, and
//! watermark-based deduplication for resumed tails.

mod cursor;
mod error;
mod stream;
mod timestamp;

pub use cursor::Cursor;
pub use error::DecodeError;
pub use stream::{LogStreamDecoder, MalformedPolicy};

// Re-export types used in our public API
pub use dockstream_types::{CONTAINER_ID_KEY, ExtraMap, LogEvent, TAG_DECODE_FAILED};
