//! Shared utility functions.
//!
//! - [`content_length`] - Content-Range and Content-Length parsing

pub mod content_length;

pub use content_length::{
    header_content_length, parse_content_range, parse_content_range_total, total_size,
    ContentRange,
};
