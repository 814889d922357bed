//! Pure planning and bookkeeping for chunked downloads.
//!
//! Nothing in this module touches the network or the filesystem, so chunk
//! planning, the per-chunk retry state machine and response validation can
//! be tested without any I/O.

mod chunk;
mod range;
mod retry;

pub use chunk::{Chunk, ChunkState, ChunkTask, interleave, plan_chunks};
pub use range::{check_body_length, parse_content_range, range_header, validate_ranged_status};
pub use retry::retry_delay;
