//! Per-construct decoration handlers.
//!
//! Tree handlers (`block`, `inline`, `link`, `image`, `list`) are reached
//! through the dispatch table; `scan` is the raw-text pass for constructs the
//! parser has no node for.

pub mod block;
pub mod image;
pub mod inline;
pub mod link;
pub mod list;
pub mod scan;
