//! # Inline scanning
//!
//! Secondary, text-level scanners that run over the leaf regions of the
//! syntax tree. The markdown parser has no notion of wiki-links, so they are
//! found here with a byte cursor; the remaining regex constructs live with the
//! decoration code that consumes them.
//!
//! - **`cursor`**: `Cursor` over one text region, reporting document offsets
//! - **`wikilink`**: `[[target|alias]]` scanner and `WikiTarget` parsing

pub mod cursor;
pub mod wikilink;

pub use wikilink::{WikiLink, WikiTarget, scan_wikilinks};
