//! # Syntax Tree Provider
//!
//! Turns document text into a read-only syntax tree for one decoration pass.
//! Block and inline structure comes from `pulldown-cmark`; this module only
//! adapts its offset events into owned nodes with byte spans, and adds the
//! line index and text-region helpers the resolver needs.
//!
//! - **`span`**: `Span` byte ranges
//! - **`lines`**: `LineIndex` offset-to-line lookup
//! - **`tree`**: `parse()`, `SyntaxTree`, `SyntaxNode`, `NodeKind`
//! - **`regions`**: leaf text-bearing regions for the regex pass
//! - **`inline`**: wiki-link scanning over raw text

pub mod inline;
pub mod lines;
pub mod regions;
pub mod span;
pub mod tree;

pub use lines::{LineIndex, LineSpan};
pub use regions::text_regions;
pub use span::Span;
pub use tree::{LinkKind, NodeKind, SyntaxNode, SyntaxTree, parse};
