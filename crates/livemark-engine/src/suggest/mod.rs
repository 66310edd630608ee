//! Suggestion commit protocol for the `[[` trigger.
//!
//! The search index is an external collaborator reached through
//! [`SearchIndex`]; [`EditorSession`] ties the document, the trigger detector
//! and the block-identity manager together when a suggestion is chosen.

pub mod search;
pub mod session;

pub use search::{MemorySearchIndex, SearchIndex, SearchKind, SearchResult};
pub use session::{Commit, CommitError, DeferredCommit, EditorSession};
