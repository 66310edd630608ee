pub mod assets;
pub mod block_id;
pub mod decorate;
pub mod editing;
pub mod models;
pub mod store;
pub mod suggest;
pub mod syntax;
pub mod trigger;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use assets::{AssetPipeline, ImagePlacement, ImageState, ImageWidget, RenderRequest};
pub use block_id::{BlockId, BlockIdError, BlockLabelCache, ensure_block_id};
pub use decorate::{Decoration, DecorationContext, DecorationKind, DecorationSet, resolve};
pub use editing::{Cmd, Document, Patch, Selection, SelectionRange};
pub use models::NoteRef;
pub use trigger::{Trigger, TriggerDetector, TriggerState, detect};
