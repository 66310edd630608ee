/*!
 * # Editing Core
 *
 * The note body lives in a single **`xi_rope::Rope`** buffer owned by
 * [`Document`]. Nothing else mutates it.
 *
 * - All edits are **Commands** (`Cmd`) compiled to xi-rope **Deltas** and
 *   applied atomically; each application returns a [`Patch`] with the changed
 *   ranges, the new selection and the new version.
 * - The [`Selection`] is a small ordered set of anchor/head ranges with one
 *   primary range, mapped through every delta.
 * - Asynchronous flows (linking to a block in another note) capture their
 *   target range as a [`PendingInsertion`] and apply it later through
 *   `Document::apply_pending`, which refuses ranges that drifted.
 *
 * Decorations, triggers and block ids only ever read from the document or
 * go through these commands.
 */

pub mod commands;
pub mod document;
pub mod patch;
pub mod pending;
pub mod selection;

pub use commands::Cmd;
pub use document::{Document, IndentStyle};
pub use patch::Patch;
pub use pending::{InsertionError, PendingInsertion};
pub use selection::{Selection, SelectionRange};
