// CRDT operations the server performs on collab state: reading document
// settings, restoring snapshots and switching editors.

pub mod editor_sync;
pub mod restore;
pub mod security;
pub mod ydoc;

pub use ydoc::YDoc;
