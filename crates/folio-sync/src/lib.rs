//! # folio-sync
//!
//! Moves workspace snapshots between the in-memory [`Workspace`](folio_core::Workspace)
//! and a persisted project.
//!
//! - [`SyncEngine`]: full-snapshot save, load and cascading delete
//! - [`ProjectDirectory`]: the identity's project list with quota-checked creation
//! - [`App`]: workspace, directory and engine wired to one event bus

pub mod app;
pub mod directory;
pub mod engine;

pub use app::App;
pub use directory::ProjectDirectory;
pub use engine::{storage_key, SyncEngine, SyncSummary};
