//! # folio-core
//!
//! Core types, traits, and abstractions for folio.
//!
//! This crate holds the data model for a PDF annotation session (notes and a
//! mind-map graph), the quota rules for persisted projects, the storage
//! traits the sync layer is written against, and the in-memory [`Workspace`]
//! that an editing session mutates. Nothing in here performs I/O.

pub mod defaults;
pub mod error;
pub mod events;
pub mod exchange;
pub mod logging;
pub mod models;
pub mod quota;
pub mod traits;
pub mod workspace;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, EventEnvelope, StoreEvent, StoreKind};
pub use exchange::WorkspaceExport;
pub use models::*;
pub use quota::{can_admit_file, can_create_project, format_file_size, QuotaPolicy};
pub use traits::*;
pub use workspace::{Workspace, WorkspaceSnapshot};

/// Generate a new UUIDv7 identifier for server-side rows.
#[inline]
pub fn new_v7() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
