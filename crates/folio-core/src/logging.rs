//! Structured logging field name constants for folio.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed and the failure was surfaced to the caller |
//! | WARN  | Recoverable issue (orphaned blob, skipped cleanup) |
//! | INFO  | Lifecycle events, completed save/load/delete |
//! | DEBUG | Per-step progress inside a protocol |
//! | TRACE | Per-row detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "sync", "directory", "db", "storage", "auth", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "save", "load", "delete", "fetch_projects"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Project UUID being operated on.
pub const PROJECT_ID: &str = "project_id";

/// Acting user UUID.
pub const USER_ID: &str = "user_id";

/// Blob storage key.
pub const STORAGE_PATH: &str = "storage_path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of notes written or read.
pub const NOTE_COUNT: &str = "note_count";

/// Number of mind-map nodes written or read.
pub const NODE_COUNT: &str = "node_count";

/// Number of mind-map edges written or read.
pub const EDGE_COUNT: &str = "edge_count";

/// Byte size of a file.
pub const FILE_SIZE: &str = "file_size";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
