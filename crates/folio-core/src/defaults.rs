//! Centralized default constants for folio.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// QUOTA
// =============================================================================

/// Maximum number of projects a single identity may own.
pub const MAX_PROJECTS: usize = 3;

/// Maximum size of a single PDF blob in bytes (10 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum aggregate PDF size per project in bytes (10 MiB).
pub const MAX_PROJECT_SIZE_BYTES: u64 = 10 * 1024 * 1024;

// =============================================================================
// STORAGE
// =============================================================================

/// Bucket that holds uploaded PDF files.
pub const PDF_BUCKET: &str = "pdfs";

/// Content type attached to PDFs reconstructed from storage.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Default directory for the filesystem blob store.
pub const FILE_STORAGE_PATH: &str = "./folio-data/blobs";

/// File name used when a workspace is exported to disk.
pub const EXPORT_FILE_NAME: &str = "pdf-notes-export.json";

// =============================================================================
// WORKSPACE
// =============================================================================

/// Page a fresh workspace starts on.
pub const FIRST_PAGE: u32 = 1;

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// DATABASE
// =============================================================================

/// Default database URL when `DATABASE_URL` is unset.
pub const DATABASE_URL: &str = "postgres://localhost/folio";

/// Default maximum number of pooled connections.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Default connection acquire timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// HTTP
// =============================================================================

/// Default request timeout for hosted storage/auth calls in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_defaults_match_product_limits() {
        const {
            assert!(MAX_PROJECTS == 3);
            assert!(MAX_FILE_SIZE_BYTES == 10_485_760);
            assert!(MAX_PROJECT_SIZE_BYTES >= MAX_FILE_SIZE_BYTES);
        }
    }
}
