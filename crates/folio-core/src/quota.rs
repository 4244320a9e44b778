//! Project and file admission rules.
//!
//! Every check here is synchronous and runs before any remote mutation. The
//! free functions use the product defaults; [`QuotaPolicy`] carries the same
//! rules with configurable limits.

use crate::defaults::{MAX_FILE_SIZE_BYTES, MAX_PROJECTS, MAX_PROJECT_SIZE_BYTES};
use crate::error::{Error, Result};

/// Whether another project may be created given the current count.
pub fn can_create_project(existing_project_count: usize) -> bool {
    QuotaPolicy::default().can_create_project(existing_project_count)
}

/// Whether a file of the given size may be admitted.
pub fn can_admit_file(file_byte_size: u64) -> bool {
    QuotaPolicy::default().can_admit_file(file_byte_size)
}

/// Limits applied to projects and uploaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub max_projects: usize,
    pub max_file_bytes: u64,
    pub max_project_bytes: u64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            max_projects: MAX_PROJECTS,
            max_file_bytes: MAX_FILE_SIZE_BYTES,
            max_project_bytes: MAX_PROJECT_SIZE_BYTES,
        }
    }
}

impl QuotaPolicy {
    pub fn can_create_project(&self, existing_project_count: usize) -> bool {
        existing_project_count < self.max_projects
    }

    pub fn can_admit_file(&self, file_byte_size: u64) -> bool {
        file_byte_size <= self.max_file_bytes
    }

    /// Whether a file fits in a project that already holds `current_total` bytes.
    pub fn can_admit_to_project(&self, current_total: u64, file_byte_size: u64) -> bool {
        self.can_admit_file(file_byte_size)
            && current_total.saturating_add(file_byte_size) <= self.max_project_bytes
    }

    pub fn ensure_can_create_project(&self, existing_project_count: usize) -> Result<()> {
        if self.can_create_project(existing_project_count) {
            Ok(())
        } else {
            Err(Error::QuotaExceeded(format!(
                "Maximum limit of {} projects reached",
                self.max_projects
            )))
        }
    }

    pub fn ensure_can_admit_file(&self, file_byte_size: u64) -> Result<()> {
        if self.can_admit_file(file_byte_size) {
            Ok(())
        } else {
            Err(Error::FileTooLarge {
                size: file_byte_size,
                limit: self.max_file_bytes,
            })
        }
    }

    pub fn ensure_can_admit_to_project(&self, current_total: u64, file_byte_size: u64) -> Result<()> {
        self.ensure_can_admit_file(file_byte_size)?;
        if self.can_admit_to_project(current_total, file_byte_size) {
            Ok(())
        } else {
            Err(Error::QuotaExceeded(format!(
                "Project storage exceeds {}",
                format_file_size(self.max_project_bytes)
            )))
        }
    }

    /// Share of the per-project ceiling used, as a percentage clamped to 100.
    pub fn usage_percent(&self, total_size: u64) -> f64 {
        if self.max_project_bytes == 0 {
            return 100.0;
        }
        (total_size as f64 / self.max_project_bytes as f64 * 100.0).min(100.0)
    }
}

/// Human-readable byte size with up to two decimals ("0 B", "1.5 KB", "2 MB").
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
