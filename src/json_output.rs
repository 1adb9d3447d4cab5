//! JSON output for tool integration
//!
//! When --json-progress flag is enabled, all progress and status information
//! is emitted as JSON lines to stdout, suppressing all other output.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::export::ExportResult;

/// Last progress emission timestamp (milliseconds since epoch)
/// Used for throttling progress updates to ~25 FPS (40ms between updates)
static LAST_PROGRESS_MS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonMessage {
    /// Progress update
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    /// File processing completed
    FileCompleted {
        input_path: String,
        output_paths: Vec<String>,
        skipped: Vec<String>,
        processing_time_ms: u128,
    },
    /// File processing failed
    FileFailed { input_path: String, error: String },
    /// Non-fatal condition such as a missing codec
    Warning { message: String },
    /// Processing summary
    Summary {
        total_files: usize,
        processed: usize,
        failed: usize,
        output_dir: String,
        duration_secs: f64,
    },
}

impl JsonMessage {
    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Create and emit progress message (throttled to ~25 FPS)
    ///
    /// The final progress (current == total) is always emitted to ensure 100% completion.
    pub fn progress(current: usize, total: usize, message: impl Into<String>) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let last_ms = LAST_PROGRESS_MS.load(Ordering::Relaxed);

        if now_ms.saturating_sub(last_ms) >= 40 || current == total {
            LAST_PROGRESS_MS.store(now_ms, Ordering::Relaxed);
            Self::Progress {
                current,
                total,
                message: message.into(),
            }
            .emit();
        }
    }

    pub fn file_completed(result: &ExportResult) -> Self {
        Self::FileCompleted {
            input_path: result.input_path.display().to_string(),
            output_paths: result
                .outputs
                .iter()
                .map(|output| output.path.display().to_string())
                .collect(),
            skipped: result
                .skipped
                .iter()
                .map(|skipped| format!("{} ({})", skipped.name, skipped.reason))
                .collect(),
            processing_time_ms: result.duration.as_millis(),
        }
    }

    pub fn file_failed(input_path: &Path, error: &anyhow::Error) -> Self {
        Self::FileFailed {
            input_path: input_path.display().to_string(),
            error: format!("{:#}", error),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    pub fn summary(
        total_files: usize,
        processed: usize,
        failed: usize,
        output_dir: &Path,
        duration_secs: f64,
    ) -> Self {
        Self::Summary {
            total_files,
            processed,
            failed,
            output_dir: output_dir.display().to_string(),
            duration_secs,
        }
    }
}
