//! Visreg: visual regression snapshots for browser test suites
//!
//! A test captures a screenshot and either stores it as the reference
//! ("base") image or compares it against the stored base. Comparison is a
//! perceptual per-pixel diff; the mismatch ratio is checked against an
//! error threshold and an annotated diff image can be written next to the
//! base tree.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   task    ┌──────────────────────────────────────┐
//! │ SnapshotCommand   │──────────►│ SnapshotEngine                       │
//! │ ScreenshotCapture │ transport │  PathResolver → codec → normalize    │
//! │ SnapshotOptions   │◄──────────│  → pixel diff → decision → diff PNG  │
//! └───────────────────┘  result   └──────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use visreg::{ComparisonRequest, SnapshotEngine};
//!
//! # async fn run() -> visreg::VisregResult<()> {
//! let engine = SnapshotEngine::from_current_dir()?;
//! let request = ComparisonRequest::new("home.spec", "header", "/tmp/shots/header.png")
//!     .with_error_threshold(0.05);
//! let result = engine.compare_snapshots(&request).await?;
//! println!("{} pixels differ", result.mismatched_pixels);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod codec;
mod command;
mod compare;
mod config;
mod engine;
mod envelope;
mod logging;
mod paths;
mod pixel_diff;
mod prune;
mod raster;
mod result;
mod task;
mod update;

pub use codec::{decode, decode_bytes, encode, encode_bytes, ensure_dir};
pub use command::{
    CaptureOptions, CapturedScreenshot, ScreenshotCapture, SnapshotCommand, SnapshotOutcome,
};
pub use compare::{
    compare_snapshots, mismatch_percentage, threshold_message, ComparisonRequest,
    ComparisonResult,
};
pub use config::{
    CompareArgs, ComparisonMode, DiffPolicy, SnapshotOptions, SnapshotOverrides,
    ENV_BASE_DIRECTORY, ENV_DIFF_DIRECTORY, ENV_ERROR_THRESHOLD, ENV_FAIL_SILENTLY,
    ENV_GENERATE_DIFF, ENV_TYPE,
};
pub use engine::SnapshotEngine;
pub use envelope::{ErrorEnvelope, ErrorKind};
pub use logging::{Logger, LoggingConfig, ENV_LOG};
pub use paths::{
    check_spec_path, sanitize, sanitize_name, PathResolver, SnapshotKind, DEFAULT_BASE_DIR,
    DEFAULT_DIFF_DIR, SNAPSHOT_EXTENSION,
};
pub use pixel_diff::{diff, diff_images, DiffOptions, PixelDiff, MAX_YIQ_DELTA};
pub use prune::{prune_upward, prune_upward_until};
pub use raster::{normalize, target_size, RasterImage, CHANNELS};
pub use result::{VisregError, VisregResult};
pub use task::{
    call as call_task, LocalTransport, TaskReply, TaskTransport, COMPARE_SNAPSHOTS, TASK_NAMES,
    UPDATE_SNAPSHOT,
};
pub use update::{
    relocate_from_common_root, strip_common_root, update_snapshot, UpdateRequest, UpdateResult,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::command::*;
    pub use super::compare::{ComparisonRequest, ComparisonResult};
    pub use super::config::*;
    pub use super::engine::*;
    pub use super::envelope::*;
    pub use super::logging::*;
    pub use super::result::*;
    pub use super::task::{LocalTransport, TaskReply, TaskTransport};
    pub use super::update::{UpdateRequest, UpdateResult};
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_exposes_host_surface() {
        let options = SnapshotOptions::new().with_mode(ComparisonMode::Base);
        assert_eq!(options.mode.to_string(), "base");
        assert!(!Logger::default().is_verbose());
        assert_eq!(
            ErrorEnvelope::from(VisregError::invalid_payload("x")).kind,
            ErrorKind::InvalidPayload
        );
    }

    #[test]
    fn test_task_names_are_camel_case() {
        assert_eq!(super::TASK_NAMES, ["compareSnapshots", "updateSnapshot"]);
    }
}
