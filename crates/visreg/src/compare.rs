//! Snapshot comparison: load base and actual, diff them, decide, and
//! optionally persist the diff image.

use crate::codec;
use crate::config::{DiffPolicy, SnapshotOptions};
use crate::envelope::{ErrorEnvelope, ErrorKind};
use crate::paths::{sanitize_name, PathResolver, SnapshotKind};
use crate::pixel_diff::{self, DiffOptions, PixelDiff};
use crate::raster::{normalize, target_size};
use crate::result::{VisregError, VisregResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// One comparison of a fresh screenshot against its stored base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequest {
    /// Spec-relative directory the snapshot belongs to
    pub spec_path: PathBuf,
    /// Snapshot name before sanitisation
    pub name: String,
    /// Absolute path of the captured screenshot
    pub actual_path: PathBuf,
    /// Largest acceptable mismatch percentage (0.0-1.0)
    #[serde(default)]
    pub error_threshold: f64,
    /// Base root override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_directory: Option<PathBuf>,
    /// Diff root override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_directory: Option<PathBuf>,
    /// When to write the diff image
    #[serde(default)]
    pub generate_diff: DiffPolicy,
    /// Per-pixel sensitivity (0.0-1.0)
    #[serde(default = "default_pixel_threshold")]
    pub pixel_threshold: f64,
    /// Count anti-aliased pixels as mismatches
    #[serde(default)]
    pub include_anti_aliasing: bool,
}

fn default_pixel_threshold() -> f64 {
    DiffOptions::default().threshold
}

impl ComparisonRequest {
    /// Request with default thresholds and roots
    #[must_use]
    pub fn new(
        spec_path: impl Into<PathBuf>,
        name: impl Into<String>,
        actual_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            spec_path: spec_path.into(),
            name: name.into(),
            actual_path: actual_path.into(),
            error_threshold: 0.0,
            base_directory: None,
            diff_directory: None,
            generate_diff: DiffPolicy::default(),
            pixel_threshold: default_pixel_threshold(),
            include_anti_aliasing: false,
        }
    }

    /// Take thresholds, roots and policy from `options`
    #[must_use]
    pub fn with_options(mut self, options: &SnapshotOptions) -> Self {
        self.error_threshold = options.error_threshold;
        self.base_directory.clone_from(&options.base_directory);
        self.diff_directory.clone_from(&options.diff_directory);
        self.generate_diff = options.generate_diff;
        self.pixel_threshold = options.pixel_threshold;
        self.include_anti_aliasing = options.include_anti_aliasing;
        self
    }

    /// Set the error threshold
    #[must_use]
    pub const fn with_error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = threshold;
        self
    }

    /// Set the diff policy
    #[must_use]
    pub const fn with_generate_diff(mut self, policy: DiffPolicy) -> Self {
        self.generate_diff = policy;
        self
    }

    /// Set the base root
    #[must_use]
    pub fn with_base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_directory = Some(dir.into());
        self
    }

    /// Set the diff root
    #[must_use]
    pub fn with_diff_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diff_directory = Some(dir.into());
        self
    }

    fn diff_options(&self) -> DiffOptions {
        DiffOptions::default()
            .with_threshold(self.pixel_threshold)
            .with_include_anti_aliasing(self.include_anti_aliasing)
    }

    fn validate(&self) -> VisregResult<()> {
        SnapshotOptions::new()
            .with_error_threshold(self.error_threshold)
            .with_pixel_threshold(self.pixel_threshold)
            .validate()
    }
}

/// Outcome of a comparison
///
/// A threshold failure is data, not an `Err`: `error` is set and the
/// metrics are still reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Pixels that differ beyond the per-pixel sensitivity
    pub mismatched_pixels: u64,
    /// `sqrt(mismatched / canvas pixels)`
    pub percentage: f64,
    /// Threshold failure, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    /// Where the diff image was written, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_path: Option<PathBuf>,
}

impl ComparisonResult {
    /// Whether the comparison stayed within its threshold
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Threshold failure as an error, with the diff location appended
    #[must_use]
    pub fn failure(&self) -> Option<VisregError> {
        let envelope = self.error.as_ref()?;
        let message = match &self.diff_path {
            Some(path) => format!("{}\nDiff image: {}", envelope.message, path.display()),
            None => envelope.message.clone(),
        };
        Some(VisregError::ThresholdExceeded { message })
    }
}

/// Square-root-scaled mismatch ratio
///
/// Thresholds are tuned to this scale, so a linear ratio must not be
/// substituted. An empty canvas has no mismatch.
#[must_use]
pub fn mismatch_percentage(mismatched_pixels: u64, width: u32, height: u32) -> f64 {
    let total = u64::from(width) * u64::from(height);
    if total == 0 {
        return 0.0;
    }
    (mismatched_pixels as f64 / total as f64).sqrt()
}

/// Failure message for a comparison over its threshold
#[must_use]
pub fn threshold_message(name: &str, threshold: f64, percentage: f64) -> String {
    format!(
        "The \"{name}\" image is different. Threshold limit exceeded!\nExpected: {threshold}\nActual: {percentage}"
    )
}

/// Compare `request.actual_path` against its base image
///
/// A missing base is [`VisregError::NotFound`] naming the expected base path.
/// Decode and filesystem errors propagate unchanged.
pub async fn compare_snapshots(
    resolver: &PathResolver,
    request: &ComparisonRequest,
) -> VisregResult<ComparisonResult> {
    request.validate()?;

    let name = sanitize_name(&request.name)?;
    let base_path = resolver.resolve(
        SnapshotKind::Base,
        request.base_directory.as_deref(),
        &request.spec_path,
        &name,
    )?;
    let diff_path = resolver.resolve(
        SnapshotKind::Diff,
        request.diff_directory.as_deref(),
        &request.spec_path,
        &name,
    )?;
    debug!(
        base = %base_path.display(),
        actual = %request.actual_path.display(),
        "comparing snapshot"
    );

    let (base, actual) = tokio::join!(
        codec::decode(&base_path),
        codec::decode(&request.actual_path)
    );
    // A missing or broken base is reported ahead of any actual-side error.
    let base = base?;
    let actual = actual?;

    let (width, height) = target_size(&base, &actual);
    if base.dimensions() != actual.dimensions() {
        debug!(
            base = ?base.dimensions(),
            actual = ?actual.dimensions(),
            "padding to common canvas {width}x{height}"
        );
    }
    let actual_canvas = normalize(&actual, width, height);
    let base_canvas = normalize(&base, width, height);

    let PixelDiff {
        mismatched_pixels,
        diff_image,
    } = pixel_diff::diff(
        actual_canvas.as_bytes(),
        base_canvas.as_bytes(),
        width,
        height,
        &request.diff_options(),
    )?;

    let percentage = mismatch_percentage(mismatched_pixels, width, height);
    let failed = percentage > request.error_threshold;
    debug!(mismatched_pixels, percentage, failed, "compared snapshot");

    let error = failed.then(|| {
        warn!(
            name = %name,
            threshold = request.error_threshold,
            percentage,
            "snapshot threshold exceeded"
        );
        ErrorEnvelope::new(
            ErrorKind::ThresholdExceeded,
            threshold_message(&name, request.error_threshold, percentage),
        )
    });

    let diff_path = if request.generate_diff.should_write(failed) {
        codec::encode(&diff_image, &diff_path).await?;
        info!(path = %diff_path.display(), "wrote diff image");
        Some(diff_path)
    } else {
        None
    };

    Ok(ComparisonResult {
        mismatched_pixels,
        percentage,
        error,
        diff_path,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::raster::RasterImage;
    use std::path::Path;
    use tempfile::TempDir;

    pub(crate) const WHITE: [u8; 4] = [255, 255, 255, 255];
    pub(crate) const BLACK: [u8; 4] = [0, 0, 0, 255];

    pub(crate) fn write_png(path: &Path, raster: &RasterImage) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, codec::encode_bytes(raster).unwrap()).unwrap();
    }

    /// 10x10 white image with row 5 painted black: 10% of pixels differ.
    pub(crate) fn ten_percent_changed() -> RasterImage {
        let mut img = RasterImage::filled(10, 10, WHITE);
        for x in 0..10 {
            img.put_pixel(x, 5, BLACK);
        }
        img
    }

    struct Fixture {
        temp: TempDir,
        resolver: PathResolver,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let resolver = PathResolver::new(temp.path());
            Self { temp, resolver }
        }

        fn base_path(&self) -> PathBuf {
            self.temp.path().join("snapshots/base/home.spec/hero.png")
        }

        fn diff_path(&self) -> PathBuf {
            self.temp.path().join("snapshots/diff/home.spec/hero.png")
        }

        fn actual_path(&self) -> PathBuf {
            self.temp.path().join("screenshots/home.spec/hero.png")
        }

        fn with_images(self, base: &RasterImage, actual: &RasterImage) -> Self {
            write_png(&self.base_path(), base);
            write_png(&self.actual_path(), actual);
            self
        }

        fn request(&self) -> ComparisonRequest {
            ComparisonRequest::new("home.spec", "hero", self.actual_path())
        }
    }

    mod percentage_tests {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn test_square_root_scale() {
            assert_eq!(mismatch_percentage(0, 10, 10), 0.0);
            assert!((mismatch_percentage(10, 10, 10) - 0.1f64.sqrt()).abs() < 1e-12);
            assert!((mismatch_percentage(100, 10, 10) - 1.0).abs() < 1e-12);
            assert_eq!(mismatch_percentage(0, 0, 0), 0.0);
        }

        #[test]
        fn test_threshold_message_format() {
            assert_eq!(
                threshold_message("hero", 0.05, 0.5),
                "The \"hero\" image is different. Threshold limit exceeded!\nExpected: 0.05\nActual: 0.5"
            );
        }

        proptest! {
            #[test]
            fn prop_percentage_monotonic(
                w in 1u32..200,
                h in 1u32..200,
                a in 0u64..40_000,
                b in 0u64..40_000
            ) {
                let total = u64::from(w) * u64::from(h);
                let (lo, hi) = (a.min(b).min(total), a.max(b).min(total));
                prop_assert!(mismatch_percentage(lo, w, h) <= mismatch_percentage(hi, w, h));
            }
        }
    }

    mod scenario_tests {
        use super::*;

        #[tokio::test]
        async fn test_identical_passes_without_diff() {
            let img = RasterImage::filled(10, 10, [30, 60, 90, 255]);
            let fx = Fixture::new().with_images(&img, &img);
            let request = fx
                .request()
                .with_error_threshold(0.0)
                .with_generate_diff(DiffPolicy::Fail);

            let result = compare_snapshots(&fx.resolver, &request).await.unwrap();

            assert!(result.is_success());
            assert_eq!(result.mismatched_pixels, 0);
            assert_eq!(result.percentage, 0.0);
            assert!(result.diff_path.is_none());
            assert!(!fx.diff_path().exists());
        }

        #[tokio::test]
        async fn test_over_threshold_fails_and_writes_diff() {
            let base = RasterImage::filled(10, 10, WHITE);
            let fx = Fixture::new().with_images(&base, &ten_percent_changed());
            let request = fx
                .request()
                .with_error_threshold(0.05)
                .with_generate_diff(DiffPolicy::Fail);

            let result = compare_snapshots(&fx.resolver, &request).await.unwrap();

            assert!(!result.is_success());
            assert_eq!(result.mismatched_pixels, 10);
            assert!((result.percentage - 0.1f64.sqrt()).abs() < 1e-12);
            let error = result.error.as_ref().unwrap();
            assert_eq!(error.kind, ErrorKind::ThresholdExceeded);
            assert!(error.message.contains("\"hero\""));
            assert!(error.message.contains("Expected: 0.05"));
            assert_eq!(result.diff_path, Some(fx.diff_path()));
            assert!(fx.diff_path().exists());

            let diff = codec::decode(&fx.diff_path()).await.unwrap();
            assert_eq!(diff.pixel(3, 5), Some([255, 0, 0, 255]));
        }

        #[tokio::test]
        async fn test_over_threshold_never_policy_skips_diff() {
            let base = RasterImage::filled(10, 10, WHITE);
            let fx = Fixture::new().with_images(&base, &ten_percent_changed());
            let request = fx
                .request()
                .with_error_threshold(0.05)
                .with_generate_diff(DiffPolicy::Never);

            let result = compare_snapshots(&fx.resolver, &request).await.unwrap();

            assert!(!result.is_success());
            assert!(result.diff_path.is_none());
            assert!(!fx.diff_path().exists());
        }

        #[tokio::test]
        async fn test_within_threshold_always_policy_writes_diff() {
            let base = RasterImage::filled(10, 10, WHITE);
            let fx = Fixture::new().with_images(&base, &ten_percent_changed());
            let request = fx
                .request()
                .with_error_threshold(0.5)
                .with_generate_diff(DiffPolicy::Always);

            let result = compare_snapshots(&fx.resolver, &request).await.unwrap();

            assert!(result.is_success());
            assert_eq!(result.mismatched_pixels, 10);
            assert!(fx.diff_path().exists());
        }

        #[tokio::test]
        async fn test_missing_base_is_not_found() {
            let fx = Fixture::new();
            write_png(&fx.actual_path(), &RasterImage::filled(4, 4, WHITE));

            let err = compare_snapshots(&fx.resolver, &fx.request())
                .await
                .unwrap_err();

            assert!(err.is_not_found());
            assert!(err
                .to_string()
                .contains(&fx.base_path().display().to_string()));
            assert!(!fx.diff_path().exists());
        }
    }

    mod edge_case_tests {
        use super::*;

        #[tokio::test]
        async fn test_different_sizes_compare_on_padded_canvas() {
            let fx = Fixture::new().with_images(
                &RasterImage::filled(10, 10, BLACK),
                &RasterImage::filled(10, 12, BLACK),
            );
            let request = fx.request().with_error_threshold(1.0);

            let result = compare_snapshots(&fx.resolver, &request).await.unwrap();

            assert_eq!(result.mismatched_pixels, 20);
            assert!((result.percentage - (20.0f64 / 120.0).sqrt()).abs() < 1e-12);
            assert!(result.is_success());
        }

        #[tokio::test]
        async fn test_overrides_redirect_roots() {
            let fx = Fixture::new();
            let base_root = fx.temp.path().join("custom-base");
            let diff_root = fx.temp.path().join("custom-diff");
            write_png(
                &base_root.join("home.spec/hero.png"),
                &RasterImage::filled(10, 10, WHITE),
            );
            write_png(&fx.actual_path(), &ten_percent_changed());

            let request = fx
                .request()
                .with_base_directory(&base_root)
                .with_diff_directory(&diff_root);
            let result = compare_snapshots(&fx.resolver, &request).await.unwrap();

            assert!(!result.is_success());
            assert!(diff_root.join("home.spec/hero.png").exists());
            assert!(!fx.diff_path().exists());
        }

        #[tokio::test]
        async fn test_name_is_sanitized_for_lookup() {
            let img = RasterImage::filled(3, 3, WHITE);
            let fx = Fixture::new().with_images(&img, &img);
            let request = ComparisonRequest::new("home.spec", "he<r>o?", fx.actual_path());

            let result = compare_snapshots(&fx.resolver, &request).await.unwrap();
            assert!(result.is_success());
        }

        #[tokio::test]
        async fn test_empty_name_is_invalid() {
            let fx = Fixture::new();
            let request = ComparisonRequest::new("home.spec", "::", fx.actual_path());
            let err = compare_snapshots(&fx.resolver, &request)
                .await
                .unwrap_err();
            assert!(matches!(err, VisregError::InvalidName { .. }));
        }

        #[tokio::test]
        async fn test_corrupt_base_propagates_decode_error() {
            let fx = Fixture::new();
            std::fs::create_dir_all(fx.base_path().parent().unwrap()).unwrap();
            std::fs::write(fx.base_path(), b"garbage").unwrap();
            write_png(&fx.actual_path(), &RasterImage::filled(2, 2, WHITE));

            let err = compare_snapshots(&fx.resolver, &fx.request())
                .await
                .unwrap_err();
            assert!(matches!(err, VisregError::Decode { .. }));
        }

        #[tokio::test]
        async fn test_missing_base_wins_over_corrupt_actual() {
            let fx = Fixture::new();
            std::fs::create_dir_all(fx.actual_path().parent().unwrap()).unwrap();
            std::fs::write(fx.actual_path(), b"garbage").unwrap();

            let err = compare_snapshots(&fx.resolver, &fx.request())
                .await
                .unwrap_err();
            assert!(err.is_not_found());
            assert!(err
                .to_string()
                .contains(&fx.base_path().display().to_string()));
        }

        #[tokio::test]
        async fn test_corrupt_base_wins_over_missing_actual() {
            let fx = Fixture::new();
            std::fs::create_dir_all(fx.base_path().parent().unwrap()).unwrap();
            std::fs::write(fx.base_path(), b"garbage").unwrap();

            let err = compare_snapshots(&fx.resolver, &fx.request())
                .await
                .unwrap_err();
            assert!(matches!(err, VisregError::Decode { ref path, .. } if *path == fx.base_path()));
        }

        #[tokio::test]
        async fn test_out_of_range_threshold_rejected() {
            let fx = Fixture::new();
            let request = fx.request().with_error_threshold(3.0);
            let err = compare_snapshots(&fx.resolver, &request)
                .await
                .unwrap_err();
            assert!(matches!(err, VisregError::InvalidPayload { .. }));
        }

        #[test]
        fn test_failure_appends_diff_path() {
            let result = ComparisonResult {
                mismatched_pixels: 4,
                percentage: 0.2,
                error: Some(ErrorEnvelope::new(ErrorKind::ThresholdExceeded, "too different")),
                diff_path: Some(PathBuf::from("/d/x.png")),
            };
            let err = result.failure().unwrap();
            assert_eq!(err.to_string(), "too different\nDiff image: /d/x.png");

            let ok = ComparisonResult {
                error: None,
                ..result
            };
            assert!(ok.failure().is_none());
        }

        #[test]
        fn test_request_json_defaults() {
            let request: ComparisonRequest = serde_json::from_str(
                r#"{"specPath":"a.spec","name":"n","actualPath":"/s/n.png"}"#,
            )
            .unwrap();
            assert_eq!(request.error_threshold, 0.0);
            assert_eq!(request.generate_diff, DiffPolicy::Fail);
            assert!((request.pixel_threshold - 0.1).abs() < f64::EPSILON);
        }
    }
}
