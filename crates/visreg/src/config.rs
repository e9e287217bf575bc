//! Snapshot configuration: suite defaults, per-call overrides and the
//! environment layer.

use crate::result::{VisregError, VisregResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable selecting [`ComparisonMode`]
pub const ENV_TYPE: &str = "VISUAL_REGRESSION_TYPE";
/// Environment variable overriding the base root
pub const ENV_BASE_DIRECTORY: &str = "VISUAL_REGRESSION_BASE_DIRECTORY";
/// Environment variable overriding the diff root
pub const ENV_DIFF_DIRECTORY: &str = "VISUAL_REGRESSION_DIFF_DIRECTORY";
/// Environment variable selecting [`DiffPolicy`]
pub const ENV_GENERATE_DIFF: &str = "VISUAL_REGRESSION_GENERATE_DIFF";
/// Environment variable for the fail-silently flag
pub const ENV_FAIL_SILENTLY: &str = "VISUAL_REGRESSION_FAIL_SILENTLY";
/// Environment variable for the image-level error threshold
pub const ENV_ERROR_THRESHOLD: &str = "VISUAL_REGRESSION_ERROR_THRESHOLD";

/// What a snapshot command does with a fresh screenshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Copy the screenshot into the base directory
    Base,
    /// Compare the screenshot against the stored base
    #[default]
    Regression,
}

impl FromStr for ComparisonMode {
    type Err = VisregError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "regression" => Ok(Self::Regression),
            other => Err(VisregError::invalid_payload(format!(
                "unknown comparison type '{other}' (expected base or regression)"
            ))),
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Regression => write!(f, "regression"),
        }
    }
}

/// When a diff image is written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffPolicy {
    /// After every comparison
    Always,
    /// Only when the comparison fails
    #[default]
    Fail,
    /// Never
    Never,
}

impl DiffPolicy {
    /// Whether a comparison with the given outcome writes its diff image
    #[must_use]
    pub const fn should_write(self, failed: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Fail => failed,
            Self::Never => false,
        }
    }
}

impl FromStr for DiffPolicy {
    type Err = VisregError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "fail" => Ok(Self::Fail),
            "never" => Ok(Self::Never),
            other => Err(VisregError::invalid_payload(format!(
                "unknown diff policy '{other}' (expected always, fail or never)"
            ))),
        }
    }
}

impl fmt::Display for DiffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::Fail => write!(f, "fail"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// Suite-level snapshot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotOptions {
    /// Base generation or regression comparison
    #[serde(rename = "type")]
    pub mode: ComparisonMode,
    /// Base root override (default `<cwd>/snapshots/base`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_directory: Option<PathBuf>,
    /// Diff root override (default `<cwd>/snapshots/diff`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_directory: Option<PathBuf>,
    /// Diff image policy
    pub generate_diff: DiffPolicy,
    /// Report threshold failures as data only
    pub fail_silently: bool,
    /// Image-level error threshold (0.0-1.0)
    pub error_threshold: f64,
    /// Per-pixel colour sensitivity (0.0-1.0)
    pub pixel_threshold: f64,
    /// Count anti-aliased pixels as mismatches
    pub include_anti_aliasing: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::Regression,
            base_directory: None,
            diff_directory: None,
            generate_diff: DiffPolicy::Fail,
            fail_silently: false,
            error_threshold: 0.0,
            pixel_threshold: 0.1,
            include_anti_aliasing: false,
        }
    }
}

impl SnapshotOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comparison mode
    #[must_use]
    pub const fn with_mode(mut self, mode: ComparisonMode) -> Self {
        self.mode = mode;
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

    /// Set the diff policy
    #[must_use]
    pub const fn with_generate_diff(mut self, policy: DiffPolicy) -> Self {
        self.generate_diff = policy;
        self
    }

    /// Set fail-silently
    #[must_use]
    pub const fn with_fail_silently(mut self, fail_silently: bool) -> Self {
        self.fail_silently = fail_silently;
        self
    }

    /// Set the image-level error threshold
    #[must_use]
    pub const fn with_error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = threshold;
        self
    }

    /// Set the per-pixel sensitivity
    #[must_use]
    pub const fn with_pixel_threshold(mut self, threshold: f64) -> Self {
        self.pixel_threshold = threshold;
        self
    }

    /// Count anti-aliased pixels as mismatches
    #[must_use]
    pub const fn with_include_anti_aliasing(mut self, include: bool) -> Self {
        self.include_anti_aliasing = include;
        self
    }

    /// Effective options for one call: every field set in `overrides` wins
    #[must_use]
    pub fn merged(&self, overrides: &SnapshotOverrides) -> Self {
        Self {
            mode: overrides.mode.unwrap_or(self.mode),
            base_directory: overrides
                .base_directory
                .clone()
                .or_else(|| self.base_directory.clone()),
            diff_directory: overrides
                .diff_directory
                .clone()
                .or_else(|| self.diff_directory.clone()),
            generate_diff: overrides.generate_diff.unwrap_or(self.generate_diff),
            fail_silently: overrides.fail_silently.unwrap_or(self.fail_silently),
            error_threshold: overrides.error_threshold.unwrap_or(self.error_threshold),
            pixel_threshold: overrides.pixel_threshold.unwrap_or(self.pixel_threshold),
            include_anti_aliasing: overrides
                .include_anti_aliasing
                .unwrap_or(self.include_anti_aliasing),
        }
    }

    /// Reject thresholds outside 0.0..=1.0
    pub fn validate(&self) -> VisregResult<()> {
        check_unit_interval("errorThreshold", self.error_threshold)?;
        check_unit_interval("pixelThreshold", self.pixel_threshold)
    }

    /// Defaults layered with the `VISUAL_REGRESSION_*` environment variables
    pub fn from_env() -> VisregResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults layered with values from `lookup`, keyed by environment variable name
    pub fn from_lookup<F>(lookup: F) -> VisregResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(value) = lookup(ENV_TYPE) {
            options.mode = value.parse().map_err(|e| env_error(ENV_TYPE, &e))?;
        }
        if let Some(value) = lookup(ENV_BASE_DIRECTORY).filter(|v| !v.is_empty()) {
            options.base_directory = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_DIFF_DIRECTORY).filter(|v| !v.is_empty()) {
            options.diff_directory = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_GENERATE_DIFF) {
            options.generate_diff = value
                .parse()
                .map_err(|e| env_error(ENV_GENERATE_DIFF, &e))?;
        }
        if let Some(value) = lookup(ENV_FAIL_SILENTLY) {
            options.fail_silently = parse_flag(&value).ok_or_else(|| {
                VisregError::invalid_payload(format!(
                    "{ENV_FAIL_SILENTLY}: expected a boolean, got '{value}'"
                ))
            })?;
        }
        if let Some(value) = lookup(ENV_ERROR_THRESHOLD) {
            options.error_threshold = value.trim().parse().map_err(|_| {
                VisregError::invalid_payload(format!(
                    "{ENV_ERROR_THRESHOLD}: expected a number, got '{value}'"
                ))
            })?;
        }

        options.validate()?;
        Ok(options)
    }
}

/// Per-call overrides; unset fields fall back to the suite options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotOverrides {
    /// Comparison mode
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mode: Option<ComparisonMode>,
    /// Base root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_directory: Option<PathBuf>,
    /// Diff root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_directory: Option<PathBuf>,
    /// Diff image policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_diff: Option<DiffPolicy>,
    /// Fail-silently flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_silently: Option<bool>,
    /// Image-level error threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_threshold: Option<f64>,
    /// Per-pixel sensitivity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_threshold: Option<f64>,
    /// Count anti-aliased pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_anti_aliasing: Option<bool>,
}

/// Argument shapes accepted by the snapshot command at the host boundary
///
/// A bare number is the error threshold; an object is a set of overrides;
/// nothing (`null` or absent) keeps the suite options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompareArgs {
    /// No per-call configuration
    #[default]
    None,
    /// Error threshold only
    Threshold(f64),
    /// Full override set
    Overrides(SnapshotOverrides),
}

impl CompareArgs {
    /// Normalize into an override set
    #[must_use]
    pub fn into_overrides(self) -> SnapshotOverrides {
        match self {
            Self::None => SnapshotOverrides::default(),
            Self::Threshold(threshold) => SnapshotOverrides {
                error_threshold: Some(threshold),
                ..SnapshotOverrides::default()
            },
            Self::Overrides(overrides) => overrides,
        }
    }
}

impl From<f64> for CompareArgs {
    fn from(threshold: f64) -> Self {
        Self::Threshold(threshold)
    }
}

impl From<SnapshotOverrides> for CompareArgs {
    fn from(overrides: SnapshotOverrides) -> Self {
        Self::Overrides(overrides)
    }
}

fn check_unit_interval(field: &str, value: f64) -> VisregResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(VisregError::invalid_payload(format!(
            "{field} must be between 0 and 1, got {value}"
        )))
    }
}

fn env_error(var: &str, err: &VisregError) -> VisregError {
    VisregError::invalid_payload(format!("{var}: {err}"))
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
