//! Entry point bundling path resolution with an explicit logger.

use crate::compare::{self, ComparisonRequest, ComparisonResult};
use crate::logging::Logger;
use crate::paths::PathResolver;
use crate::result::VisregResult;
use crate::update::{self, UpdateRequest, UpdateResult};
use std::path::PathBuf;

/// Snapshot engine
///
/// Holds no state between calls besides its working directory and logger;
/// the snapshot trees on disk are the only shared store.
#[derive(Debug, Clone)]
pub struct SnapshotEngine {
    resolver: PathResolver,
    logger: Logger,
}

impl SnapshotEngine {
    /// Engine resolving default roots against `cwd`, silent
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            resolver: PathResolver::new(cwd),
            logger: Logger::silent(),
        }
    }

    /// Engine anchored at the process working directory
    pub fn from_current_dir() -> VisregResult<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Replace the logger
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Path resolver in use
    #[must_use]
    pub const fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Logger in use
    #[must_use]
    pub const fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Compare a screenshot against its base
    pub async fn compare_snapshots(
        &self,
        request: &ComparisonRequest,
    ) -> VisregResult<ComparisonResult> {
        self.logger
            .scope(compare::compare_snapshots(&self.resolver, request))
            .await
    }

    /// Copy a screenshot into the base tree
    pub async fn update_snapshot(&self, request: &UpdateRequest) -> VisregResult<UpdateResult> {
        self.logger
            .scope(update::update_snapshot(&self.resolver, request))
            .await
    }
}
