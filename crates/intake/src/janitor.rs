//! Scratch directory ownership: creation, per-file cleanup and age-based sweeps

use crate::error::JanitorError;
use crate::part::UploadedPart;
use common::file_utils;
use futures::future::join_all;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default interval between sweeps (1 hour)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Default age after which a temp file counts as orphaned (1 hour)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Result of removing a single temp file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Someone else already cleaned it up
    AlreadyGone,
}

/// Collected outcome of a batch cleanup
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: usize,
    pub already_gone: usize,
    pub failures: Vec<JanitorError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, outcome: Result<Removal, JanitorError>) {
        match outcome {
            Ok(Removal::Removed) => self.removed += 1,
            Ok(Removal::AlreadyGone) => self.already_gone += 1,
            Err(e) => self.failures.push(e),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Owns the process-wide scratch directory used for in-flight uploads
#[derive(Debug)]
pub struct TempJanitor {
    dir: PathBuf,
}

impl TempJanitor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the scratch directory if needed. Safe to race with other callers.
    ///
    /// Directories created here are owner-only on unix. An existing directory
    /// keeps its permissions.
    pub async fn ensure_directory(&self) -> std::io::Result<()> {
        // Recursive creation treats "already exists" as success, including
        // when another task created it between the check and the mkdir
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&self.dir).await
    }

    /// Unique path inside the scratch directory for a new upload
    pub fn allocate_path(&self, original_name: &str) -> PathBuf {
        let id = Uuid::new_v4();
        let name = match file_utils::file_extension(original_name) {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.to_string(),
        };
        self.dir.join(name)
    }

    pub fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
    }

    /// Remove the backing file of a part. Not-found counts as success.
    pub async fn cleanup_one(&self, part: &UploadedPart) -> Result<Removal, JanitorError> {
        self.remove_path(part.path()).await
    }

    pub async fn remove_path(&self, path: &Path) -> Result<Removal, JanitorError> {
        if !self.owns(path) {
            return Err(JanitorError::OutsideScratch {
                path: path.to_path_buf(),
            });
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = ?path, "Removed temp file");
                Ok(Removal::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Removal::AlreadyGone),
            Err(source) => Err(JanitorError::Remove {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Clean up every part independently; one failure never stops the others
    pub async fn cleanup_all<'a, I>(&self, parts: I) -> CleanupReport
    where
        I: IntoIterator<Item = &'a UploadedPart>,
    {
        let paths = parts.into_iter().map(|p| p.path.clone()).collect();
        self.cleanup_paths(paths).await
    }

    pub async fn cleanup_paths(&self, paths: Vec<PathBuf>) -> CleanupReport {
        let outcomes = join_all(paths.iter().map(|p| self.remove_path(p))).await;

        let mut report = CleanupReport::default();
        for outcome in outcomes {
            if let Err(e) = &outcome {
                error!(error = %e, "Temp file cleanup failed");
            }
            report.record(outcome);
        }
        report
    }

    /// Remove every file whose last modification is older than `max_age`
    pub async fn sweep(&self, max_age: Duration) -> std::io::Result<SweepReport> {
        self.sweep_at(max_age, SystemTime::now()).await
    }

    /// Same as [`sweep`](Self::sweep) with an explicit notion of "now"
    pub async fn sweep_at(&self, max_age: Duration, now: SystemTime) -> std::io::Result<SweepReport> {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Removed by a request's own cleanup while we were scanning
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to stat temp file");
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            report.scanned += 1;

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Temp file has no modification time");
                    report.failed += 1;
                    continue;
                }
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= max_age {
                continue;
            }

            match self.remove_path(&path).await {
                Ok(Removal::Removed) => report.removed += 1,
                Ok(Removal::AlreadyGone) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to sweep temp file");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Sweep once right away, then every `every` for the life of the process
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration, max_age: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            // The first tick completes immediately
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match self.sweep(max_age).await {
                    Ok(report) if report.removed > 0 || report.failed > 0 => info!(
                        scanned = report.scanned,
                        removed = report.removed,
                        failed = report.failed,
                        "Temp directory sweep finished"
                    ),
                    Ok(report) => debug!(scanned = report.scanned, "Temp directory sweep finished"),
                    Err(e) => error!(dir = ?self.dir, error = %e, "Temp directory sweep failed"),
                }
            }
        })
    }
}
