//! Per-request temp-file bookkeeping

use crate::completion::{CompletionBody, CompletionReason, CompletionSignal};
use crate::janitor::{CleanupReport, TempJanitor};
use actix_web::HttpResponse;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

type Tracked = Arc<Mutex<Vec<PathBuf>>>;

/// Tracks every temp file written for one request and removes them when the
/// request completes.
///
/// [`begin`](Self::begin) subscribes a cleanup task to the request's
/// completion signal. The signal fires when the response returned through
/// [`attach`](Self::attach) has been fully sent, or when every holder is
/// dropped first (client disconnect, cancelled handler, error response).
pub struct UploadSession {
    janitor: Arc<TempJanitor>,
    tracked: Tracked,
    signal: CompletionSignal,
}

impl UploadSession {
    /// Must be called from within a tokio runtime
    pub fn begin(janitor: Arc<TempJanitor>) -> Self {
        let (signal, completion) = CompletionSignal::new();
        let tracked: Tracked = Arc::default();

        let task_janitor = janitor.clone();
        let task_tracked = tracked.clone();
        tokio::spawn(async move {
            let reason = completion.await;
            let paths = take_all(&task_tracked);
            if paths.is_empty() {
                return;
            }
            let report = task_janitor.cleanup_paths(paths).await;
            log_report(&report, reason);
        });

        Self {
            janitor,
            tracked,
            signal,
        }
    }

    pub fn janitor(&self) -> &TempJanitor {
        &self.janitor
    }

    /// Register a temp file before anything is written to it
    pub fn track(&self, path: PathBuf) {
        lock(&self.tracked).push(path);
    }

    /// Snapshot of the files currently owned by this request
    pub fn tracked(&self) -> Vec<PathBuf> {
        lock(&self.tracked).clone()
    }

    /// Remove everything written so far, right now. Used on rejection paths.
    pub async fn cleanup_now(&self) -> CleanupReport {
        let paths = take_all(&self.tracked);
        let report = self.janitor.cleanup_paths(paths).await;
        if !report.is_clean() {
            warn!(
                failures = report.failures.len(),
                "Inline temp file cleanup incomplete"
            );
        }
        report
    }

    /// Hand the completion signal to the response body so cleanup runs after
    /// the response has been sent
    pub fn attach(self, response: HttpResponse) -> HttpResponse {
        let signal = self.signal.clone();
        response
            .map_body(|_, body| CompletionBody::new(body, signal))
            .map_into_boxed_body()
    }
}

fn lock(tracked: &Tracked) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
    tracked.lock().unwrap_or_else(|e| e.into_inner())
}

fn take_all(tracked: &Tracked) -> Vec<PathBuf> {
    std::mem::take(&mut *lock(tracked))
}

fn log_report(report: &CleanupReport, reason: CompletionReason) {
    if report.is_clean() {
        debug!(
            removed = report.removed,
            already_gone = report.already_gone,
            reason = ?reason,
            "Request temp files cleaned up"
        );
    } else {
        warn!(
            removed = report.removed,
            failures = report.failures.len(),
            reason = ?reason,
            "Request temp file cleanup incomplete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    async fn setup() -> (tempfile::TempDir, Arc<TempJanitor>) {
        let root = tempfile::tempdir().unwrap();
        let janitor = Arc::new(TempJanitor::new(root.path().join("scratch")));
        janitor.ensure_directory().await.unwrap();
        (root, janitor)
    }

    async fn wait_until_gone(path: &Path) {
        for _ in 0..100 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{:?} was not cleaned up", path);
    }

    fn write_tracked(session: &UploadSession, name: &str) -> PathBuf {
        let path = session.janitor().allocate_path(name);
        session.track(path.clone());
        std::fs::write(&path, b"bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn test_cleanup_now_removes_tracked_files() {
        let (_root, janitor) = setup().await;
        let session = UploadSession::begin(janitor);
        let path = write_tracked(&session, "a.png");

        let report = session.cleanup_now().await;
        assert_eq!(report.removed, 1);
        assert!(!path.exists());
        assert!(session.tracked().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_session_cleans_up() {
        let (_root, janitor) = setup().await;
        let session = UploadSession::begin(janitor);
        let path = write_tracked(&session, "a.png");

        drop(session);
        wait_until_gone(&path).await;
    }

    #[tokio::test]
    async fn test_attached_response_defers_cleanup_until_sent() {
        let (_root, janitor) = setup().await;
        let session = UploadSession::begin(janitor);
        let path = write_tracked(&session, "a.pdf");

        let response = session.attach(HttpResponse::Ok().body("stored"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(path.exists());

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"stored");
        wait_until_gone(&path).await;
    }
}
