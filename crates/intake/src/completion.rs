//! One-shot "request is done" signal
//!
//! A request is complete either when its response body has been fully
//! streamed (`Finished`) or when the last holder of the signal goes away
//! without that happening (`Closed`): a dropped connection, a cancelled
//! handler, or an error response. Whichever comes first fires the signal;
//! later attempts are no-ops.

use actix_web::body::{BodySize, BoxBody, MessageBody};
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    Finished,
    Closed,
}

struct Inner {
    fired: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<CompletionReason>>>,
}

impl Inner {
    fn fire(&self, reason: CompletionReason) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        let tx = self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(tx) = tx {
            // The listener may already be gone, nothing left to notify
            let _ = tx.send(reason);
        }
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.fire(CompletionReason::Closed);
    }
}

/// Sender side, cloned into everything that may end the request
#[derive(Clone)]
pub struct CompletionSignal {
    inner: Arc<Inner>,
}

impl CompletionSignal {
    pub fn new() -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let signal = Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                tx: Mutex::new(Some(tx)),
            }),
        };
        (signal, Completion { rx })
    }

    /// Returns false if the signal had already fired
    pub fn fire(&self, reason: CompletionReason) -> bool {
        self.inner.fire(reason)
    }

    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// Resolves once, with the reason the request ended
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<CompletionReason>,
}

impl Future for Completion {
    type Output = CompletionReason;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(CompletionReason::Closed))
    }
}

/// Response body that fires the signal once the last chunk has been sent
pub struct CompletionBody {
    inner: BoxBody,
    signal: CompletionSignal,
}

impl CompletionBody {
    pub fn new(inner: BoxBody, signal: CompletionSignal) -> Self {
        Self { inner, signal }
    }
}

impl MessageBody for CompletionBody {
    type Error = Box<dyn std::error::Error>;

    fn size(&self) -> BodySize {
        self.inner.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(None) => {
                this.signal.fire(CompletionReason::Finished);
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
