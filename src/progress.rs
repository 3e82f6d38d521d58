//! Progress observers and the watch-mode stop signal.
//!
//! [`ProgressCallback`] observes segment and frame writes;
//! [`CancellationToken`] is the stop signal for watch mode.
//!
//! # Example
//!
//! ```
//! use framesplit::{ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(total) = info.total {
//!             println!("[{:?}] {}/{}", info.operation, info.current, total);
//!         }
//!     }
//! }
//! ```

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// The kind of work being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Writing re-encoded segments for one source video.
    Segmenting,
    /// Writing sampled frames for one segment.
    Sampling,
}

/// A snapshot of progress within one operation.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Segmenting or sampling.
    pub operation: OperationType,
    /// How many items (segments or frames) have been written so far.
    pub current: u64,
    /// Items expected in total, if known. For sampling this is an upper bound.
    pub total: Option<u64>,
    /// The file that was just written.
    pub path: PathBuf,
}

/// Receives progress updates.
///
/// Callbacks observe but cannot halt work. They must be [`Send`] and
/// [`Sync`] so the same observer can be shared with a signal thread.
pub trait ProgressCallback: Send + Sync {
    /// Called after each segment or frame is written.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default observer.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Shared stop flag for watch mode.
///
/// Clones share state. Watch mode checks the token only between cycles, so
/// cancelling never interrupts a video half way through.
///
/// # Example
///
/// ```
/// use framesplit::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ask the watch loop to stop after its current pass.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called on this token or a clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts written items for one operation and forwards them to a callback.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
        }
    }

    /// Record one written item.
    pub(crate) fn advance(&mut self, path: PathBuf) {
        self.current += 1;
        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            path,
        });
    }
}
