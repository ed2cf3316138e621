// ── Snapshot streams ──
//
// Async subscription to published setup trees, for consumers that prefer
// awaiting over registering a synchronous listener.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::tree::SetupTree;

type Snapshot = Option<Arc<SetupTree>>;

/// A subscription to the coordinator's snapshots.
///
/// `current()` is the snapshot at subscription time; `changed()` waits for
/// the next published one.
pub struct SnapshotStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl SnapshotStream {
    pub(crate) fn new(mut receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    pub fn current(&self) -> Option<&Arc<SetupTree>> {
        self.current.as_ref()
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot.
    /// Returns `None` once the coordinator has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<SetupTree>> {
        loop {
            self.receiver.changed().await.ok()?;
            let snap = self.receiver.borrow_and_update().clone();
            if let Some(tree) = snap {
                self.current = Some(Arc::clone(&tree));
                return Some(tree);
            }
        }
    }

    /// Convert into a `Stream` of published snapshots.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::from_changes(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<SetupTree>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Some(tree))) => return Poll::Ready(Some(tree)),
                Poll::Ready(Some(None)) => {}
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
