//! Subscriptions - Live collection updates on a background worker.
//!
//! Each subscription owns a worker thread polling the store's change feed.
//! Snapshots are decoded leniently: a document that fails to decode is
//! dropped from the published batch, reported on the error channel, and
//! logged, but never tears the data channel down. Transport errors publish
//! nothing for that notification and are reported the same way.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::mapping;
use crate::model::Model;
use crate::store::{ChangeFeed, FeedEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A failure observed on the live-update path.
///
/// These never interrupt the data channel; the caller decides whether to
/// read or ignore them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// A document in a snapshot could not be decoded and was dropped.
    Decode { id: String, message: String },
    /// A change notification was lost to a transport failure.
    Transport(String),
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::Decode { id, message } => {
                write!(f, "dropped undecodable document {}: {}", id, message)
            }
            SubscriptionError::Transport(message) => {
                write!(f, "dropped change notification: {}", message)
            }
        }
    }
}

impl std::error::Error for SubscriptionError {}

/// An owned handle to a live-update subscription.
///
/// Receives the full decoded collection snapshot on every change. Cancel
/// explicitly with [`cancel`](Self::cancel); dropping the handle also stops
/// the worker and releases the store-side feed.
pub struct Subscription<M> {
    data_rx: Receiver<Vec<M>>,
    error_rx: Receiver<SubscriptionError>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<M: Model + 'static> Subscription<M> {
    pub(crate) fn spawn<F: ChangeFeed + 'static>(feed: F) -> Self {
        let (data_tx, data_rx) = mpsc::channel();
        let (error_tx, error_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let worker = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                match feed.poll(POLL_INTERVAL) {
                    Ok(Some(FeedEvent::Snapshot(docs))) => {
                        let mut decoded = Vec::with_capacity(docs.len());
                        for doc in docs {
                            match mapping::decode::<M>(&doc.id, doc.fields) {
                                Ok(model) => decoded.push(model),
                                Err(err) => {
                                    tracing::warn!(
                                        collection = M::COLLECTION,
                                        id = %doc.id,
                                        error = %err,
                                        "dropping undecodable document from snapshot"
                                    );
                                    let _ = error_tx.send(SubscriptionError::Decode {
                                        id: doc.id,
                                        message: err.to_string(),
                                    });
                                }
                            }
                        }
                        if data_tx.send(decoded).is_err() {
                            break;
                        }
                    }
                    Ok(Some(FeedEvent::TransportError(message))) => {
                        // The notification is dropped whole: no partial
                        // publish on the data channel.
                        tracing::warn!(
                            collection = M::COLLECTION,
                            error = %message,
                            "dropping change notification after transport error"
                        );
                        let _ = error_tx.send(SubscriptionError::Transport(message));
                    }
                    Ok(None) => {}
                    Err(err) => {
                        let _ = error_tx.send(SubscriptionError::Transport(err.to_string()));
                        break;
                    }
                }
            }
        });

        Self {
            data_rx,
            error_rx,
            stop,
            worker: Some(worker),
        }
    }
}

impl<M> Subscription<M> {
    /// Wait for the next decoded snapshot, up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<M>> {
        match self.data_rx.recv_timeout(timeout) {
            Ok(models) => Some(models),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take the next decoded snapshot without waiting.
    pub fn try_recv(&self) -> Option<Vec<M>> {
        self.data_rx.try_recv().ok()
    }

    /// Take the next reported failure without waiting.
    pub fn try_recv_error(&self) -> Option<SubscriptionError> {
        self.error_rx.try_recv().ok()
    }

    /// Stop the worker and release the store-side feed.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
