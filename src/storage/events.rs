//! Blob arrival events connecting storage writes to the ingest worker.

use tokio::sync::mpsc;

/// A blob was created or overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobArrival {
    /// Logical path of the blob, `container/name`.
    pub path: String,
    /// Size of the blob in bytes.
    pub length: u64,
}

impl BlobArrival {
    /// Build an arrival for a blob inside `container`.
    pub fn new(container: &str, blob_name: &str, length: u64) -> Self {
        Self {
            path: format!("{container}/{blob_name}"),
            length,
        }
    }
}

/// Sending half of the arrival channel, cloned into every blob writer.
#[derive(Clone, Debug)]
pub struct ArrivalPublisher {
    sender: mpsc::UnboundedSender<BlobArrival>,
}

impl ArrivalPublisher {
    /// Publish an arrival. Returns `false` when no subscriber is listening anymore.
    pub fn publish(&self, arrival: BlobArrival) -> bool {
        match self.sender.send(arrival) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(path = %err.0.path, "Arrival subscriber dropped; event lost");
                false
            }
        }
    }
}

/// Receiving half of the arrival channel, owned by the ingest worker.
#[derive(Debug)]
pub struct ArrivalReceiver {
    receiver: mpsc::UnboundedReceiver<BlobArrival>,
}

impl ArrivalReceiver {
    /// Wait for the next arrival; `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<BlobArrival> {
        self.receiver.recv().await
    }
}

/// Create a connected publisher/receiver pair.
pub fn arrival_channel() -> (ArrivalPublisher, ArrivalReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ArrivalPublisher { sender }, ArrivalReceiver { receiver })
}
