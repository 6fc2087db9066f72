//! Subscriber loop turning blob arrivals into ingest runs.

use crate::pipeline::service::{IngestError, IngestService};
use crate::storage::{ArrivalReceiver, BlobArrival};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

/// Spawn [`run_ingest_worker`] on the runtime.
pub fn spawn_ingest_worker(
    service: Arc<IngestService>,
    receiver: ArrivalReceiver,
) -> JoinHandle<()> {
    tokio::spawn(run_ingest_worker(service, receiver))
}

/// Drain the arrival channel, running each arrival as its own task.
///
/// Runs for the same blob may overlap. Returns once every publisher is dropped and all
/// in-flight runs have finished.
pub async fn run_ingest_worker(service: Arc<IngestService>, mut receiver: ArrivalReceiver) {
    let mut runs = JoinSet::new();
    while let Some(arrival) = receiver.recv().await {
        let run_service = Arc::clone(&service);
        runs.spawn(async move { handle_arrival(&run_service, arrival).await });
        while let Some(finished) = runs.try_join_next() {
            reap(&service, finished);
        }
    }

    tracing::info!(in_flight = runs.len(), "Arrival channel closed; draining ingest runs");
    while let Some(finished) = runs.join_next().await {
        reap(&service, finished);
    }
}

fn reap(service: &IngestService, finished: Result<(), JoinError>) {
    if let Err(error) = finished {
        service.metrics().record_failure();
        tracing::error!(error = %error, "Ingest run panicked or was cancelled");
    }
}

async fn handle_arrival(service: &IngestService, arrival: BlobArrival) {
    match service.ingest(&arrival).await {
        Ok(_) => {}
        Err(IngestError::OutsidePrefix(path)) => {
            tracing::debug!(path = %path, "Ignoring arrival outside watched container");
        }
        // already logged and counted by the service
        Err(_) => {}
    }
}
