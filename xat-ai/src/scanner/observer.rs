//! Mutation batching for the scan loop

use crate::dom::{MutationOrigin, MutationRecord};
use std::time::Duration;
use tokio::sync::mpsc;

/// Quiet period after the first notification before a scan runs
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Wait for the next batch of host mutations
///
/// Blocks until the first host-originated record arrives, waits `debounce`,
/// then drains everything already queued. Records caused by the scanner's
/// own writes never start or count toward a batch. Returns the number of
/// host records in the batch, or None once the document has gone away.
pub async fn next_batch(rx: &mut mpsc::UnboundedReceiver<MutationRecord>, debounce: Duration) -> Option<usize> {
    loop {
        let record = rx.recv().await?;
        if record.origin == MutationOrigin::Host {
            break;
        }
    }

    if !debounce.is_zero() {
        tokio::time::sleep(debounce).await;
    }

    let mut count = 1;
    while let Ok(record) = rx.try_recv() {
        if record.origin == MutationOrigin::Host {
            count += 1;
        }
    }
    Some(count)
}
