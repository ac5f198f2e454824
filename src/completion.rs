//! Per-chunk completion signals and the counting join.

use tokio::sync::mpsc;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionSignal {
    pub index: u64,
    pub status: ChunkStatus,
}

/// Sending half, one clone per sender task
#[derive(Clone)]
pub struct Completion {
    tx: mpsc::Sender<CompletionSignal>,
}

impl Completion {
    pub async fn signal(&self, index: u64, status: ChunkStatus) {
        if self.tx.send(CompletionSignal { index, status }).await.is_err() {
            warn!("Completion join is gone, dropping signal for chunk {}", index);
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinSummary {
    pub delivered: u64,
    pub failed: u64,
    /// Signals that never arrived because their task died
    pub missing: u64,
}

pub struct CompletionJoin {
    rx: mpsc::Receiver<CompletionSignal>,
}

/// Channel capacity covers every expected chunk plus one, so a sender
/// never waits on signal delivery.
pub fn completion_channel(file_size: u64, chunk_size: usize) -> (Completion, CompletionJoin) {
    let expected = file_size / chunk_size.max(1) as u64 + 1;
    let capacity = usize::try_from(expected).unwrap_or(usize::MAX).min(tokio::sync::Semaphore::MAX_PERMITS);
    let (tx, rx) = mpsc::channel(capacity);
    (Completion { tx }, CompletionJoin { rx })
}

impl CompletionJoin {
    /// Waits for exactly `dispatched` signals. Both outcomes count as done.
    /// The caller must drop its own `Completion` first, otherwise a task that
    /// dies without signaling would block this forever.
    pub async fn wait(mut self, dispatched: u64) -> JoinSummary {
        let mut summary = JoinSummary::default();
        let mut received = 0u64;

        while received < dispatched {
            match self.rx.recv().await {
                Some(signal) => {
                    trace!("Completion for chunk {}: {:?}", signal.index, signal.status);
                    match signal.status {
                        ChunkStatus::Delivered => summary.delivered += 1,
                        ChunkStatus::Failed => summary.failed += 1,
                    }
                    received += 1;
                }
                None => {
                    summary.missing = dispatched - received;
                    warn!("{} chunk(s) finished without a completion signal", summary.missing);
                    break;
                }
            }
        }

        summary
    }
}
