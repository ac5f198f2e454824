use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use serde::Serialize;

use crate::completion::JoinSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub file: String,
    pub server: String,
    pub chunk_size: usize,
    pub chunks: u64,
    pub delivered: u64,
    pub failed: u64,
    pub missing: u64,
    pub bytes_read: u64,
    pub bytes_sent: u64,
    pub elapsed_us: u64,
}

/// Counters shared by every sender task of one upload
#[derive(Debug, Default)]
pub struct TransferStats {
    dispatched: AtomicU64,
    bytes_read: AtomicU64,
    bytes_sent: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_dispatched(&self, bytes: u64) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Frame bytes accepted by the socket, header included
    pub fn frame_written(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn chunk_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn chunk_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn report(
        &self,
        file: String,
        server: String,
        chunk_size: usize,
        summary: JoinSummary,
        elapsed: Duration,
    ) -> TransferReport {
        TransferReport {
            file,
            server,
            chunk_size,
            chunks: self.dispatched(),
            delivered: summary.delivered,
            failed: summary.failed,
            missing: summary.missing,
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            elapsed_us: elapsed.as_micros() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_combines_counters_and_join_summary() {
        let stats = TransferStats::new();
        stats.chunk_dispatched(3);
        stats.chunk_dispatched(1);
        stats.frame_written(19);
        stats.chunk_delivered();
        stats.chunk_failed();

        let summary = JoinSummary { delivered: 1, failed: 1, missing: 0 };
        let report = stats.report("a.bin".into(), "127.0.0.1:1".into(), 3, summary, Duration::from_micros(250));

        assert_eq!(report.chunks, 2);
        assert_eq!(report.bytes_read, 4);
        assert_eq!(report.bytes_sent, 19);
        assert_eq!(report.elapsed_us, 250);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["server"], "127.0.0.1:1");
    }
}
