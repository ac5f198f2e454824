//! Sequential windowed reads over the source file.
//!
//! `ChunkReader` walks the file from offset 0 in `chunk_size` windows and
//! yields one owned `Chunk` per window. Each payload is copied out of the
//! reusable read buffer before it is handed over, so a spawned sender
//! never shares memory with the next read. The reads themselves run on
//! tokio's blocking pool; a large window never stalls a runtime worker.

use std::fmt;
use std::fs::File;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::chunk::Chunk;
use crate::utils::limits::MAX_READ_BACKOFF_MS;

/// Positioned reads that do not move a shared cursor
pub trait PositionedRead: Send + Sync + 'static {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl PositionedRead for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling and capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(Duration::from_millis(MAX_READ_BACKOFF_MS))
    }
}

#[derive(Debug)]
pub enum ReadError {
    Io { offset: u64, source: io::Error },
    RetriesExhausted { offset: u64, attempts: u32, source: io::Error },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io { offset, source } =>
                write!(f, "read at offset {} failed: {}", offset, source),
            ReadError::RetriesExhausted { offset, attempts, source } =>
                write!(f, "read at offset {} made no progress after {} attempts: {}", offset, attempts, source),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io { source, .. } | ReadError::RetriesExhausted { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Reading,
    Draining,
}

pub struct ChunkReader<R: PositionedRead> {
    source: Arc<R>,
    buf: Vec<u8>,
    offset: u64,
    index: u64,
    state: ReadState,
    retry: RetryPolicy,
}

impl<R: PositionedRead> ChunkReader<R> {
    pub fn new(source: R, chunk_size: usize, retry: RetryPolicy) -> Self {
        Self {
            source: Arc::new(source),
            buf: vec![0u8; chunk_size],
            offset: 0,
            index: 0,
            state: ReadState::Reading,
            retry,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Chunks produced so far
    pub fn dispatched(&self) -> u64 {
        self.index
    }

    /// Next window, or `None` once end-of-file has been reached.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, ReadError> {
        if self.state == ReadState::Draining {
            return Ok(None);
        }

        let (filled, eof) = self.fill_window().await?;

        if filled == 0 {
            debug!("End of file at offset {}", self.offset);
            self.state = ReadState::Draining;
            return Ok(None);
        }

        let chunk = Chunk {
            index: self.index,
            offset: self.offset,
            payload: self.buf[..filled].to_vec(),
            terminal: eof,
        };

        self.offset += filled as u64;
        self.index += 1;
        if eof {
            debug!("Terminal {} with {} bytes", chunk, filled);
            self.state = ReadState::Draining;
        }

        Ok(Some(chunk))
    }

    /// Fills the buffer from the current offset. Short reads keep filling the
    /// same window; reads that make no progress are retried with backoff.
    async fn fill_window(&mut self) -> Result<(usize, bool), ReadError> {
        let mut filled = 0;
        let mut attempts = 0u32;

        while filled < self.buf.len() {
            let at = self.offset + filled as u64;
            match self.read_blocking(filled, at).await {
                Ok(0) => return Ok((filled, true)),
                Ok(n) => {
                    trace!("Read {} bytes at offset {}", n, at);
                    filled += n;
                    attempts = 0;
                }
                Err(e) if is_transient(&e) => {
                    attempts += 1;
                    if attempts > self.retry.max_retries {
                        return Err(ReadError::RetriesExhausted { offset: at, attempts, source: e });
                    }
                    let delay = self.retry.backoff(attempts);
                    warn!("Transient read error at offset {} (attempt {}), retrying in {:?}: {}", at, attempts, delay, e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(ReadError::Io { offset: at, source: e }),
            }
        }

        Ok((filled, false))
    }

    /// Reads into `buf[start..]` on the blocking pool. The buffer travels
    /// into the closure and back, so it is never shared.
    async fn read_blocking(&mut self, start: usize, at: u64) -> io::Result<usize> {
        let source = Arc::clone(&self.source);
        let mut buf = std::mem::take(&mut self.buf);

        let (buf, result) = tokio::task::spawn_blocking(move || {
            let result = source.read_at(&mut buf[start..], at);
            (buf, result)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        self.buf = buf;
        result
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock)
}
