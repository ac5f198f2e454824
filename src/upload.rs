use std::fs::File;
use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::completion::completion_channel;
use crate::config::SendConfig;
use crate::dispatch::{ChunkReader, RetryPolicy};
use crate::metrics::{TransferReport, TransferStats};
use crate::protocol::OP_UPLOAD_CHUNK;
use crate::sender::{send_chunk, SendContext};
use crate::utils::buffer::preview;

/// Reads the source file chunk by chunk, fans each chunk out to its own
/// sender task, and waits for every task before reporting.
pub async fn run(config: &SendConfig) -> Result<TransferReport> {
    config.validate()?;

    let file = File::open(&config.file)
        .with_context(|| format!("opening {}", config.file.display()))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("reading metadata of {}", config.file.display()))?
        .len();
    info!("Sending {:?} ({} bytes) to {} in {}-byte chunks", config.file, file_size, config.server, config.chunk_size);

    let (completion, join) = completion_channel(file_size, config.chunk_size);
    let stats = Arc::new(TransferStats::new());
    let limiter = match config.max_inflight {
        0 => None,
        n => Some(Arc::new(Semaphore::new(n))),
    };
    let ctx = SendContext {
        server: Arc::from(config.server.as_str()),
        opcode: OP_UPLOAD_CHUNK,
        stats: Arc::clone(&stats),
        completion,
    };

    let retry = RetryPolicy {
        max_retries: config.read_retries,
        initial_backoff: Duration::from_millis(config.read_backoff_ms),
    };
    let mut reader = ChunkReader::new(file, config.chunk_size, retry);

    let start = Instant::now();

    while let Some(chunk) = reader.next_chunk().await? {
        info!(
            "chunk[{}] offset[{}] read bytes[{}] buf[{}]",
            chunk.index,
            chunk.offset,
            chunk.len(),
            preview(&chunk.payload)
        );

        let permit = match &limiter {
            Some(limiter) => Some(Arc::clone(limiter).acquire_owned().await?),
            None => None,
        };

        stats.chunk_dispatched(chunk.len() as u64);
        tokio::spawn(send_chunk(ctx.clone(), chunk, permit));
    }

    let dispatched = reader.dispatched();
    info!("Read {} bytes in {} chunk(s), waiting for senders", reader.offset(), dispatched);
    drop(ctx);

    let summary = join.wait(dispatched).await;
    let elapsed = start.elapsed();
    println!("time elapsed: {} us", elapsed.as_micros());

    info!("{} delivered, {} failed", stats.delivered(), stats.failed());
    if summary.failed > 0 || summary.missing > 0 {
        warn!("{} of {} chunk(s) were not acknowledged", summary.failed + summary.missing, dispatched);
    }

    Ok(stats.report(
        config.file.display().to_string(),
        config.server.clone(),
        config.chunk_size,
        summary,
        elapsed,
    ))
}
