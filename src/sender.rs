//! One connection per chunk: resolve, connect, write the frame, read the ack.

use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, error};

use crate::chunk::Chunk;
use crate::completion::{ChunkStatus, Completion};
use crate::metrics::TransferStats;
use crate::protocol::frame::{read_ack, write_frame, Ack};

#[derive(Debug)]
pub enum SendError {
    Resolve(io::Error),
    NoAddress(String),
    Connect(io::Error),
    Write(io::Error),
    Read(io::Error),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Resolve(e) => write!(f, "resolve failed: {}", e),
            SendError::NoAddress(server) => write!(f, "no address found for {}", server),
            SendError::Connect(e) => write!(f, "connect failed: {}", e),
            SendError::Write(e) => write!(f, "write failed: {}", e),
            SendError::Read(e) => write!(f, "ack read failed: {}", e),
        }
    }
}

impl std::error::Error for SendError {}

/// Everything a sender task shares with the rest of the upload
#[derive(Clone)]
pub struct SendContext {
    pub server: Arc<str>,
    pub opcode: i64,
    pub stats: Arc<TransferStats>,
    pub completion: Completion,
}

/// Runs one chunk to completion and emits exactly one completion signal,
/// whatever the outcome. Failures are logged and never retried.
pub async fn send_chunk(ctx: SendContext, chunk: Chunk, permit: Option<OwnedSemaphorePermit>) {
    let status = match deliver(&ctx.server, &chunk, ctx.opcode, &ctx.stats).await {
        Ok(ack) => {
            println!(
                "Read: chunk[{}] offset[{}] ack[{}] hex[{}]",
                chunk.index,
                chunk.offset,
                ack,
                ack.to_hex()
            );
            ctx.stats.chunk_delivered();
            ChunkStatus::Delivered
        }
        Err(e) => {
            error!("{}: {}", chunk, e);
            ctx.stats.chunk_failed();
            ChunkStatus::Failed
        }
    };

    drop(permit);
    ctx.completion.signal(chunk.index, status).await;
}

/// The connection is closed before this returns, on every path.
pub async fn deliver(
    server: &str,
    chunk: &Chunk,
    opcode: i64,
    stats: &TransferStats,
) -> Result<Ack, SendError> {
    let addr = lookup_host(server)
        .await
        .map_err(SendError::Resolve)?
        .next()
        .ok_or_else(|| SendError::NoAddress(server.to_string()))?;

    let mut stream = TcpStream::connect(addr).await.map_err(SendError::Connect)?;
    debug!("{} connected to {}", chunk, addr);

    let written = write_frame(&mut stream, opcode, chunk.wire_offset(), &chunk.payload)
        .await
        .map_err(SendError::Write)?;
    stats.frame_written(written as u64);

    let ack = read_ack(&mut stream).await.map_err(SendError::Read)?;
    debug!("{} acknowledged: {}", chunk, ack.to_hex());

    if let Err(e) = stream.shutdown().await {
        debug!("{} shutdown: {}", chunk, e);
    }

    Ok(ack)
}
