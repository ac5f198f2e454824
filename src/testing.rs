//! In-process stand-in for the remote chunk receiver.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::protocol::frame::RequestHeader;

#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub opcode: i64,
    pub offset: i64,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct ReceiverState {
    frames: Mutex<Vec<ReceivedFrame>>,
    withheld: Mutex<HashSet<i64>>,
    closed: AtomicUsize,
}

/// Knows the file length and chunk size out of band, the same way a real
/// receiver infers payload length.
pub struct Receiver {
    addr: SocketAddr,
    state: Arc<ReceiverState>,
}

impl Receiver {
    pub async fn start(file_len: u64, chunk_size: usize) -> Self {
        Self::start_with_limit(file_len, chunk_size, usize::MAX).await
    }

    /// Stops listening after `accept_limit` connections; later connects
    /// are refused.
    pub async fn start_with_limit(file_len: u64, chunk_size: usize, accept_limit: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ReceiverState::default());

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut accepted = 0;
            while accepted < accept_limit {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                accepted += 1;
                let state = Arc::clone(&accept_state);
                tokio::spawn(handle(socket, state, file_len, chunk_size));
            }
        });

        Self { addr, state }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Close the connection for the chunk at `offset` without acknowledging
    pub fn withhold_ack_at(&self, offset: i64) {
        self.state.withheld.lock().unwrap().insert(offset);
    }

    pub fn frames(&self) -> Vec<ReceivedFrame> {
        let mut frames = self.state.frames.lock().unwrap().clone();
        frames.sort_by_key(|f| f.offset);
        frames
    }

    /// Polls until `count` acknowledged connections were closed by the client
    pub async fn wait_closed(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.state.closed.load(Ordering::SeqCst) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

async fn handle(mut socket: TcpStream, state: Arc<ReceiverState>, file_len: u64, chunk_size: usize) {
    let mut raw = [0u8; RequestHeader::SIZE];
    if socket.read_exact(&mut raw).await.is_err() {
        return;
    }
    let Ok(header) = RequestHeader::decode(&raw) else {
        return;
    };

    let remaining = file_len.saturating_sub(header.offset as u64);
    let len = remaining.min(chunk_size as u64) as usize;
    let mut payload = vec![0u8; len];
    if socket.read_exact(&mut payload).await.is_err() {
        return;
    }

    state.frames.lock().unwrap().push(ReceivedFrame {
        opcode: header.opcode,
        offset: header.offset,
        payload,
    });

    if state.withheld.lock().unwrap().contains(&header.offset) {
        return;
    }
    if socket.write_all(b"ACK!").await.is_err() {
        return;
    }

    let mut rest = Vec::new();
    if socket.read_to_end(&mut rest).await.is_ok() {
        state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// An address nothing listens on
pub async fn refused_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}
