/// Default cap on concurrently running chunk senders (0 = unbounded)
pub const DEFAULT_MAX_INFLIGHT: usize = 64;

/// Largest accepted chunk size
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024 * 1024; // 1GB

/// Default number of retries for a window read that makes no progress
pub const DEFAULT_READ_RETRIES: u32 = 8;

/// First backoff delay between read retries; doubles each attempt
pub const DEFAULT_READ_BACKOFF_MS: u64 = 1;

/// Upper bound for a single backoff delay
pub const MAX_READ_BACKOFF_MS: u64 = 1_000;

/// Bytes of payload shown in per-chunk log lines
pub const PREVIEW_BYTES: usize = 32;
