//! Wire constants for the chunk upload protocol

/// Opcode for "upload chunk" (0x2711). The only request type a receiver sees.
pub const OP_UPLOAD_CHUNK: i64 = 10001;

/// Opcode (8 bytes) + offset (8 bytes)
pub const REQUEST_HEADER_SIZE: usize = 16;

/// The receiver answers every chunk with exactly this many bytes
pub const ACK_SIZE: usize = 4;
