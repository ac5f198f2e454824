use std::fmt;

/// One contiguous window of the source file, owned by exactly one sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u64,
    pub offset: u64,
    pub payload: Vec<u8>,
    /// Read hit end-of-file before the window was full
    pub terminal: bool,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Offset as carried in the request header
    pub fn wire_offset(&self) -> i64 {
        self.offset as i64
    }
}

/// Log label, e.g. `chunk[3]@9`
impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk[{}]@{}", self.index, self.offset)
    }
}
