use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError {
    Truncated { needed: usize, available: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated { needed, available } =>
                write!(f, "truncated frame: need {} bytes, have {}", needed, available),
        }
    }
}

impl std::error::Error for ProtocolError {}
