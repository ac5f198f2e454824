use crate::utils::limits::PREVIEW_BYTES;

/// Hex preview of a buffer for log lines, truncated to `PREVIEW_BYTES`
pub fn preview(buf: &[u8]) -> String {
    if buf.len() <= PREVIEW_BYTES {
        hex::encode(buf)
    } else {
        format!("{}..", hex::encode(&buf[..PREVIEW_BYTES]))
    }
}
