use std::borrow::Cow;
use std::io::Read;

use flate2::read::MultiGzDecoder;

use crate::error::HandlerError;
use crate::models::AuditRecords;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// True when the buffer starts with the gzip magic number. Buffers shorter than the magic are
/// never treated as compressed.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= GZIP_MAGIC.len() && bytes[..GZIP_MAGIC.len()] == GZIP_MAGIC
}

/// Inflates gzip input, hands anything else back untouched.
pub fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>, HandlerError> {
    let appears_gzipped = is_gzip(bytes);
    tracing::info!("Input appears to be gzipped: {}", appears_gzipped);

    if !appears_gzipped {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut inflated = Vec::new();
    MultiGzDecoder::new(bytes)
        .read_to_end(&mut inflated)
        .map_err(HandlerError::Decode)?;

    tracing::debug!("Inflated {} bytes to {}", bytes.len(), inflated.len());
    Ok(Cow::Owned(inflated))
}

pub fn parse_records(bytes: &[u8]) -> Result<AuditRecords, HandlerError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| HandlerError::Parse(format!("log file is not valid UTF-8: {err}")))?;
    tracing::debug!("Log file contents: {}", text);

    serde_json::from_str(text).map_err(|err| HandlerError::Parse(err.to_string()))
}
