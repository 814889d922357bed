use crate::core::chunk::Chunk;
use crate::error::TransferError;

/// `Range` header value requesting exactly the bytes of `chunk`.
///
/// HTTP ranges are inclusive, chunk ends are exclusive.
pub fn range_header(chunk: &Chunk) -> String { format!("bytes={}-{}", chunk.start, chunk.end - 1) }

/// Parse a `Content-Range` value such as `bytes 0-99/1000` into
/// `(first, last, total)`. `total` is `None` for `*`.
pub fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (first, last) = range.trim().split_once('-')?;
    let first = first.trim().parse().ok()?;
    let last = last.trim().parse().ok()?;
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    (first <= last).then_some((first, last, total))
}

/// Check the status line and `Content-Range` of a response to a ranged GET.
///
/// A server honoring the range answers `206 Partial Content`. A `200`
/// means the range was ignored and the body is the whole file; that is
/// reported as [`TransferError::RangeIgnored`] so the caller never retries
/// it. When a `Content-Range` header is present it must name the requested
/// bytes exactly.
pub fn validate_ranged_status(
    status: u16,
    content_range: Option<&str>,
    chunk: &Chunk,
) -> Result<(), TransferError> {
    match status {
        206 => {}
        200 => return Err(TransferError::RangeIgnored),
        other => return Err(TransferError::Status(other)),
    }

    let Some(value) = content_range else {
        return Ok(());
    };
    match parse_content_range(value) {
        Some((first, last, _)) if first == chunk.start && last + 1 == chunk.end => Ok(()),
        _ => Err(TransferError::ContentRange {
            expected: format!("bytes {}-{}", chunk.start, chunk.end - 1),
            actual:   Some(value.to_string()),
        }),
    }
}

/// The body of a chunk must carry exactly the requested number of bytes.
pub fn check_body_length(expected: u64, actual: u64) -> Result<(), TransferError> {
    if expected == actual {
        Ok(())
    } else {
        Err(TransferError::BodyLength { expected, actual })
    }
}
