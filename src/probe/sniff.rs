//! Magic-byte content sniffing.
//!
//! Bulk-dump servers routinely misdeclare Content-Type, so the MIME type
//! resolved from the first bytes of the payload is authoritative over any
//! header value.

/// Sniff a MIME type from a leading sample of the payload.
///
/// Covers the content families the pipeline dispatches on plus the common
/// archive formats worth recognizing; anything else falls back to
/// `application/octet-stream`.
pub fn sniff_mime_type(sample: &[u8]) -> &'static str {
    if sample.is_empty() {
        return "application/x-empty";
    }

    if sample.starts_with(&[0x1f, 0x8b]) {
        return "application/gzip";
    }
    if sample.starts_with(b"BZh") {
        return "application/x-bzip2";
    }
    if sample.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
        return "application/x-xz";
    }
    if sample.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
        return "application/zstd";
    }
    if sample.starts_with(b"PK\x03\x04") || sample.starts_with(b"PK\x05\x06") {
        return "application/zip";
    }
    if sample.starts_with(b"7z\xbc\xaf\x27\x1c") {
        return "application/x-7z-compressed";
    }

    if looks_like_json(sample) {
        return "application/json";
    }

    if std::str::from_utf8(sample).is_ok() {
        return "text/plain";
    }

    "application/octet-stream"
}

/// JSON detection on a truncated sample: leading whitespace then a JSON
/// opening token. Full parsing is pointless because the sample is a prefix.
fn looks_like_json(sample: &[u8]) -> bool {
    sample
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|b| matches!(b, b'{' | b'['))
        .unwrap_or(false)
}
