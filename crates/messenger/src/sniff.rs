//! Content-type detection for binary uploads.
//!
//! Only the first [`SNIFF_LEN`] bytes are inspected, so the result is a pure
//! function of the prefix regardless of what follows.

/// Bytes of the payload considered when sniffing.
pub const SNIFF_LEN: usize = 512;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Detect the MIME type of `data` from its leading bytes.
///
/// Magic-byte signatures win. Without one, a NUL-free UTF-8 prefix is plain
/// text; anything else is `application/octet-stream`.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let prefix = &data[..data.len().min(SNIFF_LEN)];

    if let Some(kind) = infer::get(prefix) {
        return kind.mime_type();
    }

    if prefix.is_empty() || looks_like_text(prefix) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

fn looks_like_text(prefix: &[u8]) -> bool {
    if prefix.contains(&0) {
        return false;
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => true,
        // The cut at SNIFF_LEN may split a multi-byte character.
        Err(e) => e.error_len().is_none() && e.valid_up_to() + 4 > prefix.len(),
    }
}
