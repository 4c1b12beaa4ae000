//! Content-type detection from a bounded body prefix.
//!
//! The adaptive writer consumes sniffing as a pure `bytes -> MIME string`
//! function; [`detect_content_type`] is the default, following the WHATWG
//! mime-sniffing signature table for the formats that matter to a compression
//! decision. A custom function can be installed through
//! [`GzipLayerBuilder::content_type_sniffer`](crate::GzipLayerBuilder::content_type_sniffer).

/// Signature of a content-type sniffing function.
///
/// Receives at most the first 512 bytes of the body and returns a MIME type,
/// optionally with parameters.
pub type SniffFn = fn(&[u8]) -> &'static str;

const HTML_SIGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Infers a MIME type from the leading bytes of a body.
///
/// Recognizes HTML and XML after optional leading whitespace, a set of
/// well-known binary signatures, and UTF byte-order marks; anything else is
/// classified as `text/plain` or `application/octet-stream` by scanning for
/// control bytes.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let trimmed = trim_ws(data);
    for &sig in HTML_SIGS {
        if html_sig_matches(trimmed, sig) {
            return "text/html; charset=utf-8";
        }
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if let Some(mime) = match_magic(data) {
        return mime;
    }

    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "text/plain; charset=utf-8";
    }
    if data.starts_with(&[0xFE, 0xFF]) {
        return "text/plain; charset=utf-16be";
    }
    if data.starts_with(&[0xFF, 0xFE]) {
        return "text/plain; charset=utf-16le";
    }

    if data.iter().any(|&b| is_binary_byte(b)) {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn trim_ws(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

/// An HTML signature matches case-insensitively and must be terminated by a
/// space or `>` (or the end of the sniff window for `<!--`-style openers).
fn html_sig_matches(data: &[u8], sig: &[u8]) -> bool {
    if data.len() < sig.len() {
        return false;
    }
    if !data[..sig.len()].eq_ignore_ascii_case(sig) {
        return false;
    }
    match data.get(sig.len()) {
        Some(&b' ') | Some(&b'>') => true,
        _ => sig == &b"<!--"[..],
    }
}

fn match_magic(data: &[u8]) -> Option<&'static str> {
    const RIFF: &[u8] = b"RIFF";
    let table: &[(&[u8], &'static str)] = &[
        (b"%PDF-", "application/pdf"),
        (b"%!PS-Adobe-", "application/postscript"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xFF\xD8\xFF", "image/jpeg"),
        (b"BM", "image/bmp"),
        (b"\x00\x00\x01\x00", "image/x-icon"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1F\x8B\x08", "application/x-gzip"),
        (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
        (b"\x00asm", "application/wasm"),
        (b"OggS", "application/ogg"),
        (b"fLaC", "audio/x-flac"),
        (b"ID3", "audio/mpeg"),
        (b"\x1A\x45\xDF\xA3", "video/webm"),
    ];
    for &(sig, mime) in table {
        if data.starts_with(sig) {
            return Some(mime);
        }
    }
    if data.len() >= 12 && data.starts_with(RIFF) {
        return match &data[8..12] {
            b"WEBP" => Some("image/webp"),
            b"WAVE" => Some("audio/wave"),
            b"AVI " => Some("video/avi"),
            _ => None,
        };
    }
    None
}

/// Control bytes outside the whitespace/escape set mark binary content.
fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
