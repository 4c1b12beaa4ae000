use http::HeaderMap;
use http::header;

/// Returns whether the client accepts a gzip-encoded response.
///
/// A request qualifies when any `Accept-Encoding` value carries a `gzip`
/// token (ASCII case-insensitive) with a positive quality weight. A missing
/// header or `gzip;q=0` means gzip is not accepted.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|entry| {
            let (encoding, quality) = parse_encoding_with_quality(entry.trim());
            encoding.eq_ignore_ascii_case("gzip") && quality > 0.0
        })
}

/// Splits an `Accept-Encoding` entry into its token and quality weight.
/// An absent or malformed `q` parameter counts as 1.0.
fn parse_encoding_with_quality(entry: &str) -> (&str, f32) {
    let Some((token, param)) = entry.split_once(';') else {
        return (entry.trim(), 1.0);
    };
    let param = param.trim();
    let quality = param
        .strip_prefix("q=")
        .or_else(|| param.strip_prefix("Q="))
        .and_then(|weight| weight.parse().ok())
        .unwrap_or(1.0);
    (token.trim(), quality)
}
