use crate::pool::{BufferPool, CompressorPool};
use crate::sniff::SniffFn;
use flate2::Compression;
use http::HeaderMap;
use http::header;
use mime::Mime;
use std::fmt;
use thiserror::Error;

/// gzip compression level.
///
/// Mirrors the level surface of the underlying deflate implementation;
/// `Precise` accepts an explicit numeric level in `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    /// Store without compression, still framed as gzip.
    None,
    /// Fastest compression.
    Fastest,
    /// Best compression ratio.
    Best,
    /// The implementation's default trade-off.
    #[default]
    Default,
    /// Huffman coding only. The deflate backend exposes no strategy switch,
    /// so this is approximated by the fastest level.
    HuffmanOnly,
    /// An explicit numeric level in `0..=9`.
    Precise(u32),
}

impl Level {
    pub(crate) fn compression(self) -> Compression {
        match self {
            Level::None => Compression::none(),
            Level::Fastest | Level::HuffmanOnly => Compression::fast(),
            Level::Best => Compression::best(),
            Level::Default => Compression::default(),
            Level::Precise(n) => Compression::new(n),
        }
    }

    pub(crate) fn validate(self) -> Result<(), ConfigError> {
        match self {
            Level::Precise(n) if n > 9 => Err(ConfigError::InvalidLevel(n)),
            _ => Ok(()),
        }
    }
}

/// Error returned when a layer is built from invalid options.
///
/// Construction fails fast: a misconfigured layer never serves a request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The numeric compression level is outside `0..=9`.
    #[error("invalid compression level: {0}")]
    InvalidLevel(u32),
    /// A content-type pattern is not a MIME type or `type/*` range.
    #[error("invalid content type pattern: {0:?}")]
    InvalidContentType(String),
}

/// Immutable per-layer configuration.
///
/// Owns both pools so that independently configured layers never share
/// pooled state.
pub(crate) struct Config {
    pub(crate) level: Level,
    pub(crate) min_size: usize,
    pub(crate) content_types: Vec<Mime>,
    pub(crate) sniffer: SniffFn,
    pub(crate) compressors: CompressorPool,
    pub(crate) buffers: BufferPool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("level", &self.level)
            .field("min_size", &self.min_size)
            .field("content_types", &self.content_types)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Whether the allow-list admits the current `Content-Type` header.
    ///
    /// An empty list admits everything. A missing or unparseable header
    /// value is never admitted by a non-empty list.
    pub(crate) fn content_type_allowed(&self, headers: &HeaderMap) -> bool {
        if self.content_types.is_empty() {
            return true;
        }
        let Some(content_type) = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Mime>().ok())
        else {
            return false;
        };
        self.content_types
            .iter()
            .any(|pattern| pattern_matches(pattern, &content_type))
    }
}

/// Matches a `type/subtype` or `type/*` pattern, ignoring parameters.
fn pattern_matches(pattern: &Mime, content_type: &Mime) -> bool {
    pattern.type_() == content_type.type_()
        && (pattern.subtype() == mime::STAR || pattern.subtype() == content_type.subtype())
}

/// Parses and validates the allow-list patterns from a builder.
pub(crate) fn parse_content_types(patterns: &[String]) -> Result<Vec<Mime>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            pattern
                .parse::<Mime>()
                .map_err(|_| ConfigError::InvalidContentType(pattern.clone()))
        })
        .collect()
}
