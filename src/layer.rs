use crate::config::{Config, ConfigError, Level, parse_content_types};
use crate::pool::{BufferPool, CompressorPool};
use crate::service::GzipService;
use crate::sniff::{SniffFn, detect_content_type};
use std::sync::Arc;
use tower_layer::Layer;

/// Default minimum body size for compression, in bytes.
///
/// Responses that finish below this size are sent uncompressed.
pub const DEFAULT_MIN_SIZE: usize = 512;

/// A layer that adaptively gzip-compresses response bodies.
///
/// Handlers wrapped by this layer are served through an adaptive response
/// writer that buffers early writes, infers the content type when unset and
/// commits to compression or pass-through once enough of the body is known.
///
/// Each layer owns its own compressor and buffer pools, shared by every
/// service it produces.
#[derive(Debug, Clone)]
pub struct GzipLayer {
    pub(crate) config: Arc<Config>,
}

impl GzipLayer {
    /// Creates a layer with the default level, a 512 byte minimum size and
    /// no content-type restrictions.
    pub fn new() -> Self {
        GzipLayerBuilder::default()
            .build()
            .expect("default configuration is valid")
    }

    /// Returns a builder for a customised layer.
    pub fn builder() -> GzipLayerBuilder {
        GzipLayerBuilder::default()
    }

    /// Wraps a handler directly, without going through [`Layer::layer`].
    pub fn wrap<H>(&self, inner: H) -> GzipService<H> {
        GzipService::new(inner, Arc::clone(&self.config))
    }
}

impl Default for GzipLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Layer<H> for GzipLayer {
    type Service = GzipService<H>;

    fn layer(&self, inner: H) -> Self::Service {
        self.wrap(inner)
    }
}

/// Builder for [`GzipLayer`].
///
/// Options are validated by [`build`](Self::build); an invalid level or
/// content-type pattern fails there, before any request is served.
pub struct GzipLayerBuilder {
    level: Level,
    min_size: usize,
    content_types: Vec<String>,
    sniffer: SniffFn,
}

impl Default for GzipLayerBuilder {
    fn default() -> Self {
        Self {
            level: Level::Default,
            min_size: DEFAULT_MIN_SIZE,
            content_types: Vec::new(),
            sniffer: detect_content_type,
        }
    }
}

impl GzipLayerBuilder {
    /// Sets the gzip compression level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the minimum body size required for compression.
    ///
    /// Bodies that finish below this size are sent uncompressed; zero
    /// compresses every eligible response.
    pub fn min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Restricts compression to responses whose content type matches one of
    /// the given patterns (`type/subtype` or `type/*`).
    ///
    /// An empty list, the default, allows every content type.
    pub fn content_types<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_types = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the content-type sniffing function used when a handler never
    /// sets `Content-Type`.
    pub fn content_type_sniffer(mut self, sniffer: SniffFn) -> Self {
        self.sniffer = sniffer;
        self
    }

    /// Validates the options and builds the layer.
    pub fn build(self) -> Result<GzipLayer, ConfigError> {
        self.level.validate()?;
        let content_types = parse_content_types(&self.content_types)?;
        Ok(GzipLayer {
            config: Arc::new(Config {
                level: self.level,
                min_size: self.min_size,
                content_types,
                sniffer: self.sniffer,
                compressors: CompressorPool::new(),
                buffers: BufferPool::new(self.min_size.max(DEFAULT_MIN_SIZE)),
            }),
        })
    }
}
