//! Adaptive gzip compression for streaming HTTP response writers.
//!
//! This crate provides a layer that wraps a request [`Handler`] and
//! transparently gzip-compresses its response when the client accepts it and
//! the response turns out to be worth compressing. The decision is deferred:
//! early body writes are buffered until a size threshold is reached, so
//! short responses (where the gzip framing would outweigh the savings) go
//! out untouched.
//!
//! # Example
//!
//! ```ignore
//! use http_gzip_layer::{GzipLayer, ResponseWriter};
//! use http::Request;
//! use std::io::Write;
//!
//! let service = GzipLayer::new().wrap(
//!     |_req: Request<()>, w: &mut dyn ResponseWriter| {
//!         w.write_all(b"hello, world")
//!     },
//! );
//! ```
//!
//! # Compression Rules
//!
//! A response is **not** compressed when:
//! - The request carries no `Accept-Encoding` naming `gzip` with a
//!   positive quality value
//! - The handler set `Content-Encoding` itself (the body is already encoded)
//! - The `Content-Type` does not match the configured allow list
//! - The body ends below the minimum size threshold (default: 512 bytes)
//!
//! # Response Modifications
//!
//! `Vary: Accept-Encoding` is appended to every response the layer touches.
//! When compression is applied:
//! - `Content-Encoding` is set to `gzip`
//! - `Content-Length` is removed (the compressed size is unknown)
//! - `Content-Type` is sniffed from the first body bytes if the handler
//!   set none

#![deny(missing_docs)]

mod accept;
mod capability;
mod compressor;
mod config;
mod layer;
mod pool;
mod service;
mod sink;
mod sniff;
mod writer;

pub use accept::accepts_gzip;
pub use config::{ConfigError, Level};
pub use layer::{GzipLayer, GzipLayerBuilder, DEFAULT_MIN_SIZE};
pub use service::{GzipService, Handler};
pub use sink::{CloseNotify, Connection, Hijack, Push, ResponseWriter};
pub use sniff::{detect_content_type, SniffFn};
pub use writer::GzipResponseWriter;
