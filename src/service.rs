use crate::accept::accepts_gzip;
use crate::capability::{Capabilities, CapabilityWriter};
use crate::config::Config;
use crate::sink::ResponseWriter;
use crate::writer::GzipResponseWriter;
use http::{header, HeaderValue, Request};
use std::io;
use std::sync::Arc;

/// A synchronous request handler.
///
/// Any `Fn(Request<B>, &mut dyn ResponseWriter) -> io::Result<()>` is a
/// handler, so closures work directly.
pub trait Handler<B = ()> {
    /// Serves one request, writing the response to `w`.
    fn serve(&self, req: Request<B>, w: &mut dyn ResponseWriter) -> io::Result<()>;
}

impl<B, F> Handler<B> for F
where
    F: Fn(Request<B>, &mut dyn ResponseWriter) -> io::Result<()>,
{
    fn serve(&self, req: Request<B>, w: &mut dyn ResponseWriter) -> io::Result<()> {
        self(req, w)
    }
}

/// Compresses responses of the wrapped [`Handler`] with gzip when the
/// client accepts it and the response qualifies.
///
/// Built by [`GzipLayer`](crate::GzipLayer).
#[derive(Debug, Clone)]
pub struct GzipService<H> {
    inner: H,
    config: Arc<Config>,
}

impl<H> GzipService<H> {
    pub(crate) fn new(inner: H, config: Arc<Config>) -> Self {
        Self { inner, config }
    }

    /// Gets a reference to the wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Gets a mutable reference to the wrapped handler.
    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    /// Consumes `self`, returning the wrapped handler.
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H> GzipService<H> {
    /// Serves one request, interposing the compression layer between the
    /// handler and `sink`.
    ///
    /// `Vary: Accept-Encoding` is appended whether or not the response ends
    /// up compressed, since the request's `Accept-Encoding` influenced it
    /// either way. Clients that do not accept gzip get the handler's output
    /// unmodified.
    pub fn serve<B>(&self, req: Request<B>, sink: &mut dyn ResponseWriter) -> io::Result<()>
    where
        H: Handler<B>,
    {
        sink.headers_mut()
            .append(header::VARY, HeaderValue::from_static("Accept-Encoding"));

        if !accepts_gzip(req.headers()) {
            return self.inner.serve(req, sink);
        }

        let caps = Capabilities::detect(sink);
        let writer = GzipResponseWriter::new(sink, Arc::clone(&self.config));
        let mut wrapped = CapabilityWriter::wrap(writer, caps);
        let result = self.inner.serve(req, &mut wrapped);
        if let Err(error) = wrapped.finish() {
            tracing::error!(%error, "failed to finalize compressed response");
        }
        result
    }
}

impl<B, H: Handler<B>> Handler<B> for GzipService<H> {
    fn serve(&self, req: Request<B>, w: &mut dyn ResponseWriter) -> io::Result<()> {
        GzipService::serve(self, req, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Level;
    use crate::layer::GzipLayer;
    use crate::sink::testing::MockSink;
    use flate2::read::GzDecoder;
    use http::StatusCode;
    use std::io::Read;

    fn request(accept_encoding: Option<&str>) -> Request<()> {
        let mut builder = Request::get("/");
        if let Some(value) = accept_encoding {
            builder = builder.header(header::ACCEPT_ENCODING, value);
        }
        builder.body(()).unwrap()
    }

    fn decode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    fn large_body() -> String {
        "the quick brown fox jumps over the lazy dog. ".repeat(30)
    }

    #[test]
    fn accepting_client_gets_gzip() {
        let body = large_body();
        let expected = body.clone();
        let service = GzipLayer::new().wrap(
            move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_all(body.as_bytes())
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        assert_eq!(sink.sent_headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(decode(&sink.body), expected.as_bytes());
        assert!(sink.body.len() < expected.len());
    }

    #[test]
    fn non_accepting_client_gets_identity() {
        let body = large_body();
        let expected = body.clone();
        let service = GzipLayer::new().wrap(
            move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_all(body.as_bytes())
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(None), &mut sink).unwrap();

        assert!(!sink.headers.contains_key(header::CONTENT_ENCODING));
        assert_eq!(sink.body, expected.as_bytes());
    }

    #[test]
    fn zero_quality_gzip_gets_identity() {
        let body = large_body();
        let service = GzipLayer::new().wrap(
            move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_all(body.as_bytes())
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip;q=0")), &mut sink).unwrap();

        assert!(!sink.headers.contains_key(header::CONTENT_ENCODING));
    }

    #[test]
    fn small_response_stays_identity() {
        let service = GzipLayer::new().wrap(
            |_req: Request<()>, w: &mut dyn ResponseWriter| w.write_all(b"ok"),
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        assert!(!sink.sent_headers().contains_key(header::CONTENT_ENCODING));
        assert_eq!(sink.body, b"ok");
    }

    #[test]
    fn vary_is_always_appended() {
        let service = GzipLayer::new().wrap(
            |_req: Request<()>, w: &mut dyn ResponseWriter| w.write_all(b"ok"),
        );

        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();
        assert_eq!(sink.sent_headers().get(header::VARY).unwrap(), "Accept-Encoding");

        let mut sink = MockSink::new();
        service.serve(request(None), &mut sink).unwrap();
        assert_eq!(sink.headers.get(header::VARY).unwrap(), "Accept-Encoding");
    }

    #[test]
    fn vary_appends_to_existing_values() {
        let service = GzipLayer::new().wrap(
            |_req: Request<()>, w: &mut dyn ResponseWriter| w.write_all(b"ok"),
        );
        let mut sink = MockSink::new();
        sink.headers
            .insert(header::VARY, HeaderValue::from_static("Origin"));
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        let values: Vec<_> = sink.sent_headers().get_all(header::VARY).iter().collect();
        assert_eq!(values, ["Origin", "Accept-Encoding"]);
    }

    #[test]
    fn handler_content_length_is_dropped_when_compressing() {
        let body = large_body();
        let len = body.len().to_string();
        let service = GzipLayer::new().wrap(
            move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.headers_mut().insert(
                    header::CONTENT_LENGTH,
                    HeaderValue::from_str(&len).unwrap(),
                );
                w.write_all(body.as_bytes())
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        assert!(!sink.sent_headers().contains_key(header::CONTENT_LENGTH));
    }

    #[test]
    fn pre_encoded_response_passes_through() {
        let body = large_body();
        let expected = body.clone();
        let service = GzipLayer::new().wrap(
            move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.headers_mut()
                    .insert(header::CONTENT_ENCODING, HeaderValue::from_static("br"));
                w.write_all(body.as_bytes())
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        assert_eq!(sink.sent_headers().get(header::CONTENT_ENCODING).unwrap(), "br");
        assert_eq!(sink.body, expected.as_bytes());
    }

    #[test]
    fn handler_status_is_preserved() {
        let body = large_body();
        let service = GzipLayer::new().wrap(
            move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_head(StatusCode::CREATED)?;
                w.write_all(body.as_bytes())
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        assert_eq!(sink.status, Some(StatusCode::CREATED));
        assert_eq!(sink.sent_headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
    }

    #[test]
    fn handler_without_explicit_finish_is_finalized() {
        let service = GzipLayer::new().wrap(
            |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_all(b"no finish call")
                // the layer finalizes on the handler's behalf
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        assert_eq!(sink.status, Some(StatusCode::OK));
        assert_eq!(sink.body, b"no finish call");
    }

    #[test]
    fn empty_response_commits_status_only() {
        let service = GzipLayer::new().wrap(
            |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_head(StatusCode::NO_CONTENT)
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        assert_eq!(sink.status, Some(StatusCode::NO_CONTENT));
        assert!(sink.body.is_empty());
        assert!(!sink.sent_headers().contains_key(header::CONTENT_ENCODING));
    }

    #[test]
    fn every_level_round_trips() {
        let body = large_body();
        let levels = [
            Level::None,
            Level::Fastest,
            Level::Best,
            Level::Default,
            Level::HuffmanOnly,
            Level::Precise(3),
        ];
        for level in levels {
            let body = body.clone();
            let expected = body.clone();
            let service = GzipLayer::builder()
                .level(level)
                .build()
                .unwrap()
                .wrap(move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                    w.write_all(body.as_bytes())
                });
            let mut sink = MockSink::new();
            service.serve(request(Some("gzip")), &mut sink).unwrap();
            assert_eq!(decode(&sink.body), expected.as_bytes(), "level {level:?}");
        }
    }

    #[test]
    fn compressors_are_reused_across_requests() {
        let body = large_body();
        let layer = GzipLayer::new();
        let service = layer.wrap(
            move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_all(body.as_bytes())
            },
        );

        for _ in 0..3 {
            let mut sink = MockSink::new();
            service.serve(request(Some("gzip")), &mut sink).unwrap();
        }
        // sequential requests share one pooled encoder
        assert_eq!(layer.config.compressors.size(Level::Default), 1);
    }

    #[test]
    fn handler_error_propagates_after_finalization() {
        let service = GzipLayer::new().wrap(
            |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_all(b"partial")?;
                Err(io::Error::other("handler failed"))
            },
        );
        let mut sink = MockSink::new();
        let err = service.serve(request(Some("gzip")), &mut sink).unwrap_err();
        assert_eq!(err.to_string(), "handler failed");
        // the buffered prefix still went out
        assert_eq!(sink.body, b"partial");
    }

    #[test]
    fn content_type_is_sniffed_for_the_client() {
        let page = format!("<!doctype html><html><body>{}</body></html>", large_body());
        let expected = page.clone();
        let service = GzipLayer::new().wrap(
            move |_req: Request<()>, w: &mut dyn ResponseWriter| {
                w.write_all(page.as_bytes())
            },
        );
        let mut sink = MockSink::new();
        service.serve(request(Some("gzip")), &mut sink).unwrap();

        assert_eq!(
            sink.sent_headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(decode(&sink.body), expected.as_bytes());
    }
}
