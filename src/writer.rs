use crate::compressor::GzipCompressor;
use crate::config::Config;
use crate::sink::{CloseNotify, Hijack, Push, ResponseWriter};
use bytes::BytesMut;
use http::{HeaderMap, HeaderValue, StatusCode};
use http::header;
use std::io::{self, Write};
use std::mem;
use std::sync::Arc;

/// Upper bound on the prefix handed to the content-type sniffer.
const SNIFF_LEN: usize = 512;

/// The adaptive response writer.
///
/// Buffers early writes until enough of the body is known to decide between
/// gzip compression and pass-through, then commits the status line and
/// headers exactly once and streams the remainder. Created per request by
/// [`GzipService`](crate::GzipService); handlers see it behind the
/// [`ResponseWriter`] trait.
///
/// Finalization is idempotent and guaranteed: an explicit
/// [`finish`](ResponseWriter::finish) is a no-op the second time, and a
/// `Drop` impl covers every other exit path, including handler panics.
pub struct GzipResponseWriter<'a> {
    sink: &'a mut dyn ResponseWriter,
    config: Arc<Config>,
    /// First recorded status code wins; unset until the handler writes.
    status: Option<StatusCode>,
    state: State,
}

/// Disposition state. The payloads enforce that at most one of the pending
/// buffer and the active compressor exists at any time.
enum State {
    Buffering { buf: BytesMut },
    Compressing { gz: GzipCompressor },
    PassThrough,
    Closed,
}

impl<'a> GzipResponseWriter<'a> {
    pub(crate) fn new(sink: &'a mut dyn ResponseWriter, config: Arc<Config>) -> Self {
        let buf = config.buffers.take();
        Self {
            sink,
            config,
            status: None,
            state: State::Buffering { buf },
        }
    }

    /// Handles a write while the compression decision is still pending.
    fn buffered_write(&mut self, b: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }

        // The handler is emitting an already-encoded body.
        if self.sink.headers_mut().contains_key(header::CONTENT_ENCODING) {
            self.commit_pass_through()?;
            return self.sink.write(b);
        }

        {
            let State::Buffering { buf } = &mut self.state else {
                unreachable!()
            };
            if buf.len() + b.len() < self.config.min_size {
                buf.extend_from_slice(b);
                return Ok(b.len());
            }
        }

        self.ensure_content_type(b);

        if self.config.content_type_allowed(self.sink.headers_mut()) {
            self.commit_compressing()?;
            let State::Compressing { gz } = &mut self.state else {
                unreachable!()
            };
            gz.write(b, &mut *self.sink)?;
            Ok(b.len())
        } else {
            self.commit_pass_through()?;
            self.sink.write(b)
        }
    }

    /// Sniffs and sets `Content-Type` from the buffered prefix plus the
    /// committing write, unless the handler already set one.
    ///
    /// The sniff window is the first min(512, available) bytes. `next` is
    /// empty on the finalize path, where the whole body is the buffer.
    fn ensure_content_type(&mut self, next: &[u8]) {
        if self.sink.headers_mut().contains_key(header::CONTENT_TYPE) {
            return;
        }
        let State::Buffering { buf } = &self.state else {
            return;
        };
        if buf.is_empty() && next.is_empty() {
            return;
        }

        let sniffer = self.config.sniffer;
        let value = if buf.is_empty() {
            sniffer(&next[..next.len().min(SNIFF_LEN)])
        } else if buf.len() >= SNIFF_LEN {
            sniffer(&buf[..SNIFF_LEN])
        } else {
            let take = next.len().min(SNIFF_LEN - buf.len());
            let mut window = Vec::with_capacity(buf.len() + take);
            window.extend_from_slice(buf);
            window.extend_from_slice(&next[..take]);
            sniffer(&window)
        };

        self.sink
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
    }

    /// Commits to pass-through: status line, headers and the buffered
    /// prefix go to the sink unmodified.
    fn commit_pass_through(&mut self) -> io::Result<()> {
        let status = self.status.unwrap_or(StatusCode::OK);
        self.sink.write_head(status)?;
        let State::Buffering { buf } = mem::replace(&mut self.state, State::PassThrough) else {
            unreachable!()
        };
        if !buf.is_empty() {
            self.sink.write_all(&buf)?;
        }
        self.config.buffers.put(buf);
        Ok(())
    }

    /// Commits to compression: sets `Content-Encoding`, drops any
    /// `Content-Length` (the compressed size is unknown), writes the status
    /// line, borrows a pooled compressor and replays the buffered prefix
    /// through it.
    fn commit_compressing(&mut self) -> io::Result<()> {
        let status = self.status.unwrap_or(StatusCode::OK);
        let headers = self.sink.headers_mut();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers.remove(header::CONTENT_LENGTH);
        self.sink.write_head(status)?;

        let gz = self.config.compressors.acquire(self.config.level);
        let State::Buffering { buf } = mem::replace(&mut self.state, State::Compressing { gz })
        else {
            unreachable!()
        };
        let State::Compressing { gz } = &mut self.state else {
            unreachable!()
        };
        if !buf.is_empty() {
            gz.write(&buf, &mut *self.sink)?;
        }
        self.config.buffers.put(buf);
        Ok(())
    }

    fn do_finish(&mut self) -> io::Result<()> {
        match &self.state {
            State::Closed => Ok(()),

            State::PassThrough => {
                self.state = State::Closed;
                Ok(())
            }

            State::Compressing { .. } => {
                let State::Compressing { mut gz } = mem::replace(&mut self.state, State::Closed)
                else {
                    unreachable!()
                };
                // An encoder that fails to finish is dropped, never pooled.
                gz.finish(&mut *self.sink)?;
                self.config.compressors.release(self.config.level, gz);
                Ok(())
            }

            // The handler finished below the threshold: the buffer is the
            // whole body and it goes out uncompressed.
            State::Buffering { .. } => {
                self.ensure_content_type(&[]);
                let status = self.status.unwrap_or(StatusCode::OK);
                let State::Buffering { buf } = mem::replace(&mut self.state, State::Closed) else {
                    unreachable!()
                };
                let mut result = self.sink.write_head(status);
                if result.is_ok() && !buf.is_empty() {
                    result = self.sink.write_all(&buf);
                }
                self.config.buffers.put(buf);
                result
            }
        }
    }
}

impl Write for GzipResponseWriter<'_> {
    fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        match &mut self.state {
            State::Compressing { gz } => {
                gz.write(b, &mut *self.sink)?;
                Ok(b.len())
            }
            State::PassThrough => self.sink.write(b),
            State::Closed => Err(io::Error::other("write to finalized response")),
            State::Buffering { .. } => self.buffered_write(b),
        }
    }

    /// Flushing is a no-op while buffering: the compression decision is
    /// still pending and flushing would force a premature commitment.
    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            State::Buffering { .. } | State::Closed => Ok(()),
            State::Compressing { gz } => {
                gz.flush(&mut *self.sink)?;
                self.sink.flush()
            }
            State::PassThrough => self.sink.flush(),
        }
    }
}

impl ResponseWriter for GzipResponseWriter<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.sink.headers_mut()
    }

    /// Records the status code; the first call wins and nothing reaches the
    /// sink until the writer commits.
    fn write_head(&mut self, status: StatusCode) -> io::Result<()> {
        if self.status.is_none() {
            self.status = Some(status);
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.do_finish()
    }

    fn as_close_notify(&mut self) -> Option<&mut dyn CloseNotify> {
        self.sink.as_close_notify()
    }

    fn as_hijack(&mut self) -> Option<&mut dyn Hijack> {
        self.sink.as_hijack()
    }

    fn as_push(&mut self) -> Option<&mut dyn Push> {
        self.sink.as_push()
    }
}

impl Drop for GzipResponseWriter<'_> {
    fn drop(&mut self) {
        if !matches!(self.state, State::Closed) {
            if let Err(error) = self.do_finish() {
                tracing::error!(%error, "failed to finalize response writer");
            }
        }
    }
}
