use crate::sink::{CloseNotify, Hijack, Push, ResponseWriter};
use crate::writer::GzipResponseWriter;
use http::{HeaderMap, StatusCode};
use std::io::{self, Write};

/// Optional transport interfaces detected on the sink before wrapping.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Capabilities {
    pub(crate) close_notify: bool,
    pub(crate) hijack: bool,
    pub(crate) push: bool,
}

impl Capabilities {
    pub(crate) fn detect(sink: &mut dyn ResponseWriter) -> Self {
        Self {
            close_notify: sink.as_close_notify().is_some(),
            hijack: sink.as_hijack().is_some(),
            push: sink.as_push().is_some(),
        }
    }
}

/// Wraps the adaptive writer so that its capability probes expose exactly
/// the interfaces the underlying sink exposed, no more.
///
/// Without this, a handler probing the writer it was handed would see
/// capabilities the transport does not have (or miss ones it does).
/// Connection takeover and server push never coexist on one transport, so
/// that combination has no variant.
pub(crate) enum CapabilityWriter<'a> {
    Plain(GzipResponseWriter<'a>),
    CloseNotify(GzipResponseWriter<'a>),
    Hijack(GzipResponseWriter<'a>),
    Push(GzipResponseWriter<'a>),
    CloseNotifyHijack(GzipResponseWriter<'a>),
    CloseNotifyPush(GzipResponseWriter<'a>),
}

impl<'a> CapabilityWriter<'a> {
    pub(crate) fn wrap(writer: GzipResponseWriter<'a>, caps: Capabilities) -> Self {
        match (caps.close_notify, caps.hijack, caps.push) {
            (true, true, _) => Self::CloseNotifyHijack(writer),
            (true, false, true) => Self::CloseNotifyPush(writer),
            (true, false, false) => Self::CloseNotify(writer),
            (false, true, _) => Self::Hijack(writer),
            (false, false, true) => Self::Push(writer),
            (false, false, false) => Self::Plain(writer),
        }
    }

    fn inner(&mut self) -> &mut GzipResponseWriter<'a> {
        match self {
            Self::Plain(w)
            | Self::CloseNotify(w)
            | Self::Hijack(w)
            | Self::Push(w)
            | Self::CloseNotifyHijack(w)
            | Self::CloseNotifyPush(w) => w,
        }
    }
}

impl Write for CapabilityWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner().flush()
    }
}

impl ResponseWriter for CapabilityWriter<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner().headers_mut()
    }

    fn write_head(&mut self, status: StatusCode) -> io::Result<()> {
        self.inner().write_head(status)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.inner().finish()
    }

    fn as_close_notify(&mut self) -> Option<&mut dyn CloseNotify> {
        match self {
            Self::CloseNotify(w) | Self::CloseNotifyHijack(w) | Self::CloseNotifyPush(w) => {
                w.as_close_notify()
            }
            _ => None,
        }
    }

    fn as_hijack(&mut self) -> Option<&mut dyn Hijack> {
        match self {
            Self::Hijack(w) | Self::CloseNotifyHijack(w) => w.as_hijack(),
            _ => None,
        }
    }

    fn as_push(&mut self) -> Option<&mut dyn Push> {
        match self {
            Self::Push(w) | Self::CloseNotifyPush(w) => w.as_push(),
            _ => None,
        }
    }
}
