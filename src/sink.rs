use http::{HeaderMap, StatusCode};
use std::io::{self, Read, Write};
use std::sync::mpsc::Receiver;

/// The sink a response is written to.
///
/// This is the contract between the compression layer and the underlying
/// transport, and also the surface handlers write against: the adaptive
/// writer implements it too, so layers nest.
///
/// The expected call sequence per response is `write_head`* then `write`*
/// interleaved with `flush`, then `finish`. Body bytes go through the
/// [`Write`] supertrait so handlers can use `write_all` and `io::copy`.
pub trait ResponseWriter: Write {
    /// Returns the response headers.
    ///
    /// Mutations made after the status line has been committed to the
    /// transport are not observable by the client.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the status line and the current headers.
    ///
    /// Transports write both to the wire here; wrappers may instead record
    /// the code and defer the commit.
    fn write_head(&mut self, status: StatusCode) -> io::Result<()>;

    /// Ends the response. Idempotent: a second call is a no-op.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Returns the close-notification capability, if the sink has one.
    fn as_close_notify(&mut self) -> Option<&mut dyn CloseNotify> {
        None
    }

    /// Returns the connection-takeover capability, if the sink has one.
    fn as_hijack(&mut self) -> Option<&mut dyn Hijack> {
        None
    }

    /// Returns the server-push capability, if the sink has one.
    fn as_push(&mut self) -> Option<&mut dyn Push> {
        None
    }
}

/// Notification that the client side of the connection has gone away.
pub trait CloseNotify {
    /// Returns a receiver that yields one value when the client disconnects.
    fn close_notify(&mut self) -> Receiver<()>;
}

/// Raw connection takeover.
pub trait Hijack {
    /// Detaches the underlying connection from the response machinery.
    ///
    /// After a successful hijack the caller owns the connection and the
    /// response layer performs no further writes.
    fn hijack(&mut self) -> io::Result<Box<dyn Connection>>;
}

/// Server-initiated push.
pub trait Push {
    /// Initiates a push request for `target` with the given request headers.
    fn push(&mut self, target: &str, headers: &HeaderMap) -> io::Result<()>;
}

/// A bidirectional byte stream yielded by [`Hijack::hijack`].
pub trait Connection: Read + Write + Send {}

impl<T: Read + Write + Send> Connection for T {}
