use crate::config::Level;
use flate2::{Compress, FlushCompress, Status};
use std::io::{self, Write};

/// gzip member header: deflate method, no flags, no mtime, unknown OS.
const GZIP_HEADER: [u8; 10] = [0x1F, 0x8B, 0x08, 0, 0, 0, 0, 0, 0, 0xFF];

/// Scratch growth step for each deflate call.
const OUT_CHUNK: usize = 8 * 1024;

/// A reusable gzip encoder.
///
/// Wraps a raw-deflate stream in gzip framing (header, CRC32 and length
/// trailer) so that the deflate state can be [`reset`](Self::reset) and the
/// instance rebound to the next response, which is what lets the pool
/// amortize encoder allocations. Output is staged in a retained scratch
/// buffer and drained to the sink on every call.
pub(crate) struct GzipCompressor {
    deflate: Compress,
    crc: flate2::Crc,
    out: Vec<u8>,
    header_written: bool,
    finished: bool,
}

impl GzipCompressor {
    pub(crate) fn new(level: Level) -> Self {
        Self {
            deflate: Compress::new(level.compression(), false),
            crc: flate2::Crc::new(),
            out: Vec::with_capacity(OUT_CHUNK),
            header_written: false,
            finished: false,
        }
    }

    /// Compresses `input` and writes any produced bytes to `sink`.
    pub(crate) fn write<W: Write + ?Sized>(&mut self, input: &[u8], sink: &mut W) -> io::Result<()> {
        self.write_header(sink)?;
        self.crc.update(input);

        let mut consumed = 0;
        while consumed < input.len() {
            self.out.clear();
            self.out.reserve(OUT_CHUNK);
            let before = self.deflate.total_in();
            self.deflate
                .compress_vec(&input[consumed..], &mut self.out, FlushCompress::None)
                .map_err(io::Error::other)?;
            consumed += (self.deflate.total_in() - before) as usize;
            if !self.out.is_empty() {
                sink.write_all(&self.out)?;
            }
        }
        Ok(())
    }

    /// Emits all pending compressed data with a sync flush marker.
    ///
    /// A sync flush always produces output (the empty-stored-block marker at
    /// minimum), so the loop keys on output-space exhaustion instead: only a
    /// completely full scratch buffer means more is pending.
    pub(crate) fn flush<W: Write + ?Sized>(&mut self, sink: &mut W) -> io::Result<()> {
        self.write_header(sink)?;
        loop {
            self.out.clear();
            self.out.reserve(OUT_CHUNK);
            self.deflate
                .compress_vec(&[], &mut self.out, FlushCompress::Sync)
                .map_err(io::Error::other)?;
            if !self.out.is_empty() {
                sink.write_all(&self.out)?;
            }
            if self.out.len() < self.out.capacity() {
                break;
            }
        }
        Ok(())
    }

    /// Terminates the deflate stream and writes the gzip trailer.
    ///
    /// Must be called exactly once per borrow; the pool only accepts
    /// instances that finished cleanly.
    pub(crate) fn finish<W: Write + ?Sized>(&mut self, sink: &mut W) -> io::Result<()> {
        self.write_header(sink)?;
        loop {
            self.out.clear();
            self.out.reserve(OUT_CHUNK);
            let status = self
                .deflate
                .compress_vec(&[], &mut self.out, FlushCompress::Finish)
                .map_err(io::Error::other)?;
            if !self.out.is_empty() {
                sink.write_all(&self.out)?;
            }
            if matches!(status, Status::StreamEnd) {
                break;
            }
        }

        let mut trailer = [0u8; 8];
        trailer[..4].copy_from_slice(&self.crc.sum().to_le_bytes());
        trailer[4..].copy_from_slice(&self.crc.amount().to_le_bytes());
        sink.write_all(&trailer)?;
        self.finished = true;
        Ok(())
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Rebinds the encoder for its next borrow from the pool.
    pub(crate) fn reset(&mut self) {
        self.deflate.reset();
        self.crc.reset();
        self.out.clear();
        self.header_written = false;
        self.finished = false;
    }

    fn write_header<W: Write + ?Sized>(&mut self, sink: &mut W) -> io::Result<()> {
        if !self.header_written {
            sink.write_all(&GZIP_HEADER)?;
            self.header_written = true;
        }
        Ok(())
    }
}
