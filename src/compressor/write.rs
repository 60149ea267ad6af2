//!Writer compressor.

use core::{fmt, ops};
use std::io::{self, Write};

use bytes::Bytes;

use crate::deflater::{Deflater, FlushMode};
use crate::error::{check_bounds, Error};

const DEFAULT_BUFFER_SIZE: usize = 512;
//zlib repeats flush marker on every flush call that fills output, unless output is greater than 6 bytes.
const SYNC_FLUSH_WINDOW: usize = 16;

///Deflater used by [DeflaterWriter]
///
///Only `Owned` deflater is released when writer is closed.
pub enum DeflaterRef<'a> {
    ///Deflater owned by writer.
    Owned(Deflater),
    ///Deflater supplied by caller, which outlives writer.
    Borrowed(&'a Deflater),
}

impl ops::Deref for DeflaterRef<'_> {
    type Target = Deflater;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        match self {
            DeflaterRef::Owned(deflater) => deflater,
            DeflaterRef::Borrowed(deflater) => deflater,
        }
    }
}

impl From<Deflater> for DeflaterRef<'static> {
    #[inline(always)]
    fn from(deflater: Deflater) -> Self {
        DeflaterRef::Owned(deflater)
    }
}

impl<'a> From<&'a Deflater> for DeflaterRef<'a> {
    #[inline(always)]
    fn from(deflater: &'a Deflater) -> Self {
        DeflaterRef::Borrowed(deflater)
    }
}

#[derive(Debug, Copy, Clone)]
///Configuration of [DeflaterWriter]
pub struct WriterOptions {
    buffer_size: usize,
    sync_flush: bool,
}

impl WriterOptions {
    #[inline(always)]
    ///Creates new default options
    pub const fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            sync_flush: false,
        }
    }

    #[inline]
    ///Sets size of output buffer, which must be greater than 0.
    ///
    ///Defaults to 512.
    ///
    ///Sync flush always writes through window of at least 16 bytes, so that flush completes
    ///even with smaller buffer.
    pub const fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    #[inline]
    ///Sets whether `flush()` forwards [FlushMode::SyncFlush] to deflater before flushing writer.
    ///
    ///Defaults to `false`, in which case `flush()` only flushes writer.
    pub const fn sync_flush(mut self, sync_flush: bool) -> Self {
        self.sync_flush = sync_flush;
        self
    }
}

impl Default for WriterOptions {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

///Compressing writer
///
///It writes compressed data to supplied writer that implements `Write`, passing it through
///internal buffer of fixed size.
///
///Stream is terminated by [finish](Self::finish) or [close](Self::close).
///Writer that is dropped without being closed is closed on drop, ignoring errors.
///
///## Usage
///
///```rust
///use std::io::Write;
///use deflater::DeflaterWriter;
///
///let mut output = Vec::new();
///let mut writer = DeflaterWriter::new(&mut output).expect("create writer");
///writer.write_all(b"hello hello hello").expect("write");
///writer.close().expect("close");
///drop(writer);
///assert!(output.len() > 0);
///```
pub struct DeflaterWriter<'a, W: Write> {
    deflater: DeflaterRef<'a>,
    writer: Option<W>,
    buffer: Box<[u8]>,
    sync_flush: bool,
    closed: bool,
}

#[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
impl<W: Write> DeflaterWriter<'static, W> {
    #[inline]
    ///Creates new instance with default deflater and buffer of 512 bytes
    pub fn new(writer: W) -> Result<Self, Error> {
        Self::with_sync_flush(writer, false)
    }

    #[inline]
    ///Creates new instance with default deflater, specifying whether `flush()` forwards
    ///[FlushMode::SyncFlush]
    pub fn with_sync_flush(writer: W, sync_flush: bool) -> Result<Self, Error> {
        Self::with_deflater(writer, Deflater::new()?, WriterOptions::new().sync_flush(sync_flush))
    }
}

impl<'a, W: Write> DeflaterWriter<'a, W> {
    ///Creates new instance with specified `deflater`.
    ///
    ///Returns [Error::InvalidArgument] if buffer size is 0.
    pub fn with_deflater<D: Into<DeflaterRef<'a>>>(writer: W, deflater: D, opts: WriterOptions) -> Result<Self, Error> {
        if opts.buffer_size == 0 {
            return Err(Error::InvalidArgument("buffer size must be greater than 0"));
        }

        Ok(Self {
            deflater: deflater.into(),
            writer: Some(writer),
            buffer: vec![0; opts.buffer_size].into_boxed_slice(),
            sync_flush: opts.sync_flush,
            closed: false,
        })
    }

    #[inline]
    ///Returns reference to underlying deflater
    pub fn deflater(&self) -> &Deflater {
        &self.deflater
    }

    #[inline]
    ///Returns reference to underlying writer, unless writer is closed.
    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }

    #[inline]
    ///Returns mutable reference to underlying writer, unless writer is closed.
    ///
    ///Writing into it directly corrupts compressed stream.
    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.writer.as_mut()
    }

    #[inline]
    ///Returns whether writer is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline(always)]
    fn writer(&mut self) -> io::Result<&mut W> {
        match self.writer.as_mut() {
            Some(writer) => Ok(writer),
            None => Err(Error::ClosedState.into()),
        }
    }

    #[inline(always)]
    fn deflate(&mut self, mode: FlushMode) -> io::Result<usize> {
        deflate_into(&self.deflater, &mut self.writer, &mut self.buffer, mode)
    }

    ///Compresses `data[offset..offset + length]`, writing produced output.
    ///
    ///Returns once all of the data is consumed by deflater, although deflater may still hold part
    ///of it internally, until flushed or finished.
    ///
    ///Data is copied into deflater's input before compression, so `data` is free to be reused
    ///as soon as this returns.
    ///
    ///If underlying writer fails, error is returned as it is. Deflater remains consistent, so that
    ///it is possible to continue, but output produced by failed call is lost.
    pub fn write_slice(&mut self, data: &[u8], offset: usize, length: usize) -> io::Result<()> {
        if self.closed {
            return Err(Error::ClosedState.into());
        }
        if self.deflater.finished() {
            return Err(Error::StreamFinished.into());
        }
        check_bounds(data.len(), offset, length)?;
        if length == 0 {
            return Ok(());
        }

        self.deflater.set_input(Bytes::copy_from_slice(&data[offset..offset + length]), 0, length)?;
        while !self.deflater.needs_input() {
            self.deflate(FlushMode::NoFlush)?;
        }
        Ok(())
    }

    ///Finishes compressed stream without closing underlying writer.
    ///
    ///Does nothing if stream is already finished.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.deflater.finished() {
            return Ok(());
        }
        if self.closed {
            return Err(Error::ClosedState.into());
        }

        self.deflater.finish()?;
        while !self.deflater.finished() {
            self.deflate(FlushMode::NoFlush)?;
        }
        Ok(())
    }

    ///Finishes stream, releases owned deflater and closes underlying writer.
    ///
    ///Does nothing if already closed.
    ///
    ///Writer is closed even if finishing fails, in which case error of finish is returned.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        let result = self.finish();
        self.closed = true;
        if let DeflaterRef::Owned(deflater) = &self.deflater {
            deflater.close();
        }

        let writer = self.writer.take();
        result?;
        match writer {
            //Dropping writer closes it
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    ///Finishes stream and returns underlying writer without closing it.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.finish()?;
        self.closed = true;
        if let DeflaterRef::Owned(deflater) = &self.deflater {
            deflater.close();
        }

        match self.writer.take() {
            Some(writer) => Ok(writer),
            None => Err(Error::ClosedState.into()),
        }
    }
}

//Compresses single window worth of data and writes it out.
fn deflate_into<W: Write>(deflater: &Deflater, writer: &mut Option<W>, window: &mut [u8], mode: FlushMode) -> io::Result<usize> {
    let capacity = window.len();
    let len = deflater.compress(window, 0, capacity, mode)?;
    if len > 0 {
        match writer.as_mut() {
            Some(writer) => writer.write_all(&window[..len])?,
            None => return Err(Error::ClosedState.into()),
        }
    }
    Ok(len)
}

impl<W: Write> Write for DeflaterWriter<'_, W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_slice(buf, 0, buf.len()).map(|_| buf.len())
    }

    #[inline(always)]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_slice(buf, 0, buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(Error::ClosedState.into());
        }

        if self.sync_flush && !self.deflater.finished() {
            let mut scratch = [0u8; SYNC_FLUSH_WINDOW];
            let window = match self.buffer.len() < SYNC_FLUSH_WINDOW {
                true => &mut scratch[..],
                false => &mut self.buffer[..],
            };
            loop {
                //Applying parameters change is not flush, so it cannot complete it
                let applying_params = self.deflater.params_pending();
                let len = deflate_into(&self.deflater, &mut self.writer, window, FlushMode::SyncFlush)?;
                if len < window.len() && !applying_params {
                    break;
                }
            }
        }

        self.writer()?.flush()
    }
}

impl<W: Write> Drop for DeflaterWriter<'_, W> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

impl<W: Write> fmt::Debug for DeflaterWriter<'_, W> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("DeflaterWriter")
           .field("deflater", &*self.deflater)
           .field("buffer_size", &self.buffer.len())
           .field("sync_flush", &self.sync_flush)
           .field("closed", &self.closed)
           .finish()
    }
}
