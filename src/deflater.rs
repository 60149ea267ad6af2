//! Compressor engine binding

use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::engine::{Engine, EncodeOp, EncodeStatus, Strategy};
use crate::error::{check_bounds, Error};

///No compression, data is stored as is.
pub const NO_COMPRESSION: i32 = 0;
///Fastest compression.
pub const BEST_SPEED: i32 = 1;
///Best compression ratio.
pub const BEST_COMPRESSION: i32 = 9;
///Engine default level (currently 6 for zlib).
pub const DEFAULT_COMPRESSION: i32 = -1;

#[inline]
pub(crate) fn validate_level(level: i32) -> Result<(), Error> {
    match level {
        DEFAULT_COMPRESSION | NO_COMPRESSION..=BEST_COMPRESSION => Ok(()),
        _ => Err(Error::InvalidArgument("invalid compression level")),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
///Flush mode of [Deflater::compress]
pub enum FlushMode {
    ///Lets engine accumulate input for best ratio.
    ///
    ///Returning 0 means more input is needed, not an error.
    NoFlush,
    ///Emits all input supplied so far, in independently decodable form.
    ///
    ///Flush is complete only once call returns less than provided output space.
    ///Otherwise call again with more output space.
    SyncFlush,
    ///Same as `SyncFlush`, but also resets match history, making resynchronization point which
    ///doesn't depend on earlier output.
    ///
    ///Using it often seriously degrades compression.
    FullFlush,
}

impl FlushMode {
    ///Raw value of `FlushMode::NoFlush`
    pub const NO_FLUSH: i32 = 0;
    ///Raw value of `FlushMode::SyncFlush`
    pub const SYNC_FLUSH: i32 = 2;
    ///Raw value of `FlushMode::FullFlush`
    pub const FULL_FLUSH: i32 = 3;
}

impl Default for FlushMode {
    #[inline(always)]
    fn default() -> Self {
        FlushMode::NoFlush
    }
}

impl TryFrom<i32> for FlushMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            Self::NO_FLUSH => Ok(FlushMode::NoFlush),
            Self::SYNC_FLUSH => Ok(FlushMode::SyncFlush),
            Self::FULL_FLUSH => Ok(FlushMode::FullFlush),
            _ => Err(Error::InvalidArgument("invalid flush mode")),
        }
    }
}

impl From<FlushMode> for EncodeOp {
    #[inline(always)]
    fn from(mode: FlushMode) -> Self {
        match mode {
            FlushMode::NoFlush => EncodeOp::Process,
            FlushMode::SyncFlush => EncodeOp::Flush,
            FlushMode::FullFlush => EncodeOp::FullFlush,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
///Lifecycle of [Deflater]
pub enum Lifecycle {
    ///Accepting input.
    Open,
    ///`finish()` has been called, but final block is not emitted yet.
    FinishRequested,
    ///Final block has been emitted.
    Finished,
    ///Engine has been released.
    Closed,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Phase {
    Open,
    FinishRequested,
    Finished,
}

//Engine can only be reached through `Live`, so there is no use after release.
enum Handle {
    Live(Box<dyn Engine>, Phase),
    Released {
        finished: bool,
    },
}

impl Handle {
    #[inline]
    fn lifecycle(&self) -> Lifecycle {
        match self {
            Handle::Live(_, Phase::Open) => Lifecycle::Open,
            Handle::Live(_, Phase::FinishRequested) => Lifecycle::FinishRequested,
            Handle::Live(_, Phase::Finished) => Lifecycle::Finished,
            Handle::Released { .. } => Lifecycle::Closed,
        }
    }
}

struct State {
    handle: Handle,
    input: Bytes,
    offset: usize,
    length: usize,
    level: i32,
    strategy: Strategy,
    params_pending: bool,
    bytes_read: u64,
    bytes_written: u64,
}

impl State {
    #[inline(always)]
    fn engine(&mut self) -> Result<&mut dyn Engine, Error> {
        match &mut self.handle {
            Handle::Live(engine, _) => Ok(&mut **engine),
            Handle::Released { .. } => Err(Error::ClosedState),
        }
    }

    #[inline(always)]
    fn ensure_open(&self) -> Result<(), Error> {
        match self.handle {
            Handle::Live(..) => Ok(()),
            Handle::Released { .. } => Err(Error::ClosedState),
        }
    }
}

#[cold]
fn engine_fault(engine: &dyn Engine, code: i32) -> Error {
    let message = engine.describe_error(code);
    tracing::warn!(code, %message, "compression engine failed");
    Error::EngineFault(message)
}

///Streaming DEFLATE compressor.
///
///Wraps single compression [Engine], feeding it caller supplied input and collecting compressed
///output into caller supplied buffers.
///
///All state is guarded by single per-instance lock, so it is possible to query counters from one
///thread while another drives compression. Calls are serialized, not pipelined.
///
///## Usage
///
///```rust
///use deflater::{Deflater, FlushMode};
///
///let deflater = Deflater::new().expect("create deflater");
///deflater.set_input_all(&b"hello hello hello"[..]).expect("set input");
///deflater.finish().expect("finish");
///
///let mut output = [0u8; 64];
///let mut len = 0;
///while !deflater.finished() {
///    len += deflater.compress(&mut output, len, 64 - len, FlushMode::NoFlush).expect("compress");
///}
///assert_eq!(deflater.bytes_read().unwrap(), 17);
///assert_eq!(deflater.bytes_written().unwrap(), len as u64);
///```
pub struct Deflater {
    state: Mutex<State>,
}

impl Deflater {
    #[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
    #[inline]
    ///Creates compressor with default level, producing zlib format.
    pub fn new() -> Result<Self, Error> {
        Self::with_options(crate::engine::ZlibOptions::new())
    }

    #[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
    #[inline]
    ///Creates compressor with specified `level`.
    ///
    ///If `raw` is `true`, then zlib header and checksum are omitted, producing headerless deflate
    ///as used within gzip and zip containers.
    pub fn with_level(level: i32, raw: bool) -> Result<Self, Error> {
        let mode = match raw {
            true => crate::engine::ZlibMode::Deflate,
            false => crate::engine::ZlibMode::Zlib,
        };
        Self::with_options(crate::engine::ZlibOptions::new().mode(mode).compression(level))
    }

    #[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
    ///Creates compressor with default engine.
    ///
    ///Prefers `zlib` when both `zlib` and `zlib-ng` are enabled.
    pub fn with_options(opts: crate::engine::ZlibOptions) -> Result<Self, Error> {
        #[cfg(any(feature = "zlib", feature = "zlib-static"))]
        {
            Self::zlib(opts)
        }
        #[cfg(not(any(feature = "zlib", feature = "zlib-static")))]
        {
            Self::zlib_ng(opts)
        }
    }

    #[cfg(any(feature = "zlib", feature = "zlib-static"))]
    #[inline]
    ///Creates compressor using `zlib` engine
    pub fn zlib(opts: crate::engine::ZlibOptions) -> Result<Self, Error> {
        let engine = crate::engine::ZlibEngine::new(&opts)?;
        Self::with_engine(Box::new(engine), opts.level(), opts.strategy)
    }

    #[cfg(feature = "zlib-ng")]
    #[inline]
    ///Creates compressor using `zlib-ng` engine
    pub fn zlib_ng(opts: crate::engine::ZlibOptions) -> Result<Self, Error> {
        let engine = crate::engine::ZlibNgEngine::new(&opts)?;
        Self::with_engine(Box::new(engine), opts.level(), opts.strategy)
    }

    ///Creates compressor over arbitrary `engine`.
    ///
    ///`level` and `strategy` must be the parameters `engine` has been initialized with, as only
    ///changes relative to them are forwarded to engine.
    pub fn with_engine(engine: Box<dyn Engine>, level: i32, strategy: Strategy) -> Result<Self, Error> {
        validate_level(level)?;

        Ok(Self {
            state: Mutex::new(State {
                handle: Handle::Live(engine, Phase::Open),
                input: Bytes::new(),
                offset: 0,
                length: 0,
                level,
                strategy,
                params_pending: false,
                bytes_read: 0,
                bytes_written: 0,
            })
        })
    }

    #[inline(always)]
    fn lock(&self) -> MutexGuard<'_, State> {
        //State is updated only after engine call succeeds, so it stays consistent even if caller panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    ///Sets input for compression to `data[offset..offset + length]`.
    ///
    ///Should be called whenever [needs_input](Self::needs_input) returns `true`.
    ///
    ///## Note
    ///
    ///Input is replaced, not appended. Any input not yet consumed by [compress](Self::compress)
    ///is dropped, so it is caller obligation to drain it first.
    pub fn set_input<B: Into<Bytes>>(&self, data: B, offset: usize, length: usize) -> Result<(), Error> {
        let data = data.into();
        check_bounds(data.len(), offset, length)?;

        let mut state = self.lock();
        state.ensure_open()?;
        if state.length > 0 {
            tracing::warn!(dropped = state.length, "set_input drops unconsumed input");
        }
        state.input = data;
        state.offset = offset;
        state.length = length;
        Ok(())
    }

    #[inline]
    ///Sets whole `data` as input for compression.
    pub fn set_input_all<B: Into<Bytes>>(&self, data: B) -> Result<(), Error> {
        let data = data.into();
        let length = data.len();
        self.set_input(data, 0, length)
    }

    ///Primes engine's history window with `data[offset..offset + length]`.
    ///
    ///Must be called before any input is compressed.
    ///Decompressor needs the same dictionary, which is identified by its Adler-32 in zlib header.
    pub fn set_dictionary(&self, data: &[u8], offset: usize, length: usize) -> Result<(), Error> {
        check_bounds(data.len(), offset, length)?;

        let mut state = self.lock();
        state.engine()?.set_dictionary(&data[offset..offset + length])?;
        tracing::debug!(length, "primed dictionary");
        Ok(())
    }

    #[inline]
    ///Primes engine's history window with whole `data`.
    pub fn set_dictionary_all(&self, data: &[u8]) -> Result<(), Error> {
        self.set_dictionary(data, 0, data.len())
    }

    ///Sets compression level, which is `-1` or from 0 to 9.
    ///
    ///Change takes effect on next call to [compress](Self::compress), which compresses input
    ///available so far with old level.
    pub fn set_level(&self, level: i32) -> Result<(), Error> {
        validate_level(level)?;

        let mut state = self.lock();
        state.ensure_open()?;
        if state.level != level {
            state.level = level;
            state.params_pending = true;
        }
        Ok(())
    }

    ///Sets compression strategy.
    ///
    ///Change takes effect on next call to [compress](Self::compress), which compresses input
    ///available so far with old strategy.
    pub fn set_strategy(&self, strategy: Strategy) -> Result<(), Error> {
        let mut state = self.lock();
        state.ensure_open()?;
        if state.strategy != strategy {
            state.strategy = strategy;
            state.params_pending = true;
        }
        Ok(())
    }

    #[inline]
    ///Returns current compression level
    pub fn level(&self) -> i32 {
        self.lock().level
    }

    #[inline]
    ///Returns current compression strategy
    pub fn strategy(&self) -> Strategy {
        self.lock().strategy
    }

    #[inline]
    ///Returns whether level or strategy change still waits to be applied by next `compress`
    pub fn params_pending(&self) -> bool {
        self.lock().params_pending
    }

    #[inline]
    ///Returns `true` if input is exhausted and [set_input](Self::set_input) should be called.
    pub fn needs_input(&self) -> bool {
        self.lock().length == 0
    }

    ///Requests compression to end with current content of input.
    pub fn finish(&self) -> Result<(), Error> {
        let mut state = self.lock();
        match &mut state.handle {
            Handle::Live(_, phase) => {
                if *phase == Phase::Open {
                    *phase = Phase::FinishRequested;
                }
                Ok(())
            },
            Handle::Released { .. } => Err(Error::ClosedState),
        }
    }

    #[inline]
    ///Returns `true` once end of compressed stream has been emitted.
    pub fn finished(&self) -> bool {
        match self.lock().handle {
            Handle::Live(_, phase) => phase == Phase::Finished,
            Handle::Released { finished } => finished,
        }
    }

    ///Returns lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.lock().handle.lifecycle()
    }

    ///Compresses pending input into `output[offset..offset + length]`.
    ///
    ///Returns number of bytes written into `output`.
    ///
    ///If level or strategy has been changed, this call only applies the change, compressing
    ///input so far with previous parameters and without any flush semantics.
    ///Once [finish](Self::finish) is requested, `mode` is ignored and engine is asked to finish.
    ///
    ///Counters and input position are updated only when engine call succeeds.
    ///
    ///## Errors
    ///
    ///- [Error::InvalidArgument] if range is out of bounds.
    ///- [Error::ClosedState] if compressor has been closed.
    ///- [Error::EngineFault] if engine reports anything other than success or lack of output space.
    pub fn compress(&self, output: &mut [u8], offset: usize, length: usize, mode: FlushMode) -> Result<usize, Error> {
        check_bounds(output.len(), offset, length)?;
        let output = &mut output[offset..offset + length];

        let mut guard = self.lock();
        let state = &mut *guard;
        let (engine, phase) = match &mut state.handle {
            Handle::Live(engine, phase) => (engine, phase),
            Handle::Released { .. } => return Err(Error::ClosedState),
        };
        let input = &state.input[state.offset..state.offset + state.length];

        let result = if state.params_pending {
            let result = engine.set_params(input, output, state.level, state.strategy);
            match result.status {
                EncodeStatus::Error(code) => return Err(engine_fault(&**engine, code)),
                //Not applied yet, retry on next call
                EncodeStatus::NeedOutput => (),
                EncodeStatus::Continue | EncodeStatus::Finished => {
                    state.params_pending = false;
                    tracing::debug!(level = state.level, strategy = ?state.strategy, "applied parameters");
                },
            }
            result
        } else {
            let op = match phase {
                Phase::Open => mode.into(),
                Phase::FinishRequested | Phase::Finished => EncodeOp::Finish,
            };
            let result = engine.encode(input, output, op);
            match result.status {
                EncodeStatus::Error(code) => return Err(engine_fault(&**engine, code)),
                EncodeStatus::Finished => *phase = Phase::Finished,
                EncodeStatus::Continue | EncodeStatus::NeedOutput => (),
            }
            result
        };

        let consumed = state.length - result.input_remain;
        let produced = length - result.output_remain;
        state.offset += consumed;
        state.length = result.input_remain;
        state.bytes_read += consumed as u64;
        state.bytes_written += produced as u64;
        tracing::trace!(?mode, consumed, produced, "compress");

        Ok(produced)
    }

    #[inline]
    ///Compresses pending input into whole `output` without flushing.
    pub fn deflate(&self, output: &mut [u8]) -> Result<usize, Error> {
        let length = output.len();
        self.compress(output, 0, length, FlushMode::NoFlush)
    }

    ///Returns checksum of uncompressed data fed so far.
    ///
    ///For zlib engine this is Adler-32, which is also written as stream trailer.
    ///After preset dictionary is set and before any input is compressed it is the dictionary's
    ///checksum.
    pub fn checksum(&self) -> Result<u32, Error> {
        let mut state = self.lock();
        Ok(state.engine()?.checksum())
    }

    #[inline]
    ///Returns total number of uncompressed bytes consumed since creation or last reset.
    pub fn bytes_read(&self) -> Result<u64, Error> {
        let state = self.lock();
        state.ensure_open()?;
        Ok(state.bytes_read)
    }

    #[inline]
    ///Returns total number of compressed bytes produced since creation or last reset.
    pub fn bytes_written(&self) -> Result<u64, Error> {
        let state = self.lock();
        state.ensure_open()?;
        Ok(state.bytes_written)
    }

    ///Resets compressor to initial state, so that new stream can be started.
    ///
    ///Level and strategy are preserved, while input and counters are dropped.
    ///Engine may not support it, in which case [Error::Unsupported] is returned and the
    ///compressor should be considered unusable.
    pub fn reset(&self) -> Result<(), Error> {
        let mut guard = self.lock();
        let state = &mut *guard;
        match &mut state.handle {
            Handle::Live(engine, phase) => {
                if let Err(error) = engine.reset() {
                    tracing::warn!(%error, "unable to reset engine");
                    return Err(error);
                }
                *phase = Phase::Open;
            },
            Handle::Released { .. } => return Err(Error::ClosedState),
        }

        state.input = Bytes::new();
        state.offset = 0;
        state.length = 0;
        state.bytes_read = 0;
        state.bytes_written = 0;
        tracing::debug!("reset deflater");
        Ok(())
    }

    ///Releases engine.
    ///
    ///Any further operation except `close` fails with [Error::ClosedState].
    ///Engine is also released on drop, so it is only needed to free resources early.
    pub fn close(&self) {
        let mut state = self.lock();
        let finished = match state.handle {
            Handle::Live(_, phase) => phase == Phase::Finished,
            Handle::Released { .. } => return,
        };

        state.handle = Handle::Released {
            finished,
        };
        state.input = Bytes::new();
        state.offset = 0;
        state.length = 0;
        tracing::debug!(finished, "released compression engine");
    }
}

impl fmt::Debug for Deflater {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        fmt.debug_struct("Deflater")
           .field("lifecycle", &state.handle.lifecycle())
           .field("level", &state.level)
           .field("strategy", &state.strategy)
           .field("pending_input", &state.length)
           .field("bytes_read", &state.bytes_read)
           .field("bytes_written", &state.bytes_written)
           .finish()
    }
}
