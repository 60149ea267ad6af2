//! Compression engine interface
//!
//![Deflater](crate::Deflater) drives engine through [Engine] trait only.
//!Built-in implementations wrap `z_stream` of `zlib` or `zlib-ng`, but any type implementing
//![Engine] can be boxed into `Deflater` via [Deflater::with_engine](crate::Deflater::with_engine).

use crate::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
///Flush directive passed to engine
pub enum EncodeOp {
    ///Just compress as usual.
    ///
    ///Engine decides how much to accumulate before producing output.
    Process,
    ///Flush all pending output, aligning it on byte boundary.
    Flush,
    ///Same as `Flush`, but also resets match history.
    FullFlush,
    ///Finish compression.
    ///
    ///After issuing FINISH, no new data should be added.
    Finish,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
///Encode status
pub enum EncodeStatus {
    ///Encoded, carry on.
    Continue,
    ///No progress possible without more output space.
    ///
    ///Not an error, call again with more space.
    NeedOutput,
    ///Final block has been emitted.
    Finished,
    ///Engine fault with its raw status code.
    Error(i32),
}

#[derive(Debug)]
///Encode output
pub struct Encode {
    ///Number of bytes left unprocessed in `input`
    pub input_remain: usize,
    ///Number of bytes left unprocessed in `output`
    pub output_remain: usize,
    ///Status after `encode`
    pub status: EncodeStatus,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
///Compression strategy
pub enum Strategy {
    ///Default strategy.
    Default,
    ///Filtered strategy for data produced from filter.
    ///
    ///Forces more Huffman coding and less string matching.
    Filtered,
    ///Forces using Huffman encoding only, ignoring string matching.
    HuffmanOnly,
}

impl Strategy {
    ///Raw value of `Strategy::Default`
    pub const DEFAULT_STRATEGY: i32 = 0;
    ///Raw value of `Strategy::Filtered`
    pub const FILTERED: i32 = 1;
    ///Raw value of `Strategy::HuffmanOnly`
    pub const HUFFMAN_ONLY: i32 = 2;

    #[inline(always)]
    ///Returns raw value
    pub const fn as_raw(self) -> i32 {
        match self {
            Strategy::Default => Self::DEFAULT_STRATEGY,
            Strategy::Filtered => Self::FILTERED,
            Strategy::HuffmanOnly => Self::HUFFMAN_ONLY,
        }
    }
}

impl Default for Strategy {
    #[inline(always)]
    fn default() -> Self {
        Strategy::Default
    }
}

impl TryFrom<i32> for Strategy {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            Self::DEFAULT_STRATEGY => Ok(Strategy::Default),
            Self::FILTERED => Ok(Strategy::Filtered),
            Self::HUFFMAN_ONLY => Ok(Strategy::HuffmanOnly),
            _ => Err(Error::InvalidArgument("invalid compression strategy")),
        }
    }
}

///External compression engine.
///
///All calls are synchronous and bounded by single engine invocation.
///Implementation must not retain `input` or `output` past the call.
pub trait Engine: Send {
    ///Compresses `input` into `output` using `op` as flush directive.
    fn encode(&mut self, input: &[u8], output: &mut [u8], op: EncodeOp) -> Encode;

    ///Switches compression level and strategy.
    ///
    ///Engine may need to compress `input` accumulated so far with old parameters, writing it to
    ///`output`. `EncodeStatus::NeedOutput` means parameters were not applied yet.
    fn set_params(&mut self, input: &[u8], output: &mut [u8], level: i32, strategy: Strategy) -> Encode;

    ///Primes history window with `dictionary`.
    fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<(), Error>;

    ///Returns engine to initial state, keeping level and strategy.
    ///
    ///Default implementation reports [Error::Unsupported]
    fn reset(&mut self) -> Result<(), Error> {
        Err(Error::Unsupported("engine cannot reset in place"))
    }

    ///Returns checksum of all uncompressed data fed so far.
    fn checksum(&self) -> u32;

    ///Returns diagnostic for raw status `code` returned within [EncodeStatus::Error]
    fn describe_error(&self, code: i32) -> String;
}

//ZLIB macro has to be defined before declaring modules
#[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
macro_rules! internal_zlib_impl_engine {
    ($engine:ident) => {
        impl $engine {
            fn init(opts: &$crate::engine::ZlibOptions) -> Result<Self, $crate::Error> {
                let mut inner = Box::new(sys::z_stream {
                    next_in: core::ptr::null_mut(),
                    avail_in: 0,
                    total_in: 0,
                    next_out: core::ptr::null_mut(),
                    avail_out: 0,
                    total_out: 0,
                    msg: core::ptr::null_mut(),
                    state: core::ptr::null_mut(),
                    zalloc: $crate::mem::zalloc,
                    zfree: $crate::mem::zfree,
                    opaque: core::ptr::null_mut(),
                    data_type: 0,
                    adler: 0,
                    reserved: 0,
                });

                let result = unsafe {
                    sys::deflateInit2_(
                        &mut *inner,
                        opts.level() as _,
                        sys::Z_DEFLATED,
                        opts.mode.window_bits() as _,
                        opts.memory() as _,
                        Self::strategy(opts.strategy),
                        sys::zlibVersion(),
                        core::mem::size_of::<sys::z_stream>() as _,
                    )
                };

                match result {
                    sys::Z_OK => Ok(Self {
                        inner,
                    }),
                    code => {
                        //zlib releases its state on failed init, so only box itself is dropped here
                        let message = $crate::utils::convert_c_str(inner.msg as *const _).unwrap_or_else(|| $crate::engine::zlib_common::describe_code(code).to_owned());
                        Err($crate::Error::EngineFault(message))
                    },
                }
            }

            #[inline(always)]
            fn strategy(strategy: $crate::engine::Strategy) -> core::ffi::c_int {
                match strategy {
                    $crate::engine::Strategy::Default => sys::Z_DEFAULT_STRATEGY,
                    $crate::engine::Strategy::Filtered => sys::Z_FILTERED,
                    $crate::engine::Strategy::HuffmanOnly => sys::Z_HUFFMAN_ONLY,
                }
            }

            #[inline]
            fn status(result: core::ffi::c_int, op: core::ffi::c_int) -> $crate::engine::EncodeStatus {
                match result {
                    sys::Z_STREAM_END => $crate::engine::EncodeStatus::Finished,
                    //With FINISH zlib reports OK while it still needs more output
                    sys::Z_OK => match op == sys::Z_FINISH {
                        true => $crate::engine::EncodeStatus::NeedOutput,
                        false => $crate::engine::EncodeStatus::Continue,
                    },
                    sys::Z_BUF_ERROR => $crate::engine::EncodeStatus::NeedOutput,
                    code => $crate::engine::EncodeStatus::Error(code),
                }
            }

            //zlib counts in uInt, anything above is left for next call.
            #[inline(always)]
            fn prepare(&mut self, input: &[u8], output: &mut [u8]) -> (usize, usize) {
                let input_len = core::cmp::min(input.len(), core::ffi::c_uint::MAX as usize);
                let output_len = core::cmp::min(output.len(), core::ffi::c_uint::MAX as usize);

                self.inner.next_in = input.as_ptr() as *mut _;
                self.inner.avail_in = input_len as _;
                self.inner.next_out = output.as_mut_ptr();
                self.inner.avail_out = output_len as _;

                (input_len, output_len)
            }

            #[inline(always)]
            fn complete(&mut self, input: &[u8], output: &[u8], (input_len, output_len): (usize, usize), status: $crate::engine::EncodeStatus) -> $crate::engine::Encode {
                let consumed = input_len - self.inner.avail_in as usize;
                let produced = output_len - self.inner.avail_out as usize;

                self.inner.next_in = core::ptr::null_mut();
                self.inner.avail_in = 0;
                self.inner.next_out = core::ptr::null_mut();
                self.inner.avail_out = 0;

                $crate::engine::Encode {
                    input_remain: input.len() - consumed,
                    output_remain: output.len() - produced,
                    status,
                }
            }
        }

        impl $crate::engine::Engine for $engine {
            fn encode(&mut self, input: &[u8], output: &mut [u8], op: $crate::engine::EncodeOp) -> $crate::engine::Encode {
                let op = match op {
                    $crate::engine::EncodeOp::Process => sys::Z_NO_FLUSH,
                    $crate::engine::EncodeOp::Flush => sys::Z_SYNC_FLUSH,
                    $crate::engine::EncodeOp::FullFlush => sys::Z_FULL_FLUSH,
                    $crate::engine::EncodeOp::Finish => sys::Z_FINISH,
                };

                let lens = self.prepare(input, output);
                let result = unsafe {
                    sys::deflate(&mut *self.inner, op)
                };
                let status = Self::status(result, op);
                self.complete(input, output, lens, status)
            }

            fn set_params(&mut self, input: &[u8], output: &mut [u8], level: i32, strategy: $crate::engine::Strategy) -> $crate::engine::Encode {
                let lens = self.prepare(input, output);
                let result = unsafe {
                    sys::deflateParams(&mut *self.inner, level as _, Self::strategy(strategy))
                };
                let status = Self::status(result, sys::Z_NO_FLUSH);
                self.complete(input, output, lens, status)
            }

            fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<(), $crate::Error> {
                //Only last window of dictionary is ever used
                let dictionary = &dictionary[dictionary.len().saturating_sub(core::ffi::c_uint::MAX as usize)..];
                let result = unsafe {
                    sys::deflateSetDictionary(&mut *self.inner, dictionary.as_ptr(), dictionary.len() as _)
                };

                match result {
                    sys::Z_OK => Ok(()),
                    code => Err($crate::Error::EngineFault($crate::engine::Engine::describe_error(self, code))),
                }
            }

            fn reset(&mut self) -> Result<(), $crate::Error> {
                let result = unsafe {
                    sys::deflateReset(&mut *self.inner)
                };

                match result {
                    sys::Z_OK => Ok(()),
                    code => Err($crate::Error::EngineFault($crate::engine::Engine::describe_error(self, code))),
                }
            }

            #[inline]
            fn checksum(&self) -> u32 {
                self.inner.adler as u32
            }

            fn describe_error(&self, code: i32) -> String {
                match $crate::utils::convert_c_str(self.inner.msg as *const _) {
                    Some(message) => message,
                    None => $crate::engine::zlib_common::describe_code(code).to_owned(),
                }
            }
        }

        unsafe impl Send for $engine {}

        impl Drop for $engine {
            #[inline(always)]
            fn drop(&mut self) {
                unsafe {
                    sys::deflateEnd(&mut *self.inner);
                }
            }
        }
    }
}

#[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
mod zlib_common;
#[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
pub use zlib_common::*;
#[cfg(any(feature = "zlib", feature = "zlib-static"))]
mod zlib;
#[cfg(any(feature = "zlib", feature = "zlib-static"))]
pub use zlib::ZlibEngine;
#[cfg(feature = "zlib-ng")]
mod zlib_ng;
#[cfg(feature = "zlib-ng")]
pub use zlib_ng::ZlibNgEngine;
