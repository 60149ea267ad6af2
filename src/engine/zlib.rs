//! `zlib` engine

use libz_sys as sys;

use super::ZlibOptions;

///`zlib` deflate stream
///
///Stream is boxed as zlib keeps back-pointer to it within internal state.
pub struct ZlibEngine {
    inner: Box<sys::z_stream>,
}

impl ZlibEngine {
    #[inline]
    ///Creates engine with `zlib` library.
    ///
    ///Returns [Error::InvalidArgument](crate::Error::InvalidArgument) for out of range options
    ///and [Error::EngineFault](crate::Error::EngineFault) if `deflateInit2` fails (likely due to lack of memory)
    pub fn new(opts: &ZlibOptions) -> Result<Self, crate::Error> {
        opts.validate()?;
        Self::init(opts)
    }
}

internal_zlib_impl_engine!(ZlibEngine);
