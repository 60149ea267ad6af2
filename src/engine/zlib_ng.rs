//! `zlib-ng` engine

use libz_ng_sys as sys;

use super::ZlibOptions;

///`zlib-ng` deflate stream
pub struct ZlibNgEngine {
    inner: Box<sys::z_stream>,
}

impl ZlibNgEngine {
    #[inline]
    ///Creates engine with `zlib-ng` library.
    ///
    ///Returns [Error::InvalidArgument](crate::Error::InvalidArgument) for out of range options
    ///and [Error::EngineFault](crate::Error::EngineFault) if `deflateInit2` fails (likely due to lack of memory)
    pub fn new(opts: &ZlibOptions) -> Result<Self, crate::Error> {
        opts.validate()?;
        Self::init(opts)
    }
}

internal_zlib_impl_engine!(ZlibNgEngine);
