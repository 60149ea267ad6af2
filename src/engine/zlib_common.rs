use super::Strategy;
use crate::deflater::{validate_level, DEFAULT_COMPRESSION};

const DEF_MEM_LEVEL: u8 = 8;
const MAX_MEM_LEVEL: u8 = 9;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i8)]
///Stream framing
pub enum ZlibMode {
    ///Raw deflate, without header or checksum trailer.
    Deflate = -15,
    ///Uses zlib header and Adler-32 trailer
    ///
    ///Default.
    Zlib = 15,
}

impl ZlibMode {
    #[inline(always)]
    pub(crate) const fn window_bits(self) -> i8 {
        self as _
    }
}

impl Default for ZlibMode {
    #[inline(always)]
    fn default() -> Self {
        ZlibMode::Zlib
    }
}

#[derive(Debug, Copy, Clone)]
///Zlib configuration for engine.
pub struct ZlibOptions {
    ///Mode
    pub mode: ZlibMode,
    ///Strategy
    pub strategy: Strategy,
    mem_level: u8,
    compression: i32,
}

impl ZlibOptions {
    #[inline(always)]
    ///Creates new default options
    pub const fn new() -> Self {
        Self {
            mode: ZlibMode::Zlib,
            strategy: Strategy::Default,
            mem_level: DEF_MEM_LEVEL,
            compression: DEFAULT_COMPRESSION,
        }
    }

    #[inline]
    ///Sets zlib mode
    pub const fn mode(mut self, new_mode: ZlibMode) -> Self {
        self.mode = new_mode;
        self
    }

    #[inline]
    ///Sets zlib strategy
    pub const fn strategy(mut self, new_strategy: Strategy) -> Self {
        self.strategy = new_strategy;
        self
    }

    #[inline]
    ///Sets memory level, from 1 to 9
    ///
    ///Defaults to 8.
    pub const fn mem_level(mut self, mem_level: u8) -> Self {
        self.mem_level = mem_level;
        self
    }

    #[inline]
    ///Sets zlib compression in range from 0 to 9
    ///
    ///Defaults to `-1`, which is zlib default.
    pub const fn compression(mut self, compression: i32) -> Self {
        self.compression = compression;
        self
    }

    #[inline(always)]
    ///Returns configured compression level
    pub const fn level(&self) -> i32 {
        self.compression
    }

    #[inline(always)]
    ///Returns configured memory level
    pub const fn memory(&self) -> u8 {
        self.mem_level
    }

    pub(crate) fn validate(&self) -> Result<(), crate::Error> {
        validate_level(self.compression)?;
        if self.mem_level == 0 || self.mem_level > MAX_MEM_LEVEL {
            return Err(crate::Error::InvalidArgument("invalid memory level"));
        }
        Ok(())
    }
}

impl Default for ZlibOptions {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) const fn describe_code(code: i32) -> &'static str {
    match code {
        -1 => "file error",
        -2 => "stream error",
        -3 => "data error",
        -4 => "insufficient memory",
        -5 => "buffer error",
        -6 => "incompatible version",
        _ => "unknown error",
    }
}
