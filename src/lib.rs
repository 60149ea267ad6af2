//!Streaming DEFLATE compressor
//!
//![Deflater] accepts input chunks of arbitrary size and produces compressed output incrementally
//!into caller supplied buffers, with explicit flush modes to create synchronization points
//!for decompressor.
//!
//![DeflaterWriter] drives `Deflater` against any `std::io::Write`.
//!
//!## Features
//!
//!- `zlib` - Enables `zlib` engine. Default on.
//!- `zlib-static` - Enables `zlib` engine with `static` feature.
//!- `zlib-ng` - Enables `zlib-ng` engine.
//!
//!Without any of them only [Deflater::with_engine] is available to supply custom [engine::Engine].

#![warn(missing_docs)]
#![cfg_attr(feature = "cargo-clippy", allow(clippy::style))]

#[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
pub(crate) mod mem;
#[cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]
pub(crate) mod utils;
mod error;
pub use error::Error;
pub mod engine;
mod deflater;
pub use deflater::{Deflater, FlushMode, Lifecycle, NO_COMPRESSION, BEST_SPEED, BEST_COMPRESSION, DEFAULT_COMPRESSION};
pub use engine::Strategy;
pub mod compressor;
pub use compressor::Compress;
pub use compressor::write::{DeflaterWriter, DeflaterRef, WriterOptions};
