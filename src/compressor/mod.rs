//! Compression module

pub mod write;

use crate::deflater::Deflater;
use write::{DeflaterWriter, WriterOptions};

use std::io::{self, Write};

///Describes interface for item that can be compressed
pub trait Compress {
    ///Performs compression using provided deflater, returning complete stream.
    fn compress(&self, deflater: Deflater) -> io::Result<Vec<u8>> {
        self.compress_into(deflater, Vec::new())
    }

    ///Performs compression using provided deflater and writer.
    ///
    ///Returns writer once stream is finished.
    fn compress_into<W: Write>(&self, deflater: Deflater, out: W) -> io::Result<W>;
}

impl<T: AsRef<[u8]>> Compress for T {
    fn compress_into<W: Write>(&self, deflater: Deflater, out: W) -> io::Result<W> {
        let mut writer = DeflaterWriter::with_deflater(out, deflater, WriterOptions::new())?;
        writer.write_all(self.as_ref())?;
        writer.into_inner()
    }
}

impl<T: AsRef<[u8]>> Compress for [T] {
    fn compress_into<W: Write>(&self, deflater: Deflater, out: W) -> io::Result<W> {
        let mut writer = DeflaterWriter::with_deflater(out, deflater, WriterOptions::new())?;
        for item in self {
            writer.write_all(item.as_ref())?;
        }
        writer.into_inner()
    }
}
