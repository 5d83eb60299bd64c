//! Compression utilities for cache archives.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use stowage_core::{CompressionMethod, Error, Result};

/// Fail with a dependency error when `method` is not compiled in.
pub fn ensure_available(method: CompressionMethod) -> Result<()> {
    match method {
        CompressionMethod::Gzip => Ok(()),
        CompressionMethod::Zstd if cfg!(feature = "zstd") => Ok(()),
        CompressionMethod::Zstd => Err(Error::Dependency(
            "zstd is not available in this build; enable the `zstd` feature to use zstd compression"
                .to_string(),
        )),
    }
}

/// Gzip encoder at the requested level.
pub fn gzip_encoder<W: Write>(writer: W, level: u32) -> flate2::write::GzEncoder<W> {
    flate2::write::GzEncoder::new(writer, flate2::Compression::new(level))
}

/// Gzip decoder over a reader.
pub fn gzip_decoder<R: Read>(reader: R) -> flate2::read::GzDecoder<R> {
    flate2::read::GzDecoder::new(reader)
}

/// Compress `input` into `output` with zstd, returning the compressed size.
#[cfg(feature = "zstd")]
pub fn zstd_compress_file(input: &Path, output: &Path, level: u32) -> io::Result<u64> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    zstd::stream::copy_encode(reader, &mut writer, level as i32)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

#[cfg(not(feature = "zstd"))]
pub fn zstd_compress_file(_input: &Path, _output: &Path, _level: u32) -> io::Result<u64> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "zstd support not compiled in"))
}

/// Decompress a zstd `input` into `output`, returning the decompressed size.
#[cfg(feature = "zstd")]
pub fn zstd_decompress_file(input: &Path, output: &Path) -> io::Result<u64> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    zstd::stream::copy_decode(reader, &mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(file.metadata()?.len())
}

#[cfg(not(feature = "zstd"))]
pub fn zstd_decompress_file(_input: &Path, _output: &Path) -> io::Result<u64> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "zstd support not compiled in"))
}

/// Streaming decoder for an archive file, yielding the raw tar stream.
pub fn open_decoder(path: &Path, method: CompressionMethod) -> Result<Box<dyn Read>> {
    ensure_available(method)?;
    let file = BufReader::new(File::open(path)?);
    match method {
        CompressionMethod::Gzip => Ok(Box::new(gzip_decoder(file))),
        #[cfg(feature = "zstd")]
        CompressionMethod::Zstd => {
            let decoder = zstd::stream::read::Decoder::with_buffer(file)
                .map_err(|e| Error::Archive(format!("Zstd init failed: {}", e)))?;
            Ok(Box::new(decoder))
        }
        #[cfg(not(feature = "zstd"))]
        CompressionMethod::Zstd => Err(Error::Dependency(
            "zstd support not compiled in".to_string(),
        )),
    }
}
