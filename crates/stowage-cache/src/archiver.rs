//! Tar archive packing and unpacking.
//!
//! gzip archives are produced and consumed in one streaming pass. zstd archives
//! go through an intermediate `<archive>.tar` container that is always removed.

use crate::compression::{self, ensure_available};
use crate::scratch::ScratchFile;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use stowage_core::{ArchiveCodec, ArchivePlan, CompressionMethod, Error, Result};
use tracing::{debug, info};

/// Archive codec backed by the `tar`, `flate2` and `zstd` crates.
#[derive(Debug, Clone)]
pub struct TarArchiver {
    base_dir: PathBuf,
}

impl TarArchiver {
    /// Codec resolving relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn source_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Name under which `path` is stored in the archive.
    ///
    /// Root, prefix, `.` and `..` components are dropped, so `../shared/x` is stored as `shared/x`.
    pub fn entry_name(&self, path: &Path) -> PathBuf {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.base_dir).unwrap_or(path)
        } else {
            path
        };
        relative
            .components()
            .filter(|c| {
                !matches!(
                    c,
                    Component::Prefix(_) | Component::RootDir | Component::CurDir | Component::ParentDir
                )
            })
            .collect()
    }

    fn append_paths<W: Write>(&self, writer: W, paths: &[PathBuf]) -> io::Result<W> {
        let mut builder = tar::Builder::new(writer);
        builder.follow_symlinks(false);

        for p in paths {
            let source = self.source_path(p);
            let name = self.entry_name(p);
            let metadata = std::fs::symlink_metadata(&source).map_err(|e| {
                io::Error::new(e.kind(), format!("{}: {}", source.display(), e))
            })?;

            if metadata.is_dir() {
                builder.append_dir_all(&name, &source)?;
            } else {
                builder.append_path_with_name(&source, &name)?;
            }
        }

        builder.into_inner()
    }

    fn write_gzip(&self, plan: &ArchivePlan, output: &Path) -> io::Result<()> {
        let file = BufWriter::new(File::create(output)?);
        let encoder = compression::gzip_encoder(file, plan.compression_level);
        let encoder = self.append_paths(encoder, &plan.paths)?;
        let file = encoder.finish()?;
        file.into_inner().map_err(|e| e.into_error())?.sync_all()
    }

    fn write_zstd(&self, plan: &ArchivePlan, output: &Path) -> io::Result<()> {
        let intermediate = ScratchFile::sibling(output, "tar");
        let file = BufWriter::new(File::create(intermediate.path())?);
        let file = self.append_paths(file, &plan.paths)?;
        file.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        compression::zstd_compress_file(intermediate.path(), output, plan.compression_level)?;
        Ok(())
    }

    fn unpack<R: Read>(reader: R, destination: &Path) -> io::Result<()> {
        let mut archive = tar::Archive::new(reader);
        archive.set_preserve_permissions(true);
        archive.set_overwrite(true);
        archive.unpack(destination)
    }
}

impl Default for TarArchiver {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ArchiveCodec for TarArchiver {
    fn encode(&self, plan: &ArchivePlan, output: &Path) -> Result<()> {
        plan.validate()?;
        ensure_available(plan.method)?;

        info!(
            "Creating cache archive with compression level {}",
            plan.compression_level
        );

        match plan.method {
            CompressionMethod::Gzip => self.write_gzip(plan, output),
            CompressionMethod::Zstd => self.write_zstd(plan, output),
        }
        .map_err(|e| Error::Archive(format!("Failed to create archive: {}", e)))?;

        let size = verify_archive(output)?;
        info!(bytes = size, "Cache archive created ({} bytes)", size);

        if tracing::enabled!(tracing::Level::DEBUG) {
            for entry in list_entries(output, plan.method)? {
                debug!(entry = %entry.display(), "Archived");
            }
        }

        Ok(())
    }

    fn decode(
        &self,
        archive: &Path,
        method: CompressionMethod,
        destination: Option<&Path>,
    ) -> Result<()> {
        ensure_available(method)?;
        info!("Extracting cache archive");

        let destination = destination.unwrap_or_else(|| Path::new("."));

        match method {
            CompressionMethod::Gzip => File::open(archive)
                .and_then(|file| Self::unpack(compression::gzip_decoder(BufReader::new(file)), destination)),
            CompressionMethod::Zstd => {
                let intermediate = ScratchFile::sibling(archive, "tar");
                compression::zstd_decompress_file(archive, intermediate.path()).and_then(|_| {
                    let file = BufReader::new(File::open(intermediate.path())?);
                    Self::unpack(file, destination)
                })
            }
        }
        .map_err(|e| Error::Archive(format!("Failed to extract archive: {}", e)))?;

        info!("Cache archive extracted successfully");
        Ok(())
    }
}

/// Size of a freshly written archive, rejecting an empty file.
pub fn verify_archive(path: &Path) -> Result<u64> {
    let size = std::fs::metadata(path)
        .map_err(|e| Error::Archive(format!("Failed to create archive: {}", e)))?
        .len();
    if size == 0 {
        return Err(Error::Archive("Created archive is empty".to_string()));
    }
    Ok(size)
}

/// Entry paths stored in an archive.
pub fn list_entries(path: &Path, method: CompressionMethod) -> Result<Vec<PathBuf>> {
    let reader = compression::open_decoder(path, method)?;
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| Error::Archive(format!("Failed to list archive: {}", e)))?;

    entries
        .map(|entry| {
            entry
                .and_then(|e| e.path().map(|p| p.into_owned()))
                .map_err(|e| Error::Archive(format!("Failed to list archive: {}", e)))
        })
        .collect()
}
