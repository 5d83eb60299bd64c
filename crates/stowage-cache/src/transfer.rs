//! Multipart ranged download.
//!
//! An object is split into fixed-size ranges that are fetched concurrently and
//! written into a pre-sized local file at their own offsets. Writes never
//! overlap, so the file needs no lock.

use bytes::Bytes;
use std::fs::File;
use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;
use stowage_core::{Error, ObjectLocation, Result, TransferRange};
use tokio::task::JoinSet;
use tracing::debug;

/// Tile `[0, size)` with ranges of `part_size` bytes; the last may be shorter.
pub fn plan_ranges(size: u64, part_size: u64) -> Result<Vec<TransferRange>> {
    if part_size == 0 {
        return Err(Error::Configuration("part size must be positive".to_string()));
    }

    let mut ranges = Vec::with_capacity(size.div_ceil(part_size) as usize);
    let mut offset = 0;
    while offset < size {
        let length = part_size.min(size - offset);
        ranges.push(TransferRange::new(offset, length));
        offset += length;
    }
    Ok(ranges)
}

#[cfg(unix)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn write_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        let n = file.seek_write(buf, offset)?;
        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        buf = &buf[n..];
        offset += n as u64;
    }
    Ok(())
}

/// Create (or truncate) `path` and size it to `size` bytes.
fn allocate(path: &Path, size: u64) -> io::Result<File> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.set_len(size)?;
    Ok(file)
}

async fn write_part(file: Arc<File>, range: TransferRange, body: Bytes) -> io::Result<()> {
    tokio::task::spawn_blocking(move || write_at(&file, &body, range.offset))
        .await
        .map_err(io::Error::other)?
}

/// Download `size` bytes of `location` into `local_path`, one `fetch` per range.
///
/// At most `concurrency` fetches are in flight. After the first failure no new
/// ranges are started; ranges already in flight are joined and their results
/// discarded before the file handle is released. The local file is left as is
/// on failure.
pub async fn download_ranges<F, Fut>(
    location: &ObjectLocation,
    local_path: &Path,
    size: u64,
    part_size: u64,
    concurrency: usize,
    fetch: F,
) -> Result<()>
where
    F: Fn(TransferRange) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes>> + Send + 'static,
{
    let store_err = |message: String| Error::store("download", location.as_str(), message);
    let ranges = plan_ranges(size, part_size)?;

    let path = local_path.to_path_buf();
    let file = tokio::task::spawn_blocking(move || allocate(&path, size))
        .await
        .map_err(|e| store_err(format!("failed to prepare local file: {}", e)))?
        .map_err(|e| store_err(format!("failed to prepare local file: {}", e)))?;
    let file = Arc::new(file);

    let total_parts = ranges.len();
    debug!(location = %location, size, parts = total_parts, "Starting multipart download");

    let fetch = Arc::new(fetch);
    let mut pending = ranges.into_iter();
    let mut tasks: JoinSet<Result<TransferRange>> = JoinSet::new();
    let mut failure: Option<Error> = None;
    let mut written = 0u64;
    let mut completed = 0usize;

    loop {
        while failure.is_none() && tasks.len() < concurrency.max(1) {
            let Some(range) = pending.next() else {
                break;
            };
            let fetch = Arc::clone(&fetch);
            let file = Arc::clone(&file);
            let location = location.clone();

            tasks.spawn(async move {
                let body = (*fetch)(range).await?;
                if body.is_empty() {
                    return Err(Error::store(
                        "download",
                        location.as_str(),
                        format!("empty response body for {}", range.header_value()),
                    ));
                }
                if body.len() as u64 != range.length {
                    return Err(Error::store(
                        "download",
                        location.as_str(),
                        format!(
                            "expected {} bytes for {}, received {}",
                            range.length,
                            range.header_value(),
                            body.len()
                        ),
                    ));
                }
                write_part(file, range, body).await.map_err(|e| {
                    Error::store(
                        "download",
                        location.as_str(),
                        format!("failed to write part at offset {}: {}", range.offset, e),
                    )
                })?;
                Ok(range)
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };

        match joined {
            Ok(Ok(range)) => {
                written += range.length;
                completed += 1;
                debug!(
                    offset = range.offset,
                    length = range.length,
                    "Downloaded part {}/{}",
                    completed,
                    total_parts
                );
            }
            Ok(Err(e)) => {
                failure.get_or_insert(e);
            }
            Err(e) => {
                failure.get_or_insert_with(|| store_err(format!("part task failed: {}", e)));
            }
        }
    }

    // every task has been joined; this is the last handle
    let file = Arc::try_unwrap(file)
        .map_err(|_| Error::Internal("download file handle still shared".to_string()))?;

    if let Some(e) = failure {
        return Err(e);
    }

    if written != size {
        return Err(store_err(format!(
            "wrote {} of {} bytes",
            written, size
        )));
    }

    tokio::task::spawn_blocking(move || file.sync_all())
        .await
        .map_err(|e| store_err(e.to_string()))?
        .map_err(|e| store_err(format!("failed to flush local file: {}", e)))?;

    Ok(())
}
