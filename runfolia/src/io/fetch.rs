//! Idempotent download of the server binary into the run directory cache.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::core::types::{BuildReference, CachedArtifact};
use crate::error::DownloadError;
use crate::io::index::BuildIndex;
use crate::io::paths::{PARTIAL_PREFIX, PARTIAL_SUFFIX};

const CHUNK_BYTES: usize = 64 * 1024;
const PROGRESS_EVERY_BYTES: u64 = 8 * 1024 * 1024;

/// Make sure the binary of `build` exists at `destination`.
///
/// An existing file is reused unless `force_refetch` is set, in which case no
/// network request is made at all. Otherwise the body is streamed into a
/// temporary file next to `destination` and renamed over it once complete, so
/// the final name never refers to a partial download. On failure the temporary
/// file is removed and whatever was at `destination` before stays untouched.
#[instrument(skip_all, fields(version = %build.version, build = build.build_number, force_refetch = force_refetch))]
pub fn fetch(
    index: &dyn BuildIndex,
    build: &BuildReference,
    destination: &Path,
    force_refetch: bool,
) -> Result<CachedArtifact, DownloadError> {
    let cached = CachedArtifact {
        path: destination.to_path_buf(),
        version: build.version.clone(),
    };
    if destination.exists() && !force_refetch {
        info!(path = %destination.display(), "server jar cached, skipping download");
        return Ok(cached);
    }

    let parent = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| DownloadError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    let mut stream = index.open_download(build)?;
    info!(
        url = %stream.url,
        bytes = ?stream.content_length,
        path = %destination.display(),
        "downloading {} {} build {}",
        build.project,
        build.version,
        build.build_number
    );

    let mut part = tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(parent)
        .map_err(|source| DownloadError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

    let written = copy_stream(&mut stream.reader, part.as_file_mut(), &stream.url, destination)?;
    part.as_file().sync_all().map_err(|source| DownloadError::Io {
        path: part.path().to_path_buf(),
        source,
    })?;
    part.persist(destination).map_err(|err| DownloadError::Io {
        path: destination.to_path_buf(),
        source: err.error,
    })?;

    info!(bytes = written, path = %destination.display(), "download complete");
    Ok(cached)
}

/// Copy `reader` into `writer`, keeping read and write failures apart.
fn copy_stream(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    url: &str,
    destination: &Path,
) -> Result<u64, DownloadError> {
    let mut chunk = vec![0u8; CHUNK_BYTES];
    let mut written = 0u64;
    let mut next_report = PROGRESS_EVERY_BYTES;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(DownloadError::Stream {
                    url: url.to_string(),
                    source,
                });
            }
        };
        writer.write_all(&chunk[..n]).map_err(|source| DownloadError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        written += n as u64;
        if written >= next_report {
            debug!(bytes = written, "download progress");
            next_report += PROGRESS_EVERY_BYTES;
        }
    }

    writer.flush().map_err(|source| DownloadError::Io {
        path: destination.to_path_buf(),
        source,
    })?;
    Ok(written)
}
