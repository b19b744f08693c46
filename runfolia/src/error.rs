//! Error taxonomy for the prepare-and-launch pipeline.
//!
//! Every fatal stage has its own error type so callers can tell a resolution
//! failure from a download failure without string matching. [`RunError`] is a
//! transparent union: it displays and sources exactly like the stage error it
//! carries.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The build index could not produce a usable build for a version.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("request build index {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed build index response from {url}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no {project} builds published for version {version}")]
    NoBuilds { project: String, version: String },
}

/// The server binary could not be placed in the cache.
///
/// The cache is left as it was before the attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request download {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("read download stream {url}")]
    Stream {
        url: String,
        #[source]
        source: io::Error,
    },
    #[error("write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The server process could not be started.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("spawn {} in {}", program.display(), workdir.display())]
    Spawn {
        program: PathBuf,
        workdir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("wait for {}", program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fatal pipeline failure, surfaced without hiding the originating stage error.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}
