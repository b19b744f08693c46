//! Staging of plugin jars into the server's plugin directory.
//!
//! Staging prefers a filesystem link so repeated test cycles don't duplicate
//! large jars, and falls back to a byte copy whenever linking fails. It never
//! aborts the pipeline: problems come back as [`StagingWarning`]s.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::core::types::{StageMethod, StagedArtifact, StagingWarning};

/// Filesystem link capability.
///
/// [`SystemLinker`] performs real links; tests inject linkers that fail or
/// silently do nothing.
pub trait Linker {
    /// Link kind to attempt on this system ([`StageMethod::Hardlink`] or
    /// [`StageMethod::Symlink`]).
    fn link_kind(&self) -> StageMethod;

    /// Create `destination` as a link of `kind` to `source`.
    fn link(&self, kind: StageMethod, source: &Path, destination: &Path) -> io::Result<()>;
}

/// [`Linker`] over the real filesystem.
#[derive(Debug, Clone, Copy)]
pub struct SystemLinker {
    kind: StageMethod,
}

impl SystemLinker {
    pub fn new(kind: StageMethod) -> Self {
        Self { kind }
    }

    /// Pick the link kind by trying to create a symbolic link in a scratch directory.
    ///
    /// Where unprivileged users may not create symbolic links the probe fails and
    /// hard links are used instead.
    pub fn probe() -> Self {
        let kind = match probe_symlink() {
            Ok(()) => StageMethod::Symlink,
            Err(err) => {
                debug!(err = %err, "symbolic links unavailable, using hard links");
                StageMethod::Hardlink
            }
        };
        Self { kind }
    }
}

fn probe_symlink() -> io::Result<()> {
    let scratch = tempfile::tempdir()?;
    let target = scratch.path().join("target");
    fs::write(&target, b"probe")?;
    let link = scratch.path().join("link");
    symlink_file(&target, &link)?;
    fs::read(&link).map(|_| ())
}

impl Linker for SystemLinker {
    fn link_kind(&self) -> StageMethod {
        self.kind
    }

    fn link(&self, kind: StageMethod, source: &Path, destination: &Path) -> io::Result<()> {
        match kind {
            StageMethod::Hardlink => fs::hard_link(source, destination),
            StageMethod::Symlink => symlink_file(source, destination),
            StageMethod::Copy => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "copy is not a link kind",
            )),
        }
    }
}

#[cfg(unix)]
fn symlink_file(source: &Path, destination: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, destination)
}

#[cfg(windows)]
fn symlink_file(source: &Path, destination: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, destination)
}

#[cfg(not(any(unix, windows)))]
fn symlink_file(_source: &Path, _destination: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}

/// Result of staging a single artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    /// `None` when the artifact could not be staged at all.
    pub staged: Option<StagedArtifact>,
    pub warning: Option<StagingWarning>,
}

/// Result of staging a set of artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub staged: Vec<StagedArtifact>,
    pub warnings: Vec<StagingWarning>,
}

impl StageReport {
    pub fn record(&mut self, outcome: StageOutcome) {
        self.staged.extend(outcome.staged);
        self.warnings.extend(outcome.warning);
    }

    pub fn merge(&mut self, other: StageReport) {
        self.staged.extend(other.staged);
        self.warnings.extend(other.warnings);
    }
}

/// Place `source` into `staging_dir` under its own file name.
///
/// An existing file at the destination is removed first so the newest source
/// always wins. At most one warning is produced: either the link fell back to a
/// copy, or the artifact could not be staged.
#[instrument(skip_all, fields(source = %source.display(), prefer_link = prefer_link))]
pub fn stage(
    linker: &dyn Linker,
    source: &Path,
    staging_dir: &Path,
    prefer_link: bool,
) -> StageOutcome {
    let outcome = stage_inner(linker, source, staging_dir, prefer_link);
    if let Some(staged) = &outcome.staged {
        info!(
            destination = %staged.destination.display(),
            method = %staged.method,
            "staged plugin"
        );
    }
    if let Some(warning) = &outcome.warning {
        warn!("{warning}");
    }
    outcome
}

fn stage_inner(
    linker: &dyn Linker,
    source: &Path,
    staging_dir: &Path,
    prefer_link: bool,
) -> StageOutcome {
    let fail = |reason: String| StageOutcome {
        staged: None,
        warning: Some(StagingWarning::Failed {
            source: source.to_path_buf(),
            reason,
        }),
    };

    if !source.is_file() {
        return fail("source file does not exist".to_string());
    }
    let Some(file_name) = source.file_name() else {
        return fail("source has no file name".to_string());
    };
    if let Err(err) = fs::create_dir_all(staging_dir) {
        return fail(format!("create {}: {err}", staging_dir.display()));
    }
    let destination = staging_dir.join(file_name);

    if is_inside(source, staging_dir) {
        debug!(destination = %destination.display(), "source already in staging directory");
        return StageOutcome {
            staged: Some(StagedArtifact {
                source: source.to_path_buf(),
                destination,
                method: StageMethod::Copy,
            }),
            warning: None,
        };
    }
    if let Err(err) = remove_existing(&destination) {
        return fail(format!("remove stale {}: {err}", destination.display()));
    }

    let mut link_failure = None;
    if prefer_link {
        let kind = linker.link_kind();
        let target = absolute_source(source);
        let attempt = linker
            .link(kind, &target, &destination)
            .and_then(|()| ensure_present(&destination));
        match attempt {
            Ok(()) => {
                return StageOutcome {
                    staged: Some(StagedArtifact {
                        source: source.to_path_buf(),
                        destination,
                        method: kind,
                    }),
                    warning: None,
                };
            }
            Err(err) => {
                debug!(method = %kind, err = %err, "link failed, falling back to copy");
                // A dangling link may have been left behind.
                discard_leftover(&destination);
                link_failure = Some((kind, err.to_string()));
            }
        }
    }

    if let Err(err) = fs::copy(source, &destination) {
        discard_leftover(&destination);
        return fail(format!("copy to {}: {err}", destination.display()));
    }

    StageOutcome {
        staged: Some(StagedArtifact {
            source: source.to_path_buf(),
            destination: destination.clone(),
            method: StageMethod::Copy,
        }),
        warning: link_failure.map(|(attempted, reason)| StagingWarning::LinkFellBack {
            source: source.to_path_buf(),
            destination,
            attempted,
            reason,
        }),
    }
}

/// Stage every item of `sources` independently.
///
/// A failing item yields one warning and does not stop the others.
pub fn stage_all(
    linker: &dyn Linker,
    sources: &[PathBuf],
    staging_dir: &Path,
    prefer_link: bool,
) -> StageReport {
    let mut report = StageReport::default();
    for source in sources {
        report.record(stage(linker, source, staging_dir, prefer_link));
    }
    report
}

fn remove_existing(path: &Path) -> io::Result<()> {
    // symlink_metadata also sees dangling links, which `exists()` reports as absent.
    match fs::symlink_metadata(path) {
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn discard_leftover(path: &Path) {
    if let Err(err) = remove_existing(path) {
        debug!(path = %path.display(), err = %err, "could not remove leftover destination");
    }
}

fn ensure_present(path: &Path) -> io::Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "link reported success but no destination file exists",
        ))
    }
}

/// Whether `source` already lives directly in `dir`. Removing the destination
/// would then delete the source itself.
fn is_inside(source: &Path, dir: &Path) -> bool {
    let source_dir = source
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match (fs::canonicalize(source_dir), fs::canonicalize(dir)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn absolute_source(source: &Path) -> PathBuf {
    fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf())
}
