//! Shared value types passed between pipeline stages.
//!
//! These are plain data: stages produce them, later stages consume them, and
//! nothing here touches the filesystem or network.

use std::fmt;
use std::path::{Path, PathBuf};

/// Resolved settings for one invocation.
///
/// Built once from the config file and CLI flags, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    /// Project name on the build index (e.g. `folia`).
    pub project: String,
    /// Base URL of the build index API, without trailing slash.
    pub api_base_url: String,
    pub target_version: String,
    pub run_directory: PathBuf,
    pub auto_accept_license: bool,
    pub prefer_linking: bool,
    pub force_refetch: bool,
    /// JVM options placed before `-jar`.
    pub extra_process_args: Vec<String>,
    /// Server options placed after the jar name.
    pub extra_server_args: Vec<String>,
    pub java_executable: PathBuf,
    /// The plugin under test, if one was configured or discovered.
    pub primary_artifact: Option<PathBuf>,
    /// Where discovery looked for the primary artifact.
    pub primary_search_dir: PathBuf,
    /// Companion plugins staged next to the primary one.
    pub secondary_artifacts: Vec<PathBuf>,
}

/// A specific published build selected for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReference {
    pub project: String,
    pub version: String,
    pub build_number: u32,
    /// Name of the primary downloadable file (`downloads.application.name`).
    pub download_file_name: String,
}

/// The server binary as it sits in the run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub path: PathBuf,
    pub version: String,
}

impl CachedArtifact {
    /// File name the launched process sees relative to its working directory.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// How an artifact ended up in the staging directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMethod {
    Hardlink,
    Symlink,
    Copy,
}

impl fmt::Display for StageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageMethod::Hardlink => "hardlink",
            StageMethod::Symlink => "symlink",
            StageMethod::Copy => "copy",
        };
        f.write_str(label)
    }
}

/// A plugin jar present in the staging directory.
///
/// A source that already sits in the staging directory is left where it is and
/// reported with [`StageMethod::Copy`], since the server sees a regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub method: StageMethod,
}

/// Non-fatal staging problem. The pipeline logs it and keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingWarning {
    /// The link attempt failed; the artifact was copied instead.
    LinkFellBack {
        source: PathBuf,
        destination: PathBuf,
        attempted: StageMethod,
        reason: String,
    },
    /// The artifact could not be staged at all.
    Failed { source: PathBuf, reason: String },
    /// No primary artifact was configured or discovered.
    NoPrimaryArtifact { searched: PathBuf },
}

impl StagingWarning {
    pub fn source(&self) -> Option<&Path> {
        match self {
            StagingWarning::LinkFellBack { source, .. } | StagingWarning::Failed { source, .. } => {
                Some(source)
            }
            StagingWarning::NoPrimaryArtifact { .. } => None,
        }
    }
}

impl fmt::Display for StagingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagingWarning::LinkFellBack {
                source,
                destination,
                attempted,
                reason,
            } => write!(
                f,
                "{attempted} {} -> {} failed ({reason}); copied instead",
                source.display(),
                destination.display()
            ),
            StagingWarning::Failed { source, reason } => {
                write!(f, "could not stage {}: {reason}", source.display())
            }
            StagingWarning::NoPrimaryArtifact { searched } => write!(
                f,
                "no plugin jar configured and none found in {}",
                searched.display()
            ),
        }
    }
}

/// Everything needed to start the server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub working_directory: PathBuf,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl LaunchPlan {
    /// Shell-like rendering for display. Arguments containing whitespace are quoted.
    pub fn command_line(&self) -> String {
        let mut parts = vec![quote(&self.program.to_string_lossy())];
        parts.extend(self.args.iter().map(|arg| quote(arg)));
        parts.join(" ")
    }
}

fn quote(value: &str) -> String {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        format!("'{}'", value.replace('\'', "'\\''"))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_artifact_file_name_drops_directory() {
        let cached = CachedArtifact {
            path: PathBuf::from("build/run-folia/folia-1.21.6.jar"),
            version: "1.21.6".to_string(),
        };
        assert_eq!(cached.file_name(), "folia-1.21.6.jar");
    }

    #[test]
    fn command_line_quotes_whitespace() {
        let plan = LaunchPlan {
            working_directory: PathBuf::from("run"),
            program: PathBuf::from("java"),
            args: vec![
                "-Dname=a b".to_string(),
                "-jar".to_string(),
                "folia-1.21.6.jar".to_string(),
            ],
        };
        assert_eq!(plan.command_line(), "java '-Dname=a b' -jar folia-1.21.6.jar");
    }
}
