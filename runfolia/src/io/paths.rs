//! Canonical locations inside the managed run directory.

use std::path::{Path, PathBuf};

/// Directory under the run directory that the server loads plugins from.
pub const PLUGINS_DIR: &str = "plugins";

/// Name prefix and suffix of an in-progress download next to the cached jar.
pub const PARTIAL_PREFIX: &str = ".download-";
pub const PARTIAL_SUFFIX: &str = ".part";

/// All paths the pipeline owns for one run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub run_dir: PathBuf,
    pub plugins_dir: PathBuf,
}

impl RunPaths {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        let run_dir = run_dir.into();
        Self {
            plugins_dir: run_dir.join(PLUGINS_DIR),
            run_dir,
        }
    }

    /// Cache location of the server jar for `project` at `version`.
    pub fn cached_jar(&self, project: &str, version: &str) -> PathBuf {
        self.run_dir.join(cached_jar_name(project, version))
    }
}

/// `<project>-<version>.jar`; one name per version so different versions coexist.
pub fn cached_jar_name(project: &str, version: &str) -> String {
    format!("{project}-{version}.jar")
}

/// Whether `name` looks like a cached server jar of `project`.
pub fn is_cached_jar_name(project: &str, name: &str) -> bool {
    name.strip_prefix(project)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(".jar"))
        .is_some_and(|version| !version.is_empty())
}

/// Whether `name` is a download left behind by an interrupted fetch.
pub fn is_partial_download_name(name: &str) -> bool {
    name.len() > PARTIAL_PREFIX.len() + PARTIAL_SUFFIX.len()
        && name.starts_with(PARTIAL_PREFIX)
        && name.ends_with(PARTIAL_SUFFIX)
}

pub fn relative_to<'a>(path: &'a Path, base: &Path) -> &'a Path {
    path.strip_prefix(base).unwrap_or(path)
}
