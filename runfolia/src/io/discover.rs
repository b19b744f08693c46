//! Locating the plugin jar produced by the build when none is configured.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

/// Classifiers that never denote the runnable plugin jar.
const IGNORED_CLASSIFIERS: [&str; 3] = ["-sources", "-javadoc", "-plain"];
/// Classifier of a shaded jar with dependencies bundled.
const SHADED_CLASSIFIER: &str = "-all";

/// Pick the plugin jar in `libs_dir`.
///
/// A shaded jar (`*-all.jar`) wins over a plain one. Among equals, the most
/// recently modified jar is chosen, then the lexicographically last name.
/// Returns `None` when the directory is missing or holds no candidate.
pub fn find_primary_artifact(libs_dir: &Path) -> Result<Option<PathBuf>> {
    if !libs_dir.is_dir() {
        debug!(dir = %libs_dir.display(), "plugin libs directory missing");
        return Ok(None);
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(libs_dir).with_context(|| format!("read {}", libs_dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", libs_dir.display()))?;
        let path = entry.path();
        let Some(stem) = jar_stem(&path) else {
            continue;
        };
        if IGNORED_CLASSIFIERS.iter().any(|suffix| stem.ends_with(suffix)) || !path.is_file() {
            continue;
        }
        let shaded = stem.ends_with(SHADED_CLASSIFIER);
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        candidates.push((shaded, modified, path));
    }

    let selected = candidates.into_iter().max().map(|(_, _, path)| path);
    debug!(dir = %libs_dir.display(), selected = ?selected, "plugin jar discovery");
    Ok(selected)
}

fn jar_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".jar").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_shaded_jar() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("my-plugin-1.0.jar"), b"thin").expect("write");
        fs::write(temp.path().join("my-plugin-1.0-all.jar"), b"fat").expect("write");

        let selected = find_primary_artifact(temp.path()).expect("discover");
        assert_eq!(selected, Some(temp.path().join("my-plugin-1.0-all.jar")));
    }

    #[test]
    fn skips_sources_and_javadoc() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("my-plugin-1.0-sources.jar"), b"").expect("write");
        fs::write(temp.path().join("my-plugin-1.0-javadoc.jar"), b"").expect("write");
        fs::write(temp.path().join("my-plugin-1.0.jar"), b"").expect("write");
        fs::write(temp.path().join("notes.txt"), b"").expect("write");

        let selected = find_primary_artifact(temp.path()).expect("discover");
        assert_eq!(selected, Some(temp.path().join("my-plugin-1.0.jar")));
    }

    #[test]
    fn missing_directory_yields_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let selected = find_primary_artifact(&temp.path().join("build/libs")).expect("discover");
        assert_eq!(selected, None);
    }
}
