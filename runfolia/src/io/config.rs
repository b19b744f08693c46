//! Project configuration stored in `run-folia.toml`.
//!
//! The file is optional; every key has a default. CLI flags are applied on top
//! and the result is resolved once into an immutable [`RunConfiguration`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::RunConfiguration;
use crate::io::discover::find_primary_artifact;
use crate::io::index::{DEFAULT_API_BASE_URL, DEFAULT_PROJECT};

pub const CONFIG_FILE_NAME: &str = "run-folia.toml";
pub const DEFAULT_VERSION: &str = "1.21.6";
pub const NO_GUI_FLAG: &str = "--nogui";

#[cfg(windows)]
const JAVA_BINARY: &str = "java.exe";
#[cfg(not(windows))]
const JAVA_BINARY: &str = "java";

/// Contents of `run-folia.toml`.
///
/// Relative paths are resolved against the directory holding the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigFile {
    /// Project on the build index.
    pub project: String,
    pub api_base_url: String,
    /// Server release version, e.g. `1.21.6`.
    pub version: String,
    /// Managed run directory holding the server jar, world data and `plugins/`.
    pub run_dir: PathBuf,
    /// Plugin jar under test. Discovered in `plugin_libs_dir` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_jar: Option<PathBuf>,
    pub plugin_libs_dir: PathBuf,
    /// Additional plugin jars staged next to the one under test.
    pub extra_plugins: Vec<PathBuf>,
    /// Accept the server EULA through a JVM property.
    pub auto_accept_license: bool,
    /// Link plugin jars into `plugins/` instead of copying them.
    pub prefer_linking: bool,
    /// Download the server jar even when it is already cached.
    pub force_refetch: bool,
    pub jvm_args: Vec<String>,
    pub server_args: Vec<String>,
    /// Java executable. Defaults to `$JAVA_HOME/bin/java`, then `java` on `PATH`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            version: DEFAULT_VERSION.to_string(),
            run_dir: PathBuf::from("build/run-folia"),
            plugin_jar: None,
            plugin_libs_dir: PathBuf::from("build/libs"),
            extra_plugins: Vec::new(),
            auto_accept_license: true,
            prefer_linking: true,
            force_refetch: false,
            jvm_args: Vec::new(),
            server_args: vec![NO_GUI_FLAG.to_string()],
            java: None,
        }
    }
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub version: Option<String>,
    pub run_dir: Option<PathBuf>,
    pub plugin_jar: Option<PathBuf>,
    pub force_refetch: bool,
    pub copy_only: bool,
    /// Replaces `server_args` when non-empty.
    pub server_args: Vec<String>,
}

impl ConfigFile {
    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(anyhow!("project must not be empty"));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(anyhow!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            ));
        }
        validate_version(&self.version)?;
        if self.run_dir.as_os_str().is_empty() {
            return Err(anyhow!("run_dir must not be empty"));
        }
        Ok(())
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(version) = &overrides.version {
            self.version = version.clone();
        }
        if let Some(run_dir) = &overrides.run_dir {
            self.run_dir = run_dir.clone();
        }
        if let Some(plugin_jar) = &overrides.plugin_jar {
            self.plugin_jar = Some(plugin_jar.clone());
        }
        if overrides.force_refetch {
            self.force_refetch = true;
        }
        if overrides.copy_only {
            self.prefer_linking = false;
        }
        if !overrides.server_args.is_empty() {
            self.server_args = overrides.server_args.clone();
        }
        self
    }

    /// Validate and turn into the snapshot the pipeline runs with.
    ///
    /// Discovers the plugin jar when none is set and picks the Java executable.
    pub fn resolve(self, base_dir: &Path, java_home: Option<&Path>) -> Result<RunConfiguration> {
        self.validate()?;
        let plugin_libs_dir = base_dir.join(&self.plugin_libs_dir);
        let primary_artifact = match &self.plugin_jar {
            Some(jar) => Some(base_dir.join(jar)),
            None => find_primary_artifact(&plugin_libs_dir).context("discover plugin jar")?,
        };
        let java_executable = resolve_java(self.java.as_deref(), base_dir, java_home);

        Ok(RunConfiguration {
            project: self.project,
            api_base_url: self.api_base_url.trim_end_matches('/').to_string(),
            target_version: self.version,
            run_directory: base_dir.join(&self.run_dir),
            auto_accept_license: self.auto_accept_license,
            prefer_linking: self.prefer_linking,
            force_refetch: self.force_refetch,
            extra_process_args: self.jvm_args,
            extra_server_args: self.server_args,
            java_executable,
            primary_artifact,
            primary_search_dir: plugin_libs_dir,
            secondary_artifacts: self
                .extra_plugins
                .iter()
                .map(|path| base_dir.join(path))
                .collect(),
        })
    }
}

/// Versions end up in URLs and file names, so path-like input is rejected.
fn validate_version(version: &str) -> Result<()> {
    if version.trim().is_empty() {
        return Err(anyhow!("version must not be empty"));
    }
    if version
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '?' | '#'))
        || version.contains("..")
    {
        return Err(anyhow!("invalid version {version:?}"));
    }
    Ok(())
}

/// Explicit setting, else `$JAVA_HOME/bin/java` when present, else `java` from `PATH`.
fn resolve_java(configured: Option<&Path>, base_dir: &Path, java_home: Option<&Path>) -> PathBuf {
    if let Some(java) = configured {
        // A bare command name is looked up on PATH; anything path-like is relative to the project.
        if java.components().count() == 1 && !java.is_absolute() {
            return java.to_path_buf();
        }
        return base_dir.join(java);
    }
    if let Some(home) = java_home {
        let candidate = home.join("bin").join(JAVA_BINARY);
        if candidate.is_file() {
            return candidate;
        }
    }
    PathBuf::from(JAVA_BINARY)
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ConfigFile::default()`.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        let cfg = ConfigFile::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ConfigFile =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}

/// Write the default config unless one exists (or `force` is set).
///
/// Returns whether the file was written.
pub fn write_default_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    write_config(path, &ConfigFile::default())?;
    Ok(true)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ConfigFile) -> Result<()> {
    cfg.validate()?;
    let mut buf = String::from("# run-folia settings. Relative paths resolve against this file.\n");
    buf.push_str(&toml::to_string_pretty(cfg).context("serialize config toml")?);
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
