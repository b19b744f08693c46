//! Orchestration of the prepare-and-launch pipeline.
//!
//! Stages run strictly in order: resolve the latest build, fetch it into the
//! run directory cache, stage the plugin under test, stage companion plugins,
//! plan the command line, launch. Resolution, download and launch failures end
//! the run with the originating error; staging problems are only warnings.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::launch::plan_launch;
use crate::core::types::{
    BuildReference, CachedArtifact, LaunchPlan, RunConfiguration, StagingWarning,
};
use crate::error::RunError;
use crate::io::fetch::fetch;
use crate::io::index::{BuildIndex, resolve};
use crate::io::paths::{RunPaths, is_cached_jar_name, is_partial_download_name};
use crate::io::process::Launcher;
use crate::io::stage::{Linker, StageReport, stage, stage_all};

/// Collaborators the pipeline talks to.
pub struct Pipeline<'a> {
    pub index: &'a dyn BuildIndex,
    pub linker: &'a dyn Linker,
    pub launcher: &'a dyn Launcher,
}

/// Everything produced before launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub build: BuildReference,
    pub cached: CachedArtifact,
    pub staging: StageReport,
    pub plan: LaunchPlan,
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub prepared: Prepared,
    /// Exit code of the server process.
    pub exit_code: i32,
}

/// Resolve, fetch and stage; return the plan without launching.
pub fn prepare(config: &RunConfiguration, pipeline: &Pipeline<'_>) -> Result<Prepared, RunError> {
    let paths = RunPaths::new(&config.run_directory);
    debug!(run_dir = %paths.run_dir.display(), version = %config.target_version, "preparing run");

    let build = resolve(pipeline.index, &config.project, &config.target_version)?;
    let destination = paths.cached_jar(&config.project, &config.target_version);
    let cached = fetch(pipeline.index, &build, &destination, config.force_refetch)?;

    let mut staging = StageReport::default();
    match &config.primary_artifact {
        Some(primary) => staging.record(stage(
            pipeline.linker,
            primary,
            &paths.plugins_dir,
            config.prefer_linking,
        )),
        None => {
            let warning = StagingWarning::NoPrimaryArtifact {
                searched: config.primary_search_dir.clone(),
            };
            warn!("{warning}");
            staging.warnings.push(warning);
        }
    }
    if !config.secondary_artifacts.is_empty() {
        staging.merge(stage_all(
            pipeline.linker,
            &config.secondary_artifacts,
            &paths.plugins_dir,
            config.prefer_linking,
        ));
    }
    if !staging.warnings.is_empty() {
        info!(
            warnings = staging.warnings.len(),
            "staging finished with warnings"
        );
    }

    let plan = plan_launch(&cached, &paths.run_dir, config);
    Ok(Prepared {
        build,
        cached,
        staging,
        plan,
    })
}

/// Run the whole pipeline and wait for the server to exit.
pub fn run(config: &RunConfiguration, pipeline: &Pipeline<'_>) -> Result<RunOutcome, RunError> {
    let prepared = prepare(config, pipeline)?;
    let exit_code = pipeline.launcher.launch(&prepared.plan)?;
    Ok(RunOutcome {
        prepared,
        exit_code,
    })
}

/// Plan from the cache location alone, without contacting the index.
pub fn plan_offline(config: &RunConfiguration) -> LaunchPlan {
    let paths = RunPaths::new(&config.run_directory);
    let cached = CachedArtifact {
        path: paths.cached_jar(&config.project, &config.target_version),
        version: config.target_version.clone(),
    };
    plan_launch(&cached, &paths.run_dir, config)
}

/// Remove cached server jars. With `all_versions`, every cached jar of the
/// project goes, along with partial downloads a killed fetch left behind;
/// otherwise only the configured version's jar.
pub fn clean_cache(config: &RunConfiguration, all_versions: bool) -> Result<Vec<PathBuf>> {
    let paths = RunPaths::new(&config.run_directory);
    let mut removed = Vec::new();
    if !paths.run_dir.is_dir() {
        return Ok(removed);
    }

    let targets: Vec<PathBuf> = if all_versions {
        let mut found = Vec::new();
        for entry in fs::read_dir(&paths.run_dir)
            .with_context(|| format!("read {}", paths.run_dir.display()))?
        {
            let entry = entry.context("read entry")?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if is_cached_jar_name(&config.project, &name) || is_partial_download_name(&name) {
                found.push(entry.path());
            }
        }
        found.sort();
        found
    } else {
        vec![paths.cached_jar(&config.project, &config.target_version)]
    };

    for target in targets {
        if target.is_file() {
            fs::remove_file(&target).with_context(|| format!("remove {}", target.display()))?;
            info!(path = %target.display(), "removed cached file");
            removed.push(target);
        }
    }
    Ok(removed)
}
