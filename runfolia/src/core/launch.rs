//! Launch argument assembly.

use std::path::Path;

use crate::core::types::{CachedArtifact, LaunchPlan, RunConfiguration};

/// JVM system property that accepts the server EULA on first start.
pub const LICENSE_ACCEPT_FLAG: &str = "-Dcom.mojang.eula.agree=true";
/// Marks the next argument as the jar to run.
pub const JAR_FLAG: &str = "-jar";

/// Build the command line for running `cached` from `run_directory`.
///
/// Order is fixed: process options, `-jar`, jar file name, server options.
/// The jar is referenced by file name only since the process runs inside the
/// run directory.
pub fn plan_launch(
    cached: &CachedArtifact,
    run_directory: &Path,
    config: &RunConfiguration,
) -> LaunchPlan {
    let mut args = Vec::with_capacity(
        config.extra_process_args.len() + config.extra_server_args.len() + 3,
    );
    if config.auto_accept_license {
        args.push(LICENSE_ACCEPT_FLAG.to_string());
    }
    args.extend(
        config
            .extra_process_args
            .iter()
            .filter(|arg| !(config.auto_accept_license && arg.as_str() == LICENSE_ACCEPT_FLAG))
            .cloned(),
    );
    args.push(JAR_FLAG.to_string());
    args.push(cached.file_name());
    args.extend(config.extra_server_args.iter().cloned());

    LaunchPlan {
        working_directory: run_directory.to_path_buf(),
        program: config.java_executable.clone(),
        args,
    }
}
