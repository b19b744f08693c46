//! Launching the server process.

use std::process::{Command, ExitStatus, Stdio};
use std::sync::Once;

use tracing::{debug, error, info, instrument, warn};

use crate::core::types::LaunchPlan;
use crate::error::LaunchError;
use crate::exit_codes;

/// Abstraction over starting the planned process.
///
/// Tests use a recording launcher that captures the plan instead of spawning.
pub trait Launcher {
    /// Run `plan` to completion and return its exit code.
    fn launch(&self, plan: &LaunchPlan) -> Result<i32, LaunchError>;
}

/// Spawns the server attached to the current console and waits for it.
///
/// Ctrl-C reaches the server through the terminal's process group. The
/// launcher itself keeps waiting so the server can save and exit, and its exit
/// code is still returned.
pub struct ConsoleLauncher;

static INTERRUPT_HANDLER: Once = Once::new();

/// Keep this process alive on SIGINT while the server shuts down.
///
/// A handled signal is reset to its default action in spawned children, so the
/// server still receives the interrupt normally.
fn outlive_interrupts() {
    INTERRUPT_HANDLER.call_once(|| {
        let installed = ctrlc::set_handler(|| {
            info!("interrupt received, waiting for the server to stop");
        });
        if let Err(err) = installed {
            warn!(err = %err, "could not install interrupt handler");
        }
    });
}

impl Launcher for ConsoleLauncher {
    #[instrument(skip_all, fields(workdir = %plan.working_directory.display()))]
    fn launch(&self, plan: &LaunchPlan) -> Result<i32, LaunchError> {
        info!(command = %plan.command_line(), "starting server");
        outlive_interrupts();
        let mut child = match build_command(plan).spawn() {
            Ok(child) => child,
            Err(source) => {
                error!(err = %source, program = %plan.program.display(), "failed to spawn server");
                return Err(LaunchError::Spawn {
                    program: plan.program.clone(),
                    workdir: plan.working_directory.clone(),
                    source,
                });
            }
        };
        debug!(pid = child.id(), "server spawned");

        let status = child.wait().map_err(|source| LaunchError::Wait {
            program: plan.program.clone(),
            source,
        })?;
        let code = exit_code(status);
        info!(exit_code = code, "server exited");
        Ok(code)
    }
}

pub fn build_command(plan: &LaunchPlan) -> Command {
    let mut cmd = Command::new(&plan.program);
    cmd.args(&plan.args)
        .current_dir(&plan.working_directory)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

/// Exit code to propagate for `status`.
///
/// A process killed by a signal maps to `128 + signal`, as shells report it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return exit_codes::SIGNAL_BASE + signal;
        }
    }
    exit_codes::FAILED
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[cfg(unix)]
    #[test]
    fn propagates_child_exit_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let plan = LaunchPlan {
            working_directory: temp.path().to_path_buf(),
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "test -d . && exit 7".to_string()],
        };
        let code = ConsoleLauncher.launch(&plan).expect("launch");
        assert_eq!(code, 7);
    }

    #[cfg(unix)]
    #[test]
    fn runs_inside_working_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker"), b"").expect("marker");
        let plan = LaunchPlan {
            working_directory: temp.path().to_path_buf(),
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "test -f marker".to_string()],
        };
        assert_eq!(ConsoleLauncher.launch(&plan).expect("launch"), 0);
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let plan = LaunchPlan {
            working_directory: temp.path().to_path_buf(),
            program: temp.path().join("no-such-java"),
            args: Vec::new(),
        };
        let err = ConsoleLauncher.launch(&plan).expect_err("spawn fails");
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn interrupt_waits_for_server_exit_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        // The server interrupts its parent, then finishes its own shutdown.
        let plan = LaunchPlan {
            working_directory: temp.path().to_path_buf(),
            program: PathBuf::from("sh"),
            args: vec![
                "-c".to_string(),
                "kill -INT $PPID; sleep 1; echo saved > world; exit 3".to_string(),
            ],
        };

        let code = ConsoleLauncher.launch(&plan).expect("launch");

        assert_eq!(code, 3);
        assert!(temp.path().join("world").exists());
    }

    #[cfg(unix)]
    #[test]
    fn server_keeps_default_interrupt_action() {
        let temp = tempfile::tempdir().expect("tempdir");
        let plan = LaunchPlan {
            working_directory: temp.path().to_path_buf(),
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "kill -INT $$; sleep 5; exit 0".to_string()],
        };

        let code = ConsoleLauncher.launch(&plan).expect("launch");

        assert_eq!(code, exit_codes::SIGNAL_BASE + 2);
    }

    #[cfg(unix)]
    #[test]
    fn signal_exit_maps_above_128() {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status for "terminated by SIGKILL".
        let status = ExitStatus::from_raw(9);
        assert_eq!(exit_code(status), 137);
    }
}
