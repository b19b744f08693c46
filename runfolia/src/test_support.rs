//! Test-only fakes for the pipeline's collaborators.

use std::cell::{Cell, RefCell};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::core::builds::{BuildList, parse_build_list};
use crate::core::types::{BuildReference, LaunchPlan, RunConfiguration, StageMethod};
use crate::error::{DownloadError, LaunchError, ResolutionError};
use crate::io::config::NO_GUI_FLAG;
use crate::io::index::{BuildIndex, DownloadStream};
use crate::io::process::Launcher;
use crate::io::stage::Linker;

/// JSON body of a build list with `(build, file name)` entries, in the given order.
pub fn builds_body(builds: &[(u32, &str)]) -> String {
    let entries: Vec<String> = builds
        .iter()
        .map(|(build, name)| {
            format!(r#"{{"build":{build},"downloads":{{"application":{{"name":"{name}"}}}}}}"#)
        })
        .collect();
    format!(r#"{{"builds":[{}]}}"#, entries.join(","))
}

/// Deterministic build reference for `folia` 1.21.6.
pub fn build_reference(build_number: u32) -> BuildReference {
    BuildReference {
        project: "folia".to_string(),
        version: "1.21.6".to_string(),
        build_number,
        download_file_name: format!("folia-{build_number}.jar"),
    }
}

/// Configuration with defaults rooted at `run_dir` and no plugins.
pub fn run_configuration(run_dir: &Path) -> RunConfiguration {
    RunConfiguration {
        project: "folia".to_string(),
        api_base_url: "https://index.invalid/v2".to_string(),
        target_version: "1.21.6".to_string(),
        run_directory: run_dir.to_path_buf(),
        auto_accept_license: true,
        prefer_linking: true,
        force_refetch: false,
        extra_process_args: Vec::new(),
        extra_server_args: vec![NO_GUI_FLAG.to_string()],
        java_executable: PathBuf::from("java"),
        primary_artifact: None,
        primary_search_dir: run_dir.join("libs"),
        secondary_artifacts: Vec::new(),
    }
}

/// Build index serving a canned build list and payload, counting requests.
pub struct ScriptedIndex {
    body: String,
    payload: Vec<u8>,
    fail_after: Option<usize>,
    build_requests: Cell<usize>,
    download_requests: Cell<usize>,
}

impl ScriptedIndex {
    pub fn new(body: String, payload: Vec<u8>) -> Self {
        Self {
            body,
            payload,
            fail_after: None,
            build_requests: Cell::new(0),
            download_requests: Cell::new(0),
        }
    }

    /// Break the download stream after `bytes` bytes.
    pub fn failing_after(mut self, bytes: usize) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    pub fn build_requests(&self) -> usize {
        self.build_requests.get()
    }

    pub fn download_requests(&self) -> usize {
        self.download_requests.get()
    }
}

impl BuildIndex for ScriptedIndex {
    fn builds(&self, project: &str, version: &str) -> Result<BuildList, ResolutionError> {
        self.build_requests.set(self.build_requests.get() + 1);
        let url = format!("scripted://projects/{project}/versions/{version}/builds");
        parse_build_list(&url, &self.body)
    }

    fn open_download(&self, build: &BuildReference) -> Result<DownloadStream, DownloadError> {
        self.download_requests.set(self.download_requests.get() + 1);
        Ok(DownloadStream {
            url: format!(
                "scripted://builds/{}/downloads/{}",
                build.build_number, build.download_file_name
            ),
            content_length: Some(self.payload.len() as u64),
            reader: Box::new(ScriptedReader {
                data: self.payload.clone(),
                pos: 0,
                fail_after: self.fail_after,
            }),
        })
    }
}

struct ScriptedReader {
    data: Vec<u8>,
    pos: usize,
    fail_after: Option<usize>,
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.fail_after.unwrap_or(self.data.len()).min(self.data.len());
        if self.pos >= limit {
            if self.fail_after.is_some() {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ));
            }
            return Ok(0);
        }
        let n = buf.len().min(limit - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Linker whose every link attempt fails, as on filesystems without link support.
pub struct FailingLinker {
    kind: StageMethod,
}

impl FailingLinker {
    pub fn symlink() -> Self {
        Self {
            kind: StageMethod::Symlink,
        }
    }

    pub fn hardlink() -> Self {
        Self {
            kind: StageMethod::Hardlink,
        }
    }
}

impl Linker for FailingLinker {
    fn link_kind(&self) -> StageMethod {
        self.kind
    }

    fn link(&self, _kind: StageMethod, _source: &Path, _destination: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "simulated link failure",
        ))
    }
}

/// Linker that reports success without creating anything.
pub struct SilentLinker;

impl Linker for SilentLinker {
    fn link_kind(&self) -> StageMethod {
        StageMethod::Symlink
    }

    fn link(&self, _kind: StageMethod, _source: &Path, _destination: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Launcher that records plans instead of spawning.
pub struct RecordingLauncher {
    exit_code: i32,
    plans: RefCell<Vec<LaunchPlan>>,
}

impl RecordingLauncher {
    pub fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            plans: RefCell::new(Vec::new()),
        }
    }

    pub fn plans(&self) -> Vec<LaunchPlan> {
        self.plans.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, plan: &LaunchPlan) -> Result<i32, LaunchError> {
        self.plans.borrow_mut().push(plan.clone());
        Ok(self.exit_code)
    }
}
