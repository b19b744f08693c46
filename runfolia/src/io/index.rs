//! Remote build index client and version resolution.
//!
//! The [`BuildIndex`] trait decouples resolution and download from the HTTP
//! transport. [`PaperApi`] talks to the PaperMC builds API; tests use a
//! scripted index that serves canned bodies without touching the network.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::{debug, info, instrument};

use crate::core::builds::{BuildList, parse_build_list, select_build};
use crate::core::types::BuildReference;
use crate::error::{DownloadError, ResolutionError};

pub const DEFAULT_API_BASE_URL: &str = "https://api.papermc.io/v2";
pub const DEFAULT_PROJECT: &str = "folia";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// An open download body.
pub struct DownloadStream {
    pub url: String,
    /// Expected length, when the server announced one.
    pub content_length: Option<u64>,
    pub reader: Box<dyn Read>,
}

/// Read-only access to published builds.
pub trait BuildIndex {
    /// List the builds published for `project` at `version`.
    fn builds(&self, project: &str, version: &str) -> Result<BuildList, ResolutionError>;

    /// Open the binary of `build` for streaming.
    fn open_download(&self, build: &BuildReference) -> Result<DownloadStream, DownloadError>;
}

/// [`BuildIndex`] backed by the PaperMC builds API (v2 layout).
pub struct PaperApi {
    client: Client,
    base_url: String,
}

impl PaperApi {
    pub fn new(base_url: &str) -> Result<Self> {
        // No overall timeout: a large jar on a slow link may legitimately take minutes.
        let client = Client::builder()
            .user_agent(concat!("run-folia/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn builds_url(&self, project: &str, version: &str) -> String {
        format!(
            "{}/projects/{project}/versions/{version}/builds",
            self.base_url
        )
    }

    pub fn download_url(&self, build: &BuildReference) -> String {
        format!(
            "{}/builds/{}/downloads/{}",
            self.builds_url(&build.project, &build.version),
            build.build_number,
            build.download_file_name
        )
    }
}

impl BuildIndex for PaperApi {
    fn builds(&self, project: &str, version: &str) -> Result<BuildList, ResolutionError> {
        let url = self.builds_url(project, version);
        debug!(%url, "requesting build list");
        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|source| ResolutionError::Request {
                url: url.clone(),
                source,
            })?;
        parse_build_list(&url, &body)
    }

    fn open_download(&self, build: &BuildReference) -> Result<DownloadStream, DownloadError> {
        let url = self.download_url(build);
        let resp = self
            .client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|source| DownloadError::Request {
                url: url.clone(),
                source,
            })?;
        Ok(DownloadStream {
            content_length: resp.content_length(),
            url,
            reader: Box::new(resp),
        })
    }
}

/// Resolve `version` to its latest published build.
#[instrument(skip(index))]
pub fn resolve(
    index: &dyn BuildIndex,
    project: &str,
    version: &str,
) -> Result<BuildReference, ResolutionError> {
    let list = index.builds(project, version)?;
    debug!(candidates = list.builds.len(), "build list received");
    let build = select_build(project, version, &list)?;
    info!(
        build = build.build_number,
        file = %build.download_file_name,
        "resolved latest build"
    );
    Ok(build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedIndex, build_reference, builds_body};
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer a single HTTP request with an empty body and `status`.
    fn serve_once(status: &'static str) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).expect("read request");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let reply =
                format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            stream.write_all(reply.as_bytes()).expect("write reply");
        });
        (format!("http://{addr}/v2"), server)
    }

    #[test]
    fn urls_follow_index_layout() {
        let api = PaperApi::new("https://api.example.invalid/v2/").expect("client");
        let build = BuildReference {
            project: "folia".to_string(),
            version: "1.21.6".to_string(),
            build_number: 12,
            download_file_name: "folia-12.jar".to_string(),
        };
        assert_eq!(
            api.builds_url("folia", "1.21.6"),
            "https://api.example.invalid/v2/projects/folia/versions/1.21.6/builds"
        );
        assert_eq!(
            api.download_url(&build),
            "https://api.example.invalid/v2/projects/folia/versions/1.21.6/builds/12/downloads/folia-12.jar"
        );
    }

    #[test]
    fn error_status_on_build_list_is_resolution_error() {
        let (base, server) = serve_once("404 Not Found");
        let api = PaperApi::new(&base).expect("client");

        let err = api.builds("folia", "0.0.0").expect_err("not found");
        server.join().expect("server thread");

        match err {
            ResolutionError::Request { url, source } => {
                assert_eq!(url, format!("{base}/projects/folia/versions/0.0.0/builds"));
                assert_eq!(source.status(), Some(reqwest::StatusCode::NOT_FOUND));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_status_on_download_is_download_error() {
        let (base, server) = serve_once("500 Internal Server Error");
        let api = PaperApi::new(&base).expect("client");

        let result = api.open_download(&build_reference(12));
        server.join().expect("server thread");

        match result {
            Err(DownloadError::Request { url, source }) => {
                assert!(url.ends_with("/builds/12/downloads/folia-12.jar"));
                assert_eq!(
                    source.status(),
                    Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
                );
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("download should fail"),
        }
    }

    #[test]
    fn resolve_picks_latest_build() {
        let index = ScriptedIndex::new(
            builds_body(&[(12, "folia-12.jar"), (10, "folia-10.jar")]),
            Vec::new(),
        );
        let build = resolve(&index, "folia", "1.21.6").expect("resolve");
        assert_eq!(build.build_number, 12);
        assert_eq!(build.download_file_name, "folia-12.jar");
        assert_eq!(index.build_requests(), 1);
        assert_eq!(index.download_requests(), 0);
    }

    #[test]
    fn resolve_fails_without_builds() {
        let index = ScriptedIndex::new(builds_body(&[]), Vec::new());
        let err = resolve(&index, "folia", "9.9.9").expect_err("no builds");
        assert!(matches!(err, ResolutionError::NoBuilds { ref version, .. } if version == "9.9.9"));
    }

    #[test]
    fn resolve_rejects_malformed_body() {
        let index = ScriptedIndex::new("<html>not json</html>".to_string(), Vec::new());
        let err = resolve(&index, "folia", "1.21.6").expect_err("malformed");
        assert!(matches!(err, ResolutionError::Malformed { .. }));
    }
}
