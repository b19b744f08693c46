//! Typed schema for the build index and latest-build selection.

use serde::Deserialize;

use crate::core::types::BuildReference;
use crate::error::ResolutionError;

/// Response of `GET /projects/<project>/versions/<version>/builds`.
///
/// Only the fields the pipeline reads are modeled; anything else the index
/// returns is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildList {
    pub builds: Vec<BuildEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildEntry {
    pub build: u32,
    pub downloads: Downloads,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Downloads {
    pub application: Download,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Download {
    pub name: String,
}

/// Parse a build list body. Any shape mismatch is a [`ResolutionError::Malformed`].
pub fn parse_build_list(url: &str, body: &str) -> Result<BuildList, ResolutionError> {
    serde_json::from_str(body).map_err(|source| ResolutionError::Malformed {
        url: url.to_string(),
        source,
    })
}

/// Entry with the numerically largest build id, independent of array order.
pub fn latest_build(list: &BuildList) -> Option<&BuildEntry> {
    list.builds.iter().max_by_key(|entry| entry.build)
}

/// Select the latest build of `version` and turn it into a [`BuildReference`].
pub fn select_build(
    project: &str,
    version: &str,
    list: &BuildList,
) -> Result<BuildReference, ResolutionError> {
    let latest = latest_build(list).ok_or_else(|| ResolutionError::NoBuilds {
        project: project.to_string(),
        version: version.to_string(),
    })?;
    Ok(BuildReference {
        project: project.to_string(),
        version: version.to_string(),
        build_number: latest.build,
        download_file_name: latest.downloads.application.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://index.invalid/projects/folia/versions/1.21.6/builds";

    fn entry(build: u32) -> String {
        format!(
            r#"{{"build":{build},"channel":"default","downloads":{{"application":{{"name":"folia-1.21.6-{build}.jar","sha256":"00"}}}}}}"#
        )
    }

    fn body(builds: &[u32]) -> String {
        let entries: Vec<String> = builds.iter().map(|b| entry(*b)).collect();
        format!(
            r#"{{"project_id":"folia","version":"1.21.6","builds":[{}]}}"#,
            entries.join(",")
        )
    }

    #[test]
    fn selects_largest_build_regardless_of_order() {
        for order in [[3, 17, 9], [17, 9, 3], [9, 3, 17]] {
            let list = parse_build_list(URL, &body(&order)).expect("parse");
            let selected = select_build("folia", "1.21.6", &list).expect("select");
            assert_eq!(selected.build_number, 17);
            assert_eq!(selected.download_file_name, "folia-1.21.6-17.jar");
        }
    }

    #[test]
    fn empty_build_list_is_resolution_error() {
        let list = parse_build_list(URL, &body(&[])).expect("parse");
        let err = select_build("folia", "1.21.6", &list).expect_err("no builds");
        assert!(matches!(err, ResolutionError::NoBuilds { .. }));
    }

    #[test]
    fn missing_download_name_is_malformed() {
        let raw = r#"{"builds":[{"build":4,"downloads":{}}]}"#;
        let err = parse_build_list(URL, raw).expect_err("malformed");
        assert!(matches!(err, ResolutionError::Malformed { .. }));
    }

    #[test]
    fn non_numeric_build_is_malformed() {
        let raw = r#"{"builds":[{"build":"12","downloads":{"application":{"name":"x.jar"}}}]}"#;
        let err = parse_build_list(URL, raw).expect_err("malformed");
        assert!(matches!(err, ResolutionError::Malformed { .. }));
    }
}
