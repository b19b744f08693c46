//! CLI tests for `run-folia`.
//!
//! Spawns the binary against temporary project directories and checks output
//! and exit codes for the commands that need no network.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use runfolia::exit_codes;

fn run_folia(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_run-folia"))
        .current_dir(dir)
        .env_remove("JAVA_HOME")
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("run-folia")
}

#[test]
fn plan_prints_ordered_command() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("run-folia.toml"),
        "java = \"java\"\njvm_args = [\"-Xmx1G\"]\n",
    )
    .expect("config");

    let output = run_folia(temp.path(), &["plan", "--mc-version", "1.21.6"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("command: java -Dcom.mojang.eula.agree=true -Xmx1G -jar folia-1.21.6.jar --nogui"),
        "unexpected stdout: {stdout}"
    );
    let root = fs::canonicalize(temp.path()).expect("canonical tempdir");
    let workdir = root.join("build").join("run-folia");
    assert!(stdout.contains(&format!("workdir: {}", workdir.display())));
}

#[test]
fn trailing_args_replace_server_args() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = run_folia(temp.path(), &["plan", "--", "--port", "25570"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim_end().ends_with("-jar folia-1.21.6.jar --port 25570"));
    assert!(!stdout.contains("--nogui"));
}

#[test]
fn init_config_writes_loadable_file() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = run_folia(temp.path(), &["init-config"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let contents = fs::read_to_string(temp.path().join("run-folia.toml")).expect("config");
    assert!(contents.contains("version = \"1.21.6\""));

    let output = run_folia(temp.path(), &["plan"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
}

#[test]
fn missing_explicit_config_fails() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = run_folia(temp.path(), &["plan", "--config", "nope.toml"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.toml"));
}

#[test]
fn clean_removes_cached_jar() {
    let temp = tempfile::tempdir().expect("tempdir");
    let run_dir = temp.path().join("run");
    fs::create_dir_all(&run_dir).expect("run dir");
    fs::write(run_dir.join("folia-1.21.6.jar"), b"jar").expect("jar");

    let output = run_folia(temp.path(), &["clean", "--run-dir", "run"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(!run_dir.join("folia-1.21.6.jar").exists());
}

#[test]
fn unreachable_index_fails_before_download() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("run-folia.toml"),
        "api_base_url = \"http://127.0.0.1:9\"\njava = \"java\"\n",
    )
    .expect("config");

    let output = run_folia(temp.path(), &["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("request build index"));
    assert!(!temp.path().join("build").join("run-folia").exists());
}
