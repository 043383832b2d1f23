use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use ragline::store::CorpusStore;
use ragline_core::corpus::Corpus;
use ragline_core::models::Chunk;

fn ragline_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ragline");
    path
}

/// Temp project with `config/ragline.toml` pointing at `files/`.
fn setup_test_env(with_files: bool) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    if with_files {
        fs::write(
            files_dir.join("alpha.md"),
            "# Alpha\n\nThis document is about Rust programming, cargo and crates.",
        )
        .unwrap();
        fs::write(
            files_dir.join("gamma.txt"),
            "Notes about deployment: Kubernetes and Docker.",
        )
        .unwrap();
    }

    let config_content = r#"[corpus]
root = "../files"
store_dir = "../store"

[chunking]
size = 200
overlap = 20
"#;
    let config_path = config_dir.join("ragline.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ragline(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ragline_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RAGLINE_LOG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ragline binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn persist_fake_corpus(store_dir: &Path, model: &str) {
    let chunks = vec![Chunk {
        text: "Rust programming".into(),
        source_path: "alpha.md".into(),
        chunk_index: 0,
    }];
    let corpus = Corpus::from_vectors(chunks, &[vec![0.5; 8]], model).unwrap();
    CorpusStore::new(store_dir).persist(&corpus).unwrap();
}

#[test]
fn test_help_lists_commands() {
    let (_tmp, config_path) = setup_test_env(false);
    let (stdout, _, success) = run_ragline(&config_path, &["--help"]);
    assert!(success);
    assert!(stdout.contains("prepare"));
    assert!(stdout.contains("query"));
    assert!(stdout.contains("status"));
}

#[test]
fn test_prepare_empty_directory_fails() {
    let (tmp, config_path) = setup_test_env(false);

    let (stdout, stderr, success) = run_ragline(&config_path, &["prepare"]);
    assert!(!success, "prepare should fail: stdout={}", stdout);
    assert!(
        stderr.contains("no documents found"),
        "unexpected stderr: {}",
        stderr
    );
    assert!(!CorpusStore::new(tmp.path().join("store")).exists());
}

#[test]
fn test_query_before_prepare_fails() {
    let (_tmp, config_path) = setup_test_env(true);

    let (_, stderr, success) = run_ragline(&config_path, &["query", "What is Rust?"]);
    assert!(!success);
    assert!(stderr.contains("corpus not built"), "unexpected stderr: {}", stderr);
    assert!(stderr.contains("ragline prepare"));
}

#[test]
fn test_query_with_mismatched_model_fails() {
    let (tmp, config_path) = setup_test_env(true);
    persist_fake_corpus(&tmp.path().join("store"), "some-other-model");

    let (_, stderr, success) = run_ragline(&config_path, &["query", "Rust", "--no-answer"]);
    assert!(!success);
    assert!(stderr.contains("some-other-model"), "unexpected stderr: {}", stderr);
    assert!(stderr.contains("ragline prepare"));
}

#[test]
fn test_query_with_corrupt_store_fails() {
    let (tmp, config_path) = setup_test_env(true);
    let store = tmp.path().join("store");
    persist_fake_corpus(&store, "all-minilm-l6-v2");
    let sidecar = CorpusStore::new(&store).sidecar_path().unwrap();
    fs::write(sidecar, "{\"chunks\": [], \"metadata\": []}").unwrap();

    let (_, stderr, success) = run_ragline(&config_path, &["query", "Rust", "--no-answer"]);
    assert!(!success);
    assert!(stderr.contains("corrupt"), "unexpected stderr: {}", stderr);
}

#[test]
fn test_status_before_prepare() {
    let (_tmp, config_path) = setup_test_env(true);

    let (stdout, stderr, success) = run_ragline(&config_path, &["status"]);
    assert!(success, "status failed: stderr={}", stderr);
    assert!(stdout.contains("Not built"));
}

#[test]
fn test_status_reports_store() {
    let (tmp, config_path) = setup_test_env(true);
    persist_fake_corpus(&tmp.path().join("store"), "all-minilm-l6-v2");

    let (stdout, stderr, success) = run_ragline(&config_path, &["status"]);
    assert!(success, "status failed: stderr={}", stderr);
    assert!(stdout.contains("Chunks:      1"));
    assert!(stdout.contains("all-minilm-l6-v2 (8 dims)"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_ragline(&tmp.path().join("nope.toml"), &["status"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_invalid_chunking_rejected() {
    let (tmp, _) = setup_test_env(true);
    let config_path = tmp.path().join("config").join("bad.toml");
    fs::write(
        &config_path,
        "[corpus]\nroot = \"../files\"\n[chunking]\nsize = 50\noverlap = 50\n",
    )
    .unwrap();

    let (_, stderr, success) = run_ragline(&config_path, &["status"]);
    assert!(!success);
    assert!(stderr.contains("configuration error"), "unexpected stderr: {}", stderr);
}
