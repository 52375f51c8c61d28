//! Integration tests for the CLI application
//!
//! These tests run the built binary against real data files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to create test data files
struct TestDataFiles {
    dir: TempDir,
    train: PathBuf,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let train = dir.path().join("train.txt");

        let mut file = fs::File::create(&train)?;
        writeln!(file, "+1 1:2.0 2:1.0")?;
        writeln!(file, "-1 1:-2.0 2:-1.0")?;
        writeln!(file, "+1 1:1.5 2:0.8")?;
        writeln!(file, "-1 1:-1.5 2:-0.8")?;
        writeln!(file, "+1 1:1.8 2:0.9")?;
        writeln!(file, "-1 1:-1.8 2:-0.9")?;
        file.flush()?;

        Ok(Self { dir, train })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn svmbridge() -> Command {
    Command::new(env!("CARGO_BIN_EXE_svmbridge"))
}

fn run(args: &[&str]) -> Output {
    svmbridge().args(args).output().expect("Failed to run svmbridge")
}

fn train_model(files: &TestDataFiles, model: &Path) {
    let command = format!("-t 0 {} {}", files.train.display(), model.display());
    let output = run(&["train", &command]);
    assert!(
        output.status.success(),
        "train failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("train"));
    assert!(stdout.contains("predict"));
    assert!(stdout.contains("scale"));
}

#[test]
fn test_cli_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_train_and_predict_from_file() {
    let files = TestDataFiles::new().unwrap();
    let model = files.path("svm.model");
    train_model(&files, &model);
    assert!(model.exists());

    let input = files.path("sample.txt");
    fs::write(&input, "0 1.6 0.7\n").unwrap();

    let command = format!("-b 0 {}", model.display());
    let output = run(&["predict", "--input", input.to_str().unwrap(), &command]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1 0");
}

#[test]
fn test_cli_predict_from_stdin() {
    let files = TestDataFiles::new().unwrap();
    let model = files.path("svm.model");
    train_model(&files, &model);

    let command = format!("{}", model.display());
    let mut child = svmbridge()
        .args(["predict", &command])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"0 -1.6 -0.7")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "-1 0");
}

#[test]
fn test_cli_predict_without_probability_model_fails() {
    let files = TestDataFiles::new().unwrap();
    let model = files.path("svm.model");
    train_model(&files, &model);

    let input = files.path("sample.txt");
    fs::write(&input, "0 1.6 0.7").unwrap();

    let command = format!("-b 1 {}", model.display());
    let output = run(&["predict", "--input", input.to_str().unwrap(), &command]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("probability"));
}

#[test]
fn test_cli_scale() {
    let files = TestDataFiles::new().unwrap();
    let scaled = files.path("train.scaled");

    let command = format!("-l 0 -u 1 {}", files.train.display());
    let output = run(&["scale", &command, "--output", scaled.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = fs::read_to_string(&scaled).unwrap();
    assert_eq!(text.lines().count(), 6);
    assert!(text.lines().next().unwrap().starts_with("1 1:1 2:1"));
    // Nothing leaks to stdout while redirected
    assert!(output.stdout.is_empty());
}

#[test]
fn test_cli_bad_command_string() {
    let output = run(&["train", "-s 7"]);
    assert!(!output.status.success());

    let output = run(&["predict", ""]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_cli_invalid_input_values() {
    let files = TestDataFiles::new().unwrap();
    let model = files.path("svm.model");
    train_model(&files, &model);

    let input = files.path("sample.txt");
    fs::write(&input, "0 abc").unwrap();

    let output = run(&["predict", "--input", input.to_str().unwrap(), &model.display().to_string()]);
    assert!(!output.status.success());
}
