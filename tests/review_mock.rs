use std::path::Path;
use std::process::{Command, Output};

use git2::{Repository, RepositoryInitOptions, Signature};

fn init_repo(dir: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir, &opts).unwrap();

    std::fs::write(dir.join("upload.py"), "def upload(f):\n    pass\n").unwrap();
    {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("upload.py")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Dev Eloper", "dev@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
    }
    repo
}

fn preflight(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_preflight"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn mock_review_lists_findings_without_a_terminal() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    std::fs::write(
        dir.path().join("upload.py"),
        "def upload(f):\n    dest = os.path.join(UPLOAD_DIR, f.filename)\n",
    )
    .unwrap();

    let output = preflight(dir.path(), &["review", "diff", "--mock", "--test"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "review failed: {stderr}");

    assert!(stdout.contains("Found 3 issue(s): 1 CRITICAL, 1 MEDIUM, 1 LOW"));
    assert!(stdout.contains("Preflight Review Issue 1 of 3"));
    assert!(stdout.contains("Preflight Review Issue 3 of 3"));
    assert!(stdout.contains("File: src/handlers/upload.py"));
    assert!(stdout.contains("Line: 88-90"));
    assert!(stdout.contains("--- End of Review ---"));

    // Findings appear on stderr while the response is still streaming.
    assert!(stderr.contains("[CRITICAL] src/handlers/upload.py:42-47"));
    assert!(stderr.contains("[MEDIUM] src/settings.py:12-12"));

    // Dry runs leave nothing behind.
    assert!(!dir.path().join(".preflight").exists());
}

#[test]
fn mock_review_writes_database_and_report() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    std::fs::write(dir.path().join(".preflight.toml"), "[notify]\nenabled = false\n").unwrap();
    std::fs::write(dir.path().join("upload.py"), "def upload(f):\n    return 1\n").unwrap();

    let output = preflight(dir.path(), &["review", "diff", "--mock"]);
    assert!(
        output.status.success(),
        "review failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Report: "));
    assert!(dir.path().join(".preflight").join("reviews.db").exists());

    let project = dir.path().file_name().unwrap();
    let reports = dir.path().join(".preflight").join("reports").join(project);
    let entries: Vec<_> = std::fs::read_dir(reports).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn clean_tree_has_nothing_to_review() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());

    let output = preflight(dir.path(), &["review", "diff", "--mock", "--test"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Nothing to review"));
}

#[test]
fn outside_a_repository_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = preflight(dir.path(), &["review", "commit", "--mock", "--test"]);
    assert!(!output.status.success());
}

#[test]
fn oversized_change_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    std::fs::write(
        dir.path().join(".preflight.toml"),
        "[llm]\nmax_input_tokens = 4\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("upload.py"), "x = 1\n".repeat(50)).unwrap();

    let output = preflight(dir.path(), &["review", "diff", "--mock", "--test"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("model capacity is 4"));
}
