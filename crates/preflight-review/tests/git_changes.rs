use std::path::Path;

use git2::{Repository, RepositoryInitOptions, Signature};
use preflight_core::PreflightError;
use preflight_review::git::{collect_change, Action};

fn init_repo(dir: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    Repository::init_opts(dir, &opts).unwrap()
}

fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> git2::Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(name), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("Dev Eloper", "dev@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

#[test]
fn commit_action_reviews_head_against_parent() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "app.py", "print('one')\n", "initial");
    let head = commit_file(&repo, "app.py", "print('two')\n", "change greeting");

    let change = collect_change(dir.path(), Action::Commit, "main", None).unwrap();
    assert!(change.diff.starts_with(&format!("commit {head}")));
    assert!(change.diff.contains("Author: Dev Eloper <dev@example.com>"));
    assert!(change.diff.contains("    change greeting"));
    assert!(change.diff.contains("-print('one')"));
    assert!(change.diff.contains("+print('two')"));
    assert_eq!(change.commit_hash, head.to_string());
    assert_eq!(change.branch, "main");
    assert_eq!(
        change.project,
        dir.path().file_name().unwrap().to_string_lossy()
    );
}

#[test]
fn root_commit_diffs_against_empty_tree() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "README.md", "hello\n", "initial");

    let change = collect_change(dir.path(), Action::Commit, "main", None).unwrap();
    assert!(change.diff.contains("+hello"));
}

#[test]
fn diff_action_sees_unstaged_edits_only() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "lib.rs", "fn a() {}\n", "initial");

    let clean = collect_change(dir.path(), Action::Diff, "main", None).unwrap();
    assert!(clean.is_empty());

    std::fs::write(dir.path().join("lib.rs"), "fn a() { panic!() }\n").unwrap();
    let dirty = collect_change(dir.path(), Action::Diff, "main", None).unwrap();
    assert!(!dirty.is_empty());
    assert!(dirty.diff.contains("+fn a() { panic!() }"));
}

#[test]
fn branch_action_diffs_against_base() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    let base = commit_file(&repo, "main.go", "package main\n", "initial");

    let base_commit = repo.find_commit(base).unwrap();
    repo.branch("feature", &base_commit, false).unwrap();
    repo.set_head("refs/heads/feature").unwrap();
    let tip = commit_file(&repo, "main.go", "package main\n\nfunc main() {}\n", "add main");

    let change = collect_change(dir.path(), Action::Branch, "main", None).unwrap();
    assert_eq!(change.branch, "feature");
    assert_eq!(change.commit_hash, tip.to_string());
    assert!(change.diff.contains("+func main() {}"));

    let explicit = collect_change(dir.path(), Action::Branch, "main", Some("main")).unwrap();
    assert!(explicit.is_empty());
}

#[test]
fn unknown_base_is_a_git_error() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "a.txt", "a\n", "initial");

    let result = collect_change(dir.path(), Action::Branch, "no-such-branch", None);
    assert!(matches!(result, Err(PreflightError::Git(_))));
}

#[test]
fn outside_a_repository_is_a_git_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = collect_change(dir.path(), Action::Diff, "main", None);
    assert!(matches!(result, Err(PreflightError::Git(_))));
}
