//! Change retrieval via git2.
//!
//! Produces the unified diff text sent to the model, along with the labels
//! used by the store and the report (commit hash, branch, project name).

use std::fmt;
use std::path::Path;

use git2::{Diff, DiffFormat, Repository};
use preflight_core::PreflightError;
use tracing::debug;

/// Which change to review.
///
/// # Examples
///
/// ```
/// use preflight_review::git::Action;
///
/// assert_eq!(Action::Branch.to_string(), "branch");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The HEAD commit against its first parent.
    Commit,
    /// Unstaged working-tree changes.
    Diff,
    /// A branch against a base reference.
    Branch,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Commit => write!(f, "commit"),
            Action::Diff => write!(f, "diff"),
            Action::Branch => write!(f, "branch"),
        }
    }
}

/// The change under review plus its identifying labels.
///
/// # Examples
///
/// ```
/// use preflight_review::git::ChangeSet;
///
/// let change = ChangeSet {
///     diff: String::new(),
///     commit_hash: "abc1234def".into(),
///     branch: "main".into(),
///     project: "demo".into(),
/// };
/// assert!(change.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Unified diff text.
    pub diff: String,
    /// Full hash of the reviewed commit (HEAD for working-tree reviews).
    pub commit_hash: String,
    /// Branch label.
    pub branch: String,
    /// Repository directory name.
    pub project: String,
}

impl ChangeSet {
    /// `true` when there is nothing to review.
    pub fn is_empty(&self) -> bool {
        self.diff.trim().is_empty()
    }
}

/// Collect the change selected by `action` from the repository containing
/// `repo_path`.
///
/// `base` is only used by [`Action::Branch`]; `branch` defaults to the
/// current branch.
///
/// # Errors
///
/// Returns [`PreflightError::Git`] if the repository, a reference, or a tree
/// cannot be resolved.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use preflight_review::git::{collect_change, Action};
///
/// let change = collect_change(Path::new("."), Action::Branch, "master", None).unwrap();
/// println!("{} bytes of diff on {}", change.diff.len(), change.branch);
/// ```
pub fn collect_change(
    repo_path: &Path,
    action: Action,
    base: &str,
    branch: Option<&str>,
) -> Result<ChangeSet, PreflightError> {
    let repo = Repository::discover(repo_path)
        .map_err(|e| PreflightError::Git(format!("failed to open repository: {e}")))?;

    let head = repo
        .head()
        .map_err(|e| PreflightError::Git(format!("failed to resolve HEAD: {e}")))?;
    let current_branch = head.shorthand().unwrap_or("HEAD").to_string();
    let head_commit = head
        .peel_to_commit()
        .map_err(|e| PreflightError::Git(format!("HEAD is not a commit: {e}")))?;

    let project = repo
        .workdir()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repository".into());

    let (diff, commit_hash, branch_label) = match action {
        Action::Commit => {
            let tree = head_commit
                .tree()
                .map_err(|e| PreflightError::Git(format!("failed to read HEAD tree: {e}")))?;
            let parent_tree = if head_commit.parent_count() > 0 {
                let parent = head_commit
                    .parent(0)
                    .map_err(|e| PreflightError::Git(format!("failed to read parent: {e}")))?;
                Some(parent.tree().map_err(|e| {
                    PreflightError::Git(format!("failed to read parent tree: {e}"))
                })?)
            } else {
                None
            };
            let diff = repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
                .map_err(|e| PreflightError::Git(format!("failed to diff commit: {e}")))?;

            let author = head_commit.author();
            let mut text = format!(
                "commit {}\nAuthor: {} <{}>\n\n",
                head_commit.id(),
                author.name().unwrap_or("unknown"),
                author.email().unwrap_or("unknown"),
            );
            for line in head_commit.message().unwrap_or("").lines() {
                text.push_str("    ");
                text.push_str(line);
                text.push('\n');
            }
            text.push('\n');
            text.push_str(&render_patch(&diff)?);
            (text, head_commit.id().to_string(), current_branch)
        }
        Action::Diff => {
            let diff = repo.diff_index_to_workdir(None, None).map_err(|e| {
                PreflightError::Git(format!("failed to diff working tree: {e}"))
            })?;
            (
                render_patch(&diff)?,
                head_commit.id().to_string(),
                current_branch,
            )
        }
        Action::Branch => {
            let target = branch.unwrap_or(current_branch.as_str()).to_string();
            let base_tree = repo
                .revparse_single(base)
                .and_then(|o| o.peel_to_tree())
                .map_err(|e| PreflightError::Git(format!("failed to resolve base '{base}': {e}")))?;
            let target_commit = repo
                .revparse_single(&target)
                .and_then(|o| o.peel_to_commit())
                .map_err(|e| {
                    PreflightError::Git(format!("failed to resolve branch '{target}': {e}"))
                })?;
            let target_tree = target_commit.tree().map_err(|e| {
                PreflightError::Git(format!("failed to read tree of '{target}': {e}"))
            })?;
            let diff = repo
                .diff_tree_to_tree(Some(&base_tree), Some(&target_tree), None)
                .map_err(|e| PreflightError::Git(format!("failed to diff branches: {e}")))?;
            (
                render_patch(&diff)?,
                target_commit.id().to_string(),
                target,
            )
        }
    };

    debug!(%action, bytes = diff.len(), branch = %branch_label, "collected change");
    Ok(ChangeSet {
        diff,
        commit_hash,
        branch: branch_label,
        project,
    })
}

fn render_patch(diff: &Diff<'_>) -> Result<String, PreflightError> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            text.push(line.origin());
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(|e| PreflightError::Git(format!("failed to render diff: {e}")))?;
    Ok(text)
}
