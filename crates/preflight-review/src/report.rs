//! Self-contained HTML report of a review.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use preflight_core::{PreflightError, Record, SeverityClass};
use tracing::info;

/// Labels shown in the report header and used to place the file.
///
/// # Examples
///
/// ```
/// use preflight_review::report::ReportMeta;
///
/// let meta = ReportMeta {
///     project: "demo".into(),
///     branch: "main".into(),
///     commit_hash: "0123456789abcdef".into(),
/// };
/// assert_eq!(meta.short_hash(), "0123456");
/// ```
#[derive(Debug, Clone)]
pub struct ReportMeta {
    /// Repository name; becomes the report's directory.
    pub project: String,
    /// Branch the change was reviewed on.
    pub branch: String,
    /// Full commit hash.
    pub commit_hash: String,
}

impl ReportMeta {
    /// The first seven characters of the commit hash.
    pub fn short_hash(&self) -> &str {
        let end = self
            .commit_hash
            .char_indices()
            .nth(7)
            .map_or(self.commit_hash.len(), |(i, _)| i);
        &self.commit_hash[..end]
    }
}

const STYLE: &str = r#"
:root {
  --bg: #f8f9fa; --text: #333; --card: #fff; --border: #e9ecef;
  --critical: #8b0000; --high: #dc3545; --medium: #fd7e14; --low: #17a2b8; --info: #0366d6;
}
body { font-family: -apple-system, "Segoe UI", Roboto, Arial, sans-serif; background: var(--bg);
  color: var(--text); line-height: 1.6; margin: 0; padding: 40px 20px; }
.container { max-width: 900px; margin: 0 auto; }
header { margin-bottom: 40px; text-align: center; }
h1 { margin: 0; color: #2c3e50; }
.metadata { color: #6c757d; font-size: 0.9em; }
.metadata span { margin: 0 10px; }
.issue { background: var(--card); border: 1px solid var(--border); border-radius: 8px;
  margin-bottom: 24px; overflow: hidden; }
.issue-header { padding: 12px 20px; border-bottom: 1px solid var(--border); background: #fafbfc; }
.file-path { font-family: Consolas, Menlo, monospace; font-size: 0.9em; color: #586069; }
.badge { padding: 4px 8px; border-radius: 4px; font-size: 0.75em; font-weight: bold; color: #fff; }
.badge.severity-CRITICAL { background: var(--critical); }
.badge.severity-HIGH { background: var(--high); }
.badge.severity-MEDIUM { background: var(--medium); }
.badge.severity-LOW { background: var(--low); }
.badge.severity-INFO { background: var(--info); }
.issue.severity-CRITICAL { border-left: 4px solid var(--critical); }
.issue.severity-HIGH { border-left: 4px solid var(--high); }
.issue.severity-MEDIUM { border-left: 4px solid var(--medium); }
.issue.severity-LOW { border-left: 4px solid var(--low); }
.issue.severity-INFO { border-left: 4px solid var(--info); }
.issue-content { padding: 20px; }
.issue-content h3 { margin-top: 0; font-size: 1.1em; }
.suggestion { background: #f1f8ff; border: 1px solid #c8e1ff; border-radius: 4px; padding: 12px; }
.code-snippet { background: #f6f8fa; border: 1px solid #eaecef; border-radius: 4px; padding: 12px;
  margin-top: 16px; overflow-x: auto; }
pre { margin: 0; }
.empty-state { text-align: center; padding: 40px; color: #6c757d; border: 1px dashed #dee2e6; }
"#;

/// Write the HTML report for `records` and return its path.
///
/// The file lands at `root/<project>/<short-hash>.html`, overwriting any
/// earlier report for the same commit.
///
/// # Errors
///
/// Returns [`PreflightError::Report`] if the directory or file cannot be
/// written.
///
/// # Examples
///
/// ```
/// use preflight_review::report::{write_report, ReportMeta};
///
/// let dir = tempfile::tempdir().unwrap();
/// let meta = ReportMeta {
///     project: "demo".into(),
///     branch: "main".into(),
///     commit_hash: "0123456789".into(),
/// };
/// let path = write_report(dir.path(), &[], &meta).unwrap();
/// assert!(path.ends_with("demo/0123456.html"));
/// ```
pub fn write_report(
    root: &Path,
    records: &[Record],
    meta: &ReportMeta,
) -> Result<PathBuf, PreflightError> {
    let dir = root.join(&meta.project);
    std::fs::create_dir_all(&dir).map_err(|e| {
        PreflightError::Report(format!("failed to create {}: {e}", dir.display()))
    })?;

    let path = dir.join(format!("{}.html", meta.short_hash()));
    std::fs::write(&path, render_html(records, meta))
        .map_err(|e| PreflightError::Report(format!("failed to write {}: {e}", path.display())))?;

    info!(path = %path.display(), issues = records.len(), "wrote report");
    Ok(path)
}

/// Render the report document.
pub fn render_html(records: &[Record], meta: &ReportMeta) -> String {
    let mut issues = String::new();
    for record in records {
        let class = record.severity_class();
        render_issue(&mut issues, record, class);
    }
    if records.is_empty() {
        issues.push_str("<div class=\"empty-state\">No issues found.</div>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>Preflight Review - {project}</title>\n<style>{STYLE}</style>\n</head>\n\
         <body>\n<div class=\"container\">\n<header>\n<h1>Review Report</h1>\n\
         <div class=\"metadata\">\
         <span><strong>Project:</strong> {project}</span>\
         <span><strong>Branch:</strong> {branch}</span>\
         <span><strong>Commit:</strong> {commit}</span>\
         </div>\n</header>\n<main>\n{issues}</main>\n</div>\n</body>\n</html>\n",
        project = escape(&meta.project),
        branch = escape(&meta.branch),
        commit = escape(meta.short_hash()),
    )
}

fn render_issue(out: &mut String, record: &Record, class: SeverityClass) {
    let _ = write!(
        out,
        "<div class=\"issue severity-{class}\">\n\
         <div class=\"issue-header\"><span class=\"badge severity-{class}\">{severity}</span> \
         <span class=\"file-path\">{file}:{line}</span></div>\n\
         <div class=\"issue-content\">\n<h3>{description}</h3>\n\
         <div class=\"suggestion\"><strong>Suggestion:</strong> {suggestion}</div>\n",
        severity = escape(&record.severity),
        file = escape(&record.file),
        line = record.line,
        description = escape(&record.description),
        suggestion = escape(&record.suggestion),
    );
    if let Some(snippet) = &record.code_snippet {
        let _ = write!(
            out,
            "<div class=\"code-snippet\"><pre><code>{}</code></pre></div>\n",
            escape(snippet)
        );
    }
    out.push_str("</div>\n</div>\n");
}

/// Escape text for inclusion in HTML element content or attribute values.
///
/// # Examples
///
/// ```
/// use preflight_review::report::escape;
///
/// assert_eq!(escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
/// ```
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_core::LineRange;

    fn meta() -> ReportMeta {
        ReportMeta {
            project: "preflight-test".into(),
            branch: "feature/report".into(),
            commit_hash: "abc1234def5678".into(),
        }
    }

    fn record(file: &str, severity: &str, snippet: Option<&str>) -> Record {
        Record {
            file: file.into(),
            line: LineRange { start: 10, end: 15 },
            severity: severity.into(),
            description: "Unsanitized input reaches eval.".into(),
            suggestion: "Use a safer function.".into(),
            code_snippet: snippet.map(Into::into),
        }
    }

    #[test]
    fn report_contains_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record("src/main.py", "HIGH", Some("eval(user_input)")),
            record("src/utils.py", "medium", None),
            record("README.md", "whatever", Some("# Preeflight")),
        ];
        let path = write_report(dir.path(), &records, &meta()).unwrap();
        assert_eq!(path, dir.path().join("preflight-test").join("abc1234.html"));

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("src/main.py:10-15"));
        assert!(html.contains("issue severity-HIGH"));
        assert!(html.contains("issue severity-MEDIUM"));
        assert!(html.contains("issue severity-INFO"));
        assert!(html.contains("eval(user_input)"));
        assert!(html.contains("feature/report"));
        assert!(!html.contains("empty-state\">"));
        assert_eq!(html.matches("class=\"code-snippet\"").count(), 2);
    }

    #[test]
    fn record_text_is_escaped() {
        let mut r = record("a.html", "LOW", Some("if a < b && c > d {}"));
        r.description = "<script>alert('x')</script>".into();
        let html = render_html(&[r], &meta());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("if a &lt; b &amp;&amp; c &gt; d {}"));
    }

    #[test]
    fn empty_review_shows_empty_state() {
        let html = render_html(&[], &meta());
        assert!(html.contains("<div class=\"empty-state\">No issues found.</div>"));
    }

    #[test]
    fn short_hash_tolerates_short_input() {
        let m = ReportMeta {
            commit_hash: "abc".into(),
            ..meta()
        };
        assert_eq!(m.short_hash(), "abc");
    }

    #[test]
    fn rewriting_same_commit_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        write_report(dir.path(), &[record("a.rs", "LOW", None)], &meta()).unwrap();
        let path = write_report(dir.path(), &[], &meta()).unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("class=\"empty-state\""));
        assert!(!html.contains("a.rs"));
    }
}
