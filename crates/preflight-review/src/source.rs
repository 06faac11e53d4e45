//! Generation sources.
//!
//! A source is any finite, non-restartable sequence of text fragments:
//! `IntoIterator<Item = Result<String, PreflightError>>`. A single complete
//! response is just a sequence of length one.

use preflight_core::PreflightError;

use crate::llm::ChatMessage;

/// Canned model answer used by `--mock` runs.
pub const MOCK_RESPONSE: &str = r#"<think>
The diff touches the request handler and the settings loader. Check input handling
and error paths before writing findings.
</think>
I reviewed the change and found the following issues:

```json
[
  {
    "file": "src/handlers/upload.py",
    "line": {"start": 42, "end": 47},
    "severity": "CRITICAL",
    "description": "The uploaded filename is joined onto the storage directory without normalization, allowing path traversal with '../' segments.",
    "suggestion": "Resolve the final path and reject it unless it stays inside the storage root.",
    "codeSnippet": "dest = os.path.join(UPLOAD_DIR, request.files['f'].filename)"
  },
  {
    "file": "src/settings.py",
    "line": {"start": 12, "end": 12},
    "severity": "MEDIUM",
    "description": "A missing TIMEOUT environment variable raises KeyError at import time.",
    "suggestion": "Use os.environ.get with a sensible default."
  },
  {
    "file": "src/handlers/upload.py",
    "line": {"start": 88, "end": 90},
    "severity": "LOW",
    "description": "The temporary file is never closed on the error path.",
    "suggestion": "Wrap the temporary file in a with-block.",
    "codeSnippet": "tmp = open(path, 'wb')\nif not ok: return {\"error\": msg}"
  }
]
```
"#;

/// Replays fixed text as fragments of `width` characters.
///
/// # Examples
///
/// ```
/// use preflight_review::source::CannedSource;
///
/// let fragments: Vec<String> = CannedSource::new("héllo", 2).map(Result::unwrap).collect();
/// assert_eq!(fragments, vec!["hé", "ll", "o"]);
/// ```
#[derive(Debug, Clone)]
pub struct CannedSource {
    text: String,
    pos: usize,
    width: usize,
}

impl CannedSource {
    /// Replay `text` in fragments of `width` characters (at least one).
    pub fn new(text: impl Into<String>, width: usize) -> Self {
        Self {
            text: text.into(),
            pos: 0,
            width: width.max(1),
        }
    }

    /// The built-in mock response.
    pub fn mock(width: usize) -> Self {
        Self::new(MOCK_RESPONSE, width)
    }
}

impl Iterator for CannedSource {
    type Item = Result<String, PreflightError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..];
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(self.width)
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        Some(Ok(rest[..end].to_string()))
    }
}

/// Refuse a request that would not fit the model's context.
///
/// Tokens are estimated as one per four bytes over the content of every
/// message, so the system prompt and the diff wrapper count too.
///
/// # Errors
///
/// Returns [`PreflightError::SourceUnavailable`] if the estimate exceeds
/// `max_input_tokens`.
///
/// # Examples
///
/// ```
/// use preflight_review::prompt::review_messages;
/// use preflight_review::source::check_capacity;
///
/// assert!(check_capacity(&review_messages("small diff"), 10_000).is_ok());
/// assert!(check_capacity(&review_messages("small diff"), 100).is_err());
/// ```
pub fn check_capacity(
    messages: &[ChatMessage],
    max_input_tokens: usize,
) -> Result<(), PreflightError> {
    let bytes: usize = messages.iter().map(|m| m.content.len()).sum();
    let estimate = bytes / 4;
    if estimate > max_input_tokens {
        return Err(PreflightError::SourceUnavailable(format!(
            "input is ~{estimate} tokens, model capacity is {max_input_tokens}"
        )));
    }
    Ok(())
}
