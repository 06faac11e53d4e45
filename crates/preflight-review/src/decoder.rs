//! Typed decoding of model output spans into [`Record`]s.

use preflight_core::{PreflightError, Record};

/// Why a span of model output could not become records.
///
/// Every variant keeps the offending text.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not valid JSON, or a required field is missing.
    #[error("{source}")]
    Syntax {
        /// The span that was decoded.
        raw: String,
        /// Underlying parser error.
        source: serde_json::Error,
    },

    /// Well-formed JSON that breaks a record invariant.
    #[error("{reason}")]
    Invalid {
        /// The span that was decoded.
        raw: String,
        /// Which invariant failed.
        reason: String,
    },

    /// An array was opened but never closed.
    #[error("unterminated array: no closing ']' after the first '['")]
    Unterminated {
        /// The text from the opening marker onward.
        raw: String,
    },
}

impl DecodeError {
    /// The text that failed to decode.
    pub fn raw(&self) -> &str {
        match self {
            DecodeError::Syntax { raw, .. }
            | DecodeError::Invalid { raw, .. }
            | DecodeError::Unterminated { raw } => raw,
        }
    }
}

impl From<DecodeError> for PreflightError {
    fn from(err: DecodeError) -> Self {
        let reason = err.to_string();
        let raw = match err {
            DecodeError::Syntax { raw, .. }
            | DecodeError::Invalid { raw, .. }
            | DecodeError::Unterminated { raw } => raw,
        };
        PreflightError::Decode { reason, raw }
    }
}

/// Decode a span holding exactly one record object.
///
/// # Errors
///
/// Returns [`DecodeError::Syntax`] for malformed JSON or missing fields and
/// [`DecodeError::Invalid`] for a bad line range.
///
/// # Examples
///
/// ```
/// use preflight_review::decoder::decode_record;
///
/// let text = r#"{"file":"a.py","line":{"start":1,"end":2},"severity":"high",
///               "description":"d","suggestion":"s"}"#;
/// let record = decode_record(text).unwrap();
/// assert_eq!(record.severity, "HIGH");
/// assert!(record.code_snippet.is_none());
/// ```
pub fn decode_record(text: &str) -> Result<Record, DecodeError> {
    let record: Record = serde_json::from_str(text).map_err(|source| DecodeError::Syntax {
        raw: text.to_string(),
        source,
    })?;
    normalize(record).map_err(|reason| DecodeError::Invalid {
        raw: text.to_string(),
        reason,
    })
}

/// Decode a span holding a JSON array of record objects, preserving order.
///
/// # Errors
///
/// Fails on the first malformed or invalid element; the whole span is
/// reported as raw text.
///
/// # Examples
///
/// ```
/// use preflight_review::decoder::decode_records;
///
/// assert!(decode_records("[]").unwrap().is_empty());
/// ```
pub fn decode_records(text: &str) -> Result<Vec<Record>, DecodeError> {
    let records: Vec<Record> =
        serde_json::from_str(text).map_err(|source| DecodeError::Syntax {
            raw: text.to_string(),
            source,
        })?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            normalize(r).map_err(|reason| DecodeError::Invalid {
                raw: text.to_string(),
                reason: format!("record {i}: {reason}"),
            })
        })
        .collect()
}

fn normalize(mut record: Record) -> Result<Record, String> {
    let line = record.line;
    if line.start == 0 || line.end == 0 {
        return Err(format!("line numbers must be positive, got {line}"));
    }
    if line.start > line.end {
        return Err(format!("line range is reversed: {line}"));
    }
    record.severity = record.severity.trim().to_uppercase();
    if record
        .code_snippet
        .as_deref()
        .is_some_and(|s| s.trim().is_empty())
    {
        record.code_snippet = None;
    }
    Ok(record)
}
