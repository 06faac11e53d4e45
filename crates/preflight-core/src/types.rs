use std::fmt;

use serde::{Deserialize, Serialize};

/// An inclusive range of lines in the new version of a file.
///
/// Decoded records always satisfy `1 <= start <= end`.
///
/// # Examples
///
/// ```
/// use preflight_core::LineRange;
///
/// let range = LineRange { start: 10, end: 15 };
/// assert_eq!(range.to_string(), "10-15");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// First line of the finding.
    pub start: u32,
    /// Last line of the finding.
    pub end: u32,
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One review finding produced by the model.
///
/// Field names on the wire follow the model's JSON format, so the optional
/// excerpt is `codeSnippet`.
///
/// # Examples
///
/// ```
/// use preflight_core::{LineRange, Record, SeverityClass};
///
/// let record = Record {
///     file: "src/main.py".into(),
///     line: LineRange { start: 10, end: 15 },
///     severity: "HIGH".into(),
///     description: "eval on user input".into(),
///     suggestion: "use ast.literal_eval".into(),
///     code_snippet: None,
/// };
/// assert_eq!(record.severity_class(), SeverityClass::High);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Path of the file the finding refers to.
    pub file: String,
    /// Affected line range.
    pub line: LineRange,
    /// Severity label as reported by the model, uppercased.
    pub severity: String,
    /// Explanation of the issue.
    pub description: String,
    /// Suggested fix.
    pub suggestion: String,
    /// Optional code excerpt.
    #[serde(
        rename = "codeSnippet",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub code_snippet: Option<String>,
}

impl Record {
    /// Display class for this record's severity label.
    pub fn severity_class(&self) -> SeverityClass {
        SeverityClass::classify(&self.severity)
    }
}

/// Fixed set of display classes for severity labels.
///
/// Labels outside the set fall back to [`SeverityClass::Info`].
///
/// # Examples
///
/// ```
/// use preflight_core::SeverityClass;
///
/// assert_eq!(SeverityClass::classify("critical"), SeverityClass::Critical);
/// assert_eq!(SeverityClass::classify("URGENT"), SeverityClass::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityClass {
    /// Must be fixed before merging.
    Critical,
    /// Likely defect.
    High,
    /// Worth addressing.
    Medium,
    /// Minor issue.
    Low,
    /// Informational; also the class of unrecognized labels.
    Info,
}

impl SeverityClass {
    /// All classes, most severe first.
    pub const ALL: [SeverityClass; 5] = [
        SeverityClass::Critical,
        SeverityClass::High,
        SeverityClass::Medium,
        SeverityClass::Low,
        SeverityClass::Info,
    ];

    /// Map a severity label to its display class, ignoring case and
    /// surrounding whitespace. Never fails.
    pub fn classify(label: &str) -> SeverityClass {
        match label.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => SeverityClass::Critical,
            "HIGH" => SeverityClass::High,
            "MEDIUM" => SeverityClass::Medium,
            "LOW" => SeverityClass::Low,
            _ => SeverityClass::Info,
        }
    }

    /// Uppercase display label.
    pub fn label(self) -> &'static str {
        match self {
            SeverityClass::Critical => "CRITICAL",
            SeverityClass::High => "HIGH",
            SeverityClass::Medium => "MEDIUM",
            SeverityClass::Low => "LOW",
            SeverityClass::Info => "INFO",
        }
    }

    /// Sort key, most severe first.
    pub fn rank(self) -> u8 {
        match self {
            SeverityClass::Critical => 0,
            SeverityClass::High => 1,
            SeverityClass::Medium => 2,
            SeverityClass::Low => 3,
            SeverityClass::Info => 4,
        }
    }
}

impl fmt::Display for SeverityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
