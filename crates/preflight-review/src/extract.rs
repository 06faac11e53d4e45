//! Record extraction from streamed model output.
//!
//! Two passes run over the same stream. The incremental pass watches brace
//! balance as characters arrive and decodes each balanced candidate object so
//! findings can be shown before the model finishes. The whole-stream pass runs
//! once the stream is exhausted and decodes the outermost `[...]` span; its
//! result is the authoritative list.

use preflight_core::{PreflightError, Record};
use tracing::{debug, trace};

use crate::decoder::{decode_record, decode_records, DecodeError};

/// A buffer must be longer than this many characters before a balanced span
/// is treated as a candidate.
pub const MIN_CANDIDATE_LEN: usize = 5;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Incremental brace-balance extractor.
///
/// Depth never goes below zero: a closing brace with no open object is kept
/// in the buffer but otherwise ignored. While inside an object, characters in
/// JSON string literals do not affect the depth.
///
/// # Examples
///
/// ```
/// use preflight_review::extract::IncrementalExtractor;
///
/// let mut extractor = IncrementalExtractor::new();
/// let mut found = Vec::new();
/// extractor.push(r#"[{"file":"a.py","line":{"start":1,"#, |r| found.push(r));
/// assert!(found.is_empty());
/// extractor.push(r#""end":2},"severity":"low","description":"d","suggestion":"s"}"#, |r| found.push(r));
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].file, "a.py");
/// ```
#[derive(Debug, Default)]
pub struct IncrementalExtractor {
    buffer: String,
    buffered_chars: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    transcript: String,
    emitted: usize,
}

impl IncrementalExtractor {
    /// Create an empty extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment, calling `on_record` for every record completed by it.
    pub fn push<F>(&mut self, fragment: &str, mut on_record: F)
    where
        F: FnMut(Record),
    {
        self.transcript.push_str(fragment);
        for c in fragment.chars() {
            self.push_char(c, &mut on_record);
        }
    }

    fn push_char<F>(&mut self, c: char, on_record: &mut F)
    where
        F: FnMut(Record),
    {
        self.buffer.push(c);
        self.buffered_chars += 1;

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return;
        }

        match c {
            '"' if self.depth > 0 => self.in_string = true,
            '{' => self.depth += 1,
            '}' if self.depth == 0 => trace!("ignoring unmatched closing brace"),
            '}' => {
                self.depth -= 1;
                if self.depth == 0 && self.buffered_chars > MIN_CANDIDATE_LEN {
                    self.try_candidate(on_record);
                }
            }
            _ => {}
        }
    }

    fn try_candidate<F>(&mut self, on_record: &mut F)
    where
        F: FnMut(Record),
    {
        let (Some(open), Some(close)) = (self.buffer.find('{'), self.buffer.rfind('}')) else {
            return;
        };
        if close < open {
            return;
        }

        match decode_record(&self.buffer[open..=close]) {
            Ok(record) => {
                debug!(file = %record.file, severity = %record.severity, "extracted record from stream");
                let rest = self.buffer[close + 1..].to_string();
                self.buffered_chars = rest.chars().count();
                self.buffer = rest;
                self.emitted += 1;
                on_record(record);
            }
            Err(e) => {
                // Incomplete or a false balance; keep accumulating.
                debug!(error = %e, "candidate did not decode, continuing to buffer");
            }
        }
    }

    /// Current brace depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Text not yet consumed by a successful candidate.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Everything pushed so far.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Number of records emitted by the incremental pass.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Consume the extractor, returning the full stream text.
    pub fn finish(self) -> String {
        self.transcript
    }
}

/// Result of the whole-stream pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// An array was found and decoded; may be empty.
    Records(Vec<Record>),
    /// The output contains no array at all.
    NothingFound,
}

/// Everything learned from consuming one generation stream.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// Concatenation of all fragments.
    pub transcript: String,
    /// How many records the incremental pass surfaced early.
    pub progressive: usize,
    /// Authoritative whole-stream result.
    pub extraction: Extraction,
}

/// Run the authoritative pass over the complete model output.
///
/// Reasoning blocks (`<think>…</think>`) are removed first. The span from
/// the first `[` to the last `]` is then decoded as an ordered array.
///
/// # Errors
///
/// Returns [`DecodeError::Unterminated`] if `[` has no later `]`, or the
/// decoder's error if the span is not a valid array of records.
///
/// # Examples
///
/// ```
/// use preflight_review::extract::{parse_whole_stream, Extraction};
///
/// assert_eq!(parse_whole_stream("no findings here").unwrap(), Extraction::NothingFound);
/// assert_eq!(parse_whole_stream("```json\n[]\n```").unwrap(), Extraction::Records(vec![]));
/// ```
pub fn parse_whole_stream(text: &str) -> Result<Extraction, DecodeError> {
    let cleaned = strip_reasoning(text);
    let Some(open) = cleaned.find('[') else {
        return Ok(Extraction::NothingFound);
    };
    let close = match cleaned.rfind(']') {
        Some(close) if close > open => close,
        _ => {
            return Err(DecodeError::Unterminated {
                raw: cleaned[open..].to_string(),
            })
        }
    };
    decode_records(&cleaned[open..=close]).map(Extraction::Records)
}

/// Pull every fragment from `source`, surfacing records as they complete,
/// then run the whole-stream pass.
///
/// The source is consumed; it cannot be replayed.
///
/// # Errors
///
/// Propagates the first error yielded by the source, and returns
/// [`PreflightError::Decode`] when the whole-stream pass fails.
///
/// # Examples
///
/// ```
/// use preflight_review::extract::{extract_stream, Extraction};
/// use preflight_review::source::CannedSource;
///
/// let text = r#"noise [{"file":"a.py","line":{"start":1,"end":2},"severity":"HIGH","description":"d","suggestion":"s"}] noise"#;
/// let mut early = 0;
/// let outcome = extract_stream(CannedSource::new(text, 3), |_| early += 1).unwrap();
/// assert_eq!(early, 1);
/// match outcome.extraction {
///     Extraction::Records(records) => assert_eq!(records.len(), 1),
///     Extraction::NothingFound => unreachable!(),
/// }
/// ```
pub fn extract_stream<I, F>(source: I, mut on_record: F) -> Result<StreamOutcome, PreflightError>
where
    I: IntoIterator<Item = Result<String, PreflightError>>,
    F: FnMut(Record),
{
    let mut extractor = IncrementalExtractor::new();
    for fragment in source {
        let fragment = fragment?;
        extractor.push(&fragment, &mut on_record);
    }

    let progressive = extractor.emitted();
    debug!(
        progressive,
        chars = extractor.transcript().len(),
        unconsumed = extractor.buffered().len(),
        "stream exhausted"
    );
    let transcript = extractor.finish();
    let extraction = parse_whole_stream(&transcript)?;
    Ok(StreamOutcome {
        transcript,
        progressive,
        extraction,
    })
}

fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(THINK_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + THINK_OPEN.len()..];
        match after_open.find(THINK_CLOSE) {
            Some(end) => rest = &after_open[end + THINK_CLOSE.len()..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
