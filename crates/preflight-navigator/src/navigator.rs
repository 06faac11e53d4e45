//! Cursor and seen-tracking over a fixed list of review records.
//!
//! The navigator starts out empty. Records may be pushed at any time, but
//! browsing only begins when [`ReviewNavigator::begin`] is called; from then
//! on `Next` and `Previous` move cyclically through the records in their
//! original order and every record the cursor lands on is marked seen.

use std::collections::BTreeSet;
use std::time::Duration;

use preflight_core::{PreflightError, Record};
use tracing::debug;

use crate::keys::{read_command, RawInput, DEFAULT_LOOKAHEAD};
use crate::render::{Frame, Renderer};

/// A navigation request decoded from user input.
///
/// # Examples
///
/// ```
/// use preflight_navigator::Command;
///
/// assert_ne!(Command::Next, Command::Previous);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Move to the following record, wrapping to the first.
    Next,
    /// Move to the preceding record, wrapping to the last.
    Previous,
    /// Stop browsing.
    Quit,
}

/// Whether the browsing loop should keep going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Render and read the next command.
    Continue,
    /// Leave the loop.
    Quit,
}

/// A record plus whether it has been displayed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRecord {
    /// The finding.
    pub record: Record,
    /// Set once the record has been on screen. Never cleared.
    pub seen: bool,
}

/// Browsing state over the decoded records.
///
/// # Examples
///
/// ```
/// use preflight_core::{LineRange, Record};
/// use preflight_navigator::{Command, ReviewNavigator};
///
/// let record = |file: &str| Record {
///     file: file.into(),
///     line: LineRange { start: 1, end: 1 },
///     severity: "LOW".into(),
///     description: "d".into(),
///     suggestion: "s".into(),
///     code_snippet: None,
/// };
///
/// let mut nav = ReviewNavigator::new(vec![record("a.rs"), record("b.rs")]);
/// assert!(nav.begin());
/// nav.apply(Command::Previous);
/// assert_eq!(nav.cursor(), Some(1));
/// assert_eq!(nav.unseen_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ReviewNavigator {
    records: Vec<DisplayRecord>,
    cursor: Option<usize>,
    lookahead: Duration,
}

impl Default for ReviewNavigator {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            cursor: None,
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }
}

impl ReviewNavigator {
    /// An empty navigator holding `records`, none of them seen.
    pub fn new(records: Vec<Record>) -> Self {
        let mut nav = Self::default();
        for record in records {
            nav.push(record);
        }
        nav
    }

    /// Set how long an escape waits for the rest of an arrow-key sequence.
    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Append a record. Does not start browsing.
    pub fn push(&mut self, record: Record) {
        self.records.push(DisplayRecord {
            record,
            seen: false,
        });
    }

    /// Start browsing at the first record and mark it seen.
    ///
    /// Returns `false`, leaving the navigator empty, when there is nothing to
    /// browse.
    pub fn begin(&mut self) -> bool {
        if self.records.is_empty() {
            self.cursor = None;
            return false;
        }
        self.visit(0);
        true
    }

    /// Apply one command.
    ///
    /// Movement is a no-op unless browsing; `Quit` always ends the loop.
    pub fn apply(&mut self, command: Command) -> Flow {
        let Some(cursor) = self.cursor else {
            return match command {
                Command::Quit => Flow::Quit,
                _ => Flow::Continue,
            };
        };
        let len = self.records.len();
        match command {
            Command::Next => self.visit((cursor + 1) % len),
            Command::Previous => self.visit((cursor + len - 1) % len),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn visit(&mut self, index: usize) {
        self.cursor = Some(index);
        self.records[index].seen = true;
        debug!(index, "showing record");
    }

    /// Index of the displayed record, `None` before browsing begins.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The displayed record.
    pub fn current(&self) -> Option<&Record> {
        self.cursor.map(|i| &self.records[i].record)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `true` once browsing has begun.
    pub fn is_browsing(&self) -> bool {
        self.cursor.is_some()
    }

    /// Records not displayed yet.
    pub fn unseen_count(&self) -> usize {
        self.records.iter().filter(|r| !r.seen).count()
    }

    /// Indices of every record displayed so far.
    pub fn seen_indices(&self) -> BTreeSet<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.seen)
            .map(|(i, _)| i)
            .collect()
    }

    /// The frame for the displayed record.
    pub fn frame(&self) -> Option<Frame<'_>> {
        let index = self.cursor?;
        Some(Frame {
            record: &self.records[index].record,
            position: index + 1,
            total: self.records.len(),
            unseen: self.unseen_count(),
        })
    }

    /// Browse interactively until the user quits or input ends.
    ///
    /// With no records, the renderer's empty notice is shown and the call
    /// returns at once.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Io`] if reading input or writing output
    /// fails.
    pub fn run<I, R>(&mut self, input: &mut I, renderer: &mut R) -> Result<(), PreflightError>
    where
        I: RawInput + ?Sized,
        R: Renderer + ?Sized,
    {
        if !self.begin() {
            renderer.empty()?;
            return Ok(());
        }
        self.draw(renderer)?;

        loop {
            let Some(command) = read_command(input, self.lookahead)? else {
                continue;
            };
            if self.apply(command) == Flow::Quit {
                break;
            }
            self.draw(renderer)?;
        }

        debug!(seen = self.seen_indices().len(), total = self.len(), "review closed");
        renderer.finish()?;
        Ok(())
    }

    fn draw<R: Renderer + ?Sized>(&self, renderer: &mut R) -> Result<(), PreflightError> {
        if let Some(frame) = self.frame() {
            renderer.render(&frame)?;
        }
        Ok(())
    }
}
