//! Drawing review frames.
//!
//! The renderer is always handed to the navigator explicitly, so tests can
//! substitute their own and several navigators never share output.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use preflight_core::{Record, SeverityClass};

/// What to show for one navigator step.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// The displayed record.
    pub record: &'a Record,
    /// One-based position of the record.
    pub position: usize,
    /// Number of records.
    pub total: usize,
    /// Records not yet displayed.
    pub unseen: usize,
}

/// Output side of the navigator.
pub trait Renderer {
    /// Draw one record.
    fn render(&mut self, frame: &Frame<'_>) -> io::Result<()>;

    /// Say there is nothing to browse.
    fn empty(&mut self) -> io::Result<()>;

    /// Close the session after the user quits.
    fn finish(&mut self) -> io::Result<()>;
}

/// Terminal colour and weight for a severity class.
///
/// # Examples
///
/// ```
/// use crossterm::style::Color;
/// use preflight_core::SeverityClass;
/// use preflight_navigator::render::severity_style;
///
/// assert_eq!(severity_style(SeverityClass::Critical), (Color::Red, true));
/// assert_eq!(severity_style(SeverityClass::Info), (Color::Blue, false));
/// ```
pub fn severity_style(class: SeverityClass) -> (Color, bool) {
    match class {
        SeverityClass::Critical => (Color::Red, true),
        SeverityClass::High => (Color::Red, false),
        SeverityClass::Medium => (Color::Yellow, false),
        SeverityClass::Low => (Color::Cyan, false),
        SeverityClass::Info => (Color::Blue, false),
    }
}

/// Renders frames as styled text.
///
/// [`TerminalRenderer::new`] targets a raw-mode terminal: each frame clears
/// the screen, lines end in `\r\n`, and a key hint is shown.
/// [`TerminalRenderer::plain`] writes an uncoloured listing for pipes and
/// files.
///
/// # Examples
///
/// ```
/// use preflight_core::{LineRange, Record};
/// use preflight_navigator::{Frame, Renderer, TerminalRenderer};
///
/// let record = Record {
///     file: "src/db.rs".into(),
///     line: LineRange { start: 7, end: 9 },
///     severity: "HIGH".into(),
///     description: "connection leaked".into(),
///     suggestion: "drop it".into(),
///     code_snippet: None,
/// };
/// let mut out = Vec::new();
/// let mut renderer = TerminalRenderer::plain(&mut out);
/// renderer.render(&Frame { record: &record, position: 1, total: 1, unseen: 0 }).unwrap();
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.contains("File: src/db.rs"));
/// ```
pub struct TerminalRenderer<W: Write> {
    out: W,
    interactive: bool,
    color: bool,
}

impl<W: Write> TerminalRenderer<W> {
    /// Renderer for a raw-mode terminal.
    pub fn new(out: W) -> Self {
        Self {
            out,
            interactive: true,
            color: true,
        }
    }

    /// Renderer for non-interactive output.
    pub fn plain(out: W) -> Self {
        Self {
            out,
            interactive: false,
            color: false,
        }
    }

    /// Turn colours and text attributes on or off.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn eol(&self) -> &'static str {
        if self.interactive {
            "\r\n"
        } else {
            "\n"
        }
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        let eol = self.eol();
        for part in text.split('\n') {
            queue!(self.out, Print(part), Print(eol))?;
        }
        Ok(())
    }

    fn label(&mut self, label: &str) -> io::Result<()> {
        if self.color {
            queue!(
                self.out,
                SetAttribute(Attribute::Bold),
                SetForegroundColor(Color::Magenta),
                Print(label),
                ResetColor,
                SetAttribute(Attribute::Reset)
            )
        } else {
            queue!(self.out, Print(label))
        }
    }

    fn styled(&mut self, text: &str, color: Color, bold: bool) -> io::Result<()> {
        if !self.color {
            return queue!(self.out, Print(text));
        }
        if bold {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        queue!(
            self.out,
            SetForegroundColor(color),
            Print(text),
            ResetColor,
            SetAttribute(Attribute::Reset)
        )
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let record = frame.record;
        let eol = self.eol();

        if self.interactive {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        let title = format!("Preflight Review Issue {} of {}", frame.position, frame.total);
        self.styled(&title, Color::Green, true)?;
        queue!(self.out, Print(eol))?;
        self.line(&"─".repeat(title.chars().count()))?;

        let (color, bold) = severity_style(record.severity_class());
        self.label("Severity: ")?;
        self.styled(&record.severity, color, bold)?;
        queue!(self.out, Print(eol))?;
        self.line(&format!("File: {}", record.file))?;
        self.line(&format!("Line: {}", record.line))?;
        queue!(self.out, Print(eol))?;

        self.label("Description: ")?;
        self.line(&record.description)?;
        queue!(self.out, Print(eol))?;
        self.label("Suggestion: ")?;
        self.line(&record.suggestion)?;

        if let Some(snippet) = &record.code_snippet {
            queue!(self.out, Print(eol))?;
            self.label("Code Snippet:")?;
            queue!(self.out, Print(eol))?;
            for part in snippet.split('\n') {
                self.styled(part, Color::Green, false)?;
                queue!(self.out, Print(eol))?;
            }
        }

        if self.interactive {
            queue!(self.out, Print(eol))?;
            self.line(&format!("{} unseen", frame.unseen))?;
            self.styled(
                "j/↓/Enter next · k/↑ previous · q quit",
                Color::Yellow,
                false,
            )?;
            queue!(self.out, Print(eol))?;
        } else {
            queue!(self.out, Print(eol))?;
        }
        self.out.flush()
    }

    fn empty(&mut self) -> io::Result<()> {
        let eol = self.eol();
        self.styled("No issues to display.", Color::Yellow, false)?;
        queue!(self.out, Print(eol))?;
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        let eol = self.eol();
        queue!(self.out, Print("--- End of Review ---"), Print(eol))?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_core::LineRange;

    fn record(severity: &str, snippet: Option<&str>) -> Record {
        Record {
            file: "src/handlers/upload.py".into(),
            line: LineRange { start: 42, end: 47 },
            severity: severity.into(),
            description: "Path traversal.\nSecond line.".into(),
            suggestion: "Normalize the path.".into(),
            code_snippet: snippet.map(Into::into),
        }
    }

    fn render(renderer: &mut TerminalRenderer<Vec<u8>>, record: &Record, unseen: usize) {
        renderer
            .render(&Frame {
                record,
                position: 2,
                total: 3,
                unseen,
            })
            .unwrap();
    }

    #[test]
    fn interactive_frame_has_title_fields_and_hint() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let r = record("CRITICAL", Some("dest = join(a, b)"));
        render(&mut renderer, &r, 1);
        let text = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(text.contains("Preflight Review Issue 2 of 3"));
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("File: src/handlers/upload.py"));
        assert!(text.contains("Line: 42-47"));
        assert!(text.contains("Normalize the path."));
        assert!(text.contains("dest = join(a, b)"));
        assert!(text.contains("1 unseen"));
        assert!(text.contains("q quit"));
    }

    #[test]
    fn interactive_lines_end_with_crlf() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let r = record("LOW", Some("a\nb"));
        render(&mut renderer, &r, 0);
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        for (i, _) in text.match_indices('\n') {
            assert_eq!(&text[i - 1..i], "\r", "bare newline at byte {i}");
        }
    }

    #[test]
    fn plain_output_has_no_escape_sequences() {
        let mut renderer = TerminalRenderer::plain(Vec::new());
        let r = record("whatever", None);
        render(&mut renderer, &r, 0);
        renderer.finish().unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(!text.contains('\x1b'));
        assert!(!text.contains('\r'));
        assert!(!text.contains("unseen"));
        assert!(!text.contains("Code Snippet"));
        assert!(text.contains("Severity: whatever"));
        assert!(text.ends_with("--- End of Review ---\n"));
    }

    #[test]
    fn colour_can_be_disabled_interactively() {
        let mut renderer = TerminalRenderer::new(Vec::new()).with_color(false);
        let r = record("HIGH", None);
        render(&mut renderer, &r, 2);
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.contains("Severity: HIGH"));
        assert!(text.contains("2 unseen\r\n"));
    }

    #[test]
    fn empty_notice() {
        let mut renderer = TerminalRenderer::plain(Vec::new());
        renderer.empty().unwrap();
        assert_eq!(
            String::from_utf8(renderer.into_inner()).unwrap(),
            "No issues to display.\n"
        );
    }

    #[test]
    fn every_class_has_a_style() {
        let styles: Vec<_> = SeverityClass::ALL.iter().map(|c| severity_style(*c)).collect();
        assert_eq!(styles.iter().filter(|(_, bold)| *bold).count(), 1);
        assert_eq!(styles[0], (Color::Red, true));
    }
}
