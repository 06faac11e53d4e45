//! Decoding raw input units into navigation commands.
//!
//! Input arrives one byte at a time, the way a raw-mode terminal delivers
//! it. An escape byte may be a lone Esc press or the start of an arrow-key
//! sequence (`ESC [ A` / `ESC [ B`); the decoder waits a bounded time for
//! the rest of the sequence and treats anything else as quit.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::navigator::Command;

/// The escape byte.
pub const ESC: u8 = 0x1b;

/// How long an escape waits for each further byte of an arrow sequence.
pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_millis(50);

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;

/// A source of raw input units.
pub trait RawInput {
    /// Read one unit.
    ///
    /// `wait` of `None` blocks until input arrives; `Some(d)` gives up after
    /// `d`. `Ok(None)` means the wait expired or the input has ended.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the input cannot be read.
    fn read_unit(&mut self, wait: Option<Duration>) -> io::Result<Option<u8>>;
}

/// Replays a fixed sequence of units, then reports end of input.
///
/// # Examples
///
/// ```
/// use preflight_navigator::{RawInput, ScriptedInput};
///
/// let mut input = ScriptedInput::new(*b"jq");
/// assert_eq!(input.read_unit(None).unwrap(), Some(b'j'));
/// assert_eq!(input.read_unit(None).unwrap(), Some(b'q'));
/// assert_eq!(input.read_unit(None).unwrap(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    units: VecDeque<u8>,
}

impl ScriptedInput {
    /// Replay `units` in order.
    pub fn new(units: impl IntoIterator<Item = u8>) -> Self {
        Self {
            units: units.into_iter().collect(),
        }
    }
}

impl RawInput for ScriptedInput {
    fn read_unit(&mut self, _wait: Option<Duration>) -> io::Result<Option<u8>> {
        Ok(self.units.pop_front())
    }
}

/// Read the next command.
///
/// - `j`, `n`, Enter, space and Down move to the next record.
/// - `k`, `p` and Up move to the previous record.
/// - `q`, `Q`, Ctrl-C, Ctrl-D, a lone Esc and end of input quit.
///
/// Any other unit yields `Ok(None)`: it is consumed and should be ignored
/// without redrawing.
///
/// # Errors
///
/// Returns the I/O error from the input.
///
/// # Examples
///
/// ```
/// use preflight_navigator::{read_command, Command, ScriptedInput, DEFAULT_LOOKAHEAD};
///
/// let mut input = ScriptedInput::new(*b"\x1b[Az");
/// assert_eq!(read_command(&mut input, DEFAULT_LOOKAHEAD).unwrap(), Some(Command::Previous));
/// assert_eq!(read_command(&mut input, DEFAULT_LOOKAHEAD).unwrap(), None);
/// assert_eq!(read_command(&mut input, DEFAULT_LOOKAHEAD).unwrap(), Some(Command::Quit));
/// ```
pub fn read_command<I: RawInput + ?Sized>(
    input: &mut I,
    lookahead: Duration,
) -> io::Result<Option<Command>> {
    let Some(unit) = input.read_unit(None)? else {
        return Ok(Some(Command::Quit));
    };
    let command = match unit {
        b'j' | b'n' | b'\r' | b'\n' | b' ' => Some(Command::Next),
        b'k' | b'p' => Some(Command::Previous),
        b'q' | b'Q' | CTRL_C | CTRL_D => Some(Command::Quit),
        ESC => Some(read_escape(input, lookahead)?),
        _ => None,
    };
    Ok(command)
}

fn read_escape<I: RawInput + ?Sized>(input: &mut I, lookahead: Duration) -> io::Result<Command> {
    if input.read_unit(Some(lookahead))? != Some(b'[') {
        return Ok(Command::Quit);
    }
    Ok(match input.read_unit(Some(lookahead))? {
        Some(b'A') => Command::Previous,
        Some(b'B') => Command::Next,
        _ => Command::Quit,
    })
}
