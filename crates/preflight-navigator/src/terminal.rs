//! Raw-mode terminal lifecycle and crossterm-backed input.

use std::collections::VecDeque;
use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};
use preflight_core::PreflightError;
use tracing::debug;

use crate::keys::{RawInput, ESC};

/// Set while a guard holds raw mode that it enabled itself.
static RAW_MODE_HELD: AtomicBool = AtomicBool::new(false);

/// Keeps the terminal in raw mode for as long as it lives.
///
/// On drop the terminal goes back to the mode it was in before
/// [`RawModeGuard::acquire`]: if raw mode was already on, it stays on.
/// Dropping happens on normal return, on `?` error paths and while unwinding
/// from a panic.
///
/// # Examples
///
/// ```no_run
/// use preflight_navigator::RawModeGuard;
///
/// let guard = RawModeGuard::acquire().unwrap();
/// // ... read keys ...
/// drop(guard);
/// ```
#[derive(Debug)]
pub struct RawModeGuard {
    was_raw: bool,
}

impl RawModeGuard {
    /// Enable raw mode unless it is already enabled.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Terminal`] if the terminal mode cannot be
    /// queried or changed.
    pub fn acquire() -> Result<Self, PreflightError> {
        let was_raw = is_raw_mode_enabled()
            .map_err(|e| PreflightError::Terminal(format!("failed to query terminal mode: {e}")))?;
        if !was_raw {
            enable_raw_mode()
                .map_err(|e| PreflightError::Terminal(format!("failed to enable raw mode: {e}")))?;
            RAW_MODE_HELD.store(true, Ordering::SeqCst);
        }
        debug!(was_raw, "raw mode acquired");
        Ok(Self { was_raw })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if !self.was_raw && RAW_MODE_HELD.swap(false, Ordering::SeqCst) {
            let _ = disable_raw_mode();
            debug!("raw mode released");
        }
    }
}

/// Install a panic hook that leaves raw mode before the panic message prints.
///
/// Chains onto the previously installed hook, so human-panic or the default
/// printer still run afterwards.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if RAW_MODE_HELD.swap(false, Ordering::SeqCst) {
            let _ = disable_raw_mode();
        }
        original_hook(panic_info);
    }));
}

/// Keyboard input read through crossterm.
///
/// crossterm decodes escape sequences itself; decoded keys are turned back
/// into the byte units a raw terminal would deliver so that one decoder
/// handles every input source.
#[derive(Debug, Default)]
pub struct TerminalInput {
    pending: VecDeque<u8>,
}

impl TerminalInput {
    /// Read from the process's terminal.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RawInput for TerminalInput {
    fn read_unit(&mut self, wait: Option<Duration>) -> io::Result<Option<u8>> {
        if let Some(unit) = self.pending.pop_front() {
            return Ok(Some(unit));
        }

        let deadline = wait.map(|w| Instant::now() + w);
        loop {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if !event::poll(remaining)? {
                    return Ok(None);
                }
            }
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                encode_key(key, &mut self.pending);
                if let Some(unit) = self.pending.pop_front() {
                    return Ok(Some(unit));
                }
            }
        }
    }
}

/// Append the VT byte encoding of `key` to `out`.
///
/// Keys without a meaningful encoding append nothing.
///
/// # Examples
///
/// ```
/// use std::collections::VecDeque;
/// use crossterm::event::{KeyCode, KeyEvent};
/// use preflight_navigator::terminal::encode_key;
///
/// let mut out = VecDeque::new();
/// encode_key(KeyEvent::from(KeyCode::Up), &mut out);
/// assert_eq!(out, [0x1b, b'[', b'A']);
/// ```
pub fn encode_key(key: KeyEvent, out: &mut VecDeque<u8>) {
    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) && c.is_ascii_alphabetic() => {
            out.push_back(c.to_ascii_lowercase() as u8 & 0x1f);
        }
        KeyCode::Char(c) => {
            let mut buf = [0u8; 4];
            out.extend(c.encode_utf8(&mut buf).bytes());
        }
        KeyCode::Enter => out.push_back(b'\r'),
        KeyCode::Tab => out.push_back(b'\t'),
        KeyCode::Backspace => out.push_back(0x7f),
        KeyCode::Esc => out.push_back(ESC),
        KeyCode::Up => out.extend([ESC, b'[', b'A']),
        KeyCode::Down => out.extend([ESC, b'[', b'B']),
        KeyCode::Right => out.extend([ESC, b'[', b'C']),
        KeyCode::Left => out.extend([ESC, b'[', b'D']),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{read_command, ScriptedInput, DEFAULT_LOOKAHEAD};
    use crate::navigator::Command;

    fn encode(keys: &[KeyEvent]) -> Vec<u8> {
        let mut out = VecDeque::new();
        for key in keys {
            encode_key(*key, &mut out);
        }
        out.into()
    }

    #[test]
    fn control_keys_become_control_bytes() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let ctrl_d = KeyEvent::new(KeyCode::Char('D'), KeyModifiers::CONTROL);
        assert_eq!(encode(&[ctrl_c, ctrl_d]), vec![0x03, 0x04]);
    }

    #[test]
    fn plain_and_unicode_chars() {
        let keys = [KeyEvent::from(KeyCode::Char('j')), KeyEvent::from(KeyCode::Char('é'))];
        assert_eq!(encode(&keys), vec![b'j', 0xc3, 0xa9]);
    }

    #[test]
    fn unsupported_keys_encode_to_nothing() {
        assert!(encode(&[KeyEvent::from(KeyCode::F(5)), KeyEvent::from(KeyCode::Home)]).is_empty());
    }

    #[test]
    fn encoded_keys_decode_to_commands() {
        let keys = [
            KeyEvent::from(KeyCode::Down),
            KeyEvent::from(KeyCode::Up),
            KeyEvent::from(KeyCode::Enter),
            KeyEvent::from(KeyCode::Esc),
        ];
        let mut input = ScriptedInput::new(encode(&keys));
        let mut commands = Vec::new();
        for _ in 0..4 {
            commands.push(read_command(&mut input, DEFAULT_LOOKAHEAD).unwrap());
        }
        assert_eq!(
            commands,
            vec![
                Some(Command::Next),
                Some(Command::Previous),
                Some(Command::Next),
                Some(Command::Quit),
            ]
        );
    }
}
