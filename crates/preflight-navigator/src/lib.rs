//! Interactive terminal browser for review findings.
//!
//! - [`navigator`]: cursor and seen-tracking over the decoded records
//! - [`keys`]: raw input units to navigation commands
//! - [`terminal`]: raw-mode acquisition and crossterm-backed input
//! - [`render`]: frame rendering for raw terminals and plain output

pub mod keys;
pub mod navigator;
pub mod render;
pub mod terminal;

pub use keys::{read_command, RawInput, ScriptedInput, DEFAULT_LOOKAHEAD};
pub use navigator::{Command, DisplayRecord, Flow, ReviewNavigator};
pub use render::{Frame, Renderer, TerminalRenderer};
pub use terminal::{install_panic_hook, RawModeGuard, TerminalInput};
