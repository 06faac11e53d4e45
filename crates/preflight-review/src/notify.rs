//! Desktop notification once a review finishes.

use std::io;
use std::process::Command;

use preflight_core::{NotifyConfig, PreflightError};
use tracing::{debug, warn};

/// Title shown on every notification.
pub const NOTIFICATION_TITLE: &str = "Preflight Review";

/// Something that can tell the user a review is ready.
pub trait Notifier {
    /// Announce `message`, linking to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError`] if the notification could not be attempted.
    fn notify(&self, message: &str, url: &str) -> Result<(), PreflightError>;
}

/// Sends notifications through an external `terminal-notifier`-style command.
///
/// A missing executable is not an error: the notification is skipped with a
/// warning, since the review itself already succeeded.
///
/// # Examples
///
/// ```
/// use preflight_review::notify::{CommandNotifier, Notifier};
///
/// let notifier = CommandNotifier::new("definitely-not-installed-notifier");
/// assert!(notifier.notify("3 issues found", "file:///tmp/report.html").is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    /// Use `program` to deliver notifications.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(config.command.clone())
    }

    fn command(&self, message: &str, url: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-title", NOTIFICATION_TITLE, "-message", message, "-open", url]);
        cmd
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, message: &str, url: &str) -> Result<(), PreflightError> {
        match self.command(message, url).output() {
            Ok(output) if output.status.success() => {
                debug!(program = %self.program, "notification sent");
                Ok(())
            }
            Ok(output) => {
                warn!(
                    program = %self.program,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "notification command failed"
                );
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(program = %self.program, message, url, "notifier not found, skipping notification");
                Ok(())
            }
            Err(e) => Err(PreflightError::Io(e)),
        }
    }
}
