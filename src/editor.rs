#![forbid(unsafe_code)]

//! External editor hand-off.
//!
//! Content goes to a scratch file, the editor runs in the foreground with the
//! terminal released, and the saved bytes are read back once it exits.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crossterm::{
    cursor::MoveTo,
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};

use crate::error::EditorError;

pub trait EditorLauncher: fmt::Debug + Send + Sync {
    /// Opens `content` in an editor and returns what the user saved.
    fn edit(&self, content: &[u8], extension: Option<&str>) -> Result<Vec<u8>, EditorError>;
}

/// Spawns an editor command line such as `vim` or `code --wait`.
#[derive(Debug, Clone)]
pub struct ProcessEditor {
    command: String,
    /// Release the terminal around the child. Off for headless use.
    hand_off_terminal: bool,
}

impl ProcessEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), hand_off_terminal: true }
    }

    #[cfg(test)]
    pub fn headless(command: impl Into<String>) -> Self {
        Self { command: command.into(), hand_off_terminal: false }
    }

    fn spawn(&self, path: &Path) -> Result<(), EditorError> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next().unwrap_or("vi");
        let status = Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .map_err(|source| EditorError::Launch { editor: self.command.clone(), source })?;
        if !status.success() {
            return Err(EditorError::Exited { editor: self.command.clone(), status });
        }
        Ok(())
    }
}

impl EditorLauncher for ProcessEditor {
    fn edit(&self, content: &[u8], extension: Option<&str>) -> Result<Vec<u8>, EditorError> {
        let suffix = extension.map(|ext| format!(".{ext}")).unwrap_or_default();
        let mut scratch = tempfile::Builder::new()
            .prefix("bucketcommander-")
            .suffix(&suffix)
            .tempfile()
            .map_err(EditorError::Scratch)?;
        scratch.write_all(content).map_err(EditorError::Scratch)?;
        scratch.flush().map_err(EditorError::Scratch)?;

        tracing::info!(editor = %self.command, path = %scratch.path().display(), "launching editor");
        let outcome = if self.hand_off_terminal {
            with_terminal_released(|| self.spawn(scratch.path()))
        } else {
            self.spawn(scratch.path())
        };
        outcome?;

        // Editors commonly replace the file on save, so read by path.
        std::fs::read(scratch.path()).map_err(EditorError::ReadBack)
    }
}

/// Leaves the alternate screen for the duration of `f` and restores it after,
/// dropping any input that queued up meanwhile.
fn with_terminal_released<T>(f: impl FnOnce() -> Result<T, EditorError>) -> Result<T, EditorError> {
    let mut stdout = io::stdout();
    crossterm::terminal::disable_raw_mode().ok();
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture).map_err(EditorError::Terminal)?;
    let result = f();
    execute!(
        stdout,
        EnterAlternateScreen,
        Clear(ClearType::All),
        MoveTo(0, 0),
        EnableMouseCapture
    )
    .map_err(EditorError::Terminal)?;
    crossterm::terminal::enable_raw_mode().ok();
    while event::poll(Duration::from_millis(0)).map_err(EditorError::Terminal)? {
        let _ = event::read();
    }
    result
}
