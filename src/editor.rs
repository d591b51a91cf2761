//! Handing a note off to the user's text editor
use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus};
use thiserror::Error;

const FALLBACK_EDITOR: &str = "vi";

#[derive(Debug, Error)]
pub(crate) enum EditorError {
    #[error("failed to run editor {command:?}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("editor {command:?} exited with {status}")]
    Failed { command: String, status: ExitStatus },
}

/// The editor to run: `$VISUAL`, then `$EDITOR`, then `vi`.  The value may
/// include arguments, separated by whitespace.
pub(crate) fn editor_command() -> String {
    pick_editor(env::var_os("VISUAL"), env::var_os("EDITOR"))
}

fn pick_editor(visual: Option<OsString>, editor: Option<OsString>) -> String {
    [visual, editor]
        .into_iter()
        .flatten()
        .filter_map(|v| v.into_string().ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| String::from(FALLBACK_EDITOR))
}

/// Run `command` on `path` and wait for it to exit.  The caller is
/// responsible for giving the editor the terminal.
pub(crate) fn launch_editor(command: &str, path: &Path) -> Result<(), EditorError> {
    let mut words = command.split_whitespace();
    let program = words.next().unwrap_or(FALLBACK_EDITOR);
    let status = Command::new(program)
        .args(words)
        .arg(path)
        .status()
        .map_err(|source| EditorError::Spawn {
            command: command.to_owned(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(EditorError::Failed {
            command: command.to_owned(),
            status,
        })
    }
}
