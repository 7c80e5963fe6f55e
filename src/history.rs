//! Search history persistence: one lookup key per line.
//!
//! Kept separate from the record cache; history survives restarts, the
//! cache does not.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::Result;

/// Read saved keys. A missing file is an empty history.
pub fn load_history(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = match std::fs::read_to_string(path.as_ref()) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Overwrite the history file with `keys`, in order
pub fn save_history(path: impl AsRef<Path>, keys: &[String]) -> Result<()> {
    let mut text = keys.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    std::fs::write(path.as_ref(), text)?;
    tracing::debug!("Saved {} history entries to {}", keys.len(), path.as_ref().display());
    Ok(())
}
