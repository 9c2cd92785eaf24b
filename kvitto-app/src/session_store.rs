use anyhow::{Context, Result};
use rowbase::Session;
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

fn root_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Cannot determine config directory")?
        .join("kvitto"))
}

fn secure_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}

pub fn session_path() -> Result<PathBuf> {
    Ok(root_path()?.join("session.json"))
}

/// Load the cached session. A file that no longer parses (e.g. after a token
/// format change) reads as signed out rather than an error.
pub fn load_session() -> Result<Option<Session>> {
    let path = session_path()?;
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path).context("Failed to read session file")?;
    match serde_json::from_str::<Session>(&raw) {
        Ok(session) => Ok(Some(session)),
        Err(err) => {
            tracing::warn!("discarding unreadable session cache: {err}");
            Ok(None)
        }
    }
}

pub fn save_session(session: &Session) -> Result<()> {
    let path = session_path()?;
    let raw = serde_json::to_string(session).context("Failed to serialize session")?;
    secure_write(path.as_path(), &raw)
}

pub fn clear_session() -> Result<()> {
    let path = session_path()?;
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
