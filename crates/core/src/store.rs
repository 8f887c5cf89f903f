//! Durable persistence for the story session.

use std::io;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tokio::fs;

use crate::session::{Session, Turn};

/// A file-backed store holding one session as a single JSON document.
///
/// The store never surfaces failures to its caller: a corrupted file
/// is discarded on load, and write errors are logged and swallowed.
/// The session stays usable in memory either way.
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

/// Raw persisted shape. `currentChoices` is kept loose here so an
/// invalid pair can be dropped without losing the whole session.
#[derive(Deserialize)]
struct StoredSession {
    #[serde(default)]
    history: Vec<Turn>,
    #[serde(rename = "currentChoices", default)]
    current_choices: Option<Value>,
}

impl SessionStore {
    /// Creates a store backed by the given file path.
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the persisted session, if a valid one exists.
    ///
    /// A file that cannot be parsed is removed so the next load starts
    /// clean. A `currentChoices` value that is not exactly two strings
    /// is discarded while the rest of the session is kept.
    pub async fn load(&self) -> Option<Session> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("failed to read the session file: {err}");
                return None;
            }
        };
        let stored: StoredSession = match serde_json::from_slice(&contents) {
            Ok(stored) => stored,
            Err(err) => {
                warn!("discarding a corrupted session file: {err}");
                fs::remove_file(&self.path).await.ok();
                return None;
            }
        };
        Some(Session {
            history: stored.history,
            current_choices: validate_choices(stored.current_choices),
        })
    }

    /// Persists the session as one atomic unit.
    ///
    /// Skipped entirely when the session is empty, so a fresh reset
    /// never recreates the file it just cleared.
    pub async fn save(&self, session: &Session) {
        if session.is_empty() {
            return;
        }
        let payload = match serde_json::to_vec(session) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("failed to serialize the session: {err}");
                return;
            }
        };
        if let Err(err) = self.write_atomically(&payload).await {
            warn!("failed to save the session: {err}");
        }
    }

    /// Removes the persisted session. Missing file is not an error.
    pub async fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("failed to clear the session file: {err}");
            }
        }
    }

    async fn write_atomically(&self, payload: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, payload).await?;
        fs::rename(&tmp_path, &self.path).await
    }
}

fn validate_choices(value: Option<Value>) -> Option<[String; 2]> {
    serde_json::from_value(value?).ok()
}
