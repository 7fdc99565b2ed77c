//! Signed-in identity and its persisted slot.
//!
//! The [`SessionStore`] is the only writer of the session slot. Its state
//! changes only through `restore`, `sign_in`, `sign_out` and `unauthorized`.

use crate::token;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Session {
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub token: String,
}

/// The backend issues numeric ids; older slots may hold them as strings.
fn id_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Single-slot durable storage for the serialized session.
pub trait SessionStorage {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, data: &str) -> Result<()>;
    fn remove(&self) -> Result<()>;
}

/// Session slot kept as a JSON file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// `<data-local-dir>/courseguide/session.json`, or `.courseguide/session.json`
    /// when the platform has no data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("courseguide"))
            .unwrap_or_else(|| PathBuf::from(".courseguide"))
            .join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("reading session file {}", self.path.display()))?;
        let data = String::from_utf8(bytes)
            .with_context(|| format!("session file {} is not UTF-8", self.path.display()))?;
        Ok(Some(data))
    }

    fn save(&self, data: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, data)
            .with_context(|| format!("writing session file {}", self.path.display()))?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process slot, used when nothing should touch the disk.
#[derive(Default)]
pub struct MemoryStorage {
    slot: RefCell<Option<String>>,
}

impl MemoryStorage {
    #[cfg(test)]
    pub fn with_data(data: &str) -> Self {
        Self {
            slot: RefCell::new(Some(data.to_string())),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&self, data: &str) -> Result<()> {
        *self.slot.borrow_mut() = Some(data.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot.borrow_mut() = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Session),
}

pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    state: SessionState,
}

impl SessionStore {
    /// A store that starts anonymous; call [`SessionStore::restore`] to pick
    /// up a persisted session.
    pub fn new(storage: Box<dyn SessionStorage>) -> Self {
        Self {
            storage,
            state: SessionState::Anonymous,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Load the persisted session, discarding it when it cannot be read or
    /// decoded or its token has expired. Never fails: a bad slot leaves the
    /// store anonymous.
    pub fn restore(&mut self) -> &SessionState {
        self.state = SessionState::Anonymous;

        let data = match self.storage.load() {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!("no persisted session");
                return &self.state;
            }
            Err(err) => {
                tracing::warn!("unreadable persisted session, clearing: {:#}", err);
                self.discard();
                return &self.state;
            }
        };

        match serde_json::from_str::<Session>(&data) {
            Ok(session) if token::is_valid(&session.token) => {
                tracing::info!(email = %session.email, "restored session");
                self.state = SessionState::Authenticated(session);
            }
            Ok(session) => {
                tracing::info!(email = %session.email, "persisted token expired, clearing session");
                self.discard();
            }
            Err(err) => {
                tracing::warn!("unparsable persisted session, clearing: {}", err);
                self.discard();
            }
        }

        &self.state
    }

    fn discard(&self) {
        if let Err(err) = self.storage.remove() {
            tracing::warn!("could not remove persisted session: {:#}", err);
        }
    }

    /// Record a successful sign-in or registration.
    pub fn sign_in(&mut self, session: Session) -> Result<()> {
        let data = serde_json::to_string(&session)?;
        self.storage.save(&data)?;
        tracing::info!(email = %session.email, "signed in");
        self.state = SessionState::Authenticated(session);
        Ok(())
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.clear()?;
        tracing::info!("signed out");
        Ok(())
    }

    /// The backend rejected our credential; drop the session.
    pub fn unauthorized(&mut self) -> Result<()> {
        self.clear()?;
        tracing::warn!("backend rejected the session token, signed out");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.state = SessionState::Anonymous;
        self.storage.remove()
    }
}
