//! crates/legal_analyzer_client/src/session_store.rs
//!
//! A small JSON file that stands in for browser local storage: it remembers
//! the session id and the document currently being worked on.

use legal_analyzer_core::{
    domain::SessionId,
    ports::{PortResult, SessionStorage},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    legal_session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_document_id: Option<Uuid>,
}

pub struct FileSessionStore {
    path: PathBuf,
    session: SessionId,
    state: StoredState,
}

impl FileSessionStore {
    /// Loads the file at `path`, creating it with a fresh session id if it
    /// does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();
        let loaded = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                StoredState::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            StoredState::default()
        };
        let session = match loaded.legal_session_id {
            Some(id) => id,
            None => {
                let id = SessionId::new();
                debug!("Created session {}", id);
                id
            }
        };
        let store = Self {
            path,
            session,
            state: StoredState {
                legal_session_id: Some(session),
                ..loaded.clone()
            },
        };
        if store.state != loaded {
            store.save()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The session id. `open` mints and saves one when the file has none,
    /// so this never changes for the lifetime of the store.
    pub fn get_or_create_session_id(&self) -> SessionId {
        self.session
    }

    /// Removes the session file entirely. The next `open` starts a new session.
    pub fn clear(self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SessionStorage for FileSessionStore {
    fn session_id(&self) -> SessionId {
        self.get_or_create_session_id()
    }

    fn current_document(&self) -> Option<Uuid> {
        self.state.current_document_id
    }

    fn set_current_document(&mut self, document_id: Uuid) -> PortResult<()> {
        self.state.current_document_id = Some(document_id);
        Ok(self.save()?)
    }

    fn clear_current_document(&mut self) -> PortResult<()> {
        self.state.current_document_id = None;
        Ok(self.save()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let first = FileSessionStore::open(&path).unwrap().session_id();
        let second = FileSessionStore::open(&path).unwrap().session_id();
        assert_eq!(first, second);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["legal_session_id"], first.to_string());
    }

    #[test]
    fn current_document_is_persisted_and_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let document = Uuid::new_v4();

        let mut store = FileSessionStore::open(&path).unwrap();
        store.set_current_document(document).unwrap();
        assert_eq!(
            FileSessionStore::open(&path).unwrap().current_document(),
            Some(document)
        );

        store.clear_current_document().unwrap();
        let reopened = FileSessionStore::open(&path).unwrap();
        assert_eq!(reopened.current_document(), None);
        assert_eq!(reopened.session_id(), store.session_id());
    }

    #[test]
    fn clear_starts_a_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileSessionStore::open(&path).unwrap();
        let old = store.session_id();
        store.clear().unwrap();
        assert!(!path.exists());

        assert_ne!(FileSessionStore::open(&path).unwrap().session_id(), old);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileSessionStore::open(&path),
            Err(ClientError::Json(_))
        ));
    }

    #[test]
    fn session_id_is_stable_within_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"current_document_id": null}"#).unwrap();

        let store = FileSessionStore::open(&path).unwrap();
        assert_eq!(store.session_id(), store.get_or_create_session_id());
        assert_eq!(store.session_id(), store.session_id());
        assert_eq!(FileSessionStore::open(&path).unwrap().session_id(), store.session_id());
    }
}
