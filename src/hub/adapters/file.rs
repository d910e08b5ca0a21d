//! Settings source backed by a JSON document on disk.

use crate::hub::{
    adapters::json::parse_settings_document,
    domain::EndpointDeclaration,
    ports::{
        EndpointSettingsError, EndpointSettingsResult, EndpointSettingsSource, SettingsChanges,
    },
};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

/// Read-only settings source loaded from a settings document.
///
/// The file is read when the source is opened and again on every
/// [`reload`](Self::reload). Subscribers are notified only when a reload
/// yields a different declaration sequence. A missing file is treated as an
/// empty sequence.
#[derive(Debug, Clone)]
pub struct JsonFileEndpointSettings {
    path: PathBuf,
    servers: Arc<RwLock<Vec<EndpointDeclaration>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl JsonFileEndpointSettings {
    /// Opens the settings document at `path`.
    ///
    /// # Errors
    ///
    /// Returns storage errors when the file cannot be read, or document and
    /// validation errors when it cannot be parsed.
    pub fn open(location: impl Into<PathBuf>) -> EndpointSettingsResult<Self> {
        let path = location.into();
        let servers = read_document(&path)?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            path,
            servers: Arc::new(RwLock::new(servers)),
            revision: Arc::new(revision),
        })
    }

    /// Returns the path of the settings document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the settings document.
    ///
    /// Returns `true` and notifies subscribers when the declarations changed.
    /// On error the previously loaded declarations stay in effect.
    ///
    /// # Errors
    ///
    /// Returns storage, document, or validation errors.
    pub fn reload(&self) -> EndpointSettingsResult<bool> {
        let fresh = read_document(&self.path)?;
        let changed = {
            let mut servers = self.servers.write().map_err(|err| lock_error(&err))?;
            if *servers == fresh {
                false
            } else {
                *servers = fresh;
                true
            }
        };

        if changed {
            tracing::debug!(path = %self.path.display(), "endpoint settings changed on disk");
            self.revision.send_modify(|revision| *revision += 1);
        }
        Ok(changed)
    }
}

fn lock_error(err: &impl ToString) -> EndpointSettingsError {
    EndpointSettingsError::storage(io::Error::other(err.to_string()))
}

fn read_document(path: &Path) -> EndpointSettingsResult<Vec<EndpointDeclaration>> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_settings_document(&text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no endpoint settings file, using empty set");
            Ok(Vec::new())
        }
        Err(err) => Err(EndpointSettingsError::storage(err)),
    }
}

#[async_trait]
impl EndpointSettingsSource for JsonFileEndpointSettings {
    async fn load(&self) -> EndpointSettingsResult<Vec<EndpointDeclaration>> {
        let servers = self.servers.read().map_err(|err| lock_error(&err))?;
        Ok(servers.clone())
    }

    fn subscribe(&self) -> SettingsChanges {
        SettingsChanges::new(self.revision.subscribe())
    }
}
