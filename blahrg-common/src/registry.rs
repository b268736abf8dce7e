//! Clip registry
//!
//! Domain operations over the record store: file identifiers, description
//! uniqueness, the default clip and the listing used for inline replay.

use crate::db::{ClipEntry, ClipField, ClipStore};
use crate::{Error, Result};
use tracing::debug;

/// Filename of the clip sent by the default-clip command
pub const DEFAULT_CLIP: &str = "aaaah.ogg";

#[derive(Debug, Clone)]
pub struct ClipRegistry {
    store: ClipStore,
}

impl ClipRegistry {
    pub fn new(store: ClipStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ClipStore {
        &self.store
    }

    /// Platform file identifier of a clip, if it was ever uploaded
    pub async fn get_file_id(&self, name: &str) -> Result<Option<String>> {
        Ok(self.store.find(name).await?.and_then(|r| r.file_id))
    }

    /// Record the platform file identifier of a clip
    ///
    /// Existing clips keep their description; new clips get `description`
    /// or the `NO_DESC` sentinel.
    pub async fn set_file_id(
        &self,
        name: &str,
        file_id: &str,
        description: Option<&str>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidInput("clip filename must not be empty".to_string()));
        }
        if file_id.is_empty() {
            return Err(Error::InvalidInput(format!("empty file_id for clip {}", name)));
        }

        self.store.upsert(name, file_id, description).await?;
        debug!(filename = name, "Stored clip file_id");
        Ok(())
    }

    pub async fn description_exists(&self, text: &str) -> Result<bool> {
        self.store.exists(ClipField::Description, text).await
    }

    /// All replayable clips as (file_id, description)
    pub async fn list_all(&self) -> Result<Vec<ClipEntry>> {
        self.store.all().await
    }

    pub async fn get_default_clip(&self) -> Result<Option<String>> {
        self.get_file_id(DEFAULT_CLIP).await
    }

    /// Whether a record already uses `filename`
    pub async fn filename_taken(&self, filename: &str) -> Result<bool> {
        self.store.exists(ClipField::Filename, filename).await
    }
}
