//! Media directory holding raw clip binaries
//!
//! Files are named by their slug-derived clip filename. The add-clip wizard
//! writes here; `/refresh` reads everything back to upload clips the store
//! has no file identifier for.

use blahrg_common::slug::CLIP_EXTENSION;
use blahrg_common::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: PathBuf,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the media directory if it is missing
    pub async fn ensure_exists(&self) -> Result<()> {
        if !tokio::fs::try_exists(&self.root).await? {
            tokio::fs::create_dir_all(&self.root).await?;
            info!("Created media directory: {}", self.root.display());
        }
        Ok(())
    }

    /// Absolute path of a clip, rejecting names that would escape the directory
    pub fn clip_path(&self, filename: &str) -> Result<PathBuf> {
        let is_plain_name = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\']);

        if !is_plain_name {
            return Err(Error::InvalidInput(format!(
                "invalid clip filename: {:?}",
                filename
            )));
        }
        Ok(self.root.join(filename))
    }

    /// Write a clip binary under a name that is not on disk yet
    ///
    /// Returns false, leaving the existing file untouched, if `filename`
    /// already exists.
    pub async fn create_clip(&self, filename: &str, bytes: &[u8]) -> Result<bool> {
        let path = self.clip_path(filename)?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        file.write_all(bytes).await?;
        file.flush().await?;
        debug!(filename, size = bytes.len(), "Stored clip binary");
        Ok(true)
    }

    /// Delete a clip binary; a missing file is not an error
    pub async fn remove_clip(&self, filename: &str) -> Result<()> {
        let path = self.clip_path(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read_clip(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.clip_path(filename)?;
        Ok(tokio::fs::read(&path).await?)
    }

    /// Filenames of every `.ogg` regular file in the directory, sorted
    pub async fn list_clips(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // Non-UTF-8 names cannot be stored as record keys
            match entry.file_name().into_string() {
                Ok(name) if !name.starts_with('.') && has_clip_extension(&name) => {
                    names.push(name)
                }
                Ok(name) => debug!("Skipping non-clip media file {}", name),
                Err(name) => debug!("Skipping non UTF-8 media file {:?}", name),
            }
        }

        names.sort();
        Ok(names)
    }
}

fn has_clip_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CLIP_EXTENSION))
}
