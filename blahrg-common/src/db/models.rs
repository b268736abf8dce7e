//! Database models

use serde::{Deserialize, Serialize};

/// Description stored for clips that were uploaded without one
pub const NO_DESCRIPTION: &str = "NO_DESC";

/// One stored voice clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClipRecord {
    /// Primary key; slug-derived filename inside the media directory
    pub filename: String,
    /// Platform reference for cached replay; None until first upload
    pub file_id: Option<String>,
    pub description: String,
}

/// Replayable clip: a record that has been uploaded at least once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClipEntry {
    pub file_id: String,
    pub description: String,
}

/// Record field usable in existence checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipField {
    Filename,
    FileId,
    Description,
}

impl ClipField {
    /// Column name in the clips table
    pub fn column(self) -> &'static str {
        match self {
            ClipField::Filename => "filename",
            ClipField::FileId => "file_id",
            ClipField::Description => "description",
        }
    }
}
