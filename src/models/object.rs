//! Represents an object (file or directory marker) stored in a project's
//! datasets area.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path::{is_directory, normalize_path};

/// A single object as reported by the object service.
///
/// Directory markers are objects whose path ends in `/`. Entries are returned
/// transiently from list/get calls and never cached.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Object path within the project, e.g. `/folder/data.txt` or `/folder/`.
    pub path: String,

    /// Size in bytes.
    pub size: u64,

    /// Opaque content fingerprint.
    pub etag: String,

    /// Timestamp when the object was last modified, if the service reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectEntry {
    pub fn is_directory(&self) -> bool {
        is_directory(&self.path)
    }
}

/// One page of a prefix listing.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectEntry>,

    /// Opaque continuation token; `None` on the last page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
}

/// Filesystem-facing description of an entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Normalized name: leading slash, no trailing slash.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileType,
    pub size: u64,
    pub etag: String,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.kind == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileType::File
    }
}

impl From<&ObjectEntry> for FileInfo {
    fn from(obj: &ObjectEntry) -> Self {
        Self {
            name: normalize_path(&obj.path),
            kind: if obj.is_directory() {
                FileType::Directory
            } else {
                FileType::File
            },
            size: obj.size,
            etag: obj.etag.clone(),
        }
    }
}

impl From<ObjectEntry> for FileInfo {
    fn from(obj: ObjectEntry) -> Self {
        Self::from(&obj)
    }
}
