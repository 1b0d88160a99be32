//! Represents multipart upload sessions and parts.

use serde::{Deserialize, Serialize};

/// A single uploaded part, as reported back to the service on completion.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CompletedPart {
    /// Part number (1-based).
    pub part_number: u32,

    /// ETag returned by the storage backend for this part.
    pub etag: String,
}

/// An open multipart upload for one destination path.
///
/// Parts are appended strictly in sequence, so the next part number is always
/// `parts.len() + 1`.
#[derive(Clone, Debug)]
pub struct UploadSession {
    pub path: String,
    pub upload_id: String,
    parts: Vec<CompletedPart>,
}

impl UploadSession {
    pub fn new(path: impl Into<String>, upload_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            upload_id: upload_id.into(),
            parts: Vec::new(),
        }
    }

    pub fn next_part_number(&self) -> u32 {
        self.parts.len() as u32 + 1
    }

    /// Record a completed part. `part_number` must be the value returned by
    /// [`UploadSession::next_part_number`] before the upload started.
    pub fn record_part(&mut self, part_number: u32, etag: impl Into<String>) {
        debug_assert_eq!(part_number, self.next_part_number());
        self.parts.push(CompletedPart {
            part_number,
            etag: etag.into(),
        });
    }

    pub fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }
}

/// Lifecycle of a chunked upload. Transitions only move forward.
#[derive(Debug)]
pub enum UploadState {
    Uninitiated,
    Active(UploadSession),
    Finalized(UploadSession),
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Uninitiated => "uninitiated",
            UploadState::Active(_) => "active",
            UploadState::Finalized(_) => "finalized",
        }
    }
}
