//! Core data models for the datasets filesystem.
//!
//! These types describe remote objects, listing pages and multipart upload
//! sessions. They serialize as JSON via `serde` for the object service API.

pub mod multipart;
pub mod object;
pub mod path;

pub use multipart::{CompletedPart, UploadSession, UploadState};
pub use object::{FileInfo, FileType, ListPage, ObjectEntry};
