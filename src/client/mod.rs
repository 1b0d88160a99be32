//! Object service client abstraction.
//!
//! [`ObjectClient`] is the seam between the filesystem layer and the remote
//! object service. [`HttpObjectClient`] talks to the service over HTTP; tests
//! substitute in-memory implementations.

mod http;

pub use http::HttpObjectClient;

use crate::{
    errors::DatasetResult,
    models::{CompletedPart, ListPage, ObjectEntry},
};
use std::fmt::Debug;
use uuid::Uuid;

/// Operations the object service exposes for one project.
///
/// Paths are normalized object keys (leading slash; trailing slash for
/// directory markers). Absent objects are reported as
/// [`DatasetError::NotFound`](crate::DatasetError::NotFound).
pub trait ObjectClient: Debug + Send + Sync {
    /// Fetch one page of objects whose path starts with `prefix`.
    fn list(
        &self,
        project_id: Uuid,
        prefix: &str,
        page_token: Option<&str>,
    ) -> DatasetResult<ListPage>;

    fn get(&self, project_id: Uuid, path: &str) -> DatasetResult<ObjectEntry>;

    fn delete(&self, project_id: Uuid, path: &str, recursive: bool) -> DatasetResult<()>;

    /// Start a multipart upload and return its upload id.
    fn presign_upload(&self, project_id: Uuid, path: &str) -> DatasetResult<String>;

    /// Presigned URL accepting a `PUT` of one part.
    fn presign_upload_part(
        &self,
        project_id: Uuid,
        path: &str,
        upload_id: &str,
        part_number: u32,
    ) -> DatasetResult<String>;

    fn complete_multipart_upload(
        &self,
        project_id: Uuid,
        path: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> DatasetResult<()>;

    /// Presigned URL accepting ranged `GET`s of the object.
    fn presign_download(&self, project_id: Uuid, path: &str) -> DatasetResult<String>;
}
