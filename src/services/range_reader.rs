//! Ranged reads against a presigned download URL.

use super::strip_query;
use crate::{
    client::ObjectClient,
    errors::{DatasetError, DatasetResult},
};
use bytes::Bytes;
use reqwest::{StatusCode, blocking::Client, header::RANGE};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Presigned URL for one object, resolved on first use.
///
/// URLs are assumed to stay valid for the lifetime of the reader; they are
/// never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadHandle {
    Unresolved,
    Resolved(String),
}

#[derive(Debug)]
pub struct RangeReader {
    client: Arc<dyn ObjectClient>,
    project_id: Uuid,
    path: String,
    http: Client,
    handle: DownloadHandle,
}

impl RangeReader {
    pub fn new(client: Arc<dyn ObjectClient>, project_id: Uuid, path: impl Into<String>) -> Self {
        Self {
            client,
            project_id,
            path: path.into(),
            http: Client::new(),
            handle: DownloadHandle::Unresolved,
        }
    }

    pub fn handle(&self) -> &DownloadHandle {
        &self.handle
    }

    fn download_url(&mut self) -> DatasetResult<String> {
        if let DownloadHandle::Resolved(url) = &self.handle {
            return Ok(url.clone());
        }
        let url = self.client.presign_download(self.project_id, &self.path)?;
        debug!(path = %self.path, "resolved download url");
        self.handle = DownloadHandle::Resolved(url.clone());
        Ok(url)
    }

    /// Fetch bytes `start..end` (end exclusive). Empty ranges make no request.
    pub fn fetch_range(&mut self, start: u64, end: u64) -> DatasetResult<Bytes> {
        if end <= start {
            return Ok(Bytes::new());
        }

        let url = self.download_url()?;
        debug!(path = %self.path, start, end, "fetching range");
        let response = self
            .http
            .get(&url)
            .header(RANGE, format!("bytes={}-{}", start, end - 1))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::Http {
                url: strip_query(&url).to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes()?;
        if status == StatusCode::PARTIAL_CONTENT {
            return Ok(body);
        }

        // Full-body reply: the server ignored the Range header.
        let len = body.len() as u64;
        let from = start.min(len) as usize;
        let to = end.min(len) as usize;
        Ok(body.slice(from..to))
    }
}
