//! ChunkedUploader: one multipart upload for one destination path.
//!
//! The upload moves through `Uninitiated -> Active -> Finalized`. Parts are
//! numbered from the count of parts already completed, so they must be sent
//! one at a time and in order; `upload_chunk` takes `&mut self`, which rules
//! out concurrent parts on the same session.

use super::strip_query;
use crate::{
    client::ObjectClient,
    config::RetryConfig,
    errors::{DatasetError, DatasetResult},
    models::{CompletedPart, UploadSession, UploadState},
};
use bytes::Bytes;
use reqwest::{
    StatusCode,
    blocking::Client,
    header::ETAG,
};
use std::{mem, sync::Arc, thread};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct ChunkedUploader {
    client: Arc<dyn ObjectClient>,
    project_id: Uuid,
    path: String,
    /// Dedicated HTTP client for part PUTs; not shared with other uploads.
    http: Client,
    retry: RetryConfig,
    state: UploadState,
}

impl ChunkedUploader {
    pub fn new(
        client: Arc<dyn ObjectClient>,
        project_id: Uuid,
        path: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            project_id,
            path: path.into(),
            http: Client::new(),
            retry,
            state: UploadState::Uninitiated,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_initiated(&self) -> bool {
        !matches!(self.state, UploadState::Uninitiated)
    }

    /// Parts uploaded so far, in part-number order.
    pub fn completed_parts(&self) -> &[CompletedPart] {
        match &self.state {
            UploadState::Uninitiated => &[],
            UploadState::Active(session) | UploadState::Finalized(session) => session.parts(),
        }
    }

    /// Request an upload id for the destination path.
    pub fn initiate(&mut self) -> DatasetResult<()> {
        if self.is_initiated() {
            return Err(DatasetError::InvalidState("upload already initiated"));
        }

        let upload_id = self.client.presign_upload(self.project_id, &self.path)?;
        info!(path = %self.path, %upload_id, "initiated multipart upload");
        self.state = UploadState::Active(UploadSession::new(self.path.clone(), upload_id));
        Ok(())
    }

    /// Upload `data` as the next part.
    ///
    /// Transient server errors are retried with exponential backoff; the part
    /// is recorded only once the backend has accepted it.
    pub fn upload_chunk(&mut self, data: Bytes) -> DatasetResult<()> {
        let session = match &mut self.state {
            UploadState::Active(session) => session,
            UploadState::Uninitiated => {
                return Err(DatasetError::InvalidState("upload not initiated"));
            }
            UploadState::Finalized(_) => {
                return Err(DatasetError::InvalidState("upload already finalized"));
            }
        };

        let part_number = session.next_part_number();
        let url = self.client.presign_upload_part(
            self.project_id,
            &session.path,
            &session.upload_id,
            part_number,
        )?;

        debug!(path = %session.path, part_number, bytes = data.len(), "uploading part");
        let etag = put_part(&self.http, &self.retry, &url, &data)?;
        session.record_part(part_number, etag);
        Ok(())
    }

    /// Ask the backend to assemble the uploaded parts into the final object.
    ///
    /// A second call is rejected. If completion fails the upload stays active.
    pub fn finalize(&mut self) -> DatasetResult<()> {
        let session = match &self.state {
            UploadState::Active(session) => session,
            UploadState::Uninitiated => {
                return Err(DatasetError::InvalidState("upload not initiated"));
            }
            UploadState::Finalized(_) => {
                return Err(DatasetError::InvalidState("upload already finalized"));
            }
        };

        self.client.complete_multipart_upload(
            self.project_id,
            &session.path,
            &session.upload_id,
            session.parts(),
        )?;
        info!(path = %session.path, parts = session.parts().len(), "completed multipart upload");

        if let UploadState::Active(session) = mem::replace(&mut self.state, UploadState::Uninitiated)
        {
            self.state = UploadState::Finalized(session);
        }
        Ok(())
    }
}

/// Server-side statuses worth retrying.
fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// PUT one part to its presigned URL and return the part's ETag.
fn put_part(http: &Client, retry: &RetryConfig, url: &str, data: &Bytes) -> DatasetResult<String> {
    let display_url = strip_query(url);
    let mut attempt: u32 = 0;

    loop {
        let last_status = match http.put(url).body(data.clone()).send() {
            Ok(response) if response.status().is_success() => {
                return response
                    .headers()
                    .get(ETAG)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
                    .ok_or(DatasetError::MissingEtag);
            }
            Ok(response) if is_transient(response.status()) => Some(response.status()),
            Ok(response) => {
                return Err(DatasetError::Http {
                    url: display_url.to_string(),
                    status: response.status().as_u16(),
                });
            }
            Err(err) if err.is_connect() || err.is_timeout() => None,
            Err(err) => return Err(err.into()),
        };

        if attempt >= retry.max_retries {
            return Err(DatasetError::RetriesExhausted {
                url: display_url.to_string(),
                status: last_status.map(|s| s.as_u16()),
                attempts: attempt + 1,
            });
        }

        let delay = retry.delay_for(attempt);
        warn!(
            url = display_url,
            status = ?last_status,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "transient failure uploading part, retrying"
        );
        thread::sleep(delay);
        attempt += 1;
    }
}
