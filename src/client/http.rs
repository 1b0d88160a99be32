//! Blocking HTTP implementation of [`ObjectClient`].

use super::ObjectClient;
use crate::{
    config::DatasetsConfig,
    errors::{DatasetError, DatasetResult},
    models::{CompletedPart, ListPage, ObjectEntry},
};
use reqwest::{
    StatusCode, Url,
    blocking::{Client, RequestBuilder, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct PathRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct PresignPartRequest<'a> {
    path: &'a str,
    upload_id: &'a str,
    part_number: u32,
}

#[derive(Debug, Serialize)]
struct CompleteUploadRequest<'a> {
    path: &'a str,
    upload_id: &'a str,
    parts: &'a [CompletedPart],
}

#[derive(Debug, Deserialize)]
struct PresignUploadResponse {
    upload_id: String,
}

#[derive(Debug, Deserialize)]
struct PresignedUrlResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to the object service at `{service_url}/project/{project_id}/...`.
#[derive(Debug, Clone)]
pub struct HttpObjectClient {
    http: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpObjectClient {
    pub fn new(service_url: &str, access_token: Option<String>) -> DatasetResult<Self> {
        let base_url = Url::parse(service_url)
            .map_err(|_| DatasetError::InvalidServiceUrl(service_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(DatasetError::InvalidServiceUrl(service_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            access_token,
        })
    }

    pub fn from_config(cfg: &DatasetsConfig) -> DatasetResult<Self> {
        Self::new(&cfg.service_url, cfg.access_token.clone())
    }

    /// Build `{base}/project/{project_id}/{resource}[/{object path}]`.
    ///
    /// Object path segments are percent-encoded individually; a trailing slash
    /// on `object_path` is preserved so directory markers stay distinct.
    fn endpoint(
        &self,
        project_id: Uuid,
        resource: &str,
        object_path: Option<&str>,
    ) -> DatasetResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| DatasetError::InvalidServiceUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push("project").push(&project_id.to_string());
            segments.extend(resource.split('/'));
            if let Some(path) = object_path {
                segments.extend(path.strip_prefix('/').unwrap_or(path).split('/'));
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder, path: &str) -> DatasetResult<Response> {
        let response = self.authorize(request).send()?;
        let status = response.status();
        trace!(%status, url = %response.url(), "object service response");

        if status == StatusCode::NOT_FOUND {
            return Err(DatasetError::not_found(path));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(DatasetError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> DatasetResult<T> {
        Ok(self.send(request, path)?.json::<T>()?)
    }
}

impl ObjectClient for HttpObjectClient {
    fn list(
        &self,
        project_id: Uuid,
        prefix: &str,
        page_token: Option<&str>,
    ) -> DatasetResult<ListPage> {
        let url = self.endpoint(project_id, "object-list", Some(prefix))?;
        let mut request = self.http.get(url);
        if let Some(token) = page_token {
            request = request.query(&[("page_start", token)]);
        }
        debug!(prefix, has_token = page_token.is_some(), "listing objects");
        self.send_json(request, prefix)
    }

    fn get(&self, project_id: Uuid, path: &str) -> DatasetResult<ObjectEntry> {
        let url = self.endpoint(project_id, "object", Some(path))?;
        self.send_json(self.http.get(url), path)
    }

    fn delete(&self, project_id: Uuid, path: &str, recursive: bool) -> DatasetResult<()> {
        let url = self.endpoint(project_id, "object", Some(path))?;
        let request = self
            .http
            .delete(url)
            .query(&[("recursive", if recursive { "true" } else { "false" })]);
        debug!(path, recursive, "deleting object");
        self.send(request, path)?;
        Ok(())
    }

    fn presign_upload(&self, project_id: Uuid, path: &str) -> DatasetResult<String> {
        let url = self.endpoint(project_id, "presign/upload", None)?;
        let request = self.http.post(url).json(&PathRequest { path });
        let response: PresignUploadResponse = self.send_json(request, path)?;
        Ok(response.upload_id)
    }

    fn presign_upload_part(
        &self,
        project_id: Uuid,
        path: &str,
        upload_id: &str,
        part_number: u32,
    ) -> DatasetResult<String> {
        let url = self.endpoint(project_id, "presign/upload/part", None)?;
        let request = self.http.post(url).json(&PresignPartRequest {
            path,
            upload_id,
            part_number,
        });
        let response: PresignedUrlResponse = self.send_json(request, path)?;
        Ok(response.url)
    }

    fn complete_multipart_upload(
        &self,
        project_id: Uuid,
        path: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> DatasetResult<()> {
        let url = self.endpoint(project_id, "presign/upload/complete", None)?;
        let request = self.http.put(url).json(&CompleteUploadRequest {
            path,
            upload_id,
            parts,
        });
        self.send(request, path)?;
        Ok(())
    }

    fn presign_download(&self, project_id: Uuid, path: &str) -> DatasetResult<String> {
        let url = self.endpoint(project_id, "presign/download", None)?;
        let request = self.http.post(url).json(&PathRequest { path });
        let response: PresignedUrlResponse = self.send_json(request, path)?;
        Ok(response.url)
    }
}
