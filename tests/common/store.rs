//! In-memory state behind the mock object service: objects, open multipart
//! uploads, presigned download tokens and the request log tests assert on.

use base64::{Engine as _, engine::general_purpose};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use datasets_fs::{CompletedPart, ObjectEntry};
use std::collections::{BTreeMap, HashMap, VecDeque};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("upload `{0}` not found")]
    UploadNotFound(String),
    #[error("directory `{0}` is not empty")]
    DirectoryNotEmpty(String),
    #[error("invalid parts list: {0}")]
    InvalidParts(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Upload {
    pub path: String,
    pub parts: BTreeMap<u32, (Bytes, String)>,
}

#[derive(Debug, Default)]
pub struct Store {
    pub objects: BTreeMap<String, StoredObject>,
    pub uploads: HashMap<String, Upload>,
    pub download_tokens: HashMap<String, String>,

    /// Statuses returned, in order, by the next presigned part PUTs.
    pub part_failures: VecDeque<u16>,
    /// When set, presigned downloads ignore `Range` and send the full body.
    pub ignore_ranges: bool,

    pub part_puts: Vec<(String, u32, usize)>,
    pub range_headers: Vec<Option<String>>,
    pub presign_downloads: usize,
    pub completed: Vec<(String, Vec<CompletedPart>)>,
}

pub fn quoted_md5(data: &[u8]) -> String {
    format!("\"{:x}\"", md5::compute(data))
}

impl Store {
    pub fn new() -> Self {
        let mut store = Self::default();
        store.put_directory("/");
        store
    }

    fn put_directory(&mut self, path: &str) {
        self.objects.entry(path.to_string()).or_insert_with(|| StoredObject {
            data: Bytes::new(),
            etag: quoted_md5(b""),
            last_modified: Utc::now(),
        });
    }

    /// Create the directory markers for every ancestor of `path`.
    fn ensure_parents(&mut self, path: &str) {
        let trimmed = path.trim_end_matches('/');
        let mut prefix = String::from("/");
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            prefix.push_str(segment);
            prefix.push('/');
            self.put_directory(&prefix);
        }
    }

    pub fn put_object(&mut self, path: &str, data: Bytes) -> StoredObject {
        self.ensure_parents(path);
        if path.ends_with('/') {
            self.put_directory(path);
        }
        let object = StoredObject {
            etag: quoted_md5(&data),
            data,
            last_modified: Utc::now(),
        };
        self.objects.insert(path.to_string(), object.clone());
        object
    }

    pub fn entry(path: &str, obj: &StoredObject) -> ObjectEntry {
        ObjectEntry {
            path: path.to_string(),
            size: obj.data.len() as u64,
            etag: obj.etag.clone(),
            last_modified: Some(obj.last_modified),
        }
    }

    pub fn get(&self, path: &str) -> StoreResult<ObjectEntry> {
        self.objects
            .get(path)
            .map(|obj| Self::entry(path, obj))
            .ok_or_else(|| StoreError::ObjectNotFound(path.to_string()))
    }

    /// One page of objects under `prefix`, ordered by path. The continuation
    /// token is the base64-encoded last path of the previous page.
    pub fn list(
        &self,
        prefix: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> (Vec<ObjectEntry>, Option<String>) {
        let after = page_token.map(decode_token);
        let mut page: Vec<ObjectEntry> = self
            .objects
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .filter(|(path, _)| after.as_deref().is_none_or(|a| path.as_str() > a))
            .take(page_size + 1)
            .map(|(path, obj)| Self::entry(path, obj))
            .collect();

        let next = if page.len() > page_size {
            page.truncate(page_size);
            page.last().map(|last| encode_token(&last.path))
        } else {
            None
        };
        (page, next)
    }

    pub fn delete(&mut self, path: &str, recursive: bool) -> StoreResult<()> {
        let dir = format!("{}/", path.trim_end_matches('/'));
        let target = if !path.ends_with('/') && self.objects.contains_key(path) {
            path.to_string()
        } else if self.objects.contains_key(&dir) {
            dir.clone()
        } else {
            return Err(StoreError::ObjectNotFound(path.to_string()));
        };

        if target == dir {
            let children: Vec<String> = self
                .objects
                .keys()
                .filter(|key| key.starts_with(&dir) && key.as_str() != dir)
                .cloned()
                .collect();
            if !children.is_empty() && !recursive {
                return Err(StoreError::DirectoryNotEmpty(dir));
            }
            for child in children {
                self.objects.remove(&child);
            }
        }
        if target != "/" {
            self.objects.remove(&target);
        }
        Ok(())
    }

    pub fn start_upload(&mut self, path: &str) -> String {
        let upload_id = Uuid::new_v4().to_string();
        self.uploads.insert(
            upload_id.clone(),
            Upload {
                path: path.to_string(),
                parts: BTreeMap::new(),
            },
        );
        upload_id
    }

    pub fn put_part(&mut self, upload_id: &str, part_number: u32, data: Bytes) -> StoreResult<String> {
        let upload = self
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::UploadNotFound(upload_id.to_string()))?;
        let etag = quoted_md5(&data);
        self.part_puts.push((upload_id.to_string(), part_number, data.len()));
        upload.parts.insert(part_number, (data, etag.clone()));
        Ok(etag)
    }

    /// Assemble the listed parts into the destination object. Part numbers
    /// must run 1..=n and every etag must match the stored part.
    pub fn complete(&mut self, path: &str, upload_id: &str, parts: &[CompletedPart]) -> StoreResult<()> {
        let upload = self
            .uploads
            .get(upload_id)
            .ok_or_else(|| StoreError::UploadNotFound(upload_id.to_string()))?;
        if upload.path != path {
            return Err(StoreError::InvalidParts(format!(
                "upload is for {}, not {}",
                upload.path, path
            )));
        }

        let mut data = BytesMut::new();
        for (index, part) in parts.iter().enumerate() {
            if part.part_number as usize != index + 1 {
                return Err(StoreError::InvalidParts(format!(
                    "expected part {} but got {}",
                    index + 1,
                    part.part_number
                )));
            }
            match upload.parts.get(&part.part_number) {
                Some((bytes, etag)) if *etag == part.etag => data.extend_from_slice(bytes),
                _ => {
                    return Err(StoreError::InvalidParts(format!(
                        "part {} does not match an uploaded part",
                        part.part_number
                    )));
                }
            }
        }

        self.uploads.remove(upload_id);
        self.put_object(path, data.freeze());
        self.completed.push((path.to_string(), parts.to_vec()));
        Ok(())
    }

    pub fn presign_download(&mut self, path: &str) -> StoreResult<String> {
        if !self.objects.contains_key(path) {
            return Err(StoreError::ObjectNotFound(path.to_string()));
        }
        self.presign_downloads += 1;
        let token = Uuid::new_v4().to_string();
        self.download_tokens.insert(token.clone(), path.to_string());
        Ok(token)
    }
}

fn encode_token(path: &str) -> String {
    general_purpose::STANDARD.encode(path)
}

fn decode_token(token: &str) -> String {
    general_purpose::STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| token.to_string())
}
