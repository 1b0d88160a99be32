//! DatasetFileSystem: path-based access to one project's datasets.
//!
//! Listing, metadata and deletion map straight onto the [`ObjectClient`];
//! `open` hands out [`DatasetFile`]s bound to the same client and project.

use super::buffered_file::{DatasetFile, OpenMode, OpenOptions};
use crate::{
    client::{HttpObjectClient, ObjectClient},
    config::DatasetsConfig,
    errors::{DatasetError, DatasetResult},
    models::{
        FileInfo, ObjectEntry,
        path::{as_directory, is_direct_child, normalize_path},
    },
};
use std::{
    env,
    io::{Read, Write},
    sync::Arc,
    vec,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Environment variable carrying the ambient project id.
pub const PROJECT_ID_VAR: &str = "DATASETS_PROJECT_ID";

/// Result of [`DatasetFileSystem::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Detailed(Vec<FileInfo>),
    Names(Vec<String>),
}

impl Listing {
    /// Normalized names regardless of the detail level.
    pub fn names(&self) -> Vec<String> {
        match self {
            Listing::Detailed(infos) => infos.iter().map(|info| info.name.clone()).collect(),
            Listing::Names(names) => names.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Detailed(infos) => infos.len(),
            Listing::Names(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
enum PageCursor {
    Start,
    Next(String),
    Done,
}

/// Lazily pages through every object under a prefix.
#[derive(Debug)]
pub struct ObjectPages<'a> {
    client: &'a dyn ObjectClient,
    project_id: Uuid,
    prefix: String,
    buffered: vec::IntoIter<ObjectEntry>,
    cursor: PageCursor,
}

impl Iterator for ObjectPages<'_> {
    type Item = DatasetResult<ObjectEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(obj) = self.buffered.next() {
                return Some(Ok(obj));
            }

            let token = match std::mem::replace(&mut self.cursor, PageCursor::Done) {
                PageCursor::Done => return None,
                PageCursor::Start => None,
                PageCursor::Next(token) => Some(token),
            };

            match self.client.list(self.project_id, &self.prefix, token.as_deref()) {
                Ok(page) => {
                    debug!(
                        prefix = %self.prefix,
                        objects = page.objects.len(),
                        more = page.next_page_token.is_some(),
                        "received listing page"
                    );
                    if let Some(next) = page.next_page_token {
                        self.cursor = PageCursor::Next(next);
                    }
                    self.buffered = page.objects.into_iter();
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Filesystem view of one project's datasets.
///
/// Cheap to clone; clones share the object client.
#[derive(Debug, Clone)]
pub struct DatasetFileSystem {
    client: Arc<dyn ObjectClient>,
    project_id: Uuid,
    open_options: OpenOptions,
}

impl DatasetFileSystem {
    /// Bind `client` to a project. Without an explicit id, the ambient project
    /// from `DATASETS_PROJECT_ID` is used.
    pub fn new(client: Arc<dyn ObjectClient>, project_id: Option<Uuid>) -> DatasetResult<Self> {
        let project_id = match project_id {
            Some(id) => id,
            None => ambient_project_id()?,
        };
        Ok(Self {
            client,
            project_id,
            open_options: OpenOptions::default(),
        })
    }

    /// Build an HTTP-backed filesystem from configuration.
    pub fn from_config(cfg: &DatasetsConfig) -> DatasetResult<Self> {
        let client = Arc::new(HttpObjectClient::from_config(cfg)?);
        let fs = Self::new(client, cfg.project_id)?.with_open_options(OpenOptions::from(cfg));
        info!(
            service_url = %cfg.service_url,
            project_id = %fs.project_id,
            "datasets filesystem ready"
        );
        Ok(fs)
    }

    /// Read configuration from the environment and build an HTTP-backed
    /// filesystem.
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = DatasetsConfig::from_env()?;
        Ok(Self::from_config(&cfg)?)
    }

    pub fn with_open_options(mut self, options: OpenOptions) -> Self {
        self.open_options = options;
        self
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn open_options(&self) -> OpenOptions {
        self.open_options
    }

    /// Every object whose path starts with `prefix`, across all pages.
    pub fn objects(&self, prefix: &str) -> ObjectPages<'_> {
        ObjectPages {
            client: self.client.as_ref(),
            project_id: self.project_id,
            prefix: prefix.to_string(),
            buffered: Vec::new().into_iter(),
            cursor: PageCursor::Start,
        }
    }

    /// List `path` and its direct children. A file lists as itself.
    pub fn list(&self, path: &str, detail: bool) -> DatasetResult<Listing> {
        let path = normalize_path(path);
        let dir = as_directory(&path);

        let mut entries = Vec::new();
        for obj in self.objects(&path) {
            let obj = obj?;
            if obj.path == path || obj.path == dir || is_direct_child(&dir, &obj.path) {
                entries.push(obj);
            }
        }
        debug!(%path, entries = entries.len(), "listed path");

        Ok(if detail {
            Listing::Detailed(entries.iter().map(FileInfo::from).collect())
        } else {
            Listing::Names(entries.iter().map(|obj| normalize_path(&obj.path)).collect())
        })
    }

    /// Detailed listing of direct children only (excluding `path` itself).
    fn children(&self, path: &str) -> DatasetResult<Vec<FileInfo>> {
        let name = normalize_path(path);
        match self.list(&name, true)? {
            Listing::Detailed(infos) => Ok(infos.into_iter().filter(|i| i.name != name).collect()),
            Listing::Names(_) => Ok(Vec::new()),
        }
    }

    /// Metadata for `path`. Without a trailing slash the directory form is
    /// tried before the file form.
    pub fn info(&self, path: &str) -> DatasetResult<FileInfo> {
        let mut candidates = vec![as_directory(path)];
        if !path.ends_with('/') {
            candidates.push(normalize_path(path));
        }

        for candidate in &candidates {
            match self.client.get(self.project_id, candidate) {
                Ok(obj) => return Ok(FileInfo::from(obj)),
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
        }
        Err(DatasetError::not_found(normalize_path(path)))
    }

    pub fn checksum(&self, path: &str) -> DatasetResult<String> {
        Ok(self.info(path)?.etag)
    }

    pub fn exists(&self, path: &str) -> DatasetResult<bool> {
        match self.info(path) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn is_dir(&self, path: &str) -> DatasetResult<bool> {
        match self.info(path) {
            Ok(info) => Ok(info.is_dir()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn is_file(&self, path: &str) -> DatasetResult<bool> {
        match self.info(path) {
            Ok(info) => Ok(info.is_file()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn size(&self, path: &str) -> DatasetResult<u64> {
        Ok(self.info(path)?.size)
    }

    /// Delete `path`.
    ///
    /// Without `maxdepth` the object service performs the (optionally
    /// recursive) delete itself. With `maxdepth`, the tree is expanded by
    /// listing down to that depth and removed one entry at a time, deepest
    /// first.
    pub fn delete(&self, path: &str, recursive: bool, maxdepth: Option<usize>) -> DatasetResult<()> {
        let Some(maxdepth) = maxdepth else {
            let target = backend_path(path);
            return self
                .client
                .delete(self.project_id, &target, recursive)
                .map_err(|err| {
                    if err.is_not_found() {
                        DatasetError::not_found(normalize_path(path))
                    } else {
                        err
                    }
                });
        };

        if maxdepth == 0 {
            return Err(DatasetError::InvalidArgument("maxdepth must be at least 1"));
        }

        let mut targets = self.expand(path, recursive, maxdepth)?;
        targets.sort();
        info!(path, entries = targets.len(), maxdepth, "deleting expanded tree");
        for target in targets.iter().rev() {
            self.client
                .delete(self.project_id, target, false)
                .map_err(|err| {
                    if err.is_not_found() {
                        DatasetError::not_found(normalize_path(target))
                    } else {
                        err
                    }
                })?;
        }
        Ok(())
    }

    /// `path` plus, when `recursive`, its descendants down to `maxdepth`
    /// levels. Directories are returned in directory-prefix form.
    fn expand(&self, path: &str, recursive: bool, maxdepth: usize) -> DatasetResult<Vec<String>> {
        let root = self.info(path)?;
        let mut out = vec![entry_path(&root)];
        if recursive && root.is_dir() {
            self.collect_descendants(&root.name, 1, maxdepth, &mut out)?;
        }
        Ok(out)
    }

    fn collect_descendants(
        &self,
        dir: &str,
        level: usize,
        maxdepth: usize,
        out: &mut Vec<String>,
    ) -> DatasetResult<()> {
        for child in self.children(dir)? {
            out.push(entry_path(&child));
            if child.is_dir() && level < maxdepth {
                self.collect_descendants(&child.name, level + 1, maxdepth, out)?;
            }
        }
        Ok(())
    }

    /// Open `path` with this filesystem's default options.
    pub fn open(&self, path: &str, mode: OpenMode) -> DatasetResult<DatasetFile> {
        self.open_with(path, mode, self.open_options)
    }

    pub fn open_with(
        &self,
        path: &str,
        mode: OpenMode,
        options: OpenOptions,
    ) -> DatasetResult<DatasetFile> {
        let path = normalize_path(path);
        match mode {
            OpenMode::Read => {
                let info = self.info(&path)?;
                if info.is_dir() {
                    return Err(DatasetError::UnsupportedOperation(
                        "cannot open a directory for reading",
                    ));
                }
                Ok(DatasetFile::for_read(
                    self.client.clone(),
                    self.project_id,
                    path,
                    info.size,
                    options,
                ))
            }
            OpenMode::Write => Ok(DatasetFile::for_write(
                self.client.clone(),
                self.project_id,
                path,
                options,
            )),
        }
    }

    /// Read a whole object.
    pub fn cat(&self, path: &str) -> DatasetResult<Vec<u8>> {
        let mut file = self.open(path, OpenMode::Read)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        file.close()?;
        Ok(data)
    }

    /// Write `data` as the whole content of `path`.
    pub fn pipe(&self, path: &str, data: &[u8]) -> DatasetResult<()> {
        let mut file = self.open(path, OpenMode::Write)?;
        file.write_all(data)?;
        file.close()
    }
}

/// Path to hand the object service: normalized, keeping a trailing slash when
/// the caller supplied one.
fn backend_path(path: &str) -> String {
    if path.ends_with('/') {
        as_directory(path)
    } else {
        normalize_path(path)
    }
}

fn entry_path(info: &FileInfo) -> String {
    if info.is_dir() {
        as_directory(&info.name)
    } else {
        info.name.clone()
    }
}

fn ambient_project_id() -> DatasetResult<Uuid> {
    let value = env::var(PROJECT_ID_VAR).map_err(|_| DatasetError::MissingProjectId)?;
    parse_project_id(&value)
}

/// Parse a project id given as a string.
pub fn parse_project_id(value: &str) -> DatasetResult<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|source| DatasetError::InvalidProjectId {
        value: value.to_string(),
        source,
    })
}
