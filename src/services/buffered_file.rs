//! DatasetFile: a buffered, path-bound handle on one remote object.
//!
//! Read mode serves random-access reads through a read-ahead window filled by
//! [`RangeReader`]. Write mode accumulates bytes and hands full blocks to a
//! [`ChunkedUploader`]; closing (explicitly or on drop) uploads the remainder
//! and completes the upload.

use super::{range_reader::RangeReader, uploader::ChunkedUploader};
use crate::{
    client::ObjectClient,
    config::{DEFAULT_BLOCK_SIZE, DatasetsConfig, RetryConfig},
    errors::{DatasetError, DatasetResult},
};
use bytes::{Buf, Bytes, BytesMut};
use std::{
    fmt,
    io::{self, Read, Seek, SeekFrom, Write},
    str::FromStr,
    sync::Arc,
};
use tracing::{debug, trace, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

impl FromStr for OpenMode {
    type Err = DatasetError;

    /// Accepts `r`/`rb` and `w`/`wb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" | "rb" => Ok(OpenMode::Read),
            "w" | "wb" => Ok(OpenMode::Write),
            _ => Err(DatasetError::UnsupportedOperation("open mode must be r, rb, w or wb")),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Read => write!(f, "rb"),
            OpenMode::Write => write!(f, "wb"),
        }
    }
}

/// Per-file tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Upload part size in write mode, read-ahead window in read mode.
    pub block_size: usize,
    pub upload_retry: RetryConfig,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            upload_retry: RetryConfig::default(),
        }
    }
}

impl From<&DatasetsConfig> for OpenOptions {
    fn from(cfg: &DatasetsConfig) -> Self {
        Self {
            block_size: cfg.block_size,
            upload_retry: cfg.upload_retry,
        }
    }
}

impl OpenOptions {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_upload_retry(mut self, retry: RetryConfig) -> Self {
        self.upload_retry = retry;
        self
    }
}

/// Bytes cached from the last range fetch.
#[derive(Debug)]
struct ReadWindow {
    start: u64,
    data: Bytes,
}

impl ReadWindow {
    fn contains(&self, pos: u64) -> bool {
        pos >= self.start && pos < self.start + self.data.len() as u64
    }

    fn slice_from(&self, pos: u64) -> &[u8] {
        &self.data[(pos - self.start) as usize..]
    }
}

#[derive(Debug)]
struct ReadState {
    reader: RangeReader,
    size: u64,
    position: u64,
    window: Option<ReadWindow>,
}

#[derive(Debug)]
struct WriteState {
    uploader: ChunkedUploader,
    buffer: BytesMut,
    /// Bytes already handed to the uploader.
    uploaded: u64,
}

#[derive(Debug)]
enum FileInner {
    Read(ReadState),
    Write(WriteState),
}

#[derive(Debug)]
pub struct DatasetFile {
    path: String,
    block_size: usize,
    inner: FileInner,
    closed: bool,
    /// Set once a close has been attempted, successful or not.
    close_attempted: bool,
}

impl DatasetFile {
    /// Open `path` for reading; `size` is the object size resolved by the caller.
    pub(crate) fn for_read(
        client: Arc<dyn ObjectClient>,
        project_id: Uuid,
        path: String,
        size: u64,
        options: OpenOptions,
    ) -> Self {
        debug!(%path, size, "opened file for reading");
        Self {
            inner: FileInner::Read(ReadState {
                reader: RangeReader::new(client, project_id, path.clone()),
                size,
                position: 0,
                window: None,
            }),
            path,
            block_size: options.block_size.max(1),
            closed: false,
            close_attempted: false,
        }
    }

    pub(crate) fn for_write(
        client: Arc<dyn ObjectClient>,
        project_id: Uuid,
        path: String,
        options: OpenOptions,
    ) -> Self {
        debug!(%path, block_size = options.block_size, "opened file for writing");
        Self {
            inner: FileInner::Write(WriteState {
                uploader: ChunkedUploader::new(
                    client,
                    project_id,
                    path.clone(),
                    options.upload_retry,
                ),
                buffer: BytesMut::new(),
                uploaded: 0,
            }),
            path,
            block_size: options.block_size.max(1),
            closed: false,
            close_attempted: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        match self.inner {
            FileInner::Read(_) => OpenMode::Read,
            FileInner::Write(_) => OpenMode::Write,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Object size in read mode; bytes written so far in write mode.
    pub fn size(&self) -> u64 {
        match &self.inner {
            FileInner::Read(state) => state.size,
            FileInner::Write(state) => state.uploaded + state.buffer.len() as u64,
        }
    }

    pub fn tell(&self) -> u64 {
        match &self.inner {
            FileInner::Read(state) => state.position,
            FileInner::Write(_) => self.size(),
        }
    }

    fn ensure_open(&self) -> DatasetResult<()> {
        if self.closed {
            return Err(DatasetError::Io(io::Error::other("I/O operation on closed file")));
        }
        Ok(())
    }

    /// Finish the file. In write mode this uploads any buffered remainder and
    /// completes the upload.
    ///
    /// A failed close leaves the file open with its unsent bytes still
    /// buffered, so it can be called again. Dropping the file after a failed
    /// close abandons the upload.
    pub fn close(&mut self) -> DatasetResult<()> {
        if self.closed {
            return Ok(());
        }
        self.close_attempted = true;

        match &mut self.inner {
            FileInner::Read(state) => state.window = None,
            FileInner::Write(state) => upload_blocks(state, self.block_size, true)?,
        }
        self.closed = true;
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> DatasetResult<usize> {
        self.ensure_open()?;
        let block_size = self.block_size as u64;
        let FileInner::Read(state) = &mut self.inner else {
            return Err(DatasetError::UnsupportedOperation("file not opened for reading"));
        };

        if buf.is_empty() || state.position >= state.size {
            return Ok(0);
        }

        let cached = state
            .window
            .as_ref()
            .is_some_and(|window| window.contains(state.position));
        if !cached {
            let end = state
                .position
                .saturating_add(block_size.max(buf.len() as u64))
                .min(state.size);
            let data = state.reader.fetch_range(state.position, end)?;
            if data.is_empty() {
                return Ok(0);
            }
            state.window = Some(ReadWindow {
                start: state.position,
                data,
            });
        }

        let Some(window) = state.window.as_ref() else {
            return Ok(0);
        };
        let available = window.slice_from(state.position);
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        state.position += n as u64;
        trace!(path = %self.path, n, position = state.position, "read");
        Ok(n)
    }

    fn write_from(&mut self, buf: &[u8]) -> DatasetResult<usize> {
        self.ensure_open()?;
        let FileInner::Write(state) = &mut self.inner else {
            return Err(DatasetError::UnsupportedOperation("file not opened for writing"));
        };

        let buffered = state.buffer.len();
        let uploaded = state.uploaded;
        state.buffer.extend_from_slice(buf);
        if state.buffer.len() < self.block_size {
            return Ok(buf.len());
        }

        match upload_blocks(state, self.block_size, false) {
            Ok(()) => Ok(buf.len()),
            Err(err) => {
                // Drop the bytes of `buf` that were not sent in an accepted part.
                let sent = (state.uploaded - uploaded) as usize;
                let accepted = sent.saturating_sub(buffered);
                state.buffer.truncate(buffered.saturating_sub(sent));
                if accepted == 0 {
                    return Err(err);
                }
                warn!(
                    path = %self.path,
                    accepted,
                    error = %err,
                    "short write after part upload failure"
                );
                Ok(accepted)
            }
        }
    }

    fn seek_to(&mut self, pos: SeekFrom) -> DatasetResult<u64> {
        self.ensure_open()?;
        let current = self.tell();

        match &mut self.inner {
            FileInner::Read(state) => {
                let target = match pos {
                    SeekFrom::Start(offset) => Some(offset),
                    SeekFrom::End(offset) => state.size.checked_add_signed(offset),
                    SeekFrom::Current(offset) => state.position.checked_add_signed(offset),
                };
                let target = target.ok_or_else(|| {
                    DatasetError::Io(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "invalid seek to a negative position",
                    ))
                })?;
                state.position = target;
                Ok(target)
            }
            FileInner::Write(_) => {
                let target = match pos {
                    SeekFrom::Start(offset) => Some(offset),
                    SeekFrom::End(offset) | SeekFrom::Current(offset) => {
                        current.checked_add_signed(offset)
                    }
                };
                if target == Some(current) {
                    Ok(current)
                } else {
                    Err(DatasetError::UnsupportedOperation(
                        "seek is only possible to the current position in write mode",
                    ))
                }
            }
        }
    }
}

/// Drain full blocks from the write buffer into the uploader. On the final
/// flush, upload any non-empty remainder and complete the upload.
///
/// Bytes leave the buffer only after their part has been accepted.
fn upload_blocks(state: &mut WriteState, block_size: usize, final_flush: bool) -> DatasetResult<()> {
    let has_full_block = state.buffer.len() >= block_size;
    if !state.uploader.is_initiated() && (has_full_block || final_flush) {
        state.uploader.initiate()?;
    }

    while state.buffer.len() >= block_size {
        let chunk = Bytes::copy_from_slice(&state.buffer[..block_size]);
        state.uploader.upload_chunk(chunk)?;
        state.buffer.advance(block_size);
        state.uploaded += block_size as u64;
    }

    if final_flush {
        if !state.buffer.is_empty() {
            let remainder = Bytes::copy_from_slice(&state.buffer);
            state.uploader.upload_chunk(remainder)?;
            state.uploaded += state.buffer.len() as u64;
            state.buffer.clear();
        }
        state.uploader.finalize()?;
    }
    Ok(())
}

impl Read for DatasetFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

impl Write for DatasetFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_from(buf)?)
    }

    /// Uploads any full blocks; a partial block stays buffered until more data
    /// arrives or the file is closed.
    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        if let FileInner::Write(state) = &mut self.inner {
            upload_blocks(state, self.block_size, false)?;
        }
        Ok(())
    }
}

impl Seek for DatasetFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.tell())
    }
}

impl Drop for DatasetFile {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if self.close_attempted {
            warn!(path = %self.path, "dropping file after a failed close; upload abandoned");
            return;
        }
        if let Err(err) = self.close() {
            warn!(path = %self.path, error = %err, "failed to finish file on drop");
        }
    }
}
