//! # datasets-fs
//!
//! Filesystem-style access to a project's datasets held in a remote object
//! service. Paths are listed, inspected and deleted through the service API;
//! files are read with ranged `GET`s against presigned URLs and written as
//! multipart uploads of fixed-size blocks.
//!
//! ```no_run
//! use datasets_fs::{DatasetFileSystem, OpenMode};
//! use std::io::{Read, Write};
//!
//! # fn main() -> anyhow::Result<()> {
//! let fs = DatasetFileSystem::from_env()?;
//!
//! let mut out = fs.open("/reports/summary.csv", OpenMode::Write)?;
//! out.write_all(b"id,total\n1,42\n")?;
//! out.close()?;
//!
//! let mut text = String::new();
//! fs.open("/reports/summary.csv", OpenMode::Read)?.read_to_string(&mut text)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use client::{HttpObjectClient, ObjectClient};
pub use config::{DatasetsConfig, RetryConfig};
pub use errors::{DatasetError, DatasetResult};
pub use models::{CompletedPart, FileInfo, FileType, ListPage, ObjectEntry};
pub use services::{
    buffered_file::{DatasetFile, OpenMode, OpenOptions},
    filesystem::{DatasetFileSystem, Listing, ObjectPages, parse_project_id},
    range_reader::{DownloadHandle, RangeReader},
    uploader::ChunkedUploader,
};
