//! Filesystem adapter, buffered remote files and the upload/download
//! machinery behind them.

pub mod buffered_file;
pub mod filesystem;
pub mod range_reader;
pub mod uploader;

/// Drop the query string from a presigned URL so credentials stay out of
/// logs and error messages.
pub(crate) fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
