use anyhow::{Context, Result};
use std::{env, str::FromStr, time::Duration};
use uuid::Uuid;

/// Default block size for buffered files (5 MiB, the smallest part most
/// multipart backends accept for non-final parts).
pub const DEFAULT_BLOCK_SIZE: usize = 5 * 1024 * 1024;

const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_MAX_RETRIES: u32 = 10;
const DEFAULT_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Retry policy for presigned part uploads.
///
/// The delay before retry `n` (0-based) is `base_delay * 2^n`, capped at two
/// minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

impl RetryConfig {
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }
}

/// Centralized client configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct DatasetsConfig {
    pub service_url: String,
    /// Ambient project context; used when a filesystem is built without an
    /// explicit project id.
    pub project_id: Option<Uuid>,
    pub access_token: Option<String>,
    pub block_size: usize,
    pub upload_retry: RetryConfig,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            project_id: None,
            access_token: None,
            block_size: DEFAULT_BLOCK_SIZE,
            upload_retry: RetryConfig::default(),
        }
    }
}

impl DatasetsConfig {
    /// Parse `DATASETS_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`DatasetsConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let service_url = lookup("DATASETS_SERVICE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.service_url);
        let project_id = parse_var::<Uuid>(&lookup, "DATASETS_PROJECT_ID")?;
        let access_token = lookup("DATASETS_ACCESS_TOKEN").filter(|token| !token.is_empty());
        let block_size =
            parse_var::<usize>(&lookup, "DATASETS_BLOCK_SIZE")?.unwrap_or(defaults.block_size);
        if block_size == 0 {
            anyhow::bail!("DATASETS_BLOCK_SIZE must be greater than zero");
        }
        let max_retries = parse_var::<u32>(&lookup, "DATASETS_UPLOAD_MAX_RETRIES")?
            .unwrap_or(defaults.upload_retry.max_retries);
        let base_delay = parse_var::<u64>(&lookup, "DATASETS_UPLOAD_BACKOFF_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.upload_retry.base_delay);

        Ok(Self {
            service_url,
            project_id,
            access_token,
            block_size,
            upload_retry: RetryConfig {
                max_retries,
                base_delay,
            },
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(None),
    }
}
