//! Turning export payloads into saved files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::ClientError;

const FALLBACK_FILENAME: &str = "download";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

impl Download {
    pub fn text(
        content: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::binary(content.into().into_bytes(), filename, content_type)
    }

    pub fn binary(
        payload: Vec<u8>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            payload,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Destination for finished downloads. Takes ownership of the payload; nothing is
/// retained between calls unless the sink chooses to record it.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn save(&self, download: Download) -> Result<PathBuf, ClientError>;
}

/// Saves literal text content under `filename` tagged with `content_type`.
pub async fn download_file<S>(
    sink: &S,
    content: &str,
    filename: &str,
    content_type: &str,
) -> Result<PathBuf, ClientError>
where
    S: DownloadSink + ?Sized,
{
    sink.save(Download::text(content, filename, content_type))
        .await
}

/// Writes downloads into a single directory.
#[derive(Debug, Clone)]
pub struct FsDownloadSink {
    dir: PathBuf,
}

impl FsDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_path(&self, filename: &str) -> PathBuf {
        self.dir.join(sanitize_filename(filename))
    }
}

#[async_trait]
impl DownloadSink for FsDownloadSink {
    async fn save(&self, download: Download) -> Result<PathBuf, ClientError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ClientError::Save {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.target_path(&download.filename);
        tokio::fs::write(&path, &download.payload)
            .await
            .map_err(|source| ClientError::Save {
                path: path.clone(),
                source,
            })?;

        info!(
            path = %path.display(),
            bytes = download.len(),
            content_type = %download.content_type,
            "saved download"
        );
        Ok(path)
    }
}

/// Keeps downloads in memory instead of touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryDownloadSink {
    saved: Mutex<Vec<Download>>,
}

impl MemoryDownloadSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn downloads(&self) -> Vec<Download> {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl DownloadSink for MemoryDownloadSink {
    async fn save(&self, download: Download) -> Result<PathBuf, ClientError> {
        let path = PathBuf::from(sanitize_filename(&download.filename));
        self.saved.lock().await.push(download);
        Ok(path)
    }
}

/// Keeps only the final path component so a server-suggested name cannot escape the target dir.
fn sanitize_filename(name: &str) -> String {
    let last = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        last.to_string()
    }
}
