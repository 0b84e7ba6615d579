use reqwest::{header::CONTENT_DISPOSITION, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::ExportFormat,
    error::ErrorBody,
    protocol::{AnalyzeRequest, AnalyzeResponse, ExportRequest, MarkdownExport},
};
use tracing::{debug, info, warn};
use url::Url;

pub mod content_disposition;
pub mod download;
pub mod error;
pub mod page;

pub use content_disposition::{resolve_download_filename, DEFAULT_PDF_FILENAME};
pub use download::{download_file, Download, DownloadSink, FsDownloadSink, MemoryDownloadSink};
pub use error::ClientError;
pub use page::{
    AnalysisSnapshot, Outcome, PageController, PageView, Panel, PanelState, RecordingView,
    RenderedAnalysis, RepoInfo,
};

const ANALYZE_PATH: &str = "api/analyze";
const EXPORT_PATH: &str = "api/export";

pub const ANALYZE_FALLBACK_ERROR: &str = "Failed to analyze repository";
pub const EXPORT_FALLBACK_ERROR: &str = "Export failed";

/// A successful export, before it is handed to a [`DownloadSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPayload {
    Text { content: String, filename: String },
    Binary { bytes: Vec<u8>, filename: String },
}

impl ExportPayload {
    pub fn filename(&self) -> &str {
        match self {
            ExportPayload::Text { filename, .. } | ExportPayload::Binary { filename, .. } => {
                filename.as_str()
            }
        }
    }
}

/// HTTP client for the analyze and export endpoints.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: Client,
    base_url: Url,
}

impl AnalysisClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_http(base_url, Client::new())
    }

    pub fn with_http(base_url: &str, http: Client) -> Result<Self, ClientError> {
        let mut parsed = Url::parse(base_url.trim()).map_err(|source| {
            ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                source,
            }
        })?;
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                source,
            })
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ClientError> {
        let url = self.endpoint(ANALYZE_PATH)?;
        debug!(%url, repo = %request.url, language = %request.language, "requesting analysis");

        let response = self.http.post(url).json(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(api_failure(status, &body, ANALYZE_FALLBACK_ERROR));
        }

        let analysis: AnalyzeResponse = decode(&body, "analysis response")?;
        info!(
            repo = %analysis.repo_data.name,
            language = %analysis.language,
            bytes = body.len(),
            "analysis received"
        );
        Ok(analysis)
    }

    pub async fn export(&self, request: &ExportRequest) -> Result<ExportPayload, ClientError> {
        let url = self.endpoint(EXPORT_PATH)?;
        debug!(%url, format = %request.format, "requesting export");

        let response = self.http.post(url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(api_failure(status, &body, EXPORT_FALLBACK_ERROR));
        }

        let payload = match request.format {
            ExportFormat::Markdown => {
                let body = response.bytes().await?;
                let export: MarkdownExport = decode(&body, "markdown export")?;
                ExportPayload::Text {
                    content: export.content,
                    filename: export.filename,
                }
            }
            ExportFormat::Pdf => {
                let filename = filename_from_response(&response);
                let bytes = response.bytes().await?.to_vec();
                ExportPayload::Binary { bytes, filename }
            }
        };

        info!(
            format = %request.format,
            filename = payload.filename(),
            "export received"
        );
        Ok(payload)
    }
}

fn filename_from_response(response: &Response) -> String {
    let header = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok());
    resolve_download_filename(header)
}

fn api_failure(status: StatusCode, body: &[u8], fallback: &str) -> ClientError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message().map(str::to_owned))
        .unwrap_or_else(|| fallback.to_string());
    warn!(%status, %message, "backend rejected request");
    ClientError::Api { status, message }
}

fn decode<T: DeserializeOwned>(body: &[u8], context: &'static str) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|source| ClientError::Decode { context, source })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
