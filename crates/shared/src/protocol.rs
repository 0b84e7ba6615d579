use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{AnalysisLanguage, ExportFormat};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub url: String,
    pub language: AnalysisLanguage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoData {
    pub name: String,
    #[serde(default)]
    pub stars: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub forks: u64,
    /// Language name to the backend's size metric, in the order the backend sent them.
    #[serde(default)]
    pub languages: Map<String, Value>,
}

impl RepoData {
    pub fn language_names(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub repo_data: RepoData,
    pub analysis: String,
    pub analysis_html: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportRequest {
    pub analysis: Option<String>,
    pub format: ExportFormat,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownExport {
    pub content: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}
