//! Page controller: the analyze form, the export actions, and panel visibility.

use std::{fmt, path::PathBuf};

use shared::{
    domain::ExportFormat,
    protocol::{AnalyzeRequest, AnalyzeResponse, ExportRequest, RepoData},
};
use tracing::{info, warn};

use crate::{
    download::{download_file, Download, DownloadSink},
    AnalysisClient, ClientError, ExportPayload,
};

pub const NO_DESCRIPTION: &str = "No description";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Progress,
    Results,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub progress: bool,
    pub results: bool,
    pub error: bool,
    /// Last text written to the error panel; kept while the panel is hidden.
    pub error_message: Option<String>,
}

impl PanelState {
    pub fn is_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Progress => self.progress,
            Panel::Results => self.results,
            Panel::Error => self.error,
        }
    }

    fn set(&mut self, panel: Panel, visible: bool) {
        match panel {
            Panel::Progress => self.progress = visible,
            Panel::Results => self.results = visible,
            Panel::Error => self.error = visible,
        }
    }
}

/// Repository summary block shown above the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub name: String,
    pub stars: u64,
    pub description: String,
    pub forks: u64,
    pub languages: String,
}

impl RepoInfo {
    pub fn from_repo_data(repo: &RepoData) -> Self {
        let description = repo
            .description
            .as_deref()
            .filter(|description| !description.is_empty())
            .unwrap_or(NO_DESCRIPTION)
            .to_string();

        Self {
            name: repo.name.clone(),
            stars: repo.stars,
            description,
            forks: repo.forks,
            languages: repo.language_names().collect::<Vec<_>>().join(", "),
        }
    }
}

impl fmt::Display for RepoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Stars: {}", self.stars)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Forks: {}", self.forks)?;
        write!(f, "Languages: {}", self.languages)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderedAnalysis<'a> {
    pub html: &'a str,
    pub markdown: &'a str,
}

/// What the last successful analysis left behind for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSnapshot {
    pub markdown: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Failed(message) => Some(message.as_str()),
        }
    }
}

/// Rendering surface driven by [`PageController`].
pub trait PageView: Send {
    fn set_visible(&mut self, panel: Panel, visible: bool);
    fn render_repo_info(&mut self, info: &RepoInfo);
    fn render_analysis(&mut self, analysis: RenderedAnalysis<'_>);
    fn show_error(&mut self, message: &str);
}

/// Keeps everything written to it; used by tests and headless embedders.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    pub visibility_changes: Vec<(Panel, bool)>,
    pub repo_info: Option<RepoInfo>,
    pub analysis_html: Option<String>,
    pub error_text: Option<String>,
}

impl PageView for RecordingView {
    fn set_visible(&mut self, panel: Panel, visible: bool) {
        self.visibility_changes.push((panel, visible));
    }

    fn render_repo_info(&mut self, info: &RepoInfo) {
        self.repo_info = Some(info.clone());
    }

    fn render_analysis(&mut self, analysis: RenderedAnalysis<'_>) {
        self.analysis_html = Some(analysis.html.to_string());
    }

    fn show_error(&mut self, message: &str) {
        self.error_text = Some(message.to_string());
    }
}

/// Drives one page: submits analyses, runs exports, and keeps panel state in sync
/// with the view. Both operations take `&mut self`, so a controller never has two
/// requests in flight.
pub struct PageController<V, S> {
    client: AnalysisClient,
    view: V,
    sink: S,
    panels: PanelState,
    snapshot: Option<AnalysisSnapshot>,
}

impl<V: PageView, S: DownloadSink> PageController<V, S> {
    pub fn new(client: AnalysisClient, view: V, sink: S) -> Self {
        Self {
            client,
            view,
            sink,
            panels: PanelState::default(),
            snapshot: None,
        }
    }

    pub fn panels(&self) -> &PanelState {
        &self.panels
    }

    pub fn snapshot(&self) -> Option<&AnalysisSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (V, S) {
        (self.view, self.sink)
    }

    pub async fn submit(&mut self, request: AnalyzeRequest) -> Outcome<RepoInfo> {
        let mut panels = PanelWriter::progress(&mut self.view, &mut self.panels);
        panels.set_panel(Panel::Results, false);
        panels.set_panel(Panel::Error, false);

        match self.client.analyze(&request).await {
            Ok(response) => {
                let info = panels.show_analysis(&response);
                self.snapshot = Some(AnalysisSnapshot {
                    markdown: response.analysis,
                    language: response.language,
                });
                Outcome::Completed(info)
            }
            Err(err) => {
                warn!(repo = %request.url, error = %err, "analysis failed");
                Outcome::Failed(panels.show_error(&err))
            }
        }
    }

    pub async fn export(&mut self, format: ExportFormat) -> Outcome<PathBuf> {
        let request = ExportRequest {
            analysis: self.snapshot.as_ref().map(|s| s.markdown.clone()),
            format,
            language: self.snapshot.as_ref().map(|s| s.language.clone()),
        };
        if request.analysis.is_none() {
            warn!(%format, "exporting before any analysis succeeded");
        }

        match self.run_export(&request).await {
            Ok(path) => {
                info!(%format, path = %path.display(), "export saved");
                Outcome::Completed(path)
            }
            Err(err) => {
                warn!(%format, error = %err, "export failed");
                let message =
                    PanelWriter::new(&mut self.view, &mut self.panels).show_error(&err);
                Outcome::Failed(message)
            }
        }
    }

    async fn run_export(&self, request: &ExportRequest) -> Result<PathBuf, ClientError> {
        match self.client.export(request).await? {
            ExportPayload::Text { content, filename } => {
                download_file(
                    &self.sink,
                    &content,
                    &filename,
                    ExportFormat::Markdown.default_content_type(),
                )
                .await
            }
            ExportPayload::Binary { bytes, filename } => {
                self.sink
                    .save(Download::binary(
                        bytes,
                        filename,
                        ExportFormat::Pdf.default_content_type(),
                    ))
                    .await
            }
        }
    }
}

/// Writes panel changes to both the tracked state and the view. When opened with
/// [`PanelWriter::progress`] the progress panel stays visible until the writer is
/// dropped, including when the enclosing future is cancelled.
struct PanelWriter<'a, V: PageView> {
    view: &'a mut V,
    panels: &'a mut PanelState,
    hide_progress_on_drop: bool,
}

impl<'a, V: PageView> PanelWriter<'a, V> {
    fn new(view: &'a mut V, panels: &'a mut PanelState) -> Self {
        Self {
            view,
            panels,
            hide_progress_on_drop: false,
        }
    }

    fn progress(view: &'a mut V, panels: &'a mut PanelState) -> Self {
        let mut writer = Self::new(view, panels);
        writer.set_panel(Panel::Progress, true);
        writer.hide_progress_on_drop = true;
        writer
    }

    fn show_analysis(&mut self, response: &AnalyzeResponse) -> RepoInfo {
        let info = RepoInfo::from_repo_data(&response.repo_data);
        self.view.render_repo_info(&info);
        self.view.render_analysis(RenderedAnalysis {
            html: &response.analysis_html,
            markdown: &response.analysis,
        });
        self.set_panel(Panel::Results, true);
        info
    }

    fn show_error(&mut self, err: &ClientError) -> String {
        let message = err.to_string();
        self.view.show_error(&message);
        self.panels.error_message = Some(message.clone());
        self.set_panel(Panel::Error, true);
        message
    }

    fn set_panel(&mut self, panel: Panel, visible: bool) {
        self.panels.set(panel, visible);
        self.view.set_visible(panel, visible);
    }
}

impl<V: PageView> Drop for PanelWriter<'_, V> {
    fn drop(&mut self) {
        if self.hide_progress_on_drop {
            self.set_panel(Panel::Progress, false);
        }
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
