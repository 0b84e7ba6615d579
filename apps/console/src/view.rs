use client_core::{PageView, Panel, RenderedAnalysis, RepoInfo};
use tracing::debug;

/// Prints the page to the terminal and keeps the rendered HTML of the last analysis.
#[derive(Debug, Default)]
pub struct TerminalView {
    last_html: Option<String>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_html(&self) -> Option<&str> {
        self.last_html.as_deref()
    }
}

impl PageView for TerminalView {
    fn set_visible(&mut self, panel: Panel, visible: bool) {
        if panel == Panel::Progress && visible {
            eprintln!("Analyzing repository...");
        }
        debug!(?panel, visible, "panel visibility changed");
    }

    fn render_repo_info(&mut self, info: &RepoInfo) {
        println!("{info}\n");
    }

    fn render_analysis(&mut self, analysis: RenderedAnalysis<'_>) {
        println!("{}", analysis.markdown);
        self.last_html = Some(analysis.html.to_string());
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
