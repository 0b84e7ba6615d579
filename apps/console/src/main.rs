use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{AnalysisClient, FsDownloadSink, Outcome, PageController};
use shared::{
    domain::{AnalysisLanguage, ExportFormat},
    protocol::AnalyzeRequest,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod view;

use view::TerminalView;

#[derive(Parser, Debug)]
#[command(
    name = "repo-insight",
    version,
    about = "Submit a repository to the analysis service and download the report"
)]
struct Args {
    /// Repository URL to analyze.
    url: String,
    /// Report language (en, es, fr, de, zh).
    #[arg(long, short)]
    language: Option<AnalysisLanguage>,
    #[arg(long)]
    server_url: Option<String>,
    /// Directory exports are saved into.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Export to download after a successful analysis (markdown, pdf). Repeatable.
    #[arg(long = "export", value_name = "FORMAT")]
    exports: Vec<ExportFormat>,
    /// Also write the rendered analysis HTML to this file.
    #[arg(long)]
    html: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    settings.apply_overrides(args.server_url, args.out_dir, args.language);

    let client = AnalysisClient::new(&settings.server_url)
        .with_context(|| format!("cannot use server url '{}'", settings.server_url))?;
    let sink = FsDownloadSink::new(&settings.output_dir);
    info!(
        server = %client.base_url(),
        out_dir = %sink.dir().display(),
        language = %settings.language,
        "starting analysis"
    );
    let mut page = PageController::new(client, TerminalView::new(), sink);

    let request = AnalyzeRequest {
        url: args.url,
        language: settings.language,
    };
    if !page.submit(request).await.is_completed() {
        return Ok(ExitCode::FAILURE);
    }
    if let (Some(path), Some(html)) = (args.html.as_deref(), page.view().last_html()) {
        tokio::fs::write(path, html)
            .await
            .with_context(|| format!("cannot write analysis html to {}", path.display()))?;
    }

    let mut failed = false;
    let mut requested: Vec<ExportFormat> = Vec::new();
    for format in args.exports {
        if requested.contains(&format) {
            continue;
        }
        requested.push(format);

        match page.export(format).await {
            Outcome::Completed(path) => println!("Saved {format} export to {}", path.display()),
            Outcome::Failed(_) => failed = true,
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
