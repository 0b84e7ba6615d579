use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use shared::domain::AnalysisLanguage;
use tracing::warn;

pub const SETTINGS_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub output_dir: PathBuf,
    pub language: AnalysisLanguage,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            output_dir: PathBuf::from("."),
            language: AnalysisLanguage::default(),
        }
    }
}

impl Settings {
    pub fn apply_overrides(
        &mut self,
        server_url: Option<String>,
        output_dir: Option<PathBuf>,
        language: Option<AnalysisLanguage>,
    ) {
        if let Some(v) = server_url {
            self.server_url = v;
        }
        if let Some(v) = output_dir {
            self.output_dir = v;
        }
        if let Some(v) = language {
            self.language = v;
        }
    }

    fn set_language(&mut self, raw: &str, origin: &str) {
        match raw.parse() {
            Ok(language) => self.language = language,
            Err(err) => warn!(%origin, error = %err, "ignoring configured language"),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then environment variables.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("server_url") {
                    settings.server_url = v.clone();
                }
                if let Some(v) = file_cfg.get("output_dir") {
                    settings.output_dir = PathBuf::from(v);
                }
                if let Some(v) = file_cfg.get("language") {
                    settings.set_language(v, "settings file");
                }
            }
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("REPO_ANALYZER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__OUTPUT_DIR") {
        settings.output_dir = PathBuf::from(v);
    }

    if let Some(v) = env("APP__LANGUAGE") {
        settings.set_language(&v, "APP__LANGUAGE");
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
