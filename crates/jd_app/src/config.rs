use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use jd_core::PREVIEW_ROW_WINDOW;
use jd_engine::{AtomicFileWriter, PollSettings, ServiceSettings};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "jd_preview.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_download_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let settings = ServiceSettings::default();
        Self {
            base_url: settings.base_url,
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            max_download_bytes: settings.max_download_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub progress_interval_ms: u64,
    pub status_interval_ms: u64,
    pub max_status_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let settings = PollSettings::default();
        Self {
            progress_interval_ms: settings.progress_interval.as_millis() as u64,
            status_interval_ms: settings.status_interval.as_millis() as u64,
            max_status_attempts: settings.max_status_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub row_window: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            row_window: PREVIEW_ROW_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub preview: PreviewConfig,
    pub output_dir: PathBuf,
    /// Also log to this file when set.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            polling: PollingConfig::default(),
            preview: PreviewConfig::default(),
            output_dir: PathBuf::from("output"),
            log_file: None,
        }
    }
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub row_window: Option<usize>,
}

impl AppConfig {
    /// Reads the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!("reading config {path:?}")))
            }
        };
        ron::from_str(&content).with_context(|| format!("parsing config {path:?}"))
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(server) = overrides.server {
            self.server.base_url = server;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(rows) = overrides.row_window {
            self.preview.row_window = rows;
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("{path:?} does not name a file"))?;
        Ok(AtomicFileWriter::new(dir).write(file_name, content.as_bytes())?)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            base_url: self.server.base_url.clone(),
            connect_timeout: Duration::from_secs(self.server.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.server.request_timeout_secs),
            max_download_bytes: self.server.max_download_bytes,
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            progress_interval: Duration::from_millis(self.polling.progress_interval_ms),
            status_interval: Duration::from_millis(self.polling.status_interval_ms),
            max_status_attempts: self.polling.max_status_attempts,
        }
    }
}
