use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_TABLE: &str = "suggestions";
pub const DEFAULT_POLL_SECS: u64 = 5;
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@pemblebox.com";

/// Hosted backend-as-a-service table.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub url: Url,
    pub api_key: String,
    pub table: String,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailConfig {
    pub endpoint: Url,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Local SQLite URL; `None` means the default file in the data dir.
    pub database_url: Option<String>,
    /// `None` selects local fallback mode.
    pub backend: Option<BackendConfig>,
    pub mail: Option<MailConfig>,
    pub admin_email: String,
}

// On-disk shape; every field optional so partial files work.
#[derive(Debug, Deserialize, Clone, Default)]
struct FileConfig {
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    backend: Option<FileBackend>,
    #[serde(default)]
    mail: Option<FileMail>,
    #[serde(default)]
    admin_email: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FileBackend {
    url: Option<String>,
    api_key: Option<String>,
    table: Option<String>,
    poll_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FileMail {
    endpoint: Option<String>,
    token: Option<String>,
}

impl Config {
    /// Load `path` (or the default config file if present), then apply
    /// `PEMBLEBOX_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(
                std::fs::read_to_string(p)
                    .with_context(|| format!("reading config file: {}", p.display()))?,
            ),
            None => default_config_path()
                .filter(|p| p.exists())
                .map(|p| {
                    info!(path = %p.display(), "loading config");
                    std::fs::read_to_string(&p)
                        .with_context(|| format!("reading config file: {}", p.display()))
                })
                .transpose()?,
        };
        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(toml_src: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match toml_src {
            Some(src) => toml::from_str(src).context("parsing config file")?,
            None => FileConfig::default(),
        };
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = env("PEMBLEBOX_DATABASE_URL").or(file.database_url);

        let fb = file.backend.unwrap_or_default();
        let backend_url = env("PEMBLEBOX_BACKEND_URL").or(fb.url);
        let backend = match backend_url {
            None => None,
            Some(raw) => {
                let url = parse_base_url(&raw).context("invalid backend url")?;
                let Some(api_key) = env("PEMBLEBOX_BACKEND_KEY").or(fb.api_key) else {
                    bail!("backend url is set but no api key (PEMBLEBOX_BACKEND_KEY) was given");
                };
                let poll_secs = match env("PEMBLEBOX_POLL_SECS") {
                    Some(s) => s.parse().with_context(|| format!("invalid PEMBLEBOX_POLL_SECS: {s}"))?,
                    None => fb.poll_secs.unwrap_or(DEFAULT_POLL_SECS),
                };
                Some(BackendConfig {
                    url,
                    api_key,
                    table: fb.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
                    poll_interval: Duration::from_secs(poll_secs.max(1)),
                })
            }
        };

        let fm = file.mail.unwrap_or_default();
        let mail = match env("PEMBLEBOX_MAIL_ENDPOINT").or(fm.endpoint) {
            None => None,
            Some(raw) => Some(MailConfig {
                endpoint: Url::parse(&raw).with_context(|| format!("invalid mail endpoint: {raw}"))?,
                token: env("PEMBLEBOX_MAIL_TOKEN").or(fm.token),
            }),
        };

        let admin_email = env("PEMBLEBOX_ADMIN_EMAIL")
            .or(file.admin_email)
            .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string());

        let cfg = Self { database_url, backend, mail, admin_email };
        debug!(remote = cfg.backend.is_some(), mail = cfg.mail.is_some(), "configuration resolved");
        Ok(cfg)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "pemblebox", "pemblebox").map(|p| p.config_dir().join("pemblebox.toml"))
}

// Base URLs must end in '/' or Url::join drops the last path segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("not a url: {raw}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported scheme: {}", url.scheme());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
