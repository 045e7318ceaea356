use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub api_token: Option<String>,
    pub page_size: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3001/api".into(),
            request_timeout_secs: 30,
            api_token: None,
            page_size: 20,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    api_token: Option<String>,
    page_size: Option<u32>,
}

/// Defaults, then `path` if it exists, then environment variables.
pub fn load_settings(path: impl AsRef<Path>) -> Result<ClientSettings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    path: impl AsRef<Path>,
    var: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let path = path.as_ref();
    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        apply_file(&mut settings, file_cfg);
    }

    apply_env(&mut settings, var)?;
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.api_token {
        settings.api_token = Some(v);
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
}

fn apply_env(
    settings: &mut ClientSettings,
    var: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let lookup = |plain: &str, prefixed: &str| var(prefixed).or_else(|| var(plain));

    if let Some(v) = lookup("LEAVE_SERVER_URL", "APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("LEAVE_REQUEST_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v
            .parse()
            .with_context(|| format!("invalid request timeout '{v}'"))?;
    }
    if let Some(v) = lookup("LEAVE_API_TOKEN", "APP__API_TOKEN") {
        settings.api_token = Some(v).filter(|token| !token.trim().is_empty());
    }
    if let Some(v) = lookup("LEAVE_PAGE_SIZE", "APP__PAGE_SIZE") {
        settings.page_size = v
            .parse()
            .with_context(|| format!("invalid page size '{v}'"))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
