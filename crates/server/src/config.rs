use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    /// When set, every route requires `Authorization: Bearer <token>`.
    pub api_token: Option<String>,
    pub max_attachment_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3001".into(),
            api_token: None,
            max_attachment_bytes: 8 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    api_token: Option<String>,
    max_attachment_bytes: Option<usize>,
}

pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    path: impl AsRef<Path>,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

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

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.api_token {
        settings.api_token = Some(v);
    }
    if let Some(v) = file_cfg.max_attachment_bytes {
        settings.max_attachment_bytes = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("LEAVE_API_TOKEN") {
        settings.api_token = Some(v);
    }
    if let Some(v) = var("APP__API_TOKEN") {
        settings.api_token = Some(v);
    }
    settings.api_token = settings
        .api_token
        .take()
        .filter(|token| !token.trim().is_empty());

    if let Some(v) = var("APP__MAX_ATTACHMENT_BYTES") {
        settings.max_attachment_bytes = v
            .parse()
            .with_context(|| format!("invalid attachment limit '{v}'"))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
