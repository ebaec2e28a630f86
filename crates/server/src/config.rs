use std::{collections::HashMap, fs};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    /// Page that plays the reveal; share links point here.
    pub public_base_url: String,
    pub contact_base_url: String,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/proposals.db".into(),
            public_base_url: "http://127.0.0.1:8080/p".into(),
            contact_base_url: reveal::MessagingLinkBuilder::DEFAULT_BASE.into(),
            max_body_bytes: 16 * 1024,
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    load_settings_with(file.as_deref(), |key| std::env::var(key).ok())
}

/// File values first, then plain env names, then `APP__*` names.
pub fn load_settings_with(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) {
            let text = |key: &str| file_cfg.get(key).and_then(|v| v.as_str()).map(String::from);
            if let Some(v) = text("bind_addr") {
                settings.server_bind = v;
            }
            if let Some(v) = text("database_url") {
                settings.database_url = v;
            }
            if let Some(v) = text("public_base_url") {
                settings.public_base_url = v;
            }
            if let Some(v) = text("contact_base_url") {
                settings.contact_base_url = v;
            }
            if let Some(v) = file_cfg.get("max_body_bytes").and_then(|v| v.as_integer()) {
                if let Ok(v) = usize::try_from(v) {
                    settings.max_body_bytes = v;
                }
            }
        }
    }

    for key in ["SERVER_BIND", "APP__BIND_ADDR"] {
        if let Some(v) = env(key) {
            settings.server_bind = v;
        }
    }
    for key in ["DATABASE_URL", "APP__DATABASE_URL"] {
        if let Some(v) = env(key) {
            settings.database_url = v;
        }
    }
    for key in ["PUBLIC_BASE_URL", "APP__PUBLIC_BASE_URL"] {
        if let Some(v) = env(key) {
            settings.public_base_url = v;
        }
    }
    if let Some(v) = env("APP__CONTACT_BASE_URL") {
        settings.contact_base_url = v;
    }
    if let Some(v) = env("APP__MAX_BODY_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_body_bytes = parsed;
        }
    }

    settings
}

/// Turns a bare path or `sqlite:` shorthand into a `sqlite://` URL. Storage
/// creates the parent directory when it opens the database.
pub fn normalize_database_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return Settings::default().database_url;
    }
    if raw.contains("://") || raw.starts_with("sqlite::memory:") {
        return raw.to_string();
    }
    let path = raw.strip_prefix("sqlite:").unwrap_or(raw);
    format!("sqlite://{}", path.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
