//! Handles settings for the application. Configuration is written in
//! `settings.toml`.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Sqlite {
    /// Store file path; omit to run against an in-memory store.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Fallback {
    /// Path of the best-effort JSON snapshot mirror.
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct LegacyImport {
    /// Path of the prior-format flat export to import on first run.
    pub path: String,
    /// Account whose partition receives the unowned legacy entries.
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub sqlite: Sqlite,
    pub fallback: Option<Fallback>,
    pub legacy_import: Option<LegacyImport>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
