use std::{fs, path::Path, path::PathBuf};

use console_core::state::{DEFAULT_API_BASE, DEFAULT_PROJECT_NAME};
use serde::Deserialize;
use shared::protocol::{DEFAULT_MAX_SCENARIOS, MAX_SCENARIOS, MIN_SCENARIOS};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "console.toml";
pub const DEFAULT_DRAFT_DIR: &str = "./ui_drafts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base: String,
    pub project_name: String,
    pub draft_dir: PathBuf,
    /// When set, drafts go to SQLite instead of `draft_dir`.
    pub draft_database_url: Option<String>,
    pub export_dir: PathBuf,
    pub log_level: String,
    pub developer_mode: bool,
    pub max_scenarios: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            project_name: DEFAULT_PROJECT_NAME.into(),
            draft_dir: PathBuf::from(DEFAULT_DRAFT_DIR),
            draft_database_url: None,
            export_dir: PathBuf::from("."),
            log_level: "info".into(),
            developer_mode: false,
            max_scenarios: DEFAULT_MAX_SCENARIOS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    api_base: Option<String>,
    project_name: Option<String>,
    draft_dir: Option<PathBuf>,
    draft_database_url: Option<String>,
    export_dir: Option<PathBuf>,
    log_level: Option<String>,
    developer_mode: Option<bool>,
    max_scenarios: Option<u32>,
}

/// Reads `path` if it exists, then applies environment overrides.
pub fn load_settings(path: &Path) -> Settings {
    let raw = fs::read_to_string(path).ok();
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

pub fn load_settings_from(raw_toml: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_toml {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!(error = %err, "ignoring malformed console settings file"),
        }
    }

    // Later names win, so `APP__*` aliases override the `TESTGEN_*` names.
    let var = |names: &[&str]| {
        names
            .iter()
            .rev()
            .filter_map(|name| env(name))
            .find(|v| !v.trim().is_empty())
    };

    if let Some(v) = var(&["TESTGEN_API_BASE", "APP__API_BASE"]) {
        settings.api_base = v;
    }
    if let Some(v) = var(&["TESTGEN_PROJECT_NAME", "APP__PROJECT_NAME"]) {
        settings.project_name = v;
    }
    if let Some(v) = var(&["TESTGEN_UI_DRAFT_DIR", "APP__DRAFT_DIR"]) {
        settings.draft_dir = PathBuf::from(v);
    }
    if let Some(v) = var(&["TESTGEN_DRAFT_DATABASE_URL", "APP__DRAFT_DATABASE_URL"]) {
        settings.draft_database_url = Some(normalize_database_url(&v));
    }
    if let Some(v) = var(&["TESTGEN_EXPORT_DIR", "APP__EXPORT_DIR"]) {
        settings.export_dir = PathBuf::from(v);
    }
    if let Some(v) = var(&["APP__LOG_LEVEL"]) {
        settings.log_level = v;
    }
    if let Some(v) = var(&["TESTGEN_DEVELOPER_MODE", "APP__DEVELOPER_MODE"]) {
        match parse_flag(&v) {
            Some(flag) => settings.developer_mode = flag,
            None => warn!(value = %v, "ignoring unparseable developer mode flag"),
        }
    }
    if let Some(v) = var(&["APP__MAX_SCENARIOS"]) {
        match v.trim().parse::<u32>() {
            Ok(parsed) => settings.max_scenarios = parsed,
            Err(_) => warn!(value = %v, "ignoring unparseable max scenarios"),
        }
    }

    settings.max_scenarios = clamp_max_scenarios(settings.max_scenarios);
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_base {
        settings.api_base = v;
    }
    if let Some(v) = file_cfg.project_name {
        settings.project_name = v;
    }
    if let Some(v) = file_cfg.draft_dir {
        settings.draft_dir = v;
    }
    if let Some(v) = file_cfg.draft_database_url {
        settings.draft_database_url = Some(normalize_database_url(&v));
    }
    if let Some(v) = file_cfg.export_dir {
        settings.export_dir = v;
    }
    if let Some(v) = file_cfg.log_level {
        settings.log_level = v;
    }
    if let Some(v) = file_cfg.developer_mode {
        settings.developer_mode = v;
    }
    if let Some(v) = file_cfg.max_scenarios {
        settings.max_scenarios = v;
    }
}

pub fn clamp_max_scenarios(value: u32) -> u32 {
    value.clamp(MIN_SCENARIOS, MAX_SCENARIOS)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accepts plain file paths as well as `sqlite:` URLs.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_windows_drive(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        if has_windows_drive(&path) {
            return format!("sqlite:{path}");
        }
        return format!("sqlite://{path}");
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url.replace('\\', "/");
    if has_windows_drive(&path) {
        return format!("sqlite:{path}");
    }
    format!("sqlite://{path}")
}

fn has_windows_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
