use crate::error::AppError;
use crate::pomodoro::timer::{DEFAULT_MINUTES, validate_minutes};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR_NAME: &str = "flow";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "FLOW_CONFIG_PATH";
const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        if self.accent.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.accent, text, self.reset)
        }
    }

    pub fn mutedize(&self, text: &str) -> String {
        if self.muted.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.muted, text, self.reset)
        }
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    match theme.and_then(canonical_theme_name).as_deref() {
        Some("noir") => Palette {
            accent: "\x1b[38;5;208m",
            muted: "\x1b[38;5;250m",
            reset: "\x1b[0m",
        },
        Some("solarized") => Palette {
            accent: "\x1b[38;5;108m",
            muted: "\x1b[38;5;250m",
            reset: "\x1b[0m",
        },
        _ => Palette {
            accent: "",
            muted: "",
            reset: "",
        },
    }
}

pub fn canonical_theme_name(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        return Some("default".into());
    }

    match trimmed {
        "vanilla" | "light" => Some("default".to_string()),
        "dark" | "dark_mode" | "darkmode" => Some("noir".to_string()),
        other => Some(other.to_string()),
    }
}

/// Light/dark switch: `noir` goes back to `default`, everything else goes dark.
pub fn toggled_theme(current: Option<&str>) -> String {
    match current.and_then(canonical_theme_name).as_deref() {
        Some("noir") => "default".to_string(),
        _ => "noir".to_string(),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pomodoro_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autosave_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    pub fn pomodoro_minutes(&self) -> u32 {
        self.pomodoro_minutes.unwrap_or(DEFAULT_MINUTES)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms.unwrap_or(DEFAULT_AUTOSAVE_DELAY_MS))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub aliases: HashMap<String, String>,
    pub pomodoro_minutes: Option<u32>,
    pub autosave_delay_ms: Option<u64>,
}

/// Per-user application directory (`~/.config/flow` or `%APPDATA%\flow`).
pub fn config_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    if let Some(minutes) = config.pomodoro_minutes {
        validate_minutes(minutes)?;
    }
    Ok(normalize_config_theme(config))
}

pub fn save_config(config: &Config) -> Result<(), AppError> {
    let path = config_path()?;
    save_config_to_path(&path, config)
}

fn save_config_to_path(path: &Path, config: &Config) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    debug!("event=config_save path={}", path.display());
    Ok(())
}

/// Flips the persisted theme between light and dark and returns the new name.
pub fn toggle_theme() -> Result<String, AppError> {
    let path = config_path()?;
    toggle_theme_at_path(&path)
}

fn toggle_theme_at_path(path: &Path) -> Result<String, AppError> {
    let mut config = if path.exists() {
        load_config_from_path(path)?
    } else {
        Config::default()
    };
    let next = toggled_theme(config.theme.as_deref());
    config.theme = Some(next.clone());
    save_config_to_path(path, &config)?;
    Ok(next)
}

pub fn set_theme(name: &str) -> Result<String, AppError> {
    let path = config_path()?;
    set_theme_at_path(&path, name)
}

fn set_theme_at_path(path: &Path, name: &str) -> Result<String, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_input("theme name is required"));
    }
    let mut config = if path.exists() {
        load_config_from_path(path)?
    } else {
        Config::default()
    };
    let normalized = canonical_theme_name(name).unwrap_or_else(|| "default".to_string());
    config.theme = Some(normalized.clone());
    save_config_to_path(path, &config)?;
    Ok(normalized)
}

fn normalize_config_theme(mut config: Config) -> Config {
    config.theme = config.theme.and_then(|name| canonical_theme_name(&name));
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme.as_ref()
        && let Some(normalized) = canonical_theme_name(theme)
    {
        merged.theme = Some(normalized);
    }

    for (alias, value) in overrides.aliases.iter() {
        merged.aliases.insert(alias.clone(), value.clone());
    }

    if overrides.pomodoro_minutes.is_some() {
        merged.pomodoro_minutes = overrides.pomodoro_minutes;
    }
    if overrides.autosave_delay_ms.is_some() {
        merged.autosave_delay_ms = overrides.autosave_delay_ms;
    }

    merged
}
