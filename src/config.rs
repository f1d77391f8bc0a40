use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::PathBuf,
    sync::{OnceLock, RwLock},
};

/// Globally accessible application configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_debug_log_value")]
    pub debug_log: bool,
}

impl AppConfig {
    fn normalize(&mut self) {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        self.api_base_url = if trimmed.is_empty() {
            DEFAULT_API_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        };
        if self.data_dir.trim().is_empty() {
            self.data_dir = DEFAULT_DATA_DIR.to_string();
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            data_dir: default_data_dir(),
            debug_log: default_debug_log_value(),
        }
    }
}

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_DATA_DIR: &str = "output";
pub const API_URL_ENV: &str = "COURSEGEN_API_URL";
const CONFIG_FILE_PATH: &str = "config/app_config.toml";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_data_dir() -> String {
    DEFAULT_DATA_DIR.to_string()
}

const fn default_debug_log_value() -> bool {
    true
}

static APP_CONFIG: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn config_lock() -> &'static RwLock<AppConfig> {
    APP_CONFIG.get_or_init(|| RwLock::new(AppConfig::default()))
}

/// Attempt to load configuration from disk. If loading fails, the in-memory config will be reset to defaults
/// and the error will be returned for the caller to surface if desired.
pub fn initialize() -> Result<()> {
    match load_config_from_disk() {
        Ok(config) => {
            let lock = config_lock();
            *lock.write().expect("config lock poisoned") = config;
            Ok(())
        }
        Err(err) => {
            let lock = config_lock();
            *lock.write().expect("config lock poisoned") = AppConfig::default();
            Err(err)
        }
    }
}

/// Retrieve a clone of the current configuration.
pub fn current() -> AppConfig {
    config_lock().read().expect("config lock poisoned").clone()
}

/// Base URL for the course API. The environment variable wins over the config file.
pub fn api_base_url() -> String {
    resolve_api_base_url(env::var(API_URL_ENV).ok(), &current())
}

fn resolve_api_base_url(from_env: Option<String>, config: &AppConfig) -> String {
    match from_env {
        Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
        _ => config.api_base_url.clone(),
    }
}

pub fn debug_log_enabled() -> bool {
    config_lock()
        .read()
        .expect("config lock poisoned")
        .debug_log
}

/// Directory holding the debug log and the token store.
pub fn data_directory() -> Result<PathBuf, String> {
    let root = PathBuf::from(current().data_dir);
    if root.is_absolute() {
        return Ok(root);
    }

    match env::current_dir() {
        Ok(mut dir) => {
            dir.push(root);
            Ok(dir)
        }
        Err(err) => Err(format!("failed to resolve current directory: {}", err)),
    }
}

/// Apply the provided mutation to the in-memory configuration and persist the result to disk.
pub fn update<F>(mutator: F) -> Result<AppConfig>
where
    F: FnOnce(&mut AppConfig),
{
    let lock = config_lock();
    let mut config = lock.write().expect("config lock poisoned");
    mutator(&mut config);
    config.normalize();
    save_config_to_disk(&config)?;
    Ok(config.clone())
}

/// Absolute path to the configuration file used for persistence.
pub fn config_file_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_PATH)
}

fn load_config_from_disk() -> Result<AppConfig> {
    let path = config_file_path();
    match fs::read_to_string(&path) {
        Ok(contents) => parse_config(&contents)
            .wrap_err_with(|| format!("failed to parse configuration at {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(err) => Err(eyre!(format!(
            "failed to read configuration at {}: {}",
            path.display(),
            err
        ))),
    }
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    let mut config: AppConfig = toml::from_str(contents)?;
    config.normalize();
    Ok(config)
}

fn save_config_to_disk(config: &AppConfig) -> Result<()> {
    let path = config_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!(
                "failed to create configuration directory {}",
                parent.display()
            )
        })?;
    }
    let serialized =
        toml::to_string_pretty(config).wrap_err("failed to serialize configuration to TOML")?;
    fs::write(&path, serialized)
        .wrap_err_with(|| format!("failed to write configuration to {}", path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigField {
    ApiBaseUrl,
    DebugLog,
}

impl ConfigField {
    fn index(self) -> usize {
        match self {
            Self::ApiBaseUrl => 0,
            Self::DebugLog => 1,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::ApiBaseUrl => Self::DebugLog,
            Self::DebugLog => Self::ApiBaseUrl,
        }
    }

    fn previous(self) -> Self {
        self.next()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigForm {
    pub(crate) api_base_url: String,
    pub(crate) debug_log: bool,
    editing_url: bool,
    url_buffer: String,
    field: ConfigField,
    pub(crate) dirty: bool,
    pub(crate) status: Option<String>,
}

impl ConfigForm {
    pub(crate) fn from_config(config: AppConfig) -> Self {
        Self {
            api_base_url: config.api_base_url,
            debug_log: config.debug_log,
            editing_url: false,
            url_buffer: String::new(),
            field: ConfigField::ApiBaseUrl,
            dirty: false,
            status: None,
        }
    }

    pub(crate) fn selected_index(&self) -> usize {
        self.field.index()
    }

    pub(crate) fn select_next(&mut self) {
        self.field = self.field.next();
    }

    pub(crate) fn select_previous(&mut self) {
        self.field = self.field.previous();
    }

    pub(crate) fn adjust_current(&mut self) {
        if matches!(self.field, ConfigField::DebugLog) {
            self.debug_log = !self.debug_log;
            self.dirty = true;
            self.status = None;
        }
    }

    pub(crate) fn apply_saved(&mut self, config: AppConfig) {
        self.api_base_url = config.api_base_url;
        self.debug_log = config.debug_log;
        self.editing_url = false;
        self.url_buffer.clear();
        self.dirty = false;
        self.status = None;
    }

    pub(crate) fn set_status<S: Into<String>>(&mut self, status: S) {
        self.status = Some(status.into());
    }

    pub(crate) fn is_url_selected(&self) -> bool {
        matches!(self.field, ConfigField::ApiBaseUrl)
    }

    pub(crate) fn is_editing_url(&self) -> bool {
        self.editing_url
    }

    pub(crate) fn url_buffer(&self) -> &str {
        &self.url_buffer
    }

    pub(crate) fn start_editing_url(&mut self) {
        self.editing_url = true;
        self.url_buffer = self.api_base_url.clone();
        self.status = Some("Editing API URL (Enter to keep, Esc to cancel)".to_string());
    }

    pub(crate) fn cancel_url_edit(&mut self) {
        self.editing_url = false;
        self.url_buffer.clear();
        self.status = Some("Cancelled API URL edit.".to_string());
    }

    pub(crate) fn apply_url_edit(&mut self) {
        let new_value = self.url_buffer.trim().to_string();
        if !new_value.is_empty() && new_value != self.api_base_url {
            self.api_base_url = new_value;
            self.dirty = true;
            self.status = Some("Updated API URL.".to_string());
        } else {
            self.status = Some("API URL unchanged.".to_string());
        }
        self.editing_url = false;
        self.url_buffer.clear();
    }

    pub(crate) fn backspace_url(&mut self) {
        self.url_buffer.pop();
    }

    pub(crate) fn push_url_char(&mut self, ch: char) {
        self.url_buffer.push(ch);
    }
}
