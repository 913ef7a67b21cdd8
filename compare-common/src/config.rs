//! Configuration loading
//!
//! Two tiers:
//! 1. **TOML bootstrap**: database path, listen address, capacity, access
//!    rules and logging. Read once at startup.
//! 2. **Database runtime**: comparison settings from the `settings` table,
//!    owned by the admin surface and read-only to the service.
//!
//! Bootstrap resolution follows the usual priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::compare::{AttributeSet, DEFAULT_MAX_ITEMS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Settings table keys owned by this service
pub const SETTING_BUTTON_POSITION: &str = "compare_button_position";
pub const SETTING_ATTRIBUTES: &str = "compare_attributes";
pub const SETTING_TABLE_STYLE: &str = "compare_table_style";

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "PRODUCT_COMPARE_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Listen address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Capacity of every comparison list
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Let anonymous sessions keep a comparison list before login
    #[serde(default)]
    pub allow_guest_compare: bool,

    /// Roles that hold the "read" capability
    #[serde(default = "default_allowed_roles")]
    pub allowed_roles: Vec<String>,

    /// Sessions older than this are rejected
    #[serde(default = "default_session_timeout")]
    pub session_timeout_seconds: i64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            host: default_host(),
            port: default_port(),
            max_items: default_max_items(),
            allow_guest_compare: false,
            allowed_roles: default_allowed_roles(),
            session_timeout_seconds: default_session_timeout(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    get_default_data_folder().join("compare.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5760
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

fn default_allowed_roles() -> Vec<String> {
    ["customer", "subscriber", "editor", "administrator"]
        .iter()
        .map(|r| r.to_string())
        .collect()
}

fn default_session_timeout() -> i64 {
    // 2 days
    172_800
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Load bootstrap configuration
    ///
    /// A missing file is not an error: a warning is logged and compiled
    /// defaults are used. A file that exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using compiled defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            return Err(Error::Config("max_items must be at least 1".to_string()));
        }
        if self.session_timeout_seconds <= 0 {
            return Err(Error::Config(
                "session_timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `role` holds the "read" capability
    pub fn role_can_read(&self, role: &str) -> bool {
        self.allowed_roles.iter().any(|r| r == role)
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument
/// 2. `PRODUCT_COMPARE_CONFIG` environment variable
/// 3. Platform config directory, if the file exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|d| d.join("product-compare").join("config.toml"))
        .filter(|p| p.exists())
}

/// Get OS-dependent default data folder
fn get_default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("product-compare"))
        .unwrap_or_else(|| PathBuf::from("./product_compare_data"))
}

/// Where the compare button is placed on product pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ButtonPosition {
    #[default]
    AfterAddToCart,
    BeforeAddToCart,
    AfterProductTitle,
}

impl ButtonPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonPosition::AfterAddToCart => "after_add_to_cart",
            ButtonPosition::BeforeAddToCart => "before_add_to_cart",
            ButtonPosition::AfterProductTitle => "after_product_title",
        }
    }
}

impl FromStr for ButtonPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "after_add_to_cart" => Ok(ButtonPosition::AfterAddToCart),
            "before_add_to_cart" => Ok(ButtonPosition::BeforeAddToCart),
            "after_product_title" => Ok(ButtonPosition::AfterProductTitle),
            other => Err(Error::Config(format!("Unknown button position: {}", other))),
        }
    }
}

/// Visual style hint for the comparison table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableStyle {
    #[default]
    Default,
    Minimal,
    Modern,
}

impl TableStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStyle::Default => "default",
            TableStyle::Minimal => "minimal",
            TableStyle::Modern => "modern",
        }
    }
}

impl FromStr for TableStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(TableStyle::Default),
            "minimal" => Ok(TableStyle::Minimal),
            "modern" => Ok(TableStyle::Modern),
            other => Err(Error::Config(format!("Unknown table style: {}", other))),
        }
    }
}

/// Runtime comparison settings from the database
///
/// `button_position` and `table_style` are presentation hints passed through
/// untouched; `attributes` drives the projector.
#[derive(Debug, Clone, Default)]
pub struct CompareSettings {
    pub button_position: ButtonPosition,
    pub attributes: AttributeSet,
    pub table_style: TableStyle,
}

impl CompareSettings {
    /// Load settings, falling back to defaults for missing or unparsable values
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let button_position = match get_setting(pool, SETTING_BUTTON_POSITION).await? {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}; using {}", e, defaults.button_position.as_str());
                defaults.button_position
            }),
            None => defaults.button_position,
        };

        let table_style = match get_setting(pool, SETTING_TABLE_STYLE).await? {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}; using {}", e, defaults.table_style.as_str());
                defaults.table_style
            }),
            None => defaults.table_style,
        };

        let attributes = match get_setting(pool, SETTING_ATTRIBUTES).await? {
            Some(value) => match AttributeSet::from_json(&value) {
                Ok(set) => set,
                Err(e) => {
                    warn!("Invalid {} setting ({}); using default attributes", SETTING_ATTRIBUTES, e);
                    defaults.attributes.clone()
                }
            },
            None => defaults.attributes.clone(),
        };

        Ok(Self {
            button_position,
            attributes,
            table_style,
        })
    }
}

/// Read one value from the settings table
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Write one value to the settings table
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
