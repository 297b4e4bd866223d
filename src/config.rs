use crate::ratings::Category;
use crate::report::ComposeOptions;
use crate::transport::{ComposeTransport, Transport, TransportError, WebhookTransport};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CATEGORIES: &str =
    "consistency:Consistency,discipline:Discipline,determination:Determination,interest:Interest";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be a valid u16, got '{0}'")]
    InvalidPort(String),

    #[error("APP_CATEGORIES must list at least one category")]
    NoCategories,

    #[error("invalid category entry '{0}'")]
    InvalidCategory(String),

    #[error("duplicate category key '{0}'")]
    DuplicateCategory(String),

    #[error("APP_TRANSPORT must be 'compose' or 'webhook', got '{0}'")]
    InvalidTransport(String),

    #[error("APP_WEBHOOK_URL is required when APP_TRANSPORT=webhook")]
    MissingWebhookUrl,

    #[error("{name} must be true or false, got '{value}'")]
    InvalidBool { name: &'static str, value: String },

    #[error("APP_POLL_SECS must be a whole number of seconds, got '{0}'")]
    InvalidPollInterval(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    Compose,
    Webhook { url: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub ratings_path: PathBuf,
    pub ledger_path: PathBuf,
    pub categories: Vec<Category>,
    pub recipients: Vec<String>,
    pub transport: TransportMode,
    pub compose: ComposeOptions,
    pub poll_interval: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            None => DEFAULT_PORT,
        };

        let data_dir = PathBuf::from(
            lookup("APP_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );
        let ratings_path = lookup("APP_RATINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("ratings.json"));
        let ledger_path = lookup("APP_LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("sent.json"));

        let categories = parse_categories(
            &lookup("APP_CATEGORIES").unwrap_or_else(|| DEFAULT_CATEGORIES.to_string()),
        )?;

        let recipients = lookup("APP_REPORT_TO")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|address| !address.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let transport = match lookup("APP_TRANSPORT")
            .map(|value| value.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("") | Some("compose") | Some("mailto") => TransportMode::Compose,
            Some("webhook") => {
                let url = lookup("APP_WEBHOOK_URL")
                    .map(|url| url.trim().to_string())
                    .filter(|url| !url.is_empty())
                    .ok_or(ConfigError::MissingWebhookUrl)?;
                TransportMode::Webhook { url }
            }
            Some(other) => return Err(ConfigError::InvalidTransport(other.to_string())),
        };

        let include_table = match lookup("APP_REPORT_TABLE") {
            Some(value) => parse_bool("APP_REPORT_TABLE", &value)?,
            None => true,
        };

        let poll_interval = match lookup("APP_POLL_SECS") {
            Some(value) => {
                let secs = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidPollInterval(value.clone()))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            port,
            ratings_path,
            ledger_path,
            categories,
            recipients,
            transport,
            compose: ComposeOptions { include_table },
            poll_interval,
        })
    }

    pub fn build_transport(&self) -> Result<Transport, TransportError> {
        Ok(match &self.transport {
            TransportMode::Compose => Transport::Compose(ComposeTransport),
            TransportMode::Webhook { url } => Transport::Webhook(WebhookTransport::new(url)?),
        })
    }

    pub fn category(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.key == key)
    }
}

/// Parses `key:Label,key:Label`. A bare `key` gets a capitalized label.
pub fn parse_categories(value: &str) -> Result<Vec<Category>, ConfigError> {
    let mut seen = HashSet::new();
    let mut categories = Vec::new();

    for item in value.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let (key, label) = match item.split_once(':') {
            Some((key, label)) => (key.trim(), label.trim().to_string()),
            None => (item, capitalize(item)),
        };
        if key.is_empty() || key.starts_with('_') || key == "savedAt" || label.is_empty() {
            return Err(ConfigError::InvalidCategory(item.to_string()));
        }
        if !seen.insert(key.to_string()) {
            return Err(ConfigError::DuplicateCategory(key.to_string()));
        }
        categories.push(Category::new(key, label));
    }

    if categories.is_empty() {
        return Err(ConfigError::NoCategories);
    }
    Ok(categories)
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name,
            value: value.to_string(),
        }),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
