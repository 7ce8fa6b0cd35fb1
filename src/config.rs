//! Runtime configuration from the environment

use std::path::PathBuf;

const DEFAULT_SHEET_NAME: &str = "Sheet1";
const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_BRIDGE_URL: &str = "ws://127.0.0.1:8765";
const DEFAULT_AUTH_DIR: &str = "auth_info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Target spreadsheet; logging is disabled when unset
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    /// Service-account key file
    pub credentials_path: PathBuf,
    /// Fallback filter when `RUST_LOG` is not set
    pub log_level: String,
    pub bridge_url: String,
    /// Where the bridge session credentials are persisted
    pub auth_dir: PathBuf,
}

impl BotConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            spreadsheet_id: get("SPREADSHEET_ID"),
            sheet_name: get("SHEET_NAME").unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            credentials_path: get("GOOGLE_CREDENTIALS_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH), PathBuf::from),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            bridge_url: get("BRIDGE_URL").unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string()),
            auth_dir: get("AUTH_DIR").map_or_else(|| PathBuf::from(DEFAULT_AUTH_DIR), PathBuf::from),
        }
    }
}
