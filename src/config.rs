use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::accounts;

/// Environment variable that overrides `general.database_url`.
pub const DATABASE_URL_ENV: &str = "THOMAS_DATABASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub cluster: ClusterConfig,

    pub accounts: AccountsConfig,

    pub provisioning: ProvisioningConfig,

    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_url: String,

    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/thomas.db?mode=rwc".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Overrides the detected node name.
    pub nodename: Option<String>,

    /// Cluster names matched against the node name, first match wins.
    pub known: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodename: None,
            known: vec![
                "thomas".to_string(),
                "michael".to_string(),
                "young".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Number of the last mmm role account that exists upstream.
    pub max_mmm_account: u32,

    pub institutional_domain: String,

    /// Test requests left out of pending listings and automation.
    pub reserved_request_ids: Vec<i32>,

    /// Other databases whose `users` tables share the mmm range.
    pub mmm_user_schemas: Vec<String>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            max_mmm_account: accounts::DEFAULT_MAX_MMM_ACCOUNT,
            institutional_domain: accounts::DEFAULT_INSTITUTIONAL_DOMAIN.to_string(),
            reserved_request_ids: accounts::DEFAULT_RESERVED_REQUEST_IDS.to_vec(),
            mmm_user_schemas: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Account creation executable per cluster.
    pub commands: HashMap<String, String>,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        let commands = [
            ("thomas", "createThomasuser"),
            ("michael", "createMichaeluser"),
            ("young", "createYounguser"),
        ]
        .into_iter()
        .map(|(cluster, command)| (cluster.to_string(), command.to_string()))
        .collect();

        Self { commands }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub from: String,

    pub to: String,

    pub sendmail_path: String,

    /// Clusters whose new requests are announced by email.
    pub clusters: Vec<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            from: "service-management-noreply@ucl.ac.uk".to_string(),
            to: "rc-support@ucl.ac.uk".to_string(),
            sendmail_path: "/usr/sbin/sendmail".to_string(),
            clusters: vec!["thomas".to_string()],
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env();
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV)
            && !url.is_empty()
        {
            self.general.database_url = url;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("thomas.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("thomas").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".thomas").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_url.is_empty() {
            anyhow::bail!("general.database_url cannot be empty");
        }

        if self.accounts.institutional_domain.is_empty() {
            anyhow::bail!("accounts.institutional_domain cannot be empty");
        }

        if self.accounts.max_mmm_account == 0 || self.accounts.max_mmm_account > 9999 {
            anyhow::bail!("accounts.max_mmm_account must be between 1 and 9999");
        }

        if let Some(schema) = self
            .accounts
            .mmm_user_schemas
            .iter()
            .find(|s| s.trim().is_empty())
        {
            anyhow::bail!("accounts.mmm_user_schemas contains an empty name: {schema:?}");
        }

        Ok(())
    }
}
