//! Configuration module for the dataset synchronizer

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub azure: AzureSettings,
    pub openml: OpenmlSettings,
    pub sync: SyncSettings,
    pub log: LogSettings,
}

/// Azure Blob Storage destination
#[derive(Debug, Clone, Deserialize)]
pub struct AzureSettings {
    pub account_name: String,
    pub account_key: String,
    pub container: String,
    /// Custom endpoint (e.g. Azurite); defaults to the public blob endpoint
    pub endpoint: Option<String>,
}

/// OpenML catalog access
#[derive(Debug, Clone, Deserialize)]
pub struct OpenmlSettings {
    pub base_url: String,
    /// Only datasets carrying this tag are synchronized
    pub tag: String,
    pub api_key: Option<String>,
    pub rate_limit_per_minute: u32,
    pub timeout_secs: u64,
}

/// When a dataset counts as already synced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    /// `{id}/metadata.json` is present
    Metadata,
    /// Any blob named `{id}` or under `{id}/` is present
    AnyBlob,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    pub membership: Membership,
    /// Stop the run at the first failed dataset
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub json: bool,
}

impl AzureSettings {
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", self.account_name))
    }
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with OPENML_SYNC_)
    /// 2. config.ini in the working directory (`[Azure]` section)
    /// 3. config/local.toml (gitignored)
    /// 4. config/default.toml
    /// 5. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let builder = Self::with_defaults(Config::builder())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(File::new("config.ini", FileFormat::Ini).required(false))
            // OPENML_SYNC_AZURE__ACCOUNT_KEY, OPENML_SYNC_OPENML__TAG, etc.
            .add_source(
                Environment::with_prefix("OPENML_SYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Settings::default();

        builder
            .set_default("azure.account_name", defaults.azure.account_name)?
            .set_default("azure.account_key", defaults.azure.account_key)?
            .set_default("azure.container", defaults.azure.container)?
            .set_default("openml.base_url", defaults.openml.base_url)?
            .set_default("openml.tag", defaults.openml.tag)?
            .set_default("openml.rate_limit_per_minute", i64::from(defaults.openml.rate_limit_per_minute))?
            .set_default("openml.timeout_secs", defaults.openml.timeout_secs as i64)?
            .set_default("sync.membership", "metadata")?
            .set_default("sync.fail_fast", defaults.sync.fail_fast)?
            .set_default("log.json", defaults.log.json)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            azure: AzureSettings {
                account_name: String::new(),
                account_key: String::new(),
                container: "openml".to_string(),
                endpoint: None,
            },
            openml: OpenmlSettings {
                base_url: "https://www.openml.org/api/v1/json".to_string(),
                tag: "AzurePilot".to_string(),
                api_key: None,
                rate_limit_per_minute: 60,
                timeout_secs: 300,
            },
            sync: SyncSettings {
                membership: Membership::Metadata,
                fail_fast: false,
            },
            log: LogSettings { json: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize() {
        let settings: Settings = Settings::with_defaults(Config::builder())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.azure.container, "openml");
        assert_eq!(settings.openml.tag, "AzurePilot");
        assert_eq!(settings.sync.membership, Membership::Metadata);
        assert!(!settings.sync.fail_fast);
        assert!(settings.openml.api_key.is_none());
    }

    #[test]
    fn test_ini_azure_section() {
        let ini = "[Azure]\naccount_name = myaccount\naccount_key = c2VjcmV0\n";
        let settings: Settings = Settings::with_defaults(Config::builder())
            .unwrap()
            .add_source(File::from_str(ini, FileFormat::Ini))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.azure.account_name, "myaccount");
        assert_eq!(settings.azure.account_key, "c2VjcmV0");
        assert_eq!(
            settings.azure.endpoint(),
            "https://myaccount.blob.core.windows.net"
        );
    }

    #[test]
    fn test_membership_override() {
        let toml = "[sync]\nmembership = \"any_blob\"\nfail_fast = true\n";
        let settings: Settings = Settings::with_defaults(Config::builder())
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.sync.membership, Membership::AnyBlob);
        assert!(settings.sync.fail_fast);
    }
}
