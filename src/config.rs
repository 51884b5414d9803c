use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::local::QuotaLimits;
use crate::drafts::DRAFT_FILE;
use crate::package::UpgradePrice;

/// File holding saved invitations within the state directory
pub const INVITATIONS_FILE: &str = "invitations.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub drafts: DraftsConfig,
    #[serde(default)]
    pub packages: PackagesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for the draft slot, saved invitations and logs
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftsConfig {
    /// Hours a draft stays recoverable (default: 24)
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: u64,
    /// Quiet period in ms before a change is written (default: 400)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_freshness_hours() -> u64 {
    24
}

fn default_debounce_ms() -> u64 {
    400
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            freshness_hours: default_freshness_hours(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagesConfig {
    /// Invitations a basic account may own
    #[serde(default = "default_basic_quota")]
    pub basic_quota: usize,
    /// Invitations a gold account may own
    #[serde(default = "default_gold_quota")]
    pub gold_quota: usize,
    #[serde(default = "default_gold_price_cents")]
    pub gold_price_cents: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_basic_quota() -> usize {
    1
}

fn default_gold_quota() -> usize {
    25
}

fn default_gold_price_cents() -> u64 {
    4900
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            basic_quota: default_basic_quota(),
            gold_quota: default_gold_quota(),
            gold_price_cents: default_gold_price_cents(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write logs to a file under the state directory instead of stderr
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(".invite-wizard/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Embedded defaults so the wizard works without any config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // User config in ~/.config/invite-wizard/
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("invite-wizard").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("INVITE_WIZARD")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Surface out-of-range values at startup rather than on first use
        config.freshness()?;
        Ok(config)
    }

    /// Save config to .invite-wizard/config.toml
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::local_config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }

    pub fn draft_path(&self) -> PathBuf {
        self.state_path().join(DRAFT_FILE)
    }

    pub fn invitations_path(&self) -> PathBuf {
        self.state_path().join(INVITATIONS_FILE)
    }

    /// How long drafts stay recoverable
    pub fn freshness(&self) -> Result<chrono::Duration> {
        let hours = self.drafts.freshness_hours;
        i64::try_from(hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .with_context(|| format!("drafts.freshness_hours = {} is out of range", hours))
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.drafts.debounce_ms)
    }

    pub fn quota_limits(&self) -> QuotaLimits {
        QuotaLimits {
            basic: self.packages.basic_quota,
            gold: self.packages.gold_quota,
        }
    }

    pub fn upgrade_price(&self) -> UpgradePrice {
        UpgradePrice {
            amount_cents: self.packages.gold_price_cents,
            currency: self.packages.currency.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                state: ".invite-wizard".to_string(), // Relative to cwd
            },
            drafts: DraftsConfig::default(),
            packages: PackagesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageTier;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.paths.state, ".invite-wizard");
        assert_eq!(config.freshness().unwrap(), chrono::Duration::hours(24));
        assert_eq!(config.debounce_window(), Duration::from_millis(400));
        assert_eq!(config.quota_limits().for_tier(PackageTier::Basic), 1);
        assert_eq!(config.quota_limits().for_tier(PackageTier::Gold), 25);
        assert_eq!(config.upgrade_price(), UpgradePrice::default());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.to_file);
    }

    #[test]
    fn test_state_paths_absolute() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();

        assert_eq!(config.state_path(), temp_dir.path());
        assert_eq!(config.draft_path(), temp_dir.path().join("draft.json"));
        assert_eq!(
            config.invitations_path(),
            temp_dir.path().join("invitations.json")
        );
        assert!(config.logs_path().ends_with("logs"));
    }

    #[test]
    fn test_relative_state_resolves_against_cwd() {
        let config = Config::default();
        assert!(config.state_path().is_absolute());
        assert!(config.state_path().ends_with(".invite-wizard"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wizard.toml");
        std::fs::write(
            &path,
            "[paths]\nstate = \"/tmp/wizard-state\"\n\n[drafts]\nfreshness_hours = 2\n",
        )
        .unwrap();

        let config = Config::load(Some(path.to_str().unwrap())).unwrap();

        assert_eq!(config.paths.state, "/tmp/wizard-state");
        assert_eq!(config.drafts.freshness_hours, 2);
        // Untouched keys keep their defaults
        assert_eq!(config.drafts.debounce_ms, 400);
        assert_eq!(config.packages.gold_price_cents, 4900);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: Config = toml::from_str("[paths]\nstate = \"s\"\n[packages]\nbasic_quota = 3\n")
            .unwrap();
        assert_eq!(config.packages.basic_quota, 3);
        assert_eq!(config.packages.gold_quota, 25);
        assert_eq!(config.packages.currency, "USD");
        assert_eq!(config.drafts.freshness_hours, 24);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.packages.currency = "EUR".to_string();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.packages.currency, "EUR");
        assert_eq!(parsed.paths.state, config.paths.state);
    }

    #[test]
    fn test_freshness_out_of_range_is_an_error() {
        let mut config = Config::default();

        config.drafts.freshness_hours = u64::MAX;
        assert!(config.freshness().is_err());

        // Fits in i64 but not in a chrono duration
        config.drafts.freshness_hours = i64::MAX as u64;
        assert!(config.freshness().is_err());

        config.drafts.freshness_hours = 0;
        assert_eq!(config.freshness().unwrap(), chrono::Duration::zero());
    }

    #[test]
    fn test_load_rejects_out_of_range_freshness() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wizard.toml");
        std::fs::write(&path, "[drafts]\nfreshness_hours = 9223372036854775807\n").unwrap();

        assert!(Config::load(Some(path.to_str().unwrap())).is_err());
    }

    #[test]
    fn test_save_to_writes_loadable_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.packages.gold_quota = 40;
        config.logging.to_file = true;

        config.save_to(&path).unwrap();
        let loaded = Config::load(Some(path.to_str().unwrap())).unwrap();

        assert_eq!(loaded.packages.gold_quota, 40);
        assert!(loaded.logging.to_file);
    }
}
