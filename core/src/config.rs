//! Service configuration.
//!
//! Loaded from a JSON file (`MIDDLEMAN_CONFIG`, default `config.json`) with a
//! few environment overrides, then validated once at startup.

use crate::ids::{ChannelId, GuildId, RoleId};
use crate::model::LeaderboardKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "MIDDLEMAN_CONFIG";
/// Environment variable overriding the registry data file.
pub const DATA_PATH_VAR: &str = "MIDDLEMAN_DATA";
/// Environment variable overriding the metrics listen address.
pub const METRICS_ADDR_VAR: &str = "MIDDLEMAN_METRICS_ADDR";

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for [`BotConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The values are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One trade-value tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    /// Stable key stored in ticket records.
    pub key: String,
    /// Human name shown in menus; its first word prefixes thread names.
    pub name: String,
    /// Value carried by the select menu and component ids.
    pub value: String,
    /// Role keys (into [`BotConfig::roles`]) pinged on new tickets.
    #[serde(default)]
    pub ping_roles: Vec<String>,
}

impl TierConfig {
    /// Word used at the front of ticket thread names.
    #[must_use]
    pub fn thread_word(&self) -> &str {
        self.name.split(' ').next().filter(|w| !w.is_empty()).unwrap_or("MM")
    }
}

/// Time budgets for the open-ticket check, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorBudgets {
    /// Panel button.
    pub default_ms: u64,
    /// Tier select, form open and counterparty check.
    pub request_ms: u64,
    /// Form submission, requester check.
    pub submit_ms: u64,
}

impl Default for DetectorBudgets {
    fn default() -> Self {
        Self {
            default_ms: 2000,
            request_ms: 1000,
            submit_ms: 1500,
        }
    }
}

impl DetectorBudgets {
    /// Panel-button budget.
    #[must_use]
    pub const fn default_budget(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    /// Intermediate request-step budget.
    #[must_use]
    pub const fn request_budget(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    /// Submission budget.
    #[must_use]
    pub const fn submit_budget(&self) -> Duration {
        Duration::from_millis(self.submit_ms)
    }
}

fn default_viewer_url() -> String {
    "https://d4l.info/chat-exporter?url=".to_string()
}

const fn default_delete_delay_ms() -> u64 {
    2000
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/db.json")
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// The guild this instance serves.
    pub guild_id: GuildId,

    /// Named roles, referenced by tier ping lists.
    #[serde(default)]
    pub roles: HashMap<String, RoleId>,

    /// Roles that count as middleman staff.
    #[serde(default)]
    pub staff_roles: Vec<RoleId>,

    /// Trade tiers in menu order.
    pub mm_tiers: Vec<TierConfig>,

    /// Where transcripts are archived.
    #[serde(default)]
    pub transcript_log_channel_id: Option<ChannelId>,

    /// Moderation log, also receives feedback notifications.
    #[serde(default)]
    pub server_mod_log_channel_id: Option<ChannelId>,

    /// Middleman leaderboard display. Unset disables middleman refreshes.
    #[serde(default)]
    pub leaderboard_channel_id: Option<ChannelId>,

    /// Trader leaderboard display. Unset disables trader refreshes.
    #[serde(default)]
    pub trader_leaderboard_channel_id: Option<ChannelId>,

    /// Prefix of the transcript viewer link; the attachment URL is appended.
    #[serde(default = "default_viewer_url")]
    pub transcript_viewer_url: String,

    /// Open-ticket check budgets.
    #[serde(default)]
    pub detector: DetectorBudgets,

    /// Pause between confirming and deleting a thread.
    #[serde(default = "default_delete_delay_ms")]
    pub delete_delay_ms: u64,

    /// Registry data file.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Prometheus listen address, e.g. `0.0.0.0:9090`.
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

impl BotConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the JSON is malformed or inconsistent.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable, malformed or inconsistent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Load from `MIDDLEMAN_CONFIG` (default `config.json`) and apply the
    /// `MIDDLEMAN_DATA` and `MIDDLEMAN_METRICS_ADDR` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.json".to_string());
        let mut config = Self::load(path)?;
        if let Ok(data) = env::var(DATA_PATH_VAR) {
            config.data_path = PathBuf::from(data);
        }
        if let Ok(addr) = env::var(METRICS_ADDR_VAR) {
            config.metrics_addr = Some(addr);
        }
        Ok(config)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on an empty tier list, duplicate tier
    /// keys or values, or a ping role key missing from `roles`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mm_tiers.is_empty() {
            return Err(ConfigError::Invalid("mmTiers must not be empty".into()));
        }
        let mut keys = HashSet::new();
        let mut values = HashSet::new();
        for tier in &self.mm_tiers {
            if !keys.insert(tier.key.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate tier key '{}'", tier.key)));
            }
            if !values.insert(tier.value.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate tier value '{}'",
                    tier.value
                )));
            }
            if let Some(missing) = tier.ping_roles.iter().find(|k| !self.roles.contains_key(*k)) {
                return Err(ConfigError::Invalid(format!(
                    "tier '{}' pings unknown role key '{missing}'",
                    tier.key
                )));
            }
        }
        Ok(())
    }

    /// Tier by its menu value.
    #[must_use]
    pub fn tier_by_value(&self, value: &str) -> Option<&TierConfig> {
        self.mm_tiers.iter().find(|t| t.value == value)
    }

    /// Display channel of a leaderboard, if configured.
    #[must_use]
    pub const fn leaderboard_channel(&self, kind: LeaderboardKind) -> Option<ChannelId> {
        match kind {
            LeaderboardKind::Middleman => self.leaderboard_channel_id,
            LeaderboardKind::Trader => self.trader_leaderboard_channel_id,
        }
    }

    /// Role mentions and keys pinged for a tier. Unknown keys are skipped.
    #[must_use]
    pub fn ping_roles(&self, tier: &TierConfig) -> (Vec<RoleId>, Vec<String>) {
        tier.ping_roles
            .iter()
            .filter_map(|key| self.roles.get(key).map(|role| (*role, key.clone())))
            .unzip()
    }

    /// Pause before a confirmed thread deletion.
    #[must_use]
    pub const fn delete_delay(&self) -> Duration {
        Duration::from_millis(self.delete_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "guildId": "100",
        "roles": { "mm": "500", "seniorMm": "501" },
        "staffRoles": ["500", "501"],
        "mmTiers": [
            { "key": "low", "name": "Small trades (<$50)", "value": "tier_low", "pingRoles": ["mm"] },
            { "key": "high", "name": "Large trades", "value": "tier_high", "pingRoles": ["mm", "seniorMm"] }
        ],
        "transcriptLogChannelId": "700"
    }"#;

    #[test]
    fn defaults_fill_optional_sections() {
        let config = BotConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.detector, DetectorBudgets::default());
        assert_eq!(config.delete_delay(), Duration::from_secs(2));
        assert_eq!(config.transcript_viewer_url, "https://d4l.info/chat-exporter?url=");
        assert_eq!(config.server_mod_log_channel_id, None);
        assert_eq!(config.tier_by_value("tier_high").unwrap().key, "high");
    }

    #[test]
    fn ping_roles_resolve_in_order() {
        let config = BotConfig::from_json(SAMPLE).unwrap();
        let (roles, keys) = config.ping_roles(config.tier_by_value("tier_high").unwrap());
        assert_eq!(roles, vec![RoleId::new(500), RoleId::new(501)]);
        assert_eq!(keys, vec!["mm".to_string(), "seniorMm".to_string()]);
    }

    #[test]
    fn leaderboard_channels_are_per_kind() {
        let mut config = BotConfig::from_json(SAMPLE).unwrap();
        config.leaderboard_channel_id = None;
        config.trader_leaderboard_channel_id = Some(ChannelId::new(703));
        assert_eq!(config.leaderboard_channel(LeaderboardKind::Middleman), None);
        assert_eq!(
            config.leaderboard_channel(LeaderboardKind::Trader),
            Some(ChannelId::new(703))
        );
    }

    #[test]
    fn thread_word_is_first_word_of_name() {
        let config = BotConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.mm_tiers[0].thread_word(), "Small");
    }

    #[test]
    fn duplicate_tier_values_are_rejected() {
        let json = SAMPLE.replace("tier_high", "tier_low");
        assert!(matches!(BotConfig::from_json(&json), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_ping_role_is_rejected() {
        let json = SAMPLE.replace("\"seniorMm\"]", "\"ghost\"]");
        let err = BotConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = BotConfig::load(file.path()).unwrap();
        assert_eq!(config.guild_id, GuildId::new(100));
    }
}
