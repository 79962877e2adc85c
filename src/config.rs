//! Emote provider configuration
//!
//! Every field has a working default pointing at the public provider
//! endpoints; only `host_url` normally needs to be set.

use crate::error::{EmoteError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for all emote providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmoteConfig {
    /// Base URL of the local asset proxy (e.g. `https://example.com`)
    ///
    /// Asset URLs are rewritten to `<host_url>/<provider>-emotes/...`.
    pub host_url: String,

    /// Per-request HTTP timeout in seconds (none by default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// 7TV settings
    pub seven_tv: SevenTvConfig,

    /// BetterTTV settings
    pub bttv: BttvConfig,

    /// FrankerFaceZ settings
    pub ffz: FfzConfig,
}

impl Default for EmoteConfig {
    fn default() -> Self {
        Self {
            host_url: "http://localhost:3000".to_string(),
            request_timeout_secs: None,
            seven_tv: SevenTvConfig::default(),
            bttv: BttvConfig::default(),
            ffz: FfzConfig::default(),
        }
    }
}

impl EmoteConfig {
    /// Create a default configuration with the given proxy host
    pub fn new(host_url: impl Into<String>) -> Self {
        Self {
            host_url: host_url.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON configuration document and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EmoteError::Config(format!("Failed to parse emote config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the providers cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.host_url.trim().is_empty() {
            return Err(EmoteError::Config("hostUrl cannot be empty".to_string()));
        }
        if self.seven_tv.reconnect_delay_secs == 0 {
            return Err(EmoteError::Config(
                "sevenTv.reconnectDelaySecs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// HTTP request timeout, if configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// 7TV REST + EventAPI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SevenTvConfig {
    /// Whether the provider participates in aggregation
    pub enabled: bool,

    /// REST API base
    pub api_url: String,

    /// EventAPI websocket endpoint
    pub events_url: String,

    /// CDN prefix replaced by the local proxy path
    pub cdn_prefix: String,

    /// Fixed delay before reconnecting after an unexpected close
    pub reconnect_delay_secs: u64,
}

impl Default for SevenTvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://7tv.io/v3".to_string(),
            events_url: "wss://events.7tv.io/v3".to_string(),
            cdn_prefix: "//cdn.7tv.app".to_string(),
            reconnect_delay_secs: 10,
        }
    }
}

impl SevenTvConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// BetterTTV REST settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BttvConfig {
    pub enabled: bool,
    pub api_url: String,
}

impl Default for BttvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.betterttv.net/3".to_string(),
        }
    }
}

/// FrankerFaceZ REST settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FfzConfig {
    pub enabled: bool,
    pub api_url: String,
    pub cdn_prefix: String,
}

impl Default for FfzConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.frankerfacez.com/v1".to_string(),
            cdn_prefix: "https://cdn.frankerfacez.com".to_string(),
        }
    }
}
