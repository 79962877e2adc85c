//! BetterTTV catalog fetcher
//!
//! One request per user: the cached Twitch user endpoint returns both the
//! channel's own emotes and the shared emotes it has enabled.

use super::{decode, CatalogFetcher, StaticProvider};
use crate::config::BttvConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::types::{Catalog, EmoteSnapshot};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Proxy path segment for BTTV assets
pub const PROXY_SEGMENT: &str = "bttv-emotes";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BttvUser {
    #[allow(dead_code)]
    id: String,
    shared_emotes: Vec<BttvEmote>,
    channel_emotes: Vec<BttvEmote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BttvEmote {
    id: String,
    code: String,
    image_type: String,
    #[allow(dead_code)]
    animated: bool,
}

/// Fetches a user's BTTV emotes
pub struct BttvFetcher {
    http: Arc<dyn HttpClient>,
    config: BttvConfig,
    host_url: String,
}

impl BttvFetcher {
    pub fn new(http: Arc<dyn HttpClient>, config: BttvConfig, host_url: impl Into<String>) -> Self {
        Self {
            http,
            config,
            host_url: host_url.into(),
        }
    }

    /// Wrap into a snapshot-only provider
    pub fn into_provider(self) -> StaticProvider<Self> {
        StaticProvider::new(self)
    }

    fn user_url(&self, platform_user_id: &str) -> String {
        format!(
            "{}/cached/users/twitch/{}",
            self.config.api_url.trim_end_matches('/'),
            platform_user_id
        )
    }

    fn asset_url(&self, emote: &BttvEmote) -> String {
        format!(
            "{}/{}/emote/{}/3x.{}",
            self.host_url.trim_end_matches('/'),
            PROXY_SEGMENT,
            emote.id,
            emote.image_type
        )
    }
}

#[async_trait]
impl CatalogFetcher for BttvFetcher {
    fn name(&self) -> &str {
        "bttv"
    }

    async fn try_fetch(&self, platform_user_id: &str) -> Result<EmoteSnapshot> {
        let body = self.http.get_json(&self.user_url(platform_user_id)).await?;
        let user: BttvUser = decode("bttv user", body)?;

        // Channel emotes merge last so they win over shared ones
        let catalog = Catalog::from_entries(
            user.shared_emotes
                .iter()
                .chain(user.channel_emotes.iter())
                .map(|emote| (emote.code.clone(), self.asset_url(emote))),
        );

        Ok(EmoteSnapshot::new(catalog))
    }
}
