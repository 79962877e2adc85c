//! 7TV full-snapshot fetch

use super::messages::{GlobalSetResponse, SevenTvEmote, UserResponse};
use super::PROXY_SEGMENT;
use crate::config::SevenTvConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::provider::{decode, rewrite_asset_url, CatalogFetcher};
use crate::types::{Catalog, EmoteSnapshot, SubscriptionIdentity};
use async_trait::async_trait;
use std::sync::Arc;

/// Fetches a user's 7TV emote set together with the global set
pub struct SevenTvFetcher {
    http: Arc<dyn HttpClient>,
    config: SevenTvConfig,
    host_url: String,
}

impl SevenTvFetcher {
    pub fn new(
        http: Arc<dyn HttpClient>,
        config: SevenTvConfig,
        host_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            config,
            host_url: host_url.into(),
        }
    }

    pub fn config(&self) -> &SevenTvConfig {
        &self.config
    }

    /// Catalog entry for an emote, with its asset moved behind the proxy
    pub fn normalize(&self, emote: &SevenTvEmote) -> (String, String) {
        let url = rewrite_asset_url(
            &emote.asset_url(),
            &self.config.cdn_prefix,
            &self.host_url,
            PROXY_SEGMENT,
        );
        (emote.name.clone(), url)
    }

    /// User endpoint with a cache-busting timestamp
    fn user_url(&self, platform_user_id: &str) -> String {
        format!(
            "{}/users/twitch/{}?t={}",
            self.api_base(),
            platform_user_id,
            chrono::Utc::now().timestamp_millis()
        )
    }

    fn global_url(&self) -> String {
        format!("{}/emote-sets/global", self.api_base())
    }

    fn api_base(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }
}

#[async_trait]
impl CatalogFetcher for SevenTvFetcher {
    fn name(&self) -> &str {
        "7tv"
    }

    async fn try_fetch(&self, platform_user_id: &str) -> Result<EmoteSnapshot> {
        let user_url = self.user_url(platform_user_id);
        let global_url = self.global_url();

        let (user_body, global_body) = futures::try_join!(
            self.http.get_json(&user_url),
            self.http.get_json(&global_url)
        )?;

        let user: UserResponse = decode("7tv user", user_body)?;
        let global: GlobalSetResponse = decode("7tv global set", global_body)?;

        // Global first so the user's own set wins on name collisions
        let catalog = Catalog::from_entries(
            global
                .emotes
                .iter()
                .chain(user.emote_set.emotes.iter())
                .map(|emote| self.normalize(emote)),
        );

        let identity = SubscriptionIdentity::new(user.user.id, user.emote_set.id);
        Ok(EmoteSnapshot::new(catalog).with_identity(identity))
    }
}
