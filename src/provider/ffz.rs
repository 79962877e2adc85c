//! FrankerFaceZ catalog fetcher

use super::{decode, rewrite_asset_url, CatalogFetcher, StaticProvider};
use crate::config::FfzConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::types::{Catalog, EmoteSnapshot};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Proxy path segment for FFZ assets
pub const PROXY_SEGMENT: &str = "ffz-emotes";

#[derive(Debug, Deserialize)]
struct FfzRoom {
    /// Set id → set; numeric keys so later sets win by ascending id
    sets: BTreeMap<u64, FfzSet>,
}

#[derive(Debug, Deserialize)]
struct FfzSet {
    emoticons: Vec<FfzEmote>,
}

#[derive(Debug, Deserialize)]
struct FfzEmote {
    #[allow(dead_code)]
    id: u64,
    name: String,
    urls: FfzUrls,
}

#[derive(Debug, Deserialize)]
struct FfzUrls {
    #[serde(rename = "1")]
    x1: String,
    #[serde(rename = "2", default)]
    x2: Option<String>,
    #[serde(rename = "4", default)]
    x4: Option<String>,
}

impl FfzUrls {
    /// Highest resolution available
    fn best(&self) -> &str {
        self.x4
            .as_deref()
            .or(self.x2.as_deref())
            .unwrap_or(self.x1.as_str())
    }
}

/// Fetches the emote sets of a user's FFZ room
pub struct FfzFetcher {
    http: Arc<dyn HttpClient>,
    config: FfzConfig,
    host_url: String,
}

impl FfzFetcher {
    pub fn new(http: Arc<dyn HttpClient>, config: FfzConfig, host_url: impl Into<String>) -> Self {
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

    fn room_url(&self, platform_user_id: &str) -> String {
        format!(
            "{}/room/id/{}",
            self.config.api_url.trim_end_matches('/'),
            platform_user_id
        )
    }
}

#[async_trait]
impl CatalogFetcher for FfzFetcher {
    fn name(&self) -> &str {
        "ffz"
    }

    async fn try_fetch(&self, platform_user_id: &str) -> Result<EmoteSnapshot> {
        let body = self.http.get_json(&self.room_url(platform_user_id)).await?;
        let room: FfzRoom = decode("ffz room", body)?;

        let catalog = Catalog::from_entries(
            room.sets
                .values()
                .flat_map(|set| set.emoticons.iter())
                .map(|emote| {
                    let url = rewrite_asset_url(
                        emote.urls.best(),
                        &self.config.cdn_prefix,
                        &self.host_url,
                        PROXY_SEGMENT,
                    );
                    (emote.name.clone(), url)
                }),
        );

        Ok(EmoteSnapshot::new(catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::FakeHttp;
    use serde_json::json;

    fn room_body() -> serde_json::Value {
        json!({
            "room": {"id": "forsen", "set": 1234},
            "sets": {
                "1234": {
                    "id": 1234,
                    "emoticons": [
                        {
                            "id": 1,
                            "name": "ZrehplaR",
                            "urls": {
                                "1": "https://cdn.frankerfacez.com/emote/1/1",
                                "2": "https://cdn.frankerfacez.com/emote/1/2",
                                "4": "https://cdn.frankerfacez.com/emote/1/4"
                            }
                        },
                        {
                            "id": 2,
                            "name": "LilZ",
                            "urls": {
                                "1": "https://cdn.frankerfacez.com/emote/2/1",
                                "2": "https://cdn.frankerfacez.com/emote/2/2"
                            }
                        },
                        {
                            "id": 3,
                            "name": "OMEGALUL",
                            "urls": {"1": "https://cdn.frankerfacez.com/emote/3/1"}
                        }
                    ]
                }
            }
        })
    }

    fn fetcher(http: Arc<FakeHttp>) -> FfzFetcher {
        FfzFetcher::new(http, FfzConfig::default(), "https://host")
    }

    #[tokio::test]
    async fn test_fetch_picks_highest_resolution() {
        let http = Arc::new(FakeHttp::new());
        http.respond("https://api.frankerfacez.com/v1/room/id/22484632", room_body());

        let catalog = fetcher(http).fetch("22484632").await.unwrap().catalog;

        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.get("ZrehplaR"),
            Some("https://host/ffz-emotes/emote/1/4")
        );
        assert_eq!(catalog.get("LilZ"), Some("https://host/ffz-emotes/emote/2/2"));
        assert_eq!(
            catalog.get("OMEGALUL"),
            Some("https://host/ffz-emotes/emote/3/1")
        );
    }

    #[tokio::test]
    async fn test_fetch_merges_sets_in_id_order() {
        let http = Arc::new(FakeHttp::new());
        http.respond(
            "https://api.frankerfacez.com",
            json!({
                "sets": {
                    "2": {"emoticons": [{"id": 9, "name": "Dup", "urls": {"1": "https://cdn.frankerfacez.com/b"}}]},
                    "1": {"emoticons": [{"id": 8, "name": "Dup", "urls": {"1": "https://cdn.frankerfacez.com/a"}}]}
                }
            }),
        );

        let catalog = fetcher(http).fetch("1").await.unwrap().catalog;
        assert_eq!(catalog.get("Dup"), Some("https://host/ffz-emotes/b"));
    }

    #[tokio::test]
    async fn test_fetch_orders_sets_numerically() {
        let http = Arc::new(FakeHttp::new());
        http.respond(
            "https://api.frankerfacez.com",
            json!({
                "sets": {
                    "9": {"emoticons": [{"id": 1, "name": "Dup", "urls": {"1": "https://cdn.frankerfacez.com/nine"}}]},
                    "10": {"emoticons": [{"id": 2, "name": "Dup", "urls": {"1": "https://cdn.frankerfacez.com/ten"}}]}
                }
            }),
        );

        let catalog = fetcher(http).fetch("1").await.unwrap().catalog;
        assert_eq!(catalog.get("Dup"), Some("https://host/ffz-emotes/ten"));
    }

    #[tokio::test]
    async fn test_fetch_non_numeric_set_id_is_absent() {
        let http = Arc::new(FakeHttp::new());
        http.respond(
            "https://api.frankerfacez.com",
            json!({"sets": {"global": {"emoticons": []}}}),
        );
        assert!(fetcher(http).fetch("1").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_missing_base_url_is_absent() {
        let http = Arc::new(FakeHttp::new());
        http.respond(
            "https://api.frankerfacez.com",
            json!({"sets": {"1": {"emoticons": [{"id": 1, "name": "X", "urls": {"2": "u"}}]}}}),
        );
        assert!(fetcher(http).fetch("1").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_without_sets_is_empty() {
        let http = Arc::new(FakeHttp::new());
        http.respond("https://api.frankerfacez.com", json!({"sets": {}}));
        let snapshot = fetcher(http).fetch("1").await.unwrap();
        assert!(snapshot.catalog.is_empty());
    }
}
