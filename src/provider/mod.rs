//! Emote provider traits — the core abstraction for catalog sources
//!
//! Each third-party catalog (7TV, BetterTTV, FrankerFaceZ) implements
//! `CatalogFetcher` for its REST snapshot and is exposed through an
//! `EmoteProvider` that hands out per-user `EmoteClient` handles.

use crate::error::{EmoteError, Result};
use crate::types::{Catalog, Emote, EmoteSnapshot};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub mod bttv;
pub mod ffz;
pub mod seventv;

/// Per-user handle over one or more catalogs
///
/// None of the methods fail: a provider that cannot reach its upstream
/// simply resolves nothing until it recovers.
#[async_trait]
pub trait EmoteClient: Send + Sync {
    /// Start live synchronization (no-op for snapshot-only providers)
    async fn connect(&self);

    /// Stop live synchronization permanently; safe to call repeatedly
    async fn disconnect(&self);

    /// Resolve the emotes used in a chat message, in token order
    fn get_emotes(&self, text: &str) -> Vec<Emote>;
}

/// Factory for per-user emote clients
#[async_trait]
pub trait EmoteProvider: Send + Sync {
    /// Provider name used in logs (e.g., "7tv", "bttv", "ffz")
    fn name(&self) -> &str;

    /// Build a client for a platform user
    ///
    /// Never fails; a failed initial fetch yields an empty catalog.
    async fn create_client(&self, platform_user_id: &str) -> Box<dyn EmoteClient>;
}

/// Full-snapshot fetch for one provider
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Fetch, validate, and normalize the provider's catalog for a user
    async fn try_fetch(&self, platform_user_id: &str) -> Result<EmoteSnapshot>;

    /// Fetch boundary: any failure is logged and reported as absent
    async fn fetch(&self, platform_user_id: &str) -> Option<EmoteSnapshot> {
        match self.try_fetch(platform_user_id).await {
            Ok(snapshot) => {
                tracing::debug!(
                    provider = self.name(),
                    user_id = platform_user_id,
                    emotes = snapshot.catalog.len(),
                    "Emote catalog fetched"
                );
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.name(),
                    user_id = platform_user_id,
                    error = %e,
                    "Failed to fetch emote catalog"
                );
                None
            }
        }
    }
}

/// Client over a catalog fetched once at creation time
pub struct StaticEmoteClient {
    catalog: Catalog,
}

impl StaticEmoteClient {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[async_trait]
impl EmoteClient for StaticEmoteClient {
    async fn connect(&self) {}

    async fn disconnect(&self) {}

    fn get_emotes(&self, text: &str) -> Vec<Emote> {
        self.catalog.lookup(text)
    }
}

/// Provider for catalogs without a push channel
///
/// Fetches once in `create_client` and serves that snapshot for the
/// lifetime of the client.
pub struct StaticProvider<F> {
    fetcher: Arc<F>,
}

impl<F: CatalogFetcher + 'static> StaticProvider<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

#[async_trait]
impl<F: CatalogFetcher + 'static> EmoteProvider for StaticProvider<F> {
    fn name(&self) -> &str {
        self.fetcher.name()
    }

    async fn create_client(&self, platform_user_id: &str) -> Box<dyn EmoteClient> {
        let catalog = self
            .fetcher
            .fetch(platform_user_id)
            .await
            .map(|snapshot| snapshot.catalog)
            .unwrap_or_default();

        Box::new(StaticEmoteClient::new(catalog))
    }
}

/// Rewrite a provider CDN URL onto the local proxy
///
/// `cdn_prefix` may be given with a scheme (`https://cdn.example.com`),
/// protocol-relative (`//cdn.example.com`) or bare (`cdn.example.com`); the
/// URL's own scheme is ignored when matching. The matched prefix is replaced
/// with `<proxy_base>/<segment>` and the remaining path kept as-is. URLs on
/// other hosts are returned unchanged.
pub fn rewrite_asset_url(url: &str, cdn_prefix: &str, proxy_base: &str, segment: &str) -> String {
    let host = strip_scheme(cdn_prefix).trim_start_matches("//");
    let rest = strip_scheme(url)
        .strip_prefix("//")
        .and_then(|u| u.strip_prefix(host))
        .filter(|rest| rest.is_empty() || rest.starts_with('/'));

    match rest {
        Some(path) if !host.is_empty() => {
            format!("{}/{}{}", proxy_base.trim_end_matches('/'), segment, path)
        }
        _ => url.to_string(),
    }
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https:")
        .or_else(|| url.strip_prefix("http:"))
        .unwrap_or(url)
}

/// Decode an untyped JSON body into a strict schema
pub(crate) fn decode<T: DeserializeOwned>(payload: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| EmoteError::schema(payload, e))
}


#[cfg(test)]
mod tests {
    use super::*;

    struct FixedFetcher(Option<Catalog>);

    #[async_trait]
    impl CatalogFetcher for FixedFetcher {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn try_fetch(&self, _platform_user_id: &str) -> Result<EmoteSnapshot> {
            self.0
                .clone()
                .map(EmoteSnapshot::new)
                .ok_or_else(|| EmoteError::schema("fixed", "no data"))
        }
    }

    #[test]
    fn test_rewrite_scheme_url() {
        let url = rewrite_asset_url(
            "https://cdn.example.com/emote/123/4x.png",
            "https://cdn.example.com",
            "https://host",
            "example-emotes",
        );
        assert_eq!(url, "https://host/example-emotes/emote/123/4x.png");
    }

    #[test]
    fn test_rewrite_protocol_relative() {
        let url = rewrite_asset_url(
            "//cdn.7tv.app/emote/01ABC/4x.gif",
            "//cdn.7tv.app",
            "https://host/",
            "7tv-emotes",
        );
        assert_eq!(url, "https://host/7tv-emotes/emote/01ABC/4x.gif");
    }

    #[test]
    fn test_rewrite_bare_prefix_matches_any_scheme() {
        let url = rewrite_asset_url(
            "http://cdn.frankerfacez.com/emote/1/4",
            "cdn.frankerfacez.com",
            "https://host",
            "ffz-emotes",
        );
        assert_eq!(url, "https://host/ffz-emotes/emote/1/4");
    }

    #[test]
    fn test_rewrite_other_host_unchanged() {
        let url = "https://elsewhere.example.com/emote/1.png";
        assert_eq!(
            rewrite_asset_url(url, "https://cdn.example.com", "https://host", "x-emotes"),
            url
        );
    }

    #[test]
    fn test_rewrite_requires_host_boundary() {
        let url = "https://cdn.example.com.evil.net/emote/1.png";
        assert_eq!(
            rewrite_asset_url(url, "https://cdn.example.com", "https://host", "x-emotes"),
            url
        );
    }

    #[tokio::test]
    async fn test_static_provider_serves_snapshot() {
        let provider = StaticProvider::new(FixedFetcher(Some(Catalog::from_entries([(
            "Kappa", "u",
        )]))));
        let client = provider.create_client("42").await;

        client.connect().await;
        assert_eq!(client.get_emotes("Kappa Kappa").len(), 2);
        client.disconnect().await;
        client.disconnect().await;
        assert_eq!(client.get_emotes("Kappa").len(), 1);
    }

    #[tokio::test]
    async fn test_static_provider_failed_fetch_is_empty() {
        let provider = StaticProvider::new(FixedFetcher(None));
        let client = provider.create_client("42").await;
        assert!(client.get_emotes("Kappa").is_empty());
        assert_eq!(provider.name(), "fixed");
    }

    #[test]
    fn test_decode_reports_payload_name() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Shape {
            id: String,
        }

        let err = decode::<Shape>("shape", serde_json::json!({"id": 5})).unwrap_err();
        assert!(matches!(err, EmoteError::SchemaMismatch { ref payload, .. } if payload == "shape"));
    }
}
