//! Aggregation over every configured emote provider
//!
//! `EmoteService` owns the provider list; `AggregateClient` fans the
//! `EmoteClient` calls out to one client per provider and concatenates
//! lookups in provider order.

use crate::config::EmoteConfig;
use crate::error::Result;
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::provider::bttv::BttvFetcher;
use crate::provider::ffz::FfzFetcher;
use crate::provider::seventv::{EventTransport, SevenTvFetcher, SevenTvProvider, WsTransport};
use crate::provider::{EmoteClient, EmoteProvider};
use crate::types::Emote;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

/// Entry point: builds per-user clients across all providers
pub struct EmoteService {
    providers: Vec<Arc<dyn EmoteProvider>>,
}

impl EmoteService {
    /// Create a service over an explicit provider list
    ///
    /// Lookup results follow the order of `providers`.
    pub fn new(providers: Vec<Arc<dyn EmoteProvider>>) -> Self {
        Self { providers }
    }

    /// Wire the enabled default providers with production transports
    pub fn from_config(config: EmoteConfig) -> Result<Self> {
        config.validate()?;
        let http = Arc::new(ReqwestHttpClient::new(config.request_timeout())?);
        Self::with_transports(config, http, Arc::new(WsTransport::new()))
    }

    /// Wire the enabled default providers over the given transports
    ///
    /// Order is 7TV, BetterTTV, FrankerFaceZ.
    pub fn with_transports(
        config: EmoteConfig,
        http: Arc<dyn HttpClient>,
        events: Arc<dyn EventTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let mut providers: Vec<Arc<dyn EmoteProvider>> = Vec::new();
        if config.seven_tv.enabled {
            let fetcher = SevenTvFetcher::new(http.clone(), config.seven_tv, &config.host_url);
            providers.push(Arc::new(SevenTvProvider::new(fetcher, events)));
        }
        if config.bttv.enabled {
            let fetcher = BttvFetcher::new(http.clone(), config.bttv, &config.host_url);
            providers.push(Arc::new(fetcher.into_provider()));
        }
        if config.ffz.enabled {
            let fetcher = FfzFetcher::new(http, config.ffz, &config.host_url);
            providers.push(Arc::new(fetcher.into_provider()));
        }

        tracing::debug!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Emote service configured"
        );

        Ok(Self::new(providers))
    }

    /// Names of the configured providers, in lookup order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Build one client per provider for a platform user
    ///
    /// Providers are created concurrently. Creation never fails; a
    /// provider whose initial fetch failed contributes an empty catalog.
    pub async fn create_client(&self, platform_user_id: &str) -> AggregateClient {
        let clients = join_all(
            self.providers
                .iter()
                .map(|provider| provider.create_client(platform_user_id)),
        )
        .await;

        AggregateClient {
            clients: self
                .providers
                .iter()
                .map(|p| p.name().to_string())
                .zip(clients)
                .collect(),
        }
    }
}

/// One user's clients across all providers
pub struct AggregateClient {
    clients: Vec<(String, Box<dyn EmoteClient>)>,
}

impl AggregateClient {
    /// Provider names, in lookup order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.clients.iter().map(|(name, _)| name.as_str())
    }
}

#[async_trait]
impl EmoteClient for AggregateClient {
    /// Start every provider's connect in declaration order and wait for all
    ///
    /// Providers run concurrently; one that stays disconnected does not
    /// hold back or fail the others.
    async fn connect(&self) {
        join_all(self.clients.iter().map(|(_, client)| client.connect())).await;
    }

    /// Disconnect every provider, in declaration order
    async fn disconnect(&self) {
        join_all(self.clients.iter().map(|(_, client)| client.disconnect())).await;
    }

    fn get_emotes(&self, text: &str) -> Vec<Emote> {
        self.clients
            .iter()
            .flat_map(|(_, client)| client.get_emotes(text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticEmoteClient;
    use crate::types::Catalog;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Shared record of lifecycle calls across providers
    #[derive(Default)]
    struct Lifecycle {
        connected: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    struct FixedProvider {
        name: &'static str,
        entries: Vec<(&'static str, &'static str)>,
        lifecycle: Arc<Lifecycle>,
    }

    struct RecordingClient {
        name: &'static str,
        inner: StaticEmoteClient,
        lifecycle: Arc<Lifecycle>,
    }

    #[async_trait]
    impl EmoteClient for RecordingClient {
        async fn connect(&self) {
            self.lifecycle.calls.lock().unwrap().push(format!("connect {}", self.name));
            self.lifecycle.connected.fetch_add(1, Ordering::SeqCst);
        }

        async fn disconnect(&self) {
            self.lifecycle.calls.lock().unwrap().push(format!("disconnect {}", self.name));
            self.lifecycle.connected.fetch_sub(1, Ordering::SeqCst);
        }

        fn get_emotes(&self, text: &str) -> Vec<Emote> {
            self.inner.get_emotes(text)
        }
    }

    #[async_trait]
    impl EmoteProvider for FixedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn create_client(&self, _platform_user_id: &str) -> Box<dyn EmoteClient> {
            Box::new(RecordingClient {
                name: self.name,
                inner: StaticEmoteClient::new(Catalog::from_entries(self.entries.clone())),
                lifecycle: self.lifecycle.clone(),
            })
        }
    }

    fn service(lifecycle: &Arc<Lifecycle>) -> EmoteService {
        EmoteService::new(vec![
            Arc::new(FixedProvider {
                name: "a",
                entries: vec![("Kappa", "a/kappa"), ("Shared", "a/shared")],
                lifecycle: lifecycle.clone(),
            }),
            Arc::new(FixedProvider {
                name: "b",
                entries: vec![("Shared", "b/shared"), ("Pog", "b/pog")],
                lifecycle: lifecycle.clone(),
            }),
        ])
    }

    #[tokio::test]
    async fn test_lookup_concatenates_in_provider_order() {
        let lifecycle = Arc::new(Lifecycle::default());
        let client = service(&lifecycle).create_client("42").await;

        let urls: Vec<String> = client
            .get_emotes("Pog Shared Kappa nope")
            .into_iter()
            .map(|e| e.url)
            .collect();
        assert_eq!(urls, vec!["a/shared", "a/kappa", "b/pog", "b/shared"]);
        assert_eq!(client.providers().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_fan_out() {
        let lifecycle = Arc::new(Lifecycle::default());
        let client = service(&lifecycle).create_client("42").await;

        client.connect().await;
        assert_eq!(lifecycle.connected.load(Ordering::SeqCst), 2);
        client.disconnect().await;
        assert_eq!(lifecycle.connected.load(Ordering::SeqCst), 0);
        assert_eq!(
            *lifecycle.calls.lock().unwrap(),
            vec!["connect a", "connect b", "disconnect a", "disconnect b"]
        );
    }

    #[tokio::test]
    async fn test_empty_service_resolves_nothing() {
        let client = EmoteService::new(Vec::new()).create_client("42").await;
        client.connect().await;
        assert!(client.get_emotes("Kappa").is_empty());
    }

    #[test]
    fn test_from_config_respects_enabled_flags() {
        let mut config = EmoteConfig::new("https://host");
        config.bttv.enabled = false;

        let service = EmoteService::from_config(config).unwrap();
        assert_eq!(service.provider_names(), vec!["7tv", "ffz"]);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        assert!(EmoteService::from_config(EmoteConfig::new("")).is_err());
    }
}
