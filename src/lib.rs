//! # a3s-emote
//!
//! Live-synchronized third-party chat emote catalogs for the A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-emote` resolves the emote names used in a chat message to image URLs
//! served through a local asset proxy. Catalogs come from 7TV, BetterTTV and
//! FrankerFaceZ; the 7TV catalog stays current through its event stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use a3s_emote::{EmoteClient, EmoteConfig, EmoteService};
//!
//! # async fn example() -> a3s_emote::Result<()> {
//! let service = EmoteService::from_config(EmoteConfig::new("https://example.com"))?;
//!
//! // One client per channel, keyed by the platform user id
//! let client = service.create_client("71092938").await;
//! client.connect().await;
//!
//! for emote in client.get_emotes("catJAM hello PogU") {
//!     println!("{} -> {}", emote.name, emote.url);
//! }
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - **7tv** — snapshot plus live `emote_set.update` / `user.update` events
//! - **bttv** — shared and channel emotes, fetched once
//! - **ffz** — room emote sets, fetched once
//!
//! ## Architecture
//!
//! - **EmoteProvider** trait — builds per-user clients for one source
//! - **EmoteClient** trait — connect / disconnect / lookup
//! - **EmoteService** — combines providers into an `AggregateClient`
//! - **Catalog** — name → URL map with set-update operations

pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod service;
pub mod types;

// Re-export core types
pub use config::{BttvConfig, EmoteConfig, FfzConfig, SevenTvConfig};
pub use error::{EmoteError, Result};
pub use http::{HttpClient, ReqwestHttpClient};
pub use provider::{rewrite_asset_url, CatalogFetcher, EmoteClient, EmoteProvider};
pub use service::{AggregateClient, EmoteService};
pub use types::{Catalog, Emote, EmoteSnapshot, SubscriptionIdentity};

// Re-export providers for convenience
pub use provider::bttv::BttvFetcher;
pub use provider::ffz::FfzFetcher;
pub use provider::seventv::{
    EventSocket, EventTransport, SevenTvClient, SevenTvFetcher, SevenTvProvider, SyncState,
    WsTransport,
};
pub use provider::{StaticEmoteClient, StaticProvider};
