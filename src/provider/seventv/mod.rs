//! 7TV provider
//!
//! Full snapshots come from the REST API; afterwards the client stays
//! subscribed to the EventAPI and applies set diffs and identity changes
//! as they arrive.

mod fetch;
pub mod messages;
mod sync;
mod transport;

pub use fetch::SevenTvFetcher;
pub use sync::{SevenTvClient, SevenTvProvider, SyncState};
pub use transport::{EventSocket, EventTransport, WsTransport};

/// Proxy path segment for 7TV assets
pub const PROXY_SEGMENT: &str = "7tv-emotes";
