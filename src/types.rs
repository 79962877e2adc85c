//! Core emote types for the a3s-emote system
//!
//! All wire-facing types use camelCase JSON serialization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single resolved emote
///
/// `name` is the literal token a user types in chat, `url` the rewritten
/// asset location behind the local proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emote {
    /// Token as typed in chat (case-sensitive)
    pub name: String,

    /// Proxied asset URL
    pub url: String,
}

impl Emote {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Current name → url mapping for one provider
///
/// The map is private; it only changes through [`Catalog::apply_removals`],
/// [`Catalog::apply_additions`] and [`Catalog::replace`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    emotes: HashMap<String, String>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from ordered `(name, url)` pairs
    ///
    /// Later pairs overwrite earlier ones with the same name, so callers
    /// pass their sources in ascending priority.
    pub fn from_entries<I, N, U>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        let mut catalog = Self::new();
        catalog.apply_additions(entries);
        catalog
    }

    /// Resolve a single name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.emotes.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.emotes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.emotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emotes.is_empty()
    }

    /// Iterate over all `(name, url)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.emotes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve every whitespace-separated token of `text` that is a known name
    ///
    /// Output follows input token order; a token repeated in `text` yields one
    /// entry per occurrence.
    pub fn lookup(&self, text: &str) -> Vec<Emote> {
        text.split_whitespace()
            .filter_map(|token| {
                self.emotes
                    .get(token)
                    .map(|url| Emote::new(token, url.clone()))
            })
            .collect()
    }

    /// Delete each named entry; unknown names are ignored
    ///
    /// Returns how many entries were actually removed.
    pub fn apply_removals<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| self.emotes.remove(name.as_ref()).is_some())
            .count()
    }

    /// Upsert each `(name, url)` pair, overwriting existing names
    pub fn apply_additions<I, N, U>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        let mut count = 0;
        for (name, url) in entries {
            self.emotes.insert(name.into(), url.into());
            count += 1;
        }
        count
    }

    /// Swap in a freshly fetched catalog wholesale
    pub fn replace(&mut self, other: Catalog) {
        self.emotes = other.emotes;
    }
}

/// Which upstream objects a live connection is subscribed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionIdentity {
    /// Provider-side opaque user id (not the platform user id)
    pub user_id: String,

    /// Emote set currently active for that user
    pub emote_set_id: String,
}

impl SubscriptionIdentity {
    pub fn new(user_id: impl Into<String>, emote_set_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            emote_set_id: emote_set_id.into(),
        }
    }
}

/// Result of a successful full catalog fetch
#[derive(Debug, Clone, Default)]
pub struct EmoteSnapshot {
    /// Present only for providers with a live update channel
    pub identity: Option<SubscriptionIdentity>,

    /// Normalized, merged catalog
    pub catalog: Catalog,
}

impl EmoteSnapshot {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            identity: None,
            catalog,
        }
    }

    pub fn with_identity(mut self, identity: SubscriptionIdentity) -> Self {
        self.identity = Some(identity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog::from_entries([
            ("Kappa", "https://host/a/kappa.png"),
            ("PogU", "https://host/a/pogu.png"),
        ])
    }

    #[test]
    fn test_lookup_preserves_order_and_duplicates() {
        let catalog = sample();
        let emotes = catalog.lookup("PogU hello Kappa PogU");

        assert_eq!(
            emotes,
            vec![
                Emote::new("PogU", "https://host/a/pogu.png"),
                Emote::new("Kappa", "https://host/a/kappa.png"),
                Emote::new("PogU", "https://host/a/pogu.png"),
            ]
        );
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let catalog = sample();
        assert!(catalog.lookup("kappa POGU").is_empty());
    }

    #[test]
    fn test_lookup_splits_on_any_whitespace() {
        let catalog = sample();
        let emotes = catalog.lookup("  Kappa\tPogU\n");
        assert_eq!(emotes.len(), 2);
        assert_eq!(emotes[0].name, "Kappa");
        assert_eq!(emotes[1].name, "PogU");
    }

    #[test]
    fn test_lookup_empty_text() {
        assert!(sample().lookup("").is_empty());
        assert!(Catalog::new().lookup("Kappa").is_empty());
    }

    #[test]
    fn test_remove_then_add_in_one_update() {
        let mut catalog = Catalog::from_entries([("Kappa", "u1"), ("PogU", "u0")]);

        catalog.apply_removals(["Kappa"]);
        catalog.apply_additions([("PogU", "url")]);

        assert_eq!(catalog, Catalog::from_entries([("PogU", "url")]));
    }

    #[test]
    fn test_remove_absent_name_is_noop() {
        let mut catalog = sample();
        let before = catalog.clone();

        let removed = catalog.apply_removals(["NotThere"]);

        assert_eq!(removed, 0);
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_from_entries_later_wins() {
        let catalog = Catalog::from_entries([("LUL", "global"), ("LUL", "channel")]);
        assert_eq!(catalog.get("LUL"), Some("channel"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_replace_wholesale() {
        let mut catalog = sample();
        catalog.replace(Catalog::from_entries([("OMEGALUL", "u")]));

        assert!(!catalog.contains("Kappa"));
        assert_eq!(catalog.get("OMEGALUL"), Some("u"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_emote_serialization() {
        let emote = Emote::new("Kappa", "https://host/k.png");
        let json = serde_json::to_string(&emote).unwrap();
        assert_eq!(json, r#"{"name":"Kappa","url":"https://host/k.png"}"#);
    }

    #[test]
    fn test_snapshot_with_identity() {
        let snapshot = EmoteSnapshot::new(sample())
            .with_identity(SubscriptionIdentity::new("user-1", "set-1"));
        assert_eq!(snapshot.identity.unwrap().emote_set_id, "set-1");
        assert_eq!(snapshot.catalog.len(), 2);
    }
}
