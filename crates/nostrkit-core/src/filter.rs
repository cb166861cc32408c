//! Subscription filters.
//!
//! A filter is built by the caller and snapshotted into its wire object when a
//! subscription opens. Only non-empty fields are sent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::PublicKey;
use crate::error::Result;
use crate::pow::nibble_prefix;
use crate::types::{EventId, Kind};

/// Default number of events a relay should return (and the dedup window size).
pub const DEFAULT_LIMIT: usize = 10;

/// Which events a relay should deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Event ids or id prefixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,

    /// Author keys or key prefixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<Kind>,

    /// Referenced events (`e` tags).
    #[serde(rename = "#e", default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,

    /// Referenced keys (`p` tags).
    #[serde(rename = "#p", default, skip_serializing_if = "Vec::is_empty")]
    pub pubkeys: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,

    #[serde(default = "default_limit", skip_serializing_if = "is_zero")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            authors: Vec::new(),
            kinds: Vec::new(),
            events: Vec::new(),
            pubkeys: Vec::new(),
            since: None,
            until: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: &EventId) -> Self {
        self.ids.push(id.to_hex());
        self
    }

    pub fn author(mut self, author: &PublicKey) -> Self {
        self.authors.push(author.to_hex());
        self
    }

    pub fn authors<'a>(mut self, authors: impl IntoIterator<Item = &'a PublicKey>) -> Self {
        self.authors.extend(authors.into_iter().map(PublicKey::to_hex));
        self
    }

    pub fn kind(mut self, kind: Kind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = Kind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Match events that reference `id` in an `e` tag.
    pub fn event(mut self, id: &EventId) -> Self {
        self.events.push(id.to_hex());
        self
    }

    /// Match events that reference `pubkey` in a `p` tag.
    pub fn pubkey(mut self, pubkey: &PublicKey) -> Self {
        self.pubkeys.push(pubkey.to_hex());
        self
    }

    pub fn since(mut self, ts: u64) -> Self {
        self.since = Some(ts);
        self
    }

    pub fn until(mut self, ts: u64) -> Self {
        self.until = Some(ts);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Ask for ids with at least `difficulty` leading zero bits.
    ///
    /// Relays match ids by hex prefix, so this rounds down to whole zero
    /// nibbles and is only an approximation of the bit-level target.
    pub fn min_pow(mut self, difficulty: u8) -> Self {
        let prefix = nibble_prefix(difficulty);
        if !prefix.is_empty() {
            self.ids.push(prefix);
        }
        self
    }

    /// The wire object sent in a subscribe request.
    pub fn to_wire(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_filter_only_sends_limit() {
        assert_eq!(Filter::new().to_wire().unwrap(), json!({ "limit": 10 }));
    }

    #[test]
    fn test_tag_filters_use_hash_keys() {
        let id = EventId::from_bytes([0xab; 32]);
        let pk = PublicKey::from_bytes([0xcd; 32]);
        let wire = Filter::new()
            .kinds([Kind::TEXT_NOTE, Kind::ENCRYPTED_MESSAGE])
            .event(&id)
            .pubkey(&pk)
            .since(100)
            .limit(5)
            .to_wire()
            .unwrap();

        assert_eq!(
            wire,
            json!({
                "kinds": [1, 4],
                "#e": [id.to_hex()],
                "#p": [pk.to_hex()],
                "since": 100,
                "limit": 5,
            })
        );
    }

    #[test]
    fn test_zero_limit_omitted() {
        let wire = Filter::new().author(&PublicKey::from_bytes([1; 32])).limit(0);
        assert!(wire.to_wire().unwrap().get("limit").is_none());
    }

    #[test]
    fn test_min_pow_prefix() {
        let filter = Filter::new().min_pow(9);
        assert_eq!(filter.ids, vec!["00".to_string()]);
        assert!(Filter::new().min_pow(3).ids.is_empty());
    }

    #[test]
    fn test_filter_parses_from_wire() {
        let filter: Filter = serde_json::from_value(json!({ "kinds": [1], "#p": ["aa"] })).unwrap();
        assert_eq!(filter.kinds, vec![Kind::TEXT_NOTE]);
        assert_eq!(filter.pubkeys, vec!["aa".to_string()]);
        assert_eq!(filter.limit, DEFAULT_LIMIT);
    }
}
