//! Tags: ordered string records attached to an event.
//!
//! A tag's first field is its key (`"e"`, `"p"`, `"nonce"` or free-form).
//! Tag order is significant because it is part of the signed body.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Key of a tag referencing another event.
pub const EVENT_TAG: &str = "e";

/// Key of a tag referencing a public key.
pub const PUBKEY_TAG: &str = "p";

/// Key of the proof-of-work tag.
pub const NONCE_TAG: &str = "nonce";

/// A single tag: a non-empty sequence of strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub Vec<String>);

impl Tag {
    /// Build a tag from its fields.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// The type key (first field).
    pub fn key(&self) -> Option<&str> {
        self.get(0)
    }

    /// The primary value (second field).
    pub fn value(&self) -> Option<&str> {
        self.get(1)
    }

    /// Field at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Set field `index`, padding any gap with empty strings.
    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if self.0.len() <= index {
            self.0.resize(index + 1, String::new());
        }
        self.0[index] = value.into();
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Position of an event reference in a reply thread (NIP-10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Root,
    Reply,
}

impl Marker {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Reply => "reply",
        }
    }
}

impl FromStr for Marker {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "root" => Ok(Self::Root),
            "reply" => Ok(Self::Reply),
            other => Err(CoreError::InvalidMarker(other.to_string())),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered list of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Tag>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag.
    pub fn push(&mut self, tag: Tag) {
        self.0.push(tag);
    }

    /// Append a tag made of `key` followed by `values`.
    pub fn push_tag<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = vec![key.to_string()];
        fields.extend(values.into_iter().map(Into::into));
        self.0.push(Tag(fields));
    }

    /// Append `["e", event_id, relay_hint]`, plus the marker when given.
    pub fn add_event_reference(
        &mut self,
        event_id: &str,
        relay_hint: &str,
        marker: Option<Marker>,
    ) -> Result<()> {
        validate_hex64(event_id)?;
        let mut tag = Tag::new([EVENT_TAG, event_id, relay_hint]);
        if let Some(marker) = marker {
            tag.0.push(marker.as_str().to_string());
        }
        self.0.push(tag);
        Ok(())
    }

    /// Append `["p", pubkey, relay_hint]`, plus the label (petname) when given.
    pub fn add_pubkey_reference(
        &mut self,
        pubkey: &str,
        relay_hint: &str,
        label: Option<&str>,
    ) -> Result<()> {
        validate_hex64(pubkey)?;
        let mut tag = Tag::new([PUBKEY_TAG, pubkey, relay_hint]);
        if let Some(label) = label {
            tag.0.push(label.to_string());
        }
        self.0.push(tag);
        Ok(())
    }

    /// Index of the first tag whose second field is `id_or_pubkey`.
    pub fn references(&self, id_or_pubkey: &str) -> Option<usize> {
        self.0
            .iter()
            .position(|tag| tag.value() == Some(id_or_pubkey))
    }

    /// First tag with the given key.
    pub fn find(&self, key: &str) -> Option<&Tag> {
        self.0.iter().find(|tag| tag.key() == Some(key))
    }

    /// All tags with the given key, in order.
    pub fn find_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.0.iter().filter(move |tag| tag.key() == Some(key))
    }

    /// Ids referenced by `e` tags.
    pub fn event_refs(&self) -> Vec<&str> {
        self.find_all(EVENT_TAG).filter_map(Tag::value).collect()
    }

    /// Keys referenced by `p` tags.
    pub fn pubkey_refs(&self) -> Vec<&str> {
        self.find_all(PUBKEY_TAG).filter_map(Tag::value).collect()
    }

    /// Tag fields grouped by key, keys sorted, each group in tag order.
    pub fn grouped(&self) -> BTreeMap<&str, Vec<&[String]>> {
        let mut groups: BTreeMap<&str, Vec<&[String]>> = BTreeMap::new();
        for tag in &self.0 {
            if let Some((key, rest)) = tag.0.split_first() {
                groups.entry(key.as_str()).or_default().push(rest);
            }
        }
        groups
    }

    /// Drop every tag with the given key.
    pub fn remove_all(&mut self, key: &str) {
        self.0.retain(|tag| tag.key() != Some(key));
    }

    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.0.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Tag> {
        self.0.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }
}

impl From<Vec<Tag>> for Tags {
    fn from(tags: Vec<Tag>) -> Self {
        Self(tags)
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<T: IntoIterator<Item = Tag>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Check that `s` is 64 lowercase hex characters.
pub(crate) fn validate_hex64(s: &str) -> Result<()> {
    let well_formed =
        s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if well_formed {
        Ok(())
    } else {
        Err(CoreError::InvalidHexString(s.to_string()))
    }
}
