//! Profile metadata carried as the JSON content of kind-0 events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::event::Event;
use crate::types::Kind;

/// A user profile.
///
/// `name`, `about` and `picture` are always written, even when empty.
/// Unknown fields read from a relay are kept in `extra` and written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub about: String,

    #[serde(default)]
    pub picture: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    nip05: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = about.into();
        self
    }

    pub fn picture(mut self, url: impl Into<String>) -> Self {
        self.picture = url.into();
        self
    }

    /// Attach a NIP-05 identifier of the form `local@domain.tld`.
    pub fn nip05(mut self, identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        validate_nip05(&identifier)?;
        self.nip05 = Some(identifier);
        Ok(self)
    }

    pub fn nip05_identifier(&self) -> Option<&str> {
        self.nip05.as_deref()
    }

    /// Serialize to event content.
    pub fn to_content(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Read the profile out of a kind-0 event.
    pub fn from_event(event: &Event) -> Result<Self> {
        if event.kind != Some(Kind::SET_METADATA) {
            return Err(CoreError::UnexpectedKind {
                expected: Kind::SET_METADATA,
                found: event.kind,
            });
        }
        Ok(serde_json::from_str(event.content_str())?)
    }
}

fn validate_nip05(identifier: &str) -> Result<()> {
    let invalid = || CoreError::Nip05Format(identifier.to_string());

    let (local, domain) = identifier.split_once('@').ok_or_else(invalid)?;
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    let domain_ok = domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !domain.contains(char::is_whitespace)
        && !domain.contains('@');

    if local_ok && domain_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}
