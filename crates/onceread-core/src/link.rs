//! Shareable links.
//!
//! ```text
//! {base}/secret/{id}#{link key}
//!                   └── only for link-key secrets; never sent to a server
//! ```

use std::{fmt, str::FromStr};

use url::Url;

use crate::{envelope::EnvelopeId, error::ValidationError};

const SECRET_SEGMENT: &str = "secret";

/// A link to one secret, optionally carrying its decryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct ShareLink {
    base: Url,
    id: EnvelopeId,
    key: Option<String>,
}

impl ShareLink {
    /// Link under `base`. `key` is the fragment passphrase, `None` for
    /// password-protected secrets.
    pub fn new(base: Url, id: EnvelopeId, key: Option<String>) -> Result<Self, ValidationError> {
        if base.cannot_be_a_base() {
            return Err(ValidationError::InvalidLink(format!("{base} cannot hold a path")));
        }
        Ok(Self { base, id, key: key.filter(|k| !k.is_empty()) })
    }

    /// Parse a full link. The id comes from the last `secret/{id}` path pair,
    /// the key from a non-empty fragment.
    pub fn parse(link: &str) -> Result<Self, ValidationError> {
        let url = Url::parse(link).map_err(|e| ValidationError::InvalidLink(e.to_string()))?;
        let segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(|| ValidationError::InvalidLink("link has no path".to_string()))?
            .collect();

        let position = segments
            .iter()
            .rposition(|segment| *segment == SECRET_SEGMENT)
            .ok_or_else(|| ValidationError::InvalidLink("missing /secret/{id}".to_string()))?;
        let id: EnvelopeId = segments
            .get(position + 1)
            .ok_or_else(|| ValidationError::InvalidLink("missing secret id".to_string()))?
            .parse()?;

        let mut base = url.clone();
        base.set_fragment(None);
        base.set_query(None);
        if let Ok(mut path) = base.path_segments_mut() {
            path.clear().extend(&segments[..position]);
        }

        Self::new(base, id, url.fragment().map(str::to_string))
    }

    /// Envelope id.
    pub fn id(&self) -> EnvelopeId {
        self.id
    }

    /// Fragment passphrase, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Base the link was built under.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Full link including the fragment key.
    pub fn to_url(&self) -> Url {
        let mut url = self.request_url();
        url.set_fragment(self.key.as_deref());
        url
    }

    /// Link with the fragment stripped. The only form that may be handed to
    /// a network or storage layer.
    pub fn request_url(&self) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        let id = self.id.to_string();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(SECRET_SEGMENT).push(&id);
        }
        url
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_url().as_str())
    }
}

impl fmt::Debug for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareLink")
            .field("url", &self.request_url().as_str())
            .field("has_key", &self.key.is_some())
            .finish()
    }
}

impl FromStr for ShareLink {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
