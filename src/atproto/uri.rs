// SPDX-License-Identifier: MPL-2.0

//! Record identifiers.
//!
//! Canonical text form is `<authority>/<collection>/<recordKey>`. The `at://`
//! scheme is accepted on input and produced only by [`ContentUri::to_at_uri`]
//! for the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SCHEME: &str = "at://";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("malformed record URI {input:?}: {reason}")]
    Malformed { input: String, reason: &'static str },
}

impl UriError {
    fn malformed(input: &str, reason: &'static str) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason,
        }
    }
}

/// Address of a content record (post, like, repost) in an account's repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    authority: String,
    collection: String,
    /// `None` only for collection addresses built by [`ContentUri::with_collection`].
    record_key: Option<String>,
}

impl ContentUri {
    pub fn new(authority: &str, collection: &str, record_key: &str) -> Result<Self, UriError> {
        let raw = format!("{authority}/{collection}/{record_key}");
        for part in [authority, collection, record_key] {
            if part.is_empty() {
                return Err(UriError::malformed(&raw, "empty segment"));
            }
            if part.contains('/') {
                return Err(UriError::malformed(&raw, "segment contains '/'"));
            }
        }
        Ok(Self {
            authority: authority.to_string(),
            collection: collection.to_string(),
            record_key: Some(record_key.to_string()),
        })
    }

    /// Parse `<authority>/<collection>/<recordKey>`, with or without `at://`.
    ///
    /// The scheme is not kept: [`ContentUri::format`] always gives the
    /// scheme-less form, and [`ContentUri::to_at_uri`] adds `at://` back.
    pub fn parse(raw: &str) -> Result<Self, UriError> {
        let body = raw.strip_prefix(SCHEME).unwrap_or(raw);
        if body.contains("://") {
            return Err(UriError::malformed(raw, "unsupported scheme"));
        }

        let parts: Vec<&str> = body.split('/').collect();
        let [authority, collection, record_key] = parts.as_slice() else {
            return Err(UriError::malformed(
                raw,
                "expected <authority>/<collection>/<recordKey>",
            ));
        };
        if authority.is_empty() {
            return Err(UriError::malformed(raw, "empty authority"));
        }
        if collection.is_empty() {
            return Err(UriError::malformed(raw, "empty collection"));
        }
        if record_key.is_empty() {
            return Err(UriError::malformed(raw, "empty record key"));
        }

        Ok(Self {
            authority: authority.to_string(),
            collection: collection.to_string(),
            record_key: Some(record_key.to_string()),
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn record_key(&self) -> Option<&str> {
        self.record_key.as_deref()
    }

    /// True for addresses that name a concrete record rather than a collection.
    pub fn is_record(&self) -> bool {
        self.record_key.is_some()
    }

    /// Same authority, different collection, no record key. Addresses the
    /// record an account would create before the server has assigned a key.
    pub fn with_collection(&self, collection: &str) -> Self {
        Self {
            authority: self.authority.clone(),
            collection: collection.to_string(),
            record_key: None,
        }
    }

    pub fn with_record_key(&self, record_key: &str) -> Result<Self, UriError> {
        Self::new(&self.authority, &self.collection, record_key)
    }

    /// Canonical text form; inverse of [`ContentUri::parse`].
    pub fn format(&self) -> String {
        self.to_string()
    }

    /// Wire form expected by the XRPC endpoints.
    pub fn to_at_uri(&self) -> String {
        format!("{SCHEME}{self}")
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.authority, self.collection)?;
        if let Some(key) = &self.record_key {
            write!(f, "/{key}")?;
        }
        Ok(())
    }
}

impl FromStr for ContentUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Only record addresses serialize; a collection address would not parse back.
impl Serialize for ContentUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.is_record() {
            return Err(serde::ser::Error::custom(format!(
                "{self} has no record key"
            )));
        }
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
