// SPDX-License-Identifier: MPL-2.0

use crate::atproto::{ContentUri, UriError};
use crate::config::{PROFILE_COLLECTION, PROFILE_RECORD_KEY};
use crate::state::InteractionState;
use serde::{Deserialize, Serialize};

/// Decoupled from atrium's internal representation so we own the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

/// Opaque identity descriptor for an account shown in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub did: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

/// Immutable post content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub text: String,
    pub created_at: String,
}

/// Everything the feed source knows about one entry when it hands it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItemSnapshot {
    pub uri: ContentUri,
    /// Content hash; like and repost records reference the post by uri + cid.
    pub cid: String,
    pub author: Author,
    pub record: PostRecord,
    pub indexed_at: String,
    /// Set when the entry appears in the feed because someone reposted it.
    pub reposted_by: Option<Author>,
    pub state: InteractionState,
}

/// The local user whose likes and reposts are tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    did: String,
    profile: ContentUri,
}

impl Viewer {
    pub fn new(did: &str) -> Result<Self, UriError> {
        Ok(Self {
            did: did.to_string(),
            profile: ContentUri::new(did, PROFILE_COLLECTION, PROFILE_RECORD_KEY)?,
        })
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    /// Where a record of `collection` created by this viewer will live, before
    /// the server assigns its key.
    pub fn record_address(&self, collection: &str) -> ContentUri {
        self.profile.with_collection(collection)
    }
}

impl Session {
    pub fn viewer(&self) -> Result<Viewer, UriError> {
        Viewer::new(&self.did)
    }
}
