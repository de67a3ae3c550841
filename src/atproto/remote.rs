// SPDX-License-Identifier: MPL-2.0

use crate::atproto::ContentUri;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("record rejected: {0}")]
    Validation(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("not authenticated")]
    NotAuthenticated,
}

/// The record-level operations the interaction layer needs from the content
/// service. Transport, auth and encoding belong to the implementor.
///
/// Futures are not required to be `Send`: callers await them on the thread
/// that owns the feed item.
#[async_trait(?Send)]
pub trait RemoteClient {
    /// Create a record in the viewer's repository and return its address.
    async fn create_record(
        &self,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<ContentUri, RemoteError>;

    async fn delete_record(&self, uri: &ContentUri) -> Result<(), RemoteError>;
}
