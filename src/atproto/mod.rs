// SPDX-License-Identifier: MPL-2.0

pub mod client;
pub mod remote;
pub mod types;
pub mod uri;

pub use client::{AtprotoRemote, ClientError};
pub use remote::{RemoteClient, RemoteError};
pub use types::{Author, FeedItemSnapshot, PostRecord, Session, Viewer};
pub use uri::{ContentUri, UriError};
