// SPDX-License-Identifier: MPL-2.0

//! Interaction state for Bluesky feed items.
//!
//! [`atproto::ContentUri`] addresses records. [`state::FeedItemViewModel`]
//! holds one feed entry and toggles likes and reposts optimistically through
//! [`state::OptimisticMutator`], talking to the content service through
//! [`atproto::RemoteClient`]. [`atproto::AtprotoRemote`] is the atrium-backed
//! implementation of that trait and also turns server post views into
//! [`atproto::FeedItemSnapshot`]s.

pub mod atproto;
pub mod config;
mod runtime;
pub mod state;

pub use atproto::{AtprotoRemote, ContentUri, RemoteClient, RemoteError};
pub use state::{Action, FeedItemViewModel, InteractionState, OptimisticMutator, ToggleOutcome};
