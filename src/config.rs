// SPDX-License-Identifier: MPL-2.0

pub const APP_ID: &str = "io.github.sethcottle.Hangar";

pub const DEFAULT_PDS: &str = "https://bsky.social";

/// Collection NSIDs for the records a viewer creates when interacting with a post.
pub const LIKE_COLLECTION: &str = "app.bsky.feed.like";
pub const REPOST_COLLECTION: &str = "app.bsky.feed.repost";

/// Every account has exactly one profile record, keyed `self`.
pub const PROFILE_COLLECTION: &str = "app.bsky.actor.profile";
pub const PROFILE_RECORD_KEY: &str = "self";
