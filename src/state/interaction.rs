// SPDX-License-Identifier: MPL-2.0

use crate::atproto::{ContentUri, RemoteError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    /// Turning on an action that is already on, or off one that is already off.
    /// Indicates a caller that did not read the current state first.
    #[error("invalid transition: {action} is already {}", on_off(.on))]
    InvalidTransition { action: Action, on: bool },
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

fn on_off(on: &bool) -> &'static str {
    if *on { "on" } else { "off" }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Like,
    Repost,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Like => f.write_str("like"),
            Action::Repost => f.write_str("repost"),
        }
    }
}

/// Which way a toggle moves the viewer's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Create the viewer's record.
    Apply,
    /// Delete the viewer's record.
    Revert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// Count the viewer, identified by the record that backs the action.
    On(ContentUri),
    Off,
}

/// Per-item social counters and the viewer's own like/repost records.
///
/// A viewer field is `Some` exactly when the viewer is counted for that action.
/// Optimistic states hold key-less viewer addresses and fail to serialize
/// until the server record URI is filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionState {
    pub reply_count: u32,
    pub repost_count: u32,
    pub like_count: u32,
    pub viewer_repost: Option<ContentUri>,
    pub viewer_like: Option<ContentUri>,
}

impl InteractionState {
    pub fn is_on(&self, action: Action) -> bool {
        self.viewer_record(action).is_some()
    }

    pub fn viewer_record(&self, action: Action) -> Option<&ContentUri> {
        match action {
            Action::Like => self.viewer_like.as_ref(),
            Action::Repost => self.viewer_repost.as_ref(),
        }
    }

    pub fn count(&self, action: Action) -> u32 {
        match action {
            Action::Like => self.like_count,
            Action::Repost => self.repost_count,
        }
    }

    fn slot_mut(&mut self, action: Action) -> (&mut u32, &mut Option<ContentUri>) {
        match action {
            Action::Like => (&mut self.like_count, &mut self.viewer_like),
            Action::Repost => (&mut self.repost_count, &mut self.viewer_repost),
        }
    }

    /// New state with the viewer counted (or uncounted) for `action`.
    pub fn apply_toggle(&self, action: Action, toggle: Toggle) -> Result<Self, InteractionError> {
        let on = self.is_on(action);
        let mut next = self.clone();
        let (count, record) = next.slot_mut(action);

        match toggle {
            Toggle::On(uri) => {
                if on {
                    return Err(InteractionError::InvalidTransition { action, on });
                }
                *count = count.saturating_add(1);
                *record = Some(uri);
            }
            Toggle::Off => {
                if !on {
                    return Err(InteractionError::InvalidTransition { action, on });
                }
                // Server counts can lag the viewer flag; never go below zero.
                *count = count.saturating_sub(1);
                *record = None;
            }
        }

        Ok(next)
    }

    /// Authoritative snapshot wins over any local optimism.
    pub fn reconcile(&self, server: &InteractionState) -> Self {
        server.clone()
    }

    /// Replace only the viewer record for `action`, keeping counters.
    pub fn with_viewer_record(&self, action: Action, uri: Option<ContentUri>) -> Self {
        let mut next = self.clone();
        *next.slot_mut(action).1 = uri;
        next
    }

    /// Copy the counter and viewer record for `action` back from `prior`,
    /// leaving the other action untouched.
    pub fn restore(&self, action: Action, prior: &InteractionState) -> Self {
        let mut next = self.clone();
        let (count, record) = next.slot_mut(action);
        *count = prior.count(action);
        *record = prior.viewer_record(action).cloned();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(raw: &str) -> ContentUri {
        ContentUri::parse(raw).unwrap()
    }

    fn state(likes: u32, reposts: u32) -> InteractionState {
        InteractionState {
            reply_count: 3,
            repost_count: reposts,
            like_count: likes,
            viewer_repost: None,
            viewer_like: None,
        }
    }

    #[test]
    fn test_like_increments_and_sets_record() {
        let before = state(5, 0);
        let after = before
            .apply_toggle(Action::Like, Toggle::On(uri("alice.com/like/abc")))
            .unwrap();
        assert_eq!(after.like_count, 6);
        assert_eq!(after.viewer_like, Some(uri("alice.com/like/abc")));
        assert_eq!(after.repost_count, 0);
        assert_eq!(after.reply_count, 3);
    }

    #[test]
    fn test_apply_then_revert_is_identity() {
        let before = state(5, 2);
        for action in [Action::Like, Action::Repost] {
            let on = before
                .apply_toggle(action, Toggle::On(uri("alice.com/x/1")))
                .unwrap();
            let off = on.apply_toggle(action, Toggle::Off).unwrap();
            assert_eq!(off, before);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let off = state(1, 1);
        assert_eq!(
            off.apply_toggle(Action::Repost, Toggle::Off),
            Err(InteractionError::InvalidTransition {
                action: Action::Repost,
                on: false
            })
        );

        let on = off
            .apply_toggle(Action::Like, Toggle::On(uri("alice.com/like/a")))
            .unwrap();
        let err = on
            .apply_toggle(Action::Like, Toggle::On(uri("alice.com/like/b")))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid transition: like is already on");
    }

    #[test]
    fn test_turning_off_saturates_at_zero() {
        let mut s = state(0, 0);
        s.viewer_like = Some(uri("alice.com/like/a"));
        let off = s.apply_toggle(Action::Like, Toggle::Off).unwrap();
        assert_eq!(off.like_count, 0);
        assert_eq!(off.viewer_like, None);
    }

    #[test]
    fn test_restore_touches_only_one_action() {
        let prior = state(5, 2);
        let both = prior
            .apply_toggle(Action::Like, Toggle::On(uri("alice.com/like/a")))
            .unwrap()
            .apply_toggle(Action::Repost, Toggle::On(uri("alice.com/repost/b")))
            .unwrap();

        let restored = both.restore(Action::Like, &prior);
        assert_eq!(restored.like_count, 5);
        assert_eq!(restored.viewer_like, None);
        assert_eq!(restored.repost_count, 3);
        assert_eq!(restored.viewer_repost, Some(uri("alice.com/repost/b")));
    }

    #[test]
    fn test_reconcile_replaces_wholesale() {
        let local = state(6, 0).with_viewer_record(Action::Like, Some(uri("alice.com/like/a")));
        let server = state(9, 4);
        assert_eq!(local.reconcile(&server), server);
    }
}
