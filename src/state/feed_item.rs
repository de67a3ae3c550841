// SPDX-License-Identifier: MPL-2.0

use crate::atproto::{Author, ContentUri, FeedItemSnapshot, PostRecord};
use crate::state::{
    Action, InteractionContext, InteractionError, InteractionState, OptimisticMutator,
    PendingMutation, SubscriptionId, ToggleOutcome,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// One entry of a feed: immutable post data plus live interaction state.
///
/// Views read `state()` and subscribe for replacements; every notification
/// carries the full state, never a delta.
#[derive(Clone)]
pub struct FeedItemViewModel {
    uri: ContentUri,
    cid: String,
    author: Author,
    record: PostRecord,
    indexed_at: String,
    reposted_by: Option<Author>,
    mutator: OptimisticMutator,
}

impl FeedItemViewModel {
    pub fn new(snapshot: FeedItemSnapshot, context: Rc<InteractionContext>) -> Self {
        let FeedItemSnapshot {
            uri,
            cid,
            author,
            record,
            indexed_at,
            reposted_by,
            state,
        } = snapshot;
        let mutator = OptimisticMutator::new(uri.clone(), cid.clone(), state, context);

        Self {
            uri,
            cid,
            author,
            record,
            indexed_at,
            reposted_by,
            mutator,
        }
    }

    pub fn uri(&self) -> &ContentUri {
        &self.uri
    }

    pub fn cid(&self) -> &str {
        &self.cid
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn record(&self) -> &PostRecord {
        &self.record
    }

    pub fn indexed_at(&self) -> &str {
        &self.indexed_at
    }

    pub fn reposted_by(&self) -> Option<&Author> {
        self.reposted_by.as_ref()
    }

    /// The post a reply composed from this entry should point at.
    pub fn reply_target(&self) -> &ContentUri {
        &self.uri
    }

    pub fn state(&self) -> InteractionState {
        self.mutator.state()
    }

    pub fn is_pending(&self, action: Action) -> bool {
        self.mutator.is_pending(action)
    }

    pub fn pending(&self, action: Action) -> Option<PendingMutation> {
        self.mutator.pending(action)
    }

    pub fn toggle_like(&self) -> LocalBoxFuture<'static, Result<ToggleOutcome, InteractionError>> {
        self.mutator.toggle(Action::Like)
    }

    pub fn toggle_repost(
        &self,
    ) -> LocalBoxFuture<'static, Result<ToggleOutcome, InteractionError>> {
        self.mutator.toggle(Action::Repost)
    }

    /// See [`OptimisticMutator::subscribe`]: an observer holding this item
    /// keeps it alive until it is unsubscribed.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&InteractionState) + 'static,
    {
        self.mutator.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.mutator.unsubscribe(id)
    }

    /// Apply a fresh server view of this post. Only interaction state can
    /// change; a snapshot for a different post is ignored.
    pub fn refresh(&self, snapshot: &FeedItemSnapshot) {
        if snapshot.uri != self.uri {
            tracing::warn!(item = %self.uri, snapshot = %snapshot.uri, "ignoring refresh for another post");
            return;
        }
        self.mutator.refresh(snapshot.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atproto::RemoteError;
    use crate::state::testing::{ScriptedRemote, context, uri};
    use std::cell::RefCell;

    fn snapshot(state: InteractionState) -> FeedItemSnapshot {
        FeedItemSnapshot {
            uri: uri("bob.test/app.bsky.feed.post/p1"),
            cid: "bafypost".to_string(),
            author: Author {
                did: "did:plc:bob".to_string(),
                handle: "bob.test".to_string(),
                display_name: Some("Bob".to_string()),
                avatar: None,
            },
            record: PostRecord {
                text: "hello world".to_string(),
                created_at: "2024-05-01T12:00:00.000Z".to_string(),
            },
            indexed_at: "2024-05-01T12:00:01.000Z".to_string(),
            reposted_by: None,
            state,
        }
    }

    #[test]
    fn test_exposes_snapshot_fields() {
        let remote = ScriptedRemote::new();
        let item = FeedItemViewModel::new(snapshot(InteractionState::default()), context(&remote));

        assert_eq!(item.reply_target(), &uri("bob.test/app.bsky.feed.post/p1"));
        assert_eq!(item.author().handle, "bob.test");
        assert_eq!(item.record().text, "hello world");
        assert_eq!(item.cid(), "bafypost");
        assert!(item.reposted_by().is_none());
    }

    #[tokio::test]
    async fn test_toggle_like_scenario() {
        let remote = ScriptedRemote::new();
        remote.push_create(Ok(uri("alice.com/like/abc123")));
        let item = FeedItemViewModel::new(
            snapshot(InteractionState {
                like_count: 5,
                ..InteractionState::default()
            }),
            context(&remote),
        );

        let settled = item.toggle_like();
        assert_eq!(item.state().like_count, 6);
        assert!(item.state().viewer_like.is_some());

        settled.await.unwrap();
        assert_eq!(item.state().like_count, 6);
        assert_eq!(item.state().viewer_like, Some(uri("alice.com/like/abc123")));
    }

    #[tokio::test]
    async fn test_toggle_repost_failure_scenario() {
        let remote = ScriptedRemote::new();
        remote.push_delete(Err(RemoteError::Network("unreachable".into())));
        let initial = InteractionState {
            repost_count: 2,
            viewer_repost: Some(uri("alice.com/repost/xyz")),
            ..InteractionState::default()
        };
        let item = FeedItemViewModel::new(snapshot(initial.clone()), context(&remote));

        let settled = item.toggle_repost();
        assert_eq!(item.state().repost_count, 1);
        assert_eq!(item.state().viewer_repost, None);
        assert!(item.is_pending(Action::Repost));

        let err = settled.await.unwrap_err();
        assert_eq!(
            err,
            InteractionError::Remote(RemoteError::Network("unreachable".into()))
        );
        assert_eq!(item.state(), initial);
    }

    #[tokio::test]
    async fn test_double_tap_makes_one_remote_call() {
        let remote = ScriptedRemote::new();
        remote.push_create(Ok(uri("alice.com/like/abc123")));
        let item = FeedItemViewModel::new(snapshot(InteractionState::default()), context(&remote));

        let (first, second) = futures::join!(item.toggle_like(), item.toggle_like());
        assert_eq!(first.unwrap(), ToggleOutcome::Applied(uri("alice.com/like/abc123")));
        assert_eq!(second.unwrap(), ToggleOutcome::Ignored);
        assert_eq!(remote.creates().len(), 1);
        assert_eq!(item.state().like_count, 1);
    }

    #[tokio::test]
    async fn test_refresh_mid_mutation_is_not_interleaved() {
        let remote = ScriptedRemote::new();
        remote.push_create(Ok(uri("alice.com/like/abc123")));
        let item = FeedItemViewModel::new(snapshot(InteractionState::default()), context(&remote));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        item.subscribe(move |state| sink.borrow_mut().push(state.like_count));

        let settled = item.toggle_like();
        item.refresh(&snapshot(InteractionState {
            like_count: 12,
            viewer_like: Some(uri("alice.com/like/abc123")),
            ..InteractionState::default()
        }));
        assert_eq!(item.state().like_count, 1);

        settled.await.unwrap();
        // optimistic, confirmed, then the held-back refresh
        assert_eq!(*seen.borrow(), vec![1, 1, 12]);
    }

    #[test]
    fn test_refresh_for_other_post_is_ignored() {
        let remote = ScriptedRemote::new();
        let item = FeedItemViewModel::new(snapshot(InteractionState::default()), context(&remote));

        let mut other = snapshot(InteractionState {
            like_count: 99,
            ..InteractionState::default()
        });
        other.uri = uri("bob.test/app.bsky.feed.post/p2");
        item.refresh(&other);
        assert_eq!(item.state().like_count, 0);
    }
}
