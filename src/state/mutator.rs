// SPDX-License-Identifier: MPL-2.0

//! Optimistic like/repost toggles for a single feed item.
//!
//! Each toggle runs in two halves. The synchronous half, executed when
//! [`OptimisticMutator::toggle`] is called, claims the action, applies the
//! expected result locally and notifies observers. The asynchronous half,
//! the returned future, performs the remote call and then either keeps the
//! optimistic state (filling in the server-assigned record URI) or rolls the
//! action back to its prior value.
//!
//! At most one mutation per action is in flight; toggles requested while one
//! is pending are dropped. Like and repost are independent of each other.
//! Authoritative refreshes that arrive while a request is awaiting its result
//! are held back and applied once the item is idle again.

use crate::atproto::{ContentUri, RemoteClient, RemoteError, Viewer};
use crate::state::{Action, ClientSettings, Direction, InteractionError, InteractionState, Toggle};
use chrono::{DateTime, Utc};
use futures::future::{self, FutureExt, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Callback invoked with the full new state on every replacement.
pub type Observer = Rc<dyn Fn(&InteractionState)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// How a toggle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Another mutation for the same action was still in flight.
    Ignored,
    /// The record was created; carries the server-assigned URI.
    Applied(ContentUri),
    /// The viewer's record was deleted.
    Reverted,
}

/// An in-flight toggle. Lives until its remote call resolves, or, when its
/// future was dropped after the request went out, until the next
/// authoritative refresh.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub action: Action,
    pub direction: Direction,
    pub prior_state: InteractionState,
    pub issued_at: DateTime<Utc>,
    /// Nobody will observe the outcome; only a refresh can settle it.
    pub detached: bool,
}

/// Shared by every item of a feed: who is acting, against what, with which
/// record types.
pub struct InteractionContext {
    pub viewer: Viewer,
    pub settings: ClientSettings,
    pub remote: Rc<dyn RemoteClient>,
}

impl InteractionContext {
    pub fn new(viewer: Viewer, settings: ClientSettings, remote: Rc<dyn RemoteClient>) -> Self {
        Self {
            viewer,
            settings,
            remote,
        }
    }
}

enum RemoteCall {
    Create {
        collection: String,
        body: serde_json::Value,
    },
    Delete(ContentUri),
}

struct Inner {
    subject: ContentUri,
    subject_cid: String,
    context: Rc<InteractionContext>,
    state: RefCell<InteractionState>,
    pending: RefCell<HashMap<Action, PendingMutation>>,
    deferred_refresh: RefCell<Option<InteractionState>>,
    observers: RefCell<Vec<(SubscriptionId, Observer)>>,
    next_subscription: Cell<u64>,
}

/// Cheap handle; clones share the same item state.
///
/// Not `Send`: an item's state belongs to the thread that displays it, and
/// that ownership is what serializes its transitions.
#[derive(Clone)]
pub struct OptimisticMutator {
    inner: Rc<Inner>,
}

impl OptimisticMutator {
    pub fn new(
        subject: ContentUri,
        subject_cid: String,
        initial: InteractionState,
        context: Rc<InteractionContext>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                subject,
                subject_cid,
                context,
                state: RefCell::new(initial),
                pending: RefCell::new(HashMap::new()),
                deferred_refresh: RefCell::new(None),
                observers: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
            }),
        }
    }

    pub fn state(&self) -> InteractionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_pending(&self, action: Action) -> bool {
        self.inner.pending.borrow().contains_key(&action)
    }

    pub fn pending(&self, action: Action) -> Option<PendingMutation> {
        self.inner.pending.borrow().get(&action).cloned()
    }

    pub fn has_deferred_refresh(&self) -> bool {
        self.inner.deferred_refresh.borrow().is_some()
    }

    /// Register `observer` for every state replacement.
    ///
    /// The mutator owns its observers, so a closure that captures a handle to
    /// this same item keeps it alive until [`OptimisticMutator::unsubscribe`].
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&InteractionState) + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.inner.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Flip `action` for the viewer.
    ///
    /// The optimistic state is applied and published before this returns. The
    /// future resolves once the remote call has settled; a failed call has
    /// already been rolled back when the error is returned.
    ///
    /// Dropping the future before its first poll rolls back, since no request
    /// was sent. Dropping it after that leaves the action pending with its
    /// optimistic state until the next [`OptimisticMutator::refresh`], because
    /// the request may still reach the server.
    pub fn toggle(
        &self,
        action: Action,
    ) -> LocalBoxFuture<'static, Result<ToggleOutcome, InteractionError>> {
        let call = match self.begin(action) {
            Ok(Some(call)) => call,
            Ok(None) => return future::ready(Ok(ToggleOutcome::Ignored)).boxed_local(),
            Err(e) => return future::ready(Err(e)).boxed_local(),
        };

        let mut guard = InFlight {
            mutator: Some(self.clone()),
            action,
            issued: false,
        };
        let this = self.clone();
        async move {
            guard.issued = true;
            let result = match call {
                RemoteCall::Create { collection, body } => this
                    .inner
                    .context
                    .remote
                    .create_record(&collection, body)
                    .await
                    .map(Some),
                RemoteCall::Delete(record) => this
                    .inner
                    .context
                    .remote
                    .delete_record(&record)
                    .await
                    .map(|()| None),
            };
            guard.disarm();
            this.settle(action, result)
        }
        .boxed_local()
    }

    /// Authoritative state from the feed source. Held back while a mutation
    /// is awaiting its result so a stale server view cannot clobber an
    /// in-flight value. Settles detached mutations.
    pub fn refresh(&self, server: InteractionState) {
        if self.awaiting_result() {
            tracing::debug!(subject = %self.inner.subject, "deferring refresh until mutations settle");
            *self.inner.deferred_refresh.borrow_mut() = Some(server);
            return;
        }
        self.reconcile_with(server);
    }

    fn awaiting_result(&self) -> bool {
        self.inner.pending.borrow().values().any(|p| !p.detached)
    }

    fn reconcile_with(&self, server: InteractionState) {
        self.inner.pending.borrow_mut().retain(|_, p| !p.detached);
        let next = self.state().reconcile(&server);
        self.publish(next);
    }

    fn begin(&self, action: Action) -> Result<Option<RemoteCall>, InteractionError> {
        if self.is_pending(action) {
            tracing::debug!(subject = %self.inner.subject, %action, "toggle ignored, mutation in flight");
            return Ok(None);
        }

        let prior = self.state();
        let collection = self.inner.context.settings.collection_for(action);
        let (direction, toggle, call) = match prior.viewer_record(action) {
            Some(record) => (
                Direction::Revert,
                Toggle::Off,
                RemoteCall::Delete(record.clone()),
            ),
            None => (
                Direction::Apply,
                Toggle::On(self.inner.context.viewer.record_address(collection)),
                RemoteCall::Create {
                    collection: collection.to_string(),
                    body: self.record_body(collection),
                },
            ),
        };
        let next = prior.apply_toggle(action, toggle)?;

        self.inner.pending.borrow_mut().insert(
            action,
            PendingMutation {
                action,
                direction,
                prior_state: prior,
                issued_at: Utc::now(),
                detached: false,
            },
        );
        tracing::debug!(subject = %self.inner.subject, %action, ?direction, "optimistic update");
        self.publish(next);
        Ok(Some(call))
    }

    fn settle(
        &self,
        action: Action,
        result: Result<Option<ContentUri>, RemoteError>,
    ) -> Result<ToggleOutcome, InteractionError> {
        let pending = self.inner.pending.borrow_mut().remove(&action);
        let elapsed_ms = pending
            .as_ref()
            .map(|p| (Utc::now() - p.issued_at).num_milliseconds());

        let outcome = match result {
            Ok(Some(record)) => {
                tracing::info!(subject = %self.inner.subject, %action, %record, ?elapsed_ms, "record created");
                let next = self
                    .state()
                    .with_viewer_record(action, Some(record.clone()));
                self.publish(next);
                Ok(ToggleOutcome::Applied(record))
            }
            Ok(None) => {
                tracing::info!(subject = %self.inner.subject, %action, ?elapsed_ms, "record deleted");
                Ok(ToggleOutcome::Reverted)
            }
            Err(error) => {
                tracing::warn!(subject = %self.inner.subject, %action, %error, ?elapsed_ms, "mutation failed, rolling back");
                if let Some(pending) = pending {
                    self.roll_back(&pending);
                }
                Err(InteractionError::Remote(error))
            }
        };

        self.apply_deferred_refresh();
        outcome
    }

    /// The toggle future was dropped before sending anything.
    fn abandon(&self, action: Action) {
        let pending = self.inner.pending.borrow_mut().remove(&action);
        if let Some(pending) = pending {
            tracing::warn!(subject = %self.inner.subject, %action, "mutation dropped before sending, rolling back");
            self.roll_back(&pending);
        }
        self.apply_deferred_refresh();
    }

    /// The toggle future was dropped while its request was in flight. The
    /// action stays claimed so no second request can go out for it.
    fn detach(&self, action: Action) {
        if let Some(pending) = self.inner.pending.borrow_mut().get_mut(&action) {
            pending.detached = true;
        }
        tracing::warn!(subject = %self.inner.subject, %action, "mutation dropped in flight, holding until refresh");
        self.apply_deferred_refresh();
    }

    fn roll_back(&self, pending: &PendingMutation) {
        let next = self.state().restore(pending.action, &pending.prior_state);
        self.publish(next);
    }

    fn apply_deferred_refresh(&self) {
        if self.awaiting_result() {
            return;
        }
        let deferred = self.inner.deferred_refresh.take();
        if let Some(server) = deferred {
            tracing::debug!(subject = %self.inner.subject, "applying deferred refresh");
            self.reconcile_with(server);
        }
    }

    /// Replace the state, then notify. Observers get a snapshot of the list so
    /// they can subscribe, unsubscribe or toggle from inside the callback.
    fn publish(&self, next: InteractionState) {
        *self.inner.state.borrow_mut() = next.clone();
        let observers: Vec<Observer> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            observer(&next);
        }
    }

    fn record_body(&self, collection: &str) -> serde_json::Value {
        serde_json::json!({
            "$type": collection,
            "subject": {
                "uri": self.inner.subject.to_at_uri(),
                "cid": self.inner.subject_cid,
            },
            "createdAt": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        })
    }
}

/// Releases the action if the toggle future is dropped before it settles.
struct InFlight {
    mutator: Option<OptimisticMutator>,
    action: Action,
    /// Set on first poll, when the remote call is made.
    issued: bool,
}

impl InFlight {
    fn disarm(mut self) {
        self.mutator = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(mutator) = self.mutator.take() {
            if self.issued {
                mutator.detach(self.action);
            } else {
                mutator.abandon(self.action);
            }
        }
    }
}
