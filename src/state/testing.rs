// SPDX-License-Identifier: MPL-2.0

//! In-memory remote for exercising toggles without a network.

use crate::atproto::{ContentUri, RemoteClient, RemoteError, Viewer};
use crate::state::{ClientSettings, InteractionContext};
use async_trait::async_trait;
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub fn uri(raw: &str) -> ContentUri {
    ContentUri::parse(raw).unwrap()
}

pub fn context(remote: &Rc<ScriptedRemote>) -> Rc<InteractionContext> {
    let remote: Rc<dyn RemoteClient> = remote.clone();
    Rc::new(InteractionContext::new(
        Viewer::new("did:plc:viewer").unwrap(),
        ClientSettings::default(),
        remote,
    ))
}

/// A scripted answer. A gated one suspends the call until the test sends the
/// result; dropping the sender fails the call with a network error, keeping
/// it unsent leaves the call hanging.
enum Reply<T> {
    Ready(Result<T, RemoteError>),
    Gated(oneshot::Receiver<Result<T, RemoteError>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T, RemoteError> {
        match self {
            Reply::Ready(result) => result,
            Reply::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(RemoteError::Network("gate closed".into()))),
        }
    }
}

pub type Gate<T> = oneshot::Sender<Result<T, RemoteError>>;

/// Answers each call with the next scripted result, in order. Unscripted
/// calls fail with a network error.
#[derive(Default)]
pub struct ScriptedRemote {
    create_results: RefCell<VecDeque<Reply<ContentUri>>>,
    delete_results: RefCell<VecDeque<Reply<()>>>,
    creates: RefCell<Vec<(String, serde_json::Value)>>,
    deletes: RefCell<Vec<ContentUri>>,
}

impl ScriptedRemote {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn push_create(&self, result: Result<ContentUri, RemoteError>) {
        self.create_results.borrow_mut().push_back(Reply::Ready(result));
    }

    pub fn push_delete(&self, result: Result<(), RemoteError>) {
        self.delete_results.borrow_mut().push_back(Reply::Ready(result));
    }

    /// The next create waits for the returned gate.
    pub fn push_create_gated(&self) -> Gate<ContentUri> {
        let (tx, rx) = oneshot::channel();
        self.create_results.borrow_mut().push_back(Reply::Gated(rx));
        tx
    }

    /// The next delete waits for the returned gate.
    pub fn push_delete_gated(&self) -> Gate<()> {
        let (tx, rx) = oneshot::channel();
        self.delete_results.borrow_mut().push_back(Reply::Gated(rx));
        tx
    }

    pub fn creates(&self) -> Vec<(String, serde_json::Value)> {
        self.creates.borrow().clone()
    }

    pub fn deletes(&self) -> Vec<ContentUri> {
        self.deletes.borrow().clone()
    }
}

#[async_trait(?Send)]
impl RemoteClient for ScriptedRemote {
    async fn create_record(
        &self,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<ContentUri, RemoteError> {
        self.creates
            .borrow_mut()
            .push((collection.to_string(), body));
        let reply = self.create_results.borrow_mut().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Err(RemoteError::Network("unscripted create".into())),
        }
    }

    async fn delete_record(&self, uri: &ContentUri) -> Result<(), RemoteError> {
        self.deletes.borrow_mut().push(uri.clone());
        let reply = self.delete_results.borrow_mut().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Err(RemoteError::Network("unscripted delete".into())),
        }
    }
}
