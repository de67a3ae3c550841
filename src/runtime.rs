// SPDX-License-Identifier: MPL-2.0

//! Process-wide runtime for network requests.
//!
//! Feed items live on the UI thread and are not `Send`; the requests they
//! trigger run here and are awaited through their join handles, which works
//! from any executor (a glib main context, a tokio `LocalSet`, a test).

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::Runtime;

/// Two workers are plenty for I/O-bound XRPC calls.
static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("hangar-feed-net")
        .build()
        .expect("failed to create async runtime")
});

pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUNTIME.spawn(future)
}
