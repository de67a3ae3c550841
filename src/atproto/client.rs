// SPDX-License-Identifier: MPL-2.0

use crate::atproto::types::{Author, FeedItemSnapshot, PostRecord, Session, Viewer};
use crate::atproto::{ContentUri, RemoteClient, RemoteError, UriError};
use crate::runtime;
use crate::state::{ClientSettings, InteractionState};
use async_trait::async_trait;
use atrium_api::agent::atp_agent::AtpAgent;
use atrium_api::agent::atp_agent::store::MemorySessionStore;
use atrium_api::com::atproto::repo::{create_record, delete_record};
use atrium_api::types::Unknown;
use atrium_xrpc_client::reqwest::ReqwestClient;
use std::future::Future;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<UriError> for ClientError {
    fn from(e: UriError) -> Self {
        ClientError::InvalidResponse(e.to_string())
    }
}

type Agent = AtpAgent<MemorySessionStore, ReqwestClient>;

/// Map an XRPC failure onto the interaction layer's error taxonomy.
fn classify(status: Option<u16>, message: String) -> RemoteError {
    match status {
        Some(400) => RemoteError::Validation(message),
        Some(404) => RemoteError::NotFound(message),
        Some(401) => RemoteError::NotAuthenticated,
        _ => RemoteError::Network(message),
    }
}

fn response_status<E: std::fmt::Debug>(error: &atrium_api::xrpc::Error<E>) -> Option<u16> {
    match error {
        atrium_api::xrpc::Error::XrpcResponse(response) => Some(response.status.as_u16()),
        _ => None,
    }
}

/// Content service client over atrium. Requests run on the shared runtime so
/// the thread that owns the feed items only ever awaits their results.
#[derive(Clone)]
pub struct AtprotoRemote {
    agent: Arc<RwLock<Option<Arc<Agent>>>>,
    service_url: String,
}

impl AtprotoRemote {
    pub fn new(settings: &ClientSettings) -> Self {
        Self {
            agent: Arc::new(RwLock::new(None)),
            service_url: settings.service_url.clone(),
        }
    }

    fn agent(&self) -> Result<Arc<Agent>, RemoteError> {
        let guard = self
            .agent
            .read()
            .map_err(|_| RemoteError::Network("agent lock poisoned".into()))?;
        guard.clone().ok_or(RemoteError::NotAuthenticated)
    }

    fn set_agent(&self, agent: Option<Agent>) {
        match self.agent.write() {
            Ok(mut guard) => *guard = agent.map(Arc::new),
            Err(poisoned) => *poisoned.into_inner() = agent.map(Arc::new),
        }
    }

    /// Run `request` on the shared runtime and wait for it from here.
    async fn on_runtime<T, F>(request: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>> + Send + 'static,
        T: Send + 'static,
    {
        runtime::spawn(request)
            .await
            .map_err(|e| RemoteError::Network(format!("request task failed: {e}")))?
    }

    pub async fn login(&self, handle: &str, password: &str) -> Result<Session, ClientError> {
        let service_url = self.service_url.clone();
        let handle = handle.to_string();
        let password = password.to_string();

        let (agent, session) = runtime::spawn(async move {
            let agent = AtpAgent::new(ReqwestClient::new(&service_url), MemorySessionStore::default());
            let result = agent
                .login(&handle, &password)
                .await
                .map_err(|e| ClientError::Auth(e.to_string()))?;
            let session = Session {
                did: result.data.did.to_string(),
                handle: result.data.handle.to_string(),
                access_jwt: result.data.access_jwt.clone(),
                refresh_jwt: result.data.refresh_jwt.clone(),
            };
            Ok::<_, ClientError>((agent, session))
        })
        .await
        .map_err(|e| ClientError::Auth(format!("login task failed: {e}")))??;

        self.set_agent(Some(agent));
        tracing::info!(did = %session.did, "logged in");
        Ok(session)
    }

    pub async fn resume_session(&self, session: &Session) -> Result<(), ClientError> {
        let service_url = self.service_url.clone();
        let atrium_session = atrium_api::agent::atp_agent::AtpSession::from(
            atrium_api::com::atproto::server::create_session::OutputData {
                access_jwt: session.access_jwt.clone(),
                active: None,
                did: session
                    .did
                    .parse()
                    .map_err(|e| ClientError::Auth(format!("invalid DID: {e}")))?,
                did_doc: None,
                email: None,
                email_auth_factor: None,
                email_confirmed: None,
                handle: session
                    .handle
                    .parse()
                    .map_err(|e| ClientError::Auth(format!("invalid handle: {e}")))?,
                refresh_jwt: session.refresh_jwt.clone(),
                status: None,
            },
        );

        let agent = runtime::spawn(async move {
            let agent = AtpAgent::new(ReqwestClient::new(&service_url), MemorySessionStore::default());
            agent
                .resume_session(atrium_session)
                .await
                .map_err(|e| ClientError::Auth(e.to_string()))?;
            Ok::<_, ClientError>(agent)
        })
        .await
        .map_err(|e| ClientError::Auth(format!("resume task failed: {e}")))??;

        self.set_agent(Some(agent));
        Ok(())
    }

    pub async fn session(&self) -> Option<Session> {
        let agent = self.agent().ok()?;
        let atrium_session = Self::on_runtime(async move { Ok(agent.get_session().await) })
            .await
            .ok()??;

        Some(Session {
            did: atrium_session.data.did.to_string(),
            handle: atrium_session.data.handle.to_string(),
            access_jwt: atrium_session.data.access_jwt.clone(),
            refresh_jwt: atrium_session.data.refresh_jwt.clone(),
        })
    }

    /// The logged-in account as the acting viewer.
    pub async fn viewer(&self) -> Result<Viewer, ClientError> {
        let session = self.session().await.ok_or(RemoteError::NotAuthenticated)?;
        Ok(session.viewer()?)
    }

    pub fn clear_session(&self) {
        self.set_agent(None);
    }

    /// Current server view of the given posts, for refreshing feed items.
    pub async fn get_posts(&self, uris: &[ContentUri]) -> Result<Vec<FeedItemSnapshot>, ClientError> {
        let agent = self.agent()?;
        let uris: Vec<String> = uris.iter().map(ContentUri::to_at_uri).collect();

        let posts = Self::on_runtime(async move {
            let params = atrium_api::app::bsky::feed::get_posts::ParametersData { uris };
            let output = agent
                .api
                .app
                .bsky
                .feed
                .get_posts(params.into())
                .await
                .map_err(|e| classify(response_status(&e), e.to_string()))?;
            Ok(output.data.posts)
        })
        .await?;

        posts
            .iter()
            .map(|post| convert_post_view(post, None))
            .collect()
    }

    /// One page of the home timeline. The cursor is passed through untouched.
    pub async fn get_timeline(
        &self,
        cursor: Option<&str>,
    ) -> Result<(Vec<FeedItemSnapshot>, Option<String>), ClientError> {
        let agent = self.agent()?;
        let cursor = cursor.map(String::from);

        let (feed, cursor) = Self::on_runtime(async move {
            let params = atrium_api::app::bsky::feed::get_timeline::ParametersData {
                algorithm: None,
                cursor,
                limit: None,
            };
            let output = agent
                .api
                .app
                .bsky
                .feed
                .get_timeline(params.into())
                .await
                .map_err(|e| classify(response_status(&e), e.to_string()))?;
            Ok((output.data.feed, output.data.cursor))
        })
        .await?;

        let items = feed
            .iter()
            .map(|feed_view| {
                convert_post_view(
                    &feed_view.data.post,
                    extract_repost_reason(&feed_view.data.reason),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, cursor))
    }
}

#[async_trait(?Send)]
impl RemoteClient for AtprotoRemote {
    async fn create_record(
        &self,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<ContentUri, RemoteError> {
        let agent = self.agent()?;
        let collection = collection.to_string();

        let uri: String = Self::on_runtime(async move {
            let session = agent
                .get_session()
                .await
                .ok_or(RemoteError::NotAuthenticated)?;
            let record: Unknown = serde_json::from_value(body)
                .map_err(|e| RemoteError::Validation(e.to_string()))?;
            let collection = atrium_api::types::string::Nsid::new(collection)
                .map_err(|e| RemoteError::Validation(format!("invalid collection: {e}")))?;

            let input = create_record::InputData {
                collection,
                record,
                repo: session.data.did.clone().into(),
                rkey: None,
                swap_commit: None,
                validate: None,
            };

            let output = agent
                .api
                .com
                .atproto
                .repo
                .create_record(input.into())
                .await
                .map_err(|e| classify(response_status(&e), e.to_string()))?;
            Ok(output.data.uri.to_string())
        })
        .await?;

        ContentUri::parse(&uri).map_err(|e| RemoteError::Validation(e.to_string()))
    }

    async fn delete_record(&self, uri: &ContentUri) -> Result<(), RemoteError> {
        let agent = self.agent()?;
        let rkey = uri
            .record_key()
            .ok_or_else(|| RemoteError::Validation(format!("{uri} does not name a record")))?
            .to_string();
        let rkey = atrium_api::types::string::RecordKey::new(rkey)
            .map_err(|e| RemoteError::Validation(format!("invalid record key: {e}")))?;
        let repo: atrium_api::types::string::AtIdentifier = uri
            .authority()
            .parse()
            .map_err(|_| RemoteError::Validation(format!("invalid repo: {}", uri.authority())))?;
        let collection = atrium_api::types::string::Nsid::new(uri.collection().to_string())
            .map_err(|e| RemoteError::Validation(format!("invalid collection: {e}")))?;

        Self::on_runtime(async move {
            let input = delete_record::InputData {
                collection,
                repo,
                rkey,
                swap_commit: None,
                swap_record: None,
            };

            agent
                .api
                .com
                .atproto
                .repo
                .delete_record(input.into())
                .await
                .map_err(|e| classify(response_status(&e), e.to_string()))?;
            Ok(())
        })
        .await
    }
}

fn author_from(
    did: String,
    handle: String,
    display_name: Option<String>,
    avatar: Option<String>,
) -> Author {
    Author {
        did,
        handle,
        display_name,
        avatar,
    }
}

fn convert_post_view(
    post_view: &atrium_api::app::bsky::feed::defs::PostView,
    reposted_by: Option<Author>,
) -> Result<FeedItemSnapshot, ClientError> {
    let author = &post_view.data.author;
    let record = extract_post_record(&post_view.data.record);

    let (viewer_like, viewer_repost) = post_view
        .data
        .viewer
        .as_ref()
        .map(|v| (v.data.like.clone(), v.data.repost.clone()))
        .unwrap_or((None, None));

    let state = InteractionState {
        reply_count: count(post_view.data.reply_count),
        repost_count: count(post_view.data.repost_count),
        like_count: count(post_view.data.like_count),
        viewer_repost: viewer_repost.as_deref().map(ContentUri::parse).transpose()?,
        viewer_like: viewer_like.as_deref().map(ContentUri::parse).transpose()?,
    };

    Ok(FeedItemSnapshot {
        uri: ContentUri::parse(&post_view.data.uri)?,
        cid: post_view.data.cid.as_ref().to_string(),
        author: author_from(
            author.data.did.to_string(),
            author.data.handle.to_string(),
            author.data.display_name.clone(),
            author.data.avatar.clone(),
        ),
        record,
        indexed_at: post_view.data.indexed_at.as_str().to_string(),
        reposted_by,
        state,
    })
}

fn count(raw: Option<i64>) -> u32 {
    raw.map(|c| c.clamp(0, u32::MAX as i64) as u32)
        .unwrap_or_default()
}

/// Who reposted this into the feed, if that is why it is there.
fn extract_repost_reason(
    reason: &Option<
        atrium_api::types::Union<atrium_api::app::bsky::feed::defs::FeedViewPostReasonRefs>,
    >,
) -> Option<Author> {
    use atrium_api::app::bsky::feed::defs::FeedViewPostReasonRefs;
    use atrium_api::types::Union;

    let Union::Refs(FeedViewPostReasonRefs::ReasonRepost(repost)) = reason.as_ref()? else {
        return None;
    };

    Some(author_from(
        repost.data.by.data.did.to_string(),
        repost.data.by.data.handle.to_string(),
        repost.data.by.data.display_name.clone(),
        repost.data.by.data.avatar.clone(),
    ))
}

fn extract_post_record(record: &Unknown) -> PostRecord {
    match record {
        Unknown::Object(map) => {
            let text = map
                .get("text")
                .and_then(|dm| serde_json::to_value(dm).ok())
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();

            let created_at = map
                .get("createdAt")
                .and_then(|dm| serde_json::to_value(dm).ok())
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();

            PostRecord { text, created_at }
        }
        _ => PostRecord {
            text: String::new(),
            created_at: String::new(),
        },
    }
}
