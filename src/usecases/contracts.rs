//! Collaborator contracts the core talks to. Platform adapters implement these;
//! tests substitute stubs.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::{
    entity::EntityKind,
    message::Message,
    page::{Page, PageQuery, RawPage},
    principal::Principal,
    session_state::ConnectionHandle,
};

/// Transport-level failures. Surfaced to the caller, never retried here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("transport unreachable: {0}")]
    Unreachable(String),
    #[error("container {0} already has a live session on this client")]
    ContainerBusy(String),
    #[error("session is not connected")]
    NotConnected,
    #[error("connection closed by transport")]
    Closed,
}

/// Raw page, history or principal lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("entity {0} not found")]
    NotFound(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// A freshly opened connection and the stream of frames it receives.
#[derive(Debug)]
pub struct Connection {
    pub handle: ConnectionHandle,
    pub inbound: mpsc::UnboundedReceiver<Message>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a connection scoped to one workspace.
    async fn connect(&self, container_id: &str) -> Result<Connection, ConnectionError>;

    /// Points the connection at the channel whose frames it should receive
    /// and publish to.
    async fn subscribe(
        &self,
        handle: &ConnectionHandle,
        channel_id: &str,
    ) -> Result<(), ConnectionError>;

    /// Enqueues a message; delivery and acknowledgement belong to the transport.
    async fn publish(
        &self,
        handle: &ConnectionHandle,
        message: &Message,
    ) -> Result<(), ConnectionError>;

    async fn disconnect(&self, handle: &ConnectionHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    #[cfg_attr(not(test), allow(dead_code))]
    Desc,
}

/// Parameters of a channel history read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub offset: usize,
    pub limit: usize,
    /// Topic name filter; `None` returns the whole channel.
    pub name: Option<String>,
    pub order: String,
    pub dir: SortDirection,
}

#[async_trait]
pub trait MessageHistory: Send + Sync {
    async fn list_messages(
        &self,
        channel_id: &str,
        query: HistoryQuery,
    ) -> Result<Page<Message>, FetchError>;
}

/// One listing request as the raw page fetcher receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub kind: EntityKind,
    /// Workspace, channel or role the listing is scoped to.
    pub container_id: Option<String>,
    pub query: PageQuery,
}

#[async_trait]
pub trait RawPageFetcher: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<RawPage, FetchError>;
}

#[async_trait]
pub trait PrincipalLookup: Send + Sync {
    async fn lookup(&self, principal_id: &str) -> Result<Principal, FetchError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn connect(&self, container_id: &str) -> Result<Connection, ConnectionError> {
        (**self).connect(container_id).await
    }

    async fn subscribe(
        &self,
        handle: &ConnectionHandle,
        channel_id: &str,
    ) -> Result<(), ConnectionError> {
        (**self).subscribe(handle, channel_id).await
    }

    async fn publish(
        &self,
        handle: &ConnectionHandle,
        message: &Message,
    ) -> Result<(), ConnectionError> {
        (**self).publish(handle, message).await
    }

    async fn disconnect(&self, handle: &ConnectionHandle) {
        (**self).disconnect(handle).await
    }
}

#[async_trait]
impl<T> MessageHistory for Arc<T>
where
    T: MessageHistory + ?Sized,
{
    async fn list_messages(
        &self,
        channel_id: &str,
        query: HistoryQuery,
    ) -> Result<Page<Message>, FetchError> {
        (**self).list_messages(channel_id, query).await
    }
}

#[async_trait]
impl<T> RawPageFetcher for Arc<T>
where
    T: RawPageFetcher + ?Sized,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<RawPage, FetchError> {
        (**self).fetch_page(request).await
    }
}

#[async_trait]
impl<T> PrincipalLookup for Arc<T>
where
    T: PrincipalLookup + ?Sized,
{
    async fn lookup(&self, principal_id: &str) -> Result<Principal, FetchError> {
        (**self).lookup(principal_id).await
    }
}
