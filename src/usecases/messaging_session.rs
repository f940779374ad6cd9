//! One conversation view over a shared transport connection.
//!
//! Session state lives behind a std mutex that is only taken between awaits;
//! overlapping calls on a shared session interleave at network calls only, and
//! history from a superseded topic switch is discarded by generation.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::domain::{
    message::Message,
    session_state::{ConnectionHandle, ConnectionStatus, SessionState},
    topic::{Topic, DEFAULT_BROADCAST_TOPIC},
};

use super::{
    contracts::{ConnectionError, FetchError, MessageHistory, Transport},
    leases::{ConnectionLeases, ContainerLease},
    load_history::{load_history, LoadHistoryQuery},
    send_message::{send_message as publish_message, SendError, SendMessageCommand},
};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

const MESSAGING_CONNECT_FAILED: &str = "MESSAGING_CONNECT_FAILED";
const MESSAGING_HISTORY_FAILED: &str = "MESSAGING_HISTORY_FAILED";
const MESSAGING_HISTORY_STALE_DROPPED: &str = "MESSAGING_HISTORY_STALE_DROPPED";
const MESSAGING_TRANSPORT_CLOSED: &str = "MESSAGING_TRANSPORT_CLOSED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Publisher id stamped on outgoing messages.
    pub user_id: String,
    pub broadcast_topic: Topic,
    pub history_limit: usize,
}

impl SessionSettings {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            broadcast_topic: Topic::broadcast(DEFAULT_BROADCAST_TOPIC),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_broadcast_topic(mut self, topic: Topic) -> Self {
        self.broadcast_topic = topic;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

/// What became of the history backfill a call triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// Buffer replaced; carries the number of buffered messages.
    Committed(usize),
    /// A newer topic switch won the race.
    Stale,
    /// Nothing to load: not connected, or already on the requested target.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("history backfill failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Resources owned by a live connection. Dropping it releases the lease.
struct Link {
    inbound: mpsc::UnboundedReceiver<Message>,
    _lease: ContainerLease,
}

pub struct MessagingSession<T, H> {
    transport: T,
    history: H,
    leases: ConnectionLeases,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    link: Mutex<Option<Link>>,
}

impl<T, H> MessagingSession<T, H>
where
    T: Transport,
    H: MessageHistory,
{
    pub fn new(transport: T, history: H, leases: ConnectionLeases, settings: SessionSettings) -> Self {
        let state = SessionState::new(settings.broadcast_topic.clone());

        Self {
            transport,
            history,
            leases,
            settings,
            state: Mutex::new(state),
            link: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn buffer(&self) -> Vec<Message> {
        self.state().buffer().to_vec()
    }

    pub fn active_topic(&self) -> Option<Topic> {
        self.state().active_topic().cloned()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.state().status()
    }

    pub fn channel_id(&self) -> Option<String> {
        self.state().channel_id().map(ToOwned::to_owned)
    }

    /// Connects to `container_id` and subscribes to `channel_id`, then reloads
    /// history for the current topic.
    ///
    /// Calling again for the live container only retargets the channel. A
    /// different container replaces the live connection.
    pub async fn connect(
        &self,
        container_id: &str,
        channel_id: &str,
    ) -> Result<HistoryOutcome, SessionError> {
        let (status, mut live_container, live_channel, handle) = {
            let state = self.state();
            (
                state.status(),
                state.container_id().map(ToOwned::to_owned),
                state.channel_id().map(ToOwned::to_owned),
                state.handle().cloned(),
            )
        };

        if live_container.as_deref() == Some(container_id) {
            let handle = match (status, handle) {
                (ConnectionStatus::Connected, Some(handle))
                    if live_channel.as_deref() != Some(channel_id) =>
                {
                    handle
                }
                _ => return Ok(HistoryOutcome::Skipped),
            };

            match self.retarget(&handle, channel_id).await {
                // The broker already dropped the connection; open a new one.
                Err(SessionError::Connection(ConnectionError::Closed)) => {
                    self.drop_lost_connection();
                    live_container = None;
                }
                outcome => return outcome,
            }
        }

        if live_container.is_some() {
            self.disconnect().await;
        }

        let lease = self.leases.acquire(container_id)?;
        self.state().begin_connect(container_id);

        let connection = match self.transport.connect(container_id).await {
            Ok(connection) => connection,
            Err(error) => {
                self.state().fail_connect();
                tracing::warn!(
                    code = MESSAGING_CONNECT_FAILED,
                    container_id,
                    error = %error,
                    "transport connect failed"
                );
                return Err(error.into());
            }
        };

        if let Err(error) = self.transport.subscribe(&connection.handle, channel_id).await {
            self.transport.disconnect(&connection.handle).await;
            self.state().fail_connect();
            tracing::warn!(
                code = MESSAGING_CONNECT_FAILED,
                container_id,
                channel_id,
                error = %error,
                "channel subscribe failed"
            );
            return Err(error.into());
        }

        let superseded = {
            let mut state = self.state();
            if state.container_id() == Some(container_id) {
                state.finish_connect(connection.handle.clone());
                state.select_channel(channel_id);
                false
            } else {
                true
            }
        };
        if superseded {
            // A disconnect landed while the transport was connecting.
            self.transport.disconnect(&connection.handle).await;
            return Err(ConnectionError::Closed.into());
        }

        *self.link() = Some(Link {
            inbound: connection.inbound,
            _lease: lease,
        });
        tracing::info!(
            container_id,
            channel_id,
            connection_id = connection.handle.id,
            "messaging session connected"
        );

        self.restore_topic().await
    }

    /// Switches the conversation and reloads its history.
    ///
    /// The buffer is emptied before this call first suspends. `None` returns to
    /// the broadcast stream.
    pub async fn set_active_topic(&self, topic: Option<Topic>) -> Result<HistoryOutcome, FetchError> {
        let request = self.state().switch_topic(topic);
        let Some(channel_id) = request.channel_id.clone() else {
            return Ok(HistoryOutcome::Skipped);
        };

        let query = LoadHistoryQuery::new(channel_id.as_str(), request.topic.clone())
            .with_limit(self.settings.history_limit);
        let loaded = load_history(&self.history, query).await;

        let mut state = self.state();
        if state.generation() != request.generation {
            tracing::debug!(
                code = MESSAGING_HISTORY_STALE_DROPPED,
                channel_id = %channel_id,
                request_generation = request.generation,
                current_generation = state.generation(),
                "dropping history from superseded topic switch"
            );
            return Ok(HistoryOutcome::Stale);
        }

        match loaded {
            Ok(messages) => {
                state.commit_history(&request, messages);
                Ok(HistoryOutcome::Committed(state.buffer().len()))
            }
            Err(error) => {
                tracing::warn!(
                    code = MESSAGING_HISTORY_FAILED,
                    channel_id = %channel_id,
                    topic = state.topic_filter().as_str(),
                    error = %error,
                    "history backfill failed"
                );
                Err(error)
            }
        }
    }

    /// Publishes on the current topic as the session identity. The buffer only
    /// changes once the transport delivers the message back.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<Message, SendError> {
        let (handle, topic) = {
            let state = self.state();
            let handle = state.handle().cloned().ok_or(ConnectionError::NotConnected)?;
            (handle, state.topic_filter().clone())
        };

        let command = SendMessageCommand {
            topic,
            publisher_id: self.settings.user_id.clone(),
            text: text.into(),
        };

        publish_message(&self.transport, &handle, command).await
    }

    /// Buffers an inbound message if it belongs to the current topic.
    pub fn deliver(&self, message: Message) -> bool {
        self.state().deliver(message)
    }

    /// Delivers every frame waiting on the connection, in arrival order, and
    /// returns how many were buffered.
    pub fn drain_inbound(&self) -> usize {
        let mut link = self.link();
        let Some(active) = link.as_mut() else {
            return 0;
        };

        let mut received = Vec::new();
        let closed = loop {
            match active.inbound.try_recv() {
                Ok(message) => received.push(message),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };
        if closed {
            *link = None;
        }
        drop(link);

        let mut state = self.state();
        let delivered = received
            .into_iter()
            .filter(|message| state.deliver(message.clone()))
            .count();

        if closed {
            report_lost(state.connection_lost());
        }

        delivered
    }

    /// Closes the connection, releases the container and clears the buffer.
    pub async fn disconnect(&self) {
        let handle = self.state().disconnect();
        let link = self.link().take();

        if let Some(handle) = handle {
            self.transport.disconnect(&handle).await;
            tracing::info!(
                container_id = %handle.container_id,
                connection_id = handle.id,
                "messaging session disconnected"
            );
        }

        drop(link);
    }

    async fn retarget(
        &self,
        handle: &ConnectionHandle,
        channel_id: &str,
    ) -> Result<HistoryOutcome, SessionError> {
        self.transport.subscribe(handle, channel_id).await?;
        self.state().select_channel(channel_id);
        tracing::debug!(
            container_id = %handle.container_id,
            channel_id,
            "messaging session moved to another channel"
        );

        self.restore_topic().await
    }

    /// Forgets a connection the transport closed, keeping buffer and channel.
    fn drop_lost_connection(&self) {
        let lost = self.state().connection_lost();
        drop(self.link().take());
        report_lost(lost);
    }

    async fn restore_topic(&self) -> Result<HistoryOutcome, SessionError> {
        let topic = self.active_topic();
        Ok(self.set_active_topic(topic).await?)
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn link(&self) -> MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn report_lost(handle: Option<ConnectionHandle>) {
    tracing::warn!(
        code = MESSAGING_TRANSPORT_CLOSED,
        connection_id = handle.as_ref().map(|handle| handle.id),
        "transport closed the connection"
    );
}
