//! In-process stand-in for the platform's websocket broker and message store.
//!
//! Every published message is encoded into a wire frame once, appended to the
//! channel history and decoded again for each subscriber of that channel.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    domain::{message::Message, page::Page, session_state::ConnectionHandle},
    usecases::contracts::{
        Connection, ConnectionError, FetchError, HistoryQuery, MessageHistory, SortDirection,
        Transport,
    },
};

use super::wire;

const TIME_ORDER: &str = "time";

const BROKER_FRAME_DROPPED: &str = "PLATFORM_BROKER_FRAME_DROPPED";
const BROKER_SUBSCRIBER_PRUNED: &str = "PLATFORM_BROKER_SUBSCRIBER_PRUNED";

#[derive(Debug)]
pub struct LoopbackBroker {
    inner: Mutex<BrokerState>,
}

#[derive(Debug)]
struct BrokerState {
    reachable: bool,
    next_connection_id: u64,
    subscribers: HashMap<u64, Subscriber>,
    frames: HashMap<String, Vec<String>>,
}

#[derive(Debug)]
struct Subscriber {
    channel_id: Option<String>,
    sender: mpsc::UnboundedSender<Message>,
}

impl Default for LoopbackBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackBroker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BrokerState {
                reachable: true,
                next_connection_id: 0,
                subscribers: HashMap::new(),
                frames: HashMap::new(),
            }),
        }
    }

    /// While unreachable, new connections are refused. Live ones keep working.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn set_reachable(&self, reachable: bool) {
        self.state().reachable = reachable;
    }

    /// Closes a connection from the broker side; its inbound stream ends.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn drop_connection(&self, handle: &ConnectionHandle) {
        self.state().subscribers.remove(&handle.id);
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn connection_count(&self) -> usize {
        self.state().subscribers.len()
    }

    /// Stores a message in channel history without delivering it, as if it
    /// had been published before anyone connected.
    pub fn seed_history(&self, channel_id: &str, message: &Message) -> Result<(), FetchError> {
        let frame = wire::encode(message)?;
        self.state()
            .frames
            .entry(channel_id.to_owned())
            .or_default()
            .push(frame);
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for LoopbackBroker {
    async fn connect(&self, container_id: &str) -> Result<Connection, ConnectionError> {
        let mut state = self.state();
        if !state.reachable {
            return Err(ConnectionError::Unreachable(
                "loopback broker is offline".to_owned(),
            ));
        }

        state.next_connection_id += 1;
        let id = state.next_connection_id;
        let (sender, inbound) = mpsc::unbounded_channel();
        state.subscribers.insert(
            id,
            Subscriber {
                channel_id: None,
                sender,
            },
        );

        Ok(Connection {
            handle: ConnectionHandle {
                id,
                container_id: container_id.to_owned(),
            },
            inbound,
        })
    }

    async fn subscribe(
        &self,
        handle: &ConnectionHandle,
        channel_id: &str,
    ) -> Result<(), ConnectionError> {
        let mut state = self.state();
        let subscriber = state
            .subscribers
            .get_mut(&handle.id)
            .ok_or(ConnectionError::Closed)?;
        subscriber.channel_id = Some(channel_id.to_owned());

        Ok(())
    }

    async fn publish(
        &self,
        handle: &ConnectionHandle,
        message: &Message,
    ) -> Result<(), ConnectionError> {
        let frame = wire::encode(message)
            .map_err(|error| ConnectionError::Unreachable(error.to_string()))?;

        let mut state = self.state();
        let channel_id = state
            .subscribers
            .get(&handle.id)
            .ok_or(ConnectionError::Closed)?
            .channel_id
            .clone()
            .ok_or(ConnectionError::NotConnected)?;

        state
            .frames
            .entry(channel_id.clone())
            .or_default()
            .push(frame.clone());

        let delivered = match wire::decode(&frame) {
            Ok(delivered) => delivered,
            Err(error) => {
                tracing::warn!(
                    code = BROKER_FRAME_DROPPED,
                    channel_id = %channel_id,
                    error = %error,
                    "published frame could not be decoded for delivery"
                );
                return Ok(());
            }
        };

        state.subscribers.retain(|id, subscriber| {
            if subscriber.channel_id.as_deref() != Some(channel_id.as_str()) {
                return true;
            }
            let alive = subscriber.sender.send(delivered.clone()).is_ok();
            if !alive {
                tracing::debug!(
                    code = BROKER_SUBSCRIBER_PRUNED,
                    connection_id = *id,
                    "subscriber went away, dropping it"
                );
            }
            alive
        });

        Ok(())
    }

    async fn disconnect(&self, handle: &ConnectionHandle) {
        self.state().subscribers.remove(&handle.id);
    }
}

#[async_trait]
impl MessageHistory for LoopbackBroker {
    async fn list_messages(
        &self,
        channel_id: &str,
        query: HistoryQuery,
    ) -> Result<Page<Message>, FetchError> {
        if query.order != TIME_ORDER {
            return Err(FetchError::InvalidData(format!(
                "unsupported history order: {}",
                query.order
            )));
        }

        let frames = self
            .state()
            .frames
            .get(channel_id)
            .cloned()
            .unwrap_or_default();

        let mut messages = frames
            .iter()
            .map(|frame| wire::decode(frame))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(name) = query.name.as_deref() {
            messages.retain(|message| message.topic.as_str() == name);
        }

        messages.sort_by_key(|message| message.timestamp_nanos);
        if query.dir == SortDirection::Desc {
            messages.reverse();
        }

        Ok(Page::from_collection(messages, query.offset, query.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::topic::{canonical_topic, Topic};

    fn history_query(name: Option<&str>) -> HistoryQuery {
        HistoryQuery {
            offset: 0,
            limit: 100,
            name: name.map(ToOwned::to_owned),
            order: TIME_ORDER.to_owned(),
            dir: SortDirection::Asc,
        }
    }

    async fn subscribed(
        broker: &LoopbackBroker,
        container_id: &str,
        channel_id: &str,
    ) -> Connection {
        let connection = broker.connect(container_id).await.expect("connect");
        broker
            .subscribe(&connection.handle, channel_id)
            .await
            .expect("subscribe");
        connection
    }

    #[tokio::test]
    async fn fans_out_to_subscribers_of_the_same_channel_only() {
        let broker = LoopbackBroker::new();
        let mut sender = subscribed(&broker, "ws-1", "ch-1").await;
        let mut peer = subscribed(&broker, "ws-1", "ch-1").await;
        let mut elsewhere = subscribed(&broker, "ws-1", "ch-2").await;
        let message = Message::new(Topic::new("chat"), "hello", 5, "alice");

        broker
            .publish(&sender.handle, &message)
            .await
            .expect("publish");

        assert_eq!(peer.inbound.try_recv().ok(), Some(message.clone()));
        assert_eq!(sender.inbound.try_recv().ok(), Some(message));
        assert!(elsewhere.inbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_before_subscribe_is_rejected() {
        let broker = LoopbackBroker::new();
        let connection = broker.connect("ws-1").await.expect("connect");

        let result = broker
            .publish(&connection.handle, &Message::new(Topic::new("chat"), "x", 1, "a"))
            .await;

        assert_eq!(result, Err(ConnectionError::NotConnected));
    }

    #[tokio::test]
    async fn unreachable_broker_refuses_connections() {
        let broker = LoopbackBroker::new();
        broker.set_reachable(false);

        let result = broker.connect("ws-1").await;

        assert!(matches!(result, Err(ConnectionError::Unreachable(_))));
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned_on_publish() {
        let broker = LoopbackBroker::new();
        let sender = subscribed(&broker, "ws-1", "ch-1").await;
        drop(subscribed(&broker, "ws-1", "ch-1").await);

        broker
            .publish(&sender.handle, &Message::new(Topic::new("chat"), "x", 1, "a"))
            .await
            .expect("publish");

        assert_eq!(broker.connection_count(), 1);
    }

    #[tokio::test]
    async fn history_filters_by_topic_and_sorts_by_time() {
        let broker = LoopbackBroker::new();
        let dm = canonical_topic("alice", "bob");
        for (topic, value, at) in [(&dm, "second", 20), (&dm, "first", 10)] {
            broker
                .seed_history("ch-1", &Message::new(topic.clone(), value, at, "alice"))
                .expect("seed");
        }
        broker
            .seed_history("ch-1", &Message::new(Topic::new("chat"), "broadcast", 15, "bob"))
            .expect("seed");

        let page = broker
            .list_messages("ch-1", history_query(Some(dm.as_str())))
            .await
            .expect("history");

        let values: Vec<_> = page.items.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, ["first", "second"]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn history_pages_in_descending_order() {
        let broker = LoopbackBroker::new();
        for at in 1..=5 {
            broker
                .seed_history(
                    "ch-1",
                    &Message::new(Topic::new("chat"), at.to_string(), at, "alice"),
                )
                .expect("seed");
        }
        let query = HistoryQuery {
            offset: 1,
            limit: 2,
            dir: SortDirection::Desc,
            ..history_query(None)
        };

        let page = broker.list_messages("ch-1", query).await.expect("history");

        let values: Vec<_> = page.items.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, ["4", "3"]);
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn unknown_channel_has_empty_history() {
        let broker = LoopbackBroker::new();

        let page = broker
            .list_messages("nowhere", history_query(None))
            .await
            .expect("history");

        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn rejects_unknown_order() {
        let broker = LoopbackBroker::new();
        let query = HistoryQuery {
            order: "publisher".to_owned(),
            ..history_query(None)
        };

        let result = broker.list_messages("ch-1", query).await;

        assert!(matches!(result, Err(FetchError::InvalidData(_))));
    }
}
