//! Loopback implementations of the platform collaborators.

pub mod broker;
pub mod directory;
pub mod fixtures;
pub mod wire;

pub use broker::LoopbackBroker;
pub use directory::Directory;

/// Returns the platform module name for smoke checks.
pub fn module_name() -> &'static str {
    "platform"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{
            session_state::{ConnectionHandle, ConnectionStatus},
            topic::canonical_topic,
        },
        usecases::{
            leases::ConnectionLeases,
            messaging_session::{HistoryOutcome, MessagingSession, SessionSettings},
        },
    };

    type LoopbackSession = MessagingSession<Arc<LoopbackBroker>, Arc<LoopbackBroker>>;

    fn client(broker: &Arc<LoopbackBroker>, user_id: &str) -> LoopbackSession {
        MessagingSession::new(
            Arc::clone(broker),
            Arc::clone(broker),
            ConnectionLeases::new(),
            SessionSettings::new(user_id),
        )
    }

    #[tokio::test]
    async fn direct_message_reaches_peer_and_stays_out_of_broadcast() {
        let broker = Arc::new(LoopbackBroker::new());
        let alice = client(&broker, "alice");
        let bob = client(&broker, "bob");
        let carol = client(&broker, "carol");
        for session in [&alice, &bob, &carol] {
            session.connect("ws-1", "ch-1").await.expect("connect");
        }
        alice
            .set_active_topic(Some(canonical_topic("alice", "bob")))
            .await
            .expect("alice opens dm");
        bob.set_active_topic(Some(canonical_topic("bob", "alice")))
            .await
            .expect("bob opens dm");

        let sent = alice.send_message("hi bob").await.expect("send");

        assert_eq!(bob.drain_inbound(), 1);
        assert_eq!(bob.buffer(), vec![sent.clone()]);
        assert_eq!(alice.drain_inbound(), 1);
        assert_eq!(carol.drain_inbound(), 0);
        assert!(carol.buffer().is_empty());

        let late = client(&broker, "bob");
        late.connect("ws-2", "ch-1").await.expect("connect");
        let outcome = late
            .set_active_topic(Some(canonical_topic("alice", "bob")))
            .await;
        assert_eq!(outcome, Ok(HistoryOutcome::Committed(1)));
        assert_eq!(late.buffer(), vec![sent]);
    }

    #[tokio::test]
    async fn broker_side_close_ends_session() {
        let broker = Arc::new(LoopbackBroker::new());
        let alice = client(&broker, "alice");
        alice.connect("ws-1", "ch-1").await.expect("connect");

        let handle = ConnectionHandle {
            id: 1,
            container_id: "ws-1".to_owned(),
        };
        broker.drop_connection(&handle);
        alice.drain_inbound();

        assert_eq!(alice.connection_status(), ConnectionStatus::Disconnected);
        assert_eq!(
            alice.connect("ws-1", "ch-1").await,
            Ok(HistoryOutcome::Committed(0))
        );
    }

    #[tokio::test]
    async fn moving_channel_after_broker_close_reconnects() {
        let broker = Arc::new(LoopbackBroker::new());
        let alice = client(&broker, "alice");
        alice.connect("ws-1", "ch-1").await.expect("connect");
        broker.drop_connection(&ConnectionHandle {
            id: 1,
            container_id: "ws-1".to_owned(),
        });

        let moved = alice.connect("ws-1", "ch-2").await;

        assert_eq!(moved, Ok(HistoryOutcome::Committed(0)));
        assert_eq!(alice.connection_status(), ConnectionStatus::Connected);
        assert_eq!(alice.channel_id().as_deref(), Some("ch-2"));
        assert_eq!(broker.connection_count(), 1);

        let bob = client(&broker, "bob");
        bob.connect("ws-1", "ch-2").await.expect("connect");
        bob.send_message("still there?").await.expect("send");
        assert_eq!(alice.drain_inbound(), 1);
    }
}
