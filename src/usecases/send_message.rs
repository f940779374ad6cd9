//! Use case for publishing a message on the active topic.
//!
//! The message is handed to the transport only; it reaches the session buffer
//! when the transport delivers it back.

use thiserror::Error;

use crate::domain::{
    message::{wall_clock_nanos, Message},
    session_state::ConnectionHandle,
    topic::Topic,
};

use super::contracts::{ConnectionError, Transport};

/// Command to publish `text` on `topic` as `publisher_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub topic: Topic,
    pub publisher_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// Message text is empty after trimming whitespace.
    #[error("message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Builds the outgoing message stamped with the current wall clock.
///
/// # Errors
/// Returns `SendError::EmptyMessage` if the text is empty or whitespace.
pub fn compose_message(command: SendMessageCommand) -> Result<Message, SendError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendError::EmptyMessage);
    }

    Ok(Message::new(
        command.topic,
        text,
        wall_clock_nanos(),
        command.publisher_id,
    ))
}

/// Validates and publishes a message, returning what was handed to the transport.
pub async fn send_message(
    transport: &dyn Transport,
    handle: &ConnectionHandle,
    command: SendMessageCommand,
) -> Result<Message, SendError> {
    let message = compose_message(command)?;
    transport.publish(handle, &message).await?;

    Ok(message)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::usecases::contracts::Connection;

    struct StubTransport {
        result: Result<(), ConnectionError>,
        published: Mutex<Vec<Message>>,
    }

    impl StubTransport {
        fn with_result(result: Result<(), ConnectionError>) -> Self {
            Self {
                result,
                published: Mutex::new(Vec::new()),
            }
        }

        fn published(&self) -> Vec<Message> {
            self.published.lock().expect("published lock").clone()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn connect(&self, _container_id: &str) -> Result<Connection, ConnectionError> {
            Err(ConnectionError::Unreachable("stub".to_owned()))
        }

        async fn subscribe(
            &self,
            _handle: &ConnectionHandle,
            _channel_id: &str,
        ) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn publish(
            &self,
            _handle: &ConnectionHandle,
            message: &Message,
        ) -> Result<(), ConnectionError> {
            self.published
                .lock()
                .expect("published lock")
                .push(message.clone());
            self.result.clone()
        }

        async fn disconnect(&self, _handle: &ConnectionHandle) {}
    }

    fn handle() -> ConnectionHandle {
        ConnectionHandle {
            id: 7,
            container_id: "ws-1".to_owned(),
        }
    }

    fn command(text: &str) -> SendMessageCommand {
        SendMessageCommand {
            topic: Topic::new("alice-bob"),
            publisher_id: "alice".to_owned(),
            text: text.to_owned(),
        }
    }

    #[tokio::test]
    async fn rejects_empty_message_text() {
        let transport = StubTransport::with_result(Ok(()));

        let result = send_message(&transport, &handle(), command("")).await;

        assert_eq!(result, Err(SendError::EmptyMessage));
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn rejects_whitespace_only_message() {
        let transport = StubTransport::with_result(Ok(()));

        let result = send_message(&transport, &handle(), command("   \n\t  ")).await;

        assert_eq!(result, Err(SendError::EmptyMessage));
    }

    #[tokio::test]
    async fn trims_and_stamps_before_publishing() {
        let transport = StubTransport::with_result(Ok(()));

        let sent = send_message(&transport, &handle(), command("  hello world  "))
            .await
            .expect("send should succeed");

        assert_eq!(sent.value, "hello world");
        assert_eq!(sent.topic.as_str(), "alice-bob");
        assert_eq!(sent.publisher_id, "alice");
        assert!(sent.timestamp_nanos > 0);
        assert_eq!(transport.published(), vec![sent]);
    }

    #[tokio::test]
    async fn maps_transport_failure() {
        let transport = StubTransport::with_result(Err(ConnectionError::Closed));

        let result = send_message(&transport, &handle(), command("hello")).await;

        assert_eq!(result, Err(SendError::Connection(ConnectionError::Closed)));
    }
}
