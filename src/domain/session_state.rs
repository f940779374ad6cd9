use super::{message::Message, topic::Topic};

/// Identifies one live transport connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    pub id: u64,
    pub container_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { container_id: String },
    Connected { handle: ConnectionHandle },
}

/// Everything a history backfill needs to know about the moment it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub generation: u64,
    /// `None` when there is nothing to backfill from yet.
    pub channel_id: Option<String>,
    /// Topic name filter; `None` reads the broadcast stream.
    pub topic: Option<Topic>,
}

/// Connection, subscription target and message buffer of one conversation view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    connection: ConnectionState,
    channel_id: Option<String>,
    active_topic: Option<Topic>,
    broadcast_topic: Topic,
    buffer: Vec<Message>,
    generation: u64,
}

impl SessionState {
    pub fn new(broadcast_topic: Topic) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            channel_id: None,
            active_topic: None,
            broadcast_topic,
            buffer: Vec::new(),
            generation: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.connection {
            ConnectionState::Disconnected => ConnectionStatus::Disconnected,
            ConnectionState::Connecting { .. } => ConnectionStatus::Connecting,
            ConnectionState::Connected { .. } => ConnectionStatus::Connected,
        }
    }

    pub fn handle(&self) -> Option<&ConnectionHandle> {
        match &self.connection {
            ConnectionState::Connected { handle } => Some(handle),
            _ => None,
        }
    }

    pub fn container_id(&self) -> Option<&str> {
        match &self.connection {
            ConnectionState::Disconnected => None,
            ConnectionState::Connecting { container_id } => Some(container_id),
            ConnectionState::Connected { handle } => Some(&handle.container_id),
        }
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }

    pub fn active_topic(&self) -> Option<&Topic> {
        self.active_topic.as_ref()
    }

    /// Topic inbound messages must carry to be buffered.
    pub fn topic_filter(&self) -> &Topic {
        self.active_topic.as_ref().unwrap_or(&self.broadcast_topic)
    }

    pub fn buffer(&self) -> &[Message] {
        &self.buffer
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn begin_connect(&mut self, container_id: impl Into<String>) {
        self.connection = ConnectionState::Connecting {
            container_id: container_id.into(),
        };
    }

    pub fn finish_connect(&mut self, handle: ConnectionHandle) {
        self.connection = ConnectionState::Connected { handle };
    }

    pub fn fail_connect(&mut self) {
        self.connection = ConnectionState::Disconnected;
    }

    /// The transport went away underneath us. The buffer and the selected
    /// channel stay so the view keeps what it showed until a reconnect.
    pub fn connection_lost(&mut self) -> Option<ConnectionHandle> {
        match std::mem::replace(&mut self.connection, ConnectionState::Disconnected) {
            ConnectionState::Connected { handle } => Some(handle),
            _ => None,
        }
    }

    /// Returns whether the selected channel changed.
    pub fn select_channel(&mut self, channel_id: &str) -> bool {
        if self.channel_id.as_deref() == Some(channel_id) {
            return false;
        }

        self.channel_id = Some(channel_id.to_owned());
        true
    }

    /// Drops the connection and everything buffered under it.
    pub fn disconnect(&mut self) -> Option<ConnectionHandle> {
        let previous = std::mem::replace(&mut self.connection, ConnectionState::Disconnected);
        self.channel_id = None;
        self.buffer.clear();
        self.generation += 1;

        match previous {
            ConnectionState::Connected { handle } => Some(handle),
            _ => None,
        }
    }

    /// Retargets the session. The buffer is emptied here, before any history
    /// for the new topic can arrive.
    pub fn switch_topic(&mut self, topic: Option<Topic>) -> HistoryRequest {
        self.active_topic = topic;
        self.buffer.clear();
        self.generation += 1;

        let channel_id = match self.connection {
            ConnectionState::Connected { .. } => self.channel_id.clone(),
            _ => None,
        };

        HistoryRequest {
            generation: self.generation,
            channel_id,
            topic: self.active_topic.clone(),
        }
    }

    /// Commits a backfill unless the session moved on since `request` was issued.
    /// Messages on other topics are left out.
    pub fn commit_history(&mut self, request: &HistoryRequest, messages: Vec<Message>) -> bool {
        if request.generation != self.generation {
            return false;
        }

        let filter = self.topic_filter().clone();
        self.buffer = messages
            .into_iter()
            .filter(|message| message.topic == filter)
            .collect();

        true
    }

    /// Appends an inbound message when it belongs to the active topic.
    pub fn deliver(&mut self, message: Message) -> bool {
        if &message.topic != self.topic_filter() {
            return false;
        }

        self.buffer.push(message);
        true
    }
}
