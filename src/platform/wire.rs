//! SenML-style JSON record the messaging broker carries.

use serde::{Deserialize, Serialize};

use crate::{
    domain::{message::Message, topic::Topic},
    usecases::contracts::FetchError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    /// Topic name.
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "vs")]
    pub string_value: String,
    /// Nanoseconds since the Unix epoch.
    #[serde(rename = "t")]
    pub time: i64,
    pub publisher: String,
}

impl From<&Message> for WireRecord {
    fn from(message: &Message) -> Self {
        Self {
            name: message.topic.as_str().to_owned(),
            string_value: message.value.clone(),
            time: message.timestamp_nanos,
            publisher: message.publisher_id.clone(),
        }
    }
}

impl From<WireRecord> for Message {
    fn from(record: WireRecord) -> Self {
        Message::new(
            Topic::new(record.name),
            record.string_value,
            record.time,
            record.publisher,
        )
    }
}

pub fn encode(message: &Message) -> Result<String, FetchError> {
    serde_json::to_string(&WireRecord::from(message))
        .map_err(|error| FetchError::InvalidData(error.to_string()))
}

pub fn decode(frame: &str) -> Result<Message, FetchError> {
    serde_json::from_str::<WireRecord>(frame)
        .map(Message::from)
        .map_err(|error| FetchError::InvalidData(format!("malformed frame: {error}")))
}
