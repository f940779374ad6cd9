use chrono::Utc;

use super::topic::Topic;

/// A chat message as it travels through one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: Topic,
    pub value: String,
    /// Wall clock at publish time, nanoseconds since the Unix epoch.
    pub timestamp_nanos: i64,
    pub publisher_id: String,
}

impl Message {
    pub fn new(
        topic: Topic,
        value: impl Into<String>,
        timestamp_nanos: i64,
        publisher_id: impl Into<String>,
    ) -> Self {
        Self {
            topic,
            value: value.into(),
            timestamp_nanos,
            publisher_id: publisher_id.into(),
        }
    }

    pub fn is_from(&self, principal_id: &str) -> bool {
        self.publisher_id == principal_id
    }

    /// Millisecond timestamp, the resolution UI clocks render with.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_nanos / 1_000_000
    }
}

/// Current wall clock in nanoseconds since the Unix epoch.
///
/// Saturates to zero outside the range an `i64` nanosecond count can hold.
pub fn wall_clock_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(publisher: &str) -> Message {
        Message::new(Topic::new("chat"), "hello", 1_700_000_000_123_456_789, publisher)
    }

    #[test]
    fn is_from_matches_publisher_only() {
        let message = msg("alice");

        assert!(message.is_from("alice"));
        assert!(!message.is_from("bob"));
    }

    #[test]
    fn timestamp_ms_truncates_nanoseconds() {
        assert_eq!(msg("alice").timestamp_ms(), 1_700_000_000_123);
    }

    #[test]
    fn wall_clock_is_after_2020() {
        let nanos = wall_clock_nanos();

        assert!(nanos > 1_577_836_800_000_000_000);
    }
}
