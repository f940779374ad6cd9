use std::fmt;

/// Joins the two sorted participant ids of a direct conversation.
pub const DM_TOPIC_SEPARATOR: char = '-';

/// Topic name used by the workspace broadcast stream unless configured otherwise.
pub const DEFAULT_BROADCAST_TOPIC: &str = "chat";

/// Opaque key identifying one conversation stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn broadcast(literal: &str) -> Self {
        Self(literal.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the topic both participants of a direct conversation subscribe to.
///
/// Both ends compute this independently, so the ids are ordered by byte value
/// before joining: `canonical_topic(a, b) == canonical_topic(b, a)` for any pair.
pub fn canonical_topic(id_a: &str, id_b: &str) -> Topic {
    let (low, high) = if id_a <= id_b {
        (id_a, id_b)
    } else {
        (id_b, id_a)
    };

    Topic(format!("{low}{DM_TOPIC_SEPARATOR}{high}"))
}
