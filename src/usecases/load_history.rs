use crate::domain::{message::Message, topic::Topic};

use super::contracts::{FetchError, HistoryQuery, MessageHistory, SortDirection};

const DEFAULT_HISTORY_PAGE_SIZE: usize = 100;
const MAX_HISTORY_PAGE_SIZE: usize = 1_000;
const HISTORY_ORDER: &str = "time";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadHistoryQuery {
    pub channel_id: String,
    /// Narrow to one conversation; `None` reads the channel broadcast stream.
    pub topic: Option<Topic>,
    pub limit: usize,
}

impl LoadHistoryQuery {
    pub fn new(channel_id: impl Into<String>, topic: Option<Topic>) -> Self {
        Self {
            channel_id: channel_id.into(),
            topic,
            limit: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn normalized_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_HISTORY_PAGE_SIZE,
            value if value > MAX_HISTORY_PAGE_SIZE => MAX_HISTORY_PAGE_SIZE,
            value => value,
        }
    }
}

/// Reads the oldest-first backfill for one channel, optionally narrowed to a topic.
pub async fn load_history(
    source: &dyn MessageHistory,
    query: LoadHistoryQuery,
) -> Result<Vec<Message>, FetchError> {
    let history_query = HistoryQuery {
        offset: 0,
        limit: query.normalized_limit(),
        name: query.topic.as_ref().map(|topic| topic.as_str().to_owned()),
        order: HISTORY_ORDER.to_owned(),
        dir: SortDirection::Asc,
    };

    let page = source
        .list_messages(&query.channel_id, history_query)
        .await?;

    match page.error {
        Some(error) => Err(FetchError::Unavailable(error)),
        None => Ok(page.items),
    }
}
