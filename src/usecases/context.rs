use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use crate::{
    domain::{entity::EntityKind, topic::Topic},
    infra::config::AppConfig,
    platform::{Directory, LoopbackBroker},
    usecases::{
        incremental_selector::{IncrementalSelector, SelectorSettings},
        leases::ConnectionLeases,
        messaging_session::{MessagingSession, SessionSettings},
        resolve_page::PageResolver,
    },
};

pub type LoopbackSession = MessagingSession<Arc<LoopbackBroker>, Arc<LoopbackBroker>>;
pub type DirectoryResolver = PageResolver<Arc<Directory>, Arc<Directory>>;
pub type DirectorySelector = IncrementalSelector<Arc<Directory>, Arc<Directory>>;

#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub broker: Arc<LoopbackBroker>,
    pub directory: Arc<Directory>,
    /// Container leases per client. A client is one signed-in user id.
    clients: Mutex<HashMap<String, ConnectionLeases>>,
}

impl AppContext {
    pub fn new(config: AppConfig, broker: Arc<LoopbackBroker>, directory: Arc<Directory>) -> Self {
        Self {
            config,
            broker,
            directory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn session_settings(&self, user_id: &str) -> SessionSettings {
        SessionSettings::new(user_id)
            .with_broadcast_topic(Topic::broadcast(&self.config.messaging.broadcast_topic))
            .with_history_limit(self.config.messaging.history_limit)
    }

    pub fn selector_settings(&self) -> SelectorSettings {
        SelectorSettings {
            page_size: self.config.selector.page_size,
            search_debounce: Duration::from_millis(self.config.selector.search_debounce_ms),
        }
    }

    /// Opens a session on the client of `user_id`. Sessions of one client
    /// share its leases, so only one of them can be live per container.
    pub fn messaging_session(&self, user_id: &str) -> LoopbackSession {
        MessagingSession::new(
            Arc::clone(&self.broker),
            Arc::clone(&self.broker),
            self.client_leases(user_id),
            self.session_settings(user_id),
        )
    }

    fn client_leases(&self, user_id: &str) -> ConnectionLeases {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_owned())
            .or_default()
            .clone()
    }

    pub fn page_resolver(&self) -> DirectoryResolver {
        PageResolver::new(Arc::clone(&self.directory), Arc::clone(&self.directory))
            .with_lookup_concurrency(self.config.resolution.lookup_concurrency)
    }

    pub fn selector(
        &self,
        kind: EntityKind,
        excluded_id: Option<&str>,
        container_id: Option<&str>,
    ) -> DirectorySelector {
        IncrementalSelector::new(
            kind,
            self.page_resolver(),
            self.selector_settings(),
            excluded_id.map(ToOwned::to_owned),
            container_id.map(ToOwned::to_owned),
        )
    }
}
