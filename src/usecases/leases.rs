use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use super::contracts::ConnectionError;

/// Workspaces that currently have a live session on this client.
#[derive(Debug, Clone, Default)]
pub struct ConnectionLeases {
    held: Arc<Mutex<HashSet<String>>>,
}

impl ConnectionLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `container_id` until the returned lease is dropped.
    pub fn acquire(&self, container_id: &str) -> Result<ContainerLease, ConnectionError> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(container_id.to_owned()) {
            return Err(ConnectionError::ContainerBusy(container_id.to_owned()));
        }

        Ok(ContainerLease {
            container_id: container_id.to_owned(),
            held: Arc::clone(&self.held),
        })
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_held(&self, container_id: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(container_id)
    }
}

#[derive(Debug)]
pub struct ContainerLease {
    container_id: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl ContainerLease {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }
}

impl Drop for ContainerLease {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.container_id);
    }
}
