//! Use case layer: collaborator contracts and the workflows built on them.

pub mod bootstrap;
pub mod channel_members;
pub mod context;
pub mod contracts;
pub mod incremental_selector;
pub mod leases;
pub mod load_history;
pub mod messaging_session;
pub mod resolve_page;
pub mod send_message;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
