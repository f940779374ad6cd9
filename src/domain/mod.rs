//! Domain layer: conversation identifiers, paged entities and the state
//! machines that the messaging session and the incremental selector drive.

pub mod entity;
pub mod message;
pub mod page;
pub mod principal;
pub mod selector_state;
pub mod session_state;
pub mod topic;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
