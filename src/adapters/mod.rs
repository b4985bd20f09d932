//! Adapters implementing the domain ports against external systems.

pub mod http;
pub mod lock_store;
pub mod notifier;
pub mod reasoning;
pub mod tools;
