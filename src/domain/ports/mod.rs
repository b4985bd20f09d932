//! Ports: the interfaces the diagnosis engine consumes.

pub mod lock_store;
pub mod notifier;
pub mod reasoning;
pub mod tool;

pub use lock_store::LockStore;
pub use notifier::{Notification, Notifier};
pub use reasoning::{ReasoningCapability, ReasoningRequest};
pub use tool::{Tool, ToolOutcome, ToolRegistry, ToolSpec};
