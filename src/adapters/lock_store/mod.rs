//! Lock store adapter implementations.

pub mod memory;
pub mod redis;

pub use memory::MemoryLockStore;
pub use self::redis::RedisLockStore;
