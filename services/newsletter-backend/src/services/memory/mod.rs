/// In process implementations of the storage and queue ports.
///
/// Nothing survives a restart. They back the `memory` executor, and record what
/// went through them so tests can inspect it.
mod queue;
mod storage;

pub use self::queue::InMemoryQueue;
pub use self::storage::InMemoryStorage;
