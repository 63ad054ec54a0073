pub mod memory_store;
pub mod node_store;
pub mod page_locks;

pub use memory_store::InMemoryStore;
pub use node_store::{FormStore, NodeStore, WriteBatch};
pub use page_locks::{PageGuard, PageLocks};
