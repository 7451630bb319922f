//! Object store adapters: filesystem, in-memory, and the retry decorator.

mod filesystem;
mod in_memory;
mod retrying;

pub use filesystem::FilesystemObjectStore;
pub use in_memory::InMemoryObjectStore;
pub use retrying::{RetryPolicy, RetryingObjectStore};
