pub mod memory;
pub mod session_storage;
pub mod sqlite;
pub mod traits;
pub mod vault_storage;

pub use memory::MemoryStore;
pub use session_storage::{SessionRecord, SessionStorage, SESSION_KEY, SESSION_VERSION};
pub use sqlite::SqliteStore;
pub use traits::KeyValueStore;
pub use vault_storage::{VaultStorage, VAULT_KEY};
