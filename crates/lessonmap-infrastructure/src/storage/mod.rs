//! File-backed stores: atomic TOML config, persistent content store and the
//! session cookie.

mod atomic_file;
mod atomic_toml;
pub mod content_store;
mod session_storage;

pub use atomic_file::StorageError;
pub use atomic_toml::AtomicTomlFile;
pub use content_store::{COLLECTION_NAME, ContentStore, STORE_NAME};
pub use session_storage::SessionStorage;
