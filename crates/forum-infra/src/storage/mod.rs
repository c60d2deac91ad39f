//! Local key/value storage.

mod file;
mod memory;

pub use file::FileLocalStorage;
pub use memory::InMemoryLocalStorage;

use forum_core::ports::StorageError;

/// Keys become file names, so only a conservative alphabet is accepted.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
