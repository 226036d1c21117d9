use crate::prelude::DbKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key {0} not found in store")]
    KeyNotFound(DbKey),

    /// Stored bytes decoded fine but do not describe what the key promises
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("rocksdb error {0}")]
    DbError(#[from] rocksdb::Error),

    #[error("bincode error {0}")]
    DeserializationError(#[from] Box<bincode::ErrorKind>),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait StoreResultExt<T> {
    /// Maps a "key not found" error to `Ok(None)`
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::KeyNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional() {
        let not_found: StoreResult<u32> = Err(StoreError::KeyNotFound(DbKey::new(&[1], [2u8])));
        assert!(matches!(not_found.optional(), Ok(None)));
        let found: StoreResult<u32> = Ok(3);
        assert!(matches!(found.optional(), Ok(Some(3))));
        let other: StoreResult<u32> = Err(StoreError::DataInconsistency("x".to_string()));
        assert!(matches!(other.optional(), Err(StoreError::DataInconsistency(_))));
    }
}
