use super::{
    SegmentStore, SliceStore,
    memory::{MemorySegmentStore, MemorySliceStore},
    segments::DbSegmentStore,
    slices::DbSliceStore,
};
use sopnet_blockwise_core::config::{BackendType, ProjectConfig, params::CacheParams};
use sopnet_core::info;
use sopnet_database::{
    prelude::{DB, StoreResult},
    utils::{DbLifetime, open_permanent_db},
};
use std::{path::PathBuf, sync::Arc};

/// Namespace of the stores holding data derived from membrane predictions
pub const MEMBRANE_NAMESPACE: u8 = 0;

/// Namespace of the stores holding data derived from the ground truth labels
pub const GROUND_TRUTH_NAMESPACE: u8 = 1;

const DB_FILES_LIMIT: i32 = 256;

/// The slice and segment store of one label source
#[derive(Clone)]
pub struct StoreSet {
    pub slices: Arc<dyn SliceStore>,
    pub segments: Arc<dyn SegmentStore>,
}

impl StoreSet {
    pub fn in_memory() -> Self {
        Self { slices: Arc::new(MemorySliceStore::new()), segments: Arc::new(MemorySegmentStore::new()) }
    }

    pub fn in_db(db: Arc<DB>, namespace: u8, cache: &CacheParams) -> Self {
        Self {
            slices: Arc::new(DbSliceStore::new(db.clone(), namespace, cache)),
            segments: Arc::new(DbSegmentStore::new(db, namespace, cache)),
        }
    }
}

/// All stores of a project. Keeps the backing DB, if any, alive.
pub struct Stores {
    pub membrane: StoreSet,
    pub ground_truth: StoreSet,
    _db_lifetime: Option<DbLifetime>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self { membrane: StoreSet::in_memory(), ground_truth: StoreSet::in_memory(), _db_lifetime: None }
    }

    /// Stores over an already opened DB. The caller owns the DB lifetime.
    pub fn in_db(db: Arc<DB>, cache: &CacheParams) -> Self {
        Self {
            membrane: StoreSet::in_db(db.clone(), MEMBRANE_NAMESPACE, cache),
            ground_truth: StoreSet::in_db(db, GROUND_TRUTH_NAMESPACE, cache),
            _db_lifetime: None,
        }
    }
}

pub struct StoreFactory;

impl StoreFactory {
    /// Creates the stores of the configured backend
    pub fn from_config(config: &ProjectConfig) -> StoreResult<Stores> {
        match &config.backend {
            BackendType::Local => Ok(Stores::in_memory()),
            BackendType::RocksDb { path } => {
                info!("opening rocksdb stores at {}", path);
                let (lifetime, db) = open_permanent_db(PathBuf::from(path), DB_FILES_LIMIT)?;
                let stores = Stores::in_db(db, &config.cache);
                Ok(Stores { _db_lifetime: Some(lifetime), ..stores })
            }
        }
    }
}
