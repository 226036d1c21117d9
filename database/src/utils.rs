use crate::db::DB;
use std::sync::{Arc, Weak};
use tempfile::TempDir;

#[derive(Default)]
pub struct DbLifetime {
    weak_db_ref: Weak<DB>,
    optional_tempdir: Option<TempDir>,
}

impl DbLifetime {
    pub fn new(tempdir: TempDir, weak_db_ref: Weak<DB>) -> Self {
        Self { optional_tempdir: Some(tempdir), weak_db_ref }
    }

    /// Tracks the DB reference and makes sure all strong refs are cleaned up
    /// but does not remove the DB from disk when dropped.
    pub fn without_destroy(weak_db_ref: Weak<DB>) -> Self {
        Self { optional_tempdir: None, weak_db_ref }
    }

    /// Weak reference to the tracked DB
    pub fn weak_db(&self) -> Weak<DB> {
        self.weak_db_ref.clone()
    }
}

impl Drop for DbLifetime {
    fn drop(&mut self) {
        // Give concurrent holders (e.g. rayon workers in tests) a moment to release their strong refs
        for _ in 0..16 {
            if self.weak_db_ref.strong_count() > 0 {
                std::thread::sleep(std::time::Duration::from_millis(50));
            } else {
                break;
            }
        }
        if let Some(dir) = self.optional_tempdir.take() {
            // The tempdir removal is best effort at this point
            let _ = dir.close();
        }
    }
}

pub fn get_sopnet_tempdir() -> std::io::Result<TempDir> {
    let global_tempdir = std::env::temp_dir();
    let sopnet_tempdir = global_tempdir.join("sopnet-blockwise");
    std::fs::create_dir_all(sopnet_tempdir.as_path())?;
    tempfile::tempdir_in(sopnet_tempdir.as_path())
}

/// Creates a DB within a temp directory under `<OS SPECIFIC TEMP DIR>/sopnet-blockwise`.
/// Callers must keep the returned `DbLifetime` guard for as long as they wish the DB to exist.
/// Panics on failure, for test code only.
#[macro_export]
macro_rules! create_temp_db {
    ($conn_builder: expr) => {{
        let db_tempdir = $crate::utils::get_sopnet_tempdir().unwrap();
        let db_path = db_tempdir.path().to_owned();
        let db = $conn_builder.with_db_path(db_path).build().unwrap();
        ($crate::utils::DbLifetime::new(db_tempdir, std::sync::Arc::downgrade(&db)), db)
    }};
}

/// Opens (or creates) a DB at `db_path` which is kept on disk after the returned guard is dropped.
pub fn open_permanent_db(db_path: std::path::PathBuf, files_limit: i32) -> Result<(DbLifetime, Arc<DB>), rocksdb::Error> {
    std::fs::create_dir_all(&db_path).ok();
    let db = crate::prelude::ConnBuilder::default().with_files_limit(files_limit).with_db_path(db_path).build()?;
    Ok((DbLifetime::without_destroy(Arc::downgrade(&db)), db))
}
