use rocksdb::{DBWithThreadMode, MultiThreaded};

pub use conn_builder::ConnBuilder;

mod conn_builder;

/// The DB type used for the blockwise stores
pub type DB = DBWithThreadMode<MultiThreaded>;
