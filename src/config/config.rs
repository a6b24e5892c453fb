use lazy_static::lazy_static;
use serde::Deserialize;

/// Number of bytes in a disk page. Every read and write moves exactly one
/// page of this size.
pub const HEAP_DB_PAGE_SIZE_BYTES: usize = 4096;

/// Number of frames in a buffer pool when no explicit capacity is given.
pub const HEAP_DB_DEFAULT_POOL_SIZE: usize = 50;

/// Process-wide tunables, overridable through `HEAPDB_`-prefixed
/// environment variables (e.g. `HEAPDB_POOL_SIZE=128`).
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub pool_size: usize,
}

impl Settings {
    fn load() -> Settings {
        ::config::Config::builder()
            .set_default("pool_size", HEAP_DB_DEFAULT_POOL_SIZE as i64)
            .expect("default pool_size is representable")
            .add_source(::config::Environment::with_prefix("HEAPDB"))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .unwrap_or(Settings {
                pool_size: HEAP_DB_DEFAULT_POOL_SIZE,
            })
    }
}

lazy_static! {
    pub static ref SETTINGS: Settings = Settings::load();
}
