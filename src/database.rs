use crate::common::Result;
use crate::config::config::SETTINGS;
use crate::storage::buffer::BufferPool;
use crate::storage::catalog::Catalog;
use std::sync::Arc;

/// The process-scoped context tying the catalog to its buffer pool.
///
/// Constructed once at startup and handed to operators explicitly; nothing
/// in the crate reaches for ambient global state.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// A database with the configured default pool size.
    pub fn new() -> Database {
        Self::with_pool_size(SETTINGS.pool_size)
    }

    pub fn with_pool_size(pool_size: usize) -> Database {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(
            BufferPool::builder()
                .pool_size(pool_size)
                .catalog(Arc::clone(&catalog))
                .build(),
        );
        Database {
            catalog,
            buffer_pool,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Flushes every cached page; called on orderly shutdown.
    pub fn close(&self) -> Result<()> {
        self.buffer_pool.flush_all_pages()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
