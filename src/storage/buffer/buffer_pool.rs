use crate::common::{Error, Result};
use crate::config::config::HEAP_DB_DEFAULT_POOL_SIZE;
use crate::errdata;
use crate::storage::catalog::Catalog;
use crate::storage::page::{HeapPageHandle, HeapPageId, Page};
use crate::storage::tuple::Tuple;
use crate::transaction::{LockManager, Permission, TransactionId};
use crossbeam::utils::Backoff;
use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

const POOL_POISONED_MSG: &str = "buffer pool state mutex poisoned";
const OCCUPIED_FRAME_MSG: &str = "page table points at an empty frame";

pub type FrameId = usize;

/// The bounded page cache every reader and writer goes through.
///
/// A fixed array of frames holds cached pages; a page table maps page ids
/// to frames and a free list tracks idle frames. Each `get_page` first
/// acquires the page lock through the lock manager, then touches the pool
/// under its single mutex, so a caller only ever sees pages it has the
/// right to see.
///
/// Eviction is LRU over clean pages only (NO-STEAL): a dirty page stays
/// pinned in memory until its transaction commits (flush) or aborts
/// (discard). Aborting works precisely because the disk always holds the
/// pre-transaction image of every dirty page.
pub struct BufferPool {
    pool_size: usize,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    state: Mutex<PoolState>,
}

struct PoolState {
    frames: Vec<Option<HeapPageHandle>>,
    page_table: HashMap<HeapPageId, FrameId>,
    free_list: VecDeque<FrameId>,
    last_used: HashMap<HeapPageId, u64>,
    clock: u64,
}

#[derive(Default)]
pub struct BufferPoolBuilder {
    pool_size: Option<usize>,
    catalog: Option<Arc<Catalog>>,
}

impl BufferPoolBuilder {
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> BufferPool {
        BufferPool::new(
            self.pool_size.unwrap_or(HEAP_DB_DEFAULT_POOL_SIZE),
            self.catalog
                .expect("`catalog` not initialized before build."),
        )
    }
}

impl BufferPool {
    pub fn new(pool_size: usize, catalog: Arc<Catalog>) -> BufferPool {
        BufferPool {
            pool_size,
            catalog,
            lock_manager: LockManager::new(),
            state: Mutex::new(PoolState {
                frames: (0..pool_size).map(|_| None).collect(),
                page_table: HashMap::new(),
                free_list: (0..pool_size).collect(),
                last_used: HashMap::new(),
                clock: 0,
            }),
        }
    }

    pub fn builder() -> BufferPoolBuilder {
        BufferPoolBuilder::default()
    }

    pub fn size(&self) -> usize {
        self.pool_size
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Fetches a page on behalf of `tid` with the requested permission.
    ///
    /// Blocks (by spinning with backoff) until the page lock is granted;
    /// a deadlock detected while waiting aborts the transaction with
    /// [`Error::TransactionAborted`]. Once locked, the page is served from
    /// the cache or read through the table's heap file, evicting a clean
    /// page when the pool is full.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: &HeapPageId,
        perm: Permission,
    ) -> Result<HeapPageHandle> {
        let backoff = Backoff::new();
        while !self.lock_manager.acquire_lock(tid, pid, perm)? {
            backoff.snooze();
        }

        let mut state = self.state.lock().expect(POOL_POISONED_MSG);
        state.clock += 1;
        let stamp = state.clock;
        state.last_used.insert(*pid, stamp);

        if let Some(&frame) = state.page_table.get(pid) {
            return Ok(Arc::clone(
                state.frames[frame].as_ref().expect(OCCUPIED_FRAME_MSG),
            ));
        }

        if state.free_list.is_empty() {
            self.evict_page(&mut state)?;
        }
        let frame = state
            .free_list
            .pop_front()
            .expect("an idle frame exists after eviction");

        let file = self.catalog.db_file(pid.table_id())?;
        let handle = Arc::new(RwLock::new(file.read_page(pid)?));
        debug!("loaded page {pid} into frame {frame}");

        state.frames[frame] = Some(Arc::clone(&handle));
        state.page_table.insert(*pid, frame);
        Ok(handle)
    }

    /// Evicts the least-recently-used clean page. Never called while idle
    /// frames remain; when every cached page is dirty the pool is
    /// effectively full and the requesting transaction aborts rather than
    /// steal an uncommitted page.
    fn evict_page(&self, state: &mut PoolState) -> Result<()> {
        if !state.free_list.is_empty() {
            return errdata!("eviction requested while idle frames remain");
        }

        let victim = state
            .page_table
            .iter()
            .filter(|(_, &frame)| {
                state.frames[frame]
                    .as_ref()
                    .expect(OCCUPIED_FRAME_MSG)
                    .read()
                    .unwrap()
                    .dirtier()
                    .is_none()
            })
            .min_by_key(|(pid, _)| state.last_used.get(*pid).copied().unwrap_or(0))
            .map(|(pid, &frame)| (*pid, frame));

        let Some((pid, frame)) = victim else {
            info!("no clean page to evict; pool is full of uncommitted pages");
            return Err(Error::TransactionAborted);
        };

        // The victim is clean, so this flush is normally a no-op, but it is
        // idempotent and keeps eviction safe against a stale dirty flag.
        Self::flush_frame(state, &self.catalog, &pid)?;

        state.page_table.remove(&pid);
        state.last_used.remove(&pid);
        state.frames[frame] = None;
        state.free_list.push_back(frame);
        debug!("evicted page {pid} from frame {frame}");
        Ok(())
    }

    fn flush_frame(state: &PoolState, catalog: &Catalog, pid: &HeapPageId) -> Result<()> {
        let Some(&frame) = state.page_table.get(pid) else {
            return Ok(());
        };
        let handle = state.frames[frame].as_ref().expect(OCCUPIED_FRAME_MSG);
        let mut page = handle.write().unwrap();
        if page.dirtier().is_some() {
            catalog.db_file(pid.table_id())?.write_page(&page)?;
            page.mark_clean();
            debug!("flushed page {pid}");
        }
        Ok(())
    }

    /// Writes the page to disk and clears its dirty flag, if it is cached
    /// and dirty.
    pub fn flush_page(&self, pid: &HeapPageId) -> Result<()> {
        let state = self.state.lock().expect(POOL_POISONED_MSG);
        Self::flush_frame(&state, &self.catalog, pid)
    }

    /// Flushes every cached page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let state = self.state.lock().expect(POOL_POISONED_MSG);
        for pid in state.page_table.keys() {
            Self::flush_frame(&state, &self.catalog, pid)?;
        }
        Ok(())
    }

    /// Re-admits a dirtied page into the cache, replacing any version that
    /// was evicted (while clean) between the modification and now, so that
    /// future requests see the up-to-date page.
    fn admit_dirtied(&self, handle: &HeapPageHandle) -> Result<()> {
        let pid = *handle.read().unwrap().page_id();
        let mut state = self.state.lock().expect(POOL_POISONED_MSG);
        state.clock += 1;
        let stamp = state.clock;
        state.last_used.insert(pid, stamp);

        if let Some(&frame) = state.page_table.get(&pid) {
            state.frames[frame] = Some(Arc::clone(handle));
            return Ok(());
        }
        if state.free_list.is_empty() {
            self.evict_page(&mut state)?;
        }
        let frame = state
            .free_list
            .pop_front()
            .expect("an idle frame exists after eviction");
        state.frames[frame] = Some(Arc::clone(handle));
        state.page_table.insert(pid, frame);
        Ok(())
    }

    /// Inserts the tuple into the table, marking every page the heap file
    /// dirtied with `tid` and pinning those versions in the cache.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: usize, tuple: &Tuple) -> Result<()> {
        let file = self.catalog.db_file(table_id)?;
        for handle in file.insert_tuple(self, tid, tuple)? {
            handle.write().unwrap().mark_dirty(tid);
            self.admit_dirtied(&handle)?;
        }
        Ok(())
    }

    /// Deletes the tuple from its table (located through its record id),
    /// marking the dirtied pages.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .rid()
            .ok_or_else(|| Error::InvalidData("cannot delete a tuple with no record id".into()))?;
        let file = self.catalog.db_file(rid.page_id().table_id())?;
        for handle in file.delete_tuple(self, tid, tuple)? {
            handle.write().unwrap().mark_dirty(tid);
            self.admit_dirtied(&handle)?;
        }
        Ok(())
    }

    /// Finishes a transaction. On commit every page it locked is flushed;
    /// on abort those pages are dropped from the pool so the next read
    /// reloads the pre-transaction image from disk. All of the
    /// transaction's locks are then released.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let pages = self.lock_manager.pages_for(tid);
        {
            let mut state = self.state.lock().expect(POOL_POISONED_MSG);
            for pid in &pages {
                if commit {
                    Self::flush_frame(&state, &self.catalog, pid)?;
                } else if let Some(frame) = state.page_table.remove(pid) {
                    state.frames[frame] = None;
                    state.last_used.remove(pid);
                    state.free_list.push_back(frame);
                }
            }
        }
        self.lock_manager.release_transaction(tid);
        info!(
            "{tid} {} ({} pages)",
            if commit { "committed" } else { "aborted" },
            pages.len()
        );
        Ok(())
    }

    /// Commits the transaction; equivalent to
    /// `transaction_complete(tid, true)`.
    pub fn commit_transaction(&self, tid: TransactionId) -> Result<()> {
        self.transaction_complete(tid, true)
    }

    /// Rolls the transaction back, discarding its pages.
    pub fn abort_transaction(&self, tid: TransactionId) -> Result<()> {
        self.transaction_complete(tid, false)
    }

    /// Releases a single page lock before the transaction completes.
    /// Breaks strict two-phase locking; exists for the heap file's insert
    /// capacity scan, which probes pages it will never touch again.
    pub fn release_page(&self, tid: TransactionId, pid: &HeapPageId) {
        self.lock_manager.release_lock(tid, pid);
    }

    /// Whether `pid` currently occupies a pool frame. Bookkeeping
    /// accessor for tests and invariant checks.
    pub fn is_cached(&self, pid: &HeapPageId) -> bool {
        let state = self.state.lock().expect(POOL_POISONED_MSG);
        state.page_table.contains_key(pid)
    }

    /// Number of idle frames. The idle and occupied frames always
    /// partition the pool exactly.
    pub fn idle_frames(&self) -> usize {
        let state = self.state.lock().expect(POOL_POISONED_MSG);
        debug_assert_eq!(
            state.free_list.len() + state.page_table.len(),
            self.pool_size
        );
        state.free_list.len()
    }
}
