use crate::common::{Error, Result};
use crate::storage::page::HeapPageId;
use crate::transaction::TransactionId;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const LOCK_STATE_POISONED_MSG: &str = "lock manager state mutex poisoned";

/// The access level a caller requests when fetching a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> LockMode {
        match self {
            Permission::ReadOnly => LockMode::Shared,
            Permission::ReadWrite => LockMode::Exclusive,
        }
    }
}

/// The strength of a granted page lock. `Shared` admits any number of
/// holders; `Exclusive` admits exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Page-level strict two-phase lock table.
///
/// Grants and denials are decided under a single mutex. Blocking is the
/// caller's job: a denied request returns `Ok(false)` and the caller
/// retries, so the manager itself never parks a thread. Deadlock detection
/// runs inside every acquire, before the requester starts waiting.
pub struct LockManager {
    state: Mutex<LockState>,
}

#[derive(Default)]
struct LockState {
    tid_to_pages: HashMap<TransactionId, HashSet<HeapPageId>>,
    page_to_mode: HashMap<HeapPageId, LockMode>,
    page_to_tids: HashMap<HeapPageId, HashSet<TransactionId>>,
    /// The single page each blocked transaction is currently trying to
    /// acquire. Edges of the wait-for graph are derived from this map.
    waiting_on: HashMap<TransactionId, HeapPageId>,
}

impl LockState {
    /// Walks the wait-for graph from `start` looking for a path back to
    /// `start`. An edge `a -> b` exists iff `a` is waiting on a page that
    /// `b` currently holds.
    fn finds_cycle(&self, start: TransactionId) -> bool {
        let mut visited: HashSet<TransactionId> = HashSet::new();
        let mut stack = vec![start];

        while let Some(waiter) = stack.pop() {
            let Some(pid) = self.waiting_on.get(&waiter) else {
                continue;
            };
            let Some(holders) = self.page_to_tids.get(pid) else {
                continue;
            };
            for holder in holders {
                if *holder == waiter {
                    continue;
                }
                if *holder == start {
                    return true;
                }
                if visited.insert(*holder) {
                    stack.push(*holder);
                }
            }
        }
        false
    }

    fn grantable(&self, tid: TransactionId, pid: &HeapPageId, mode: LockMode) -> bool {
        let Some(holders) = self.page_to_tids.get(pid).filter(|h| !h.is_empty()) else {
            return true;
        };
        let sole_holder = holders.len() == 1 && holders.contains(&tid);
        match self.page_to_mode.get(pid) {
            Some(LockMode::Exclusive) => sole_holder,
            _ => match mode {
                LockMode::Shared => true,
                // A shared lock upgrades only when the requester is the
                // sole holder.
                LockMode::Exclusive => sole_holder,
            },
        }
    }
}

impl LockManager {
    pub fn new() -> LockManager {
        LockManager {
            state: Mutex::new(LockState::default()),
        }
    }

    /// One non-blocking acquisition attempt.
    ///
    /// Returns `Ok(true)` when the lock was granted, `Ok(false)` when the
    /// caller must retry, and `Err(TransactionAborted)` when waiting would
    /// close a cycle in the wait-for graph.
    pub fn acquire_lock(
        &self,
        tid: TransactionId,
        pid: &HeapPageId,
        perm: Permission,
    ) -> Result<bool> {
        let mode = perm.to_lock();
        let mut state = self.state.lock().expect(LOCK_STATE_POISONED_MSG);

        if !state.waiting_on.contains_key(&tid) {
            state.waiting_on.insert(tid, *pid);
            if state.finds_cycle(tid) {
                warn!("deadlock detected, aborting {tid} (requested {pid})");
                return Err(Error::TransactionAborted);
            }
        }

        if !state.grantable(tid, pid, mode) {
            return Ok(false);
        }

        state.page_to_tids.entry(*pid).or_default().insert(tid);
        state.tid_to_pages.entry(tid).or_default().insert(*pid);
        let granted = state.page_to_mode.entry(*pid).or_insert(mode);
        if mode == LockMode::Exclusive {
            *granted = LockMode::Exclusive;
        }
        state.waiting_on.remove(&tid);
        debug!("{tid} acquired {mode:?} on {pid}");
        Ok(true)
    }

    /// Releases one lock early. Safe for the lock table, but callers break
    /// strict two-phase locking by using it outside the heap-file capacity
    /// scan.
    pub fn release_lock(&self, tid: TransactionId, pid: &HeapPageId) {
        let mut state = self.state.lock().expect(LOCK_STATE_POISONED_MSG);
        Self::release_locked(&mut state, tid, pid);
    }

    fn release_locked(state: &mut LockState, tid: TransactionId, pid: &HeapPageId) {
        if let Some(holders) = state.page_to_tids.get_mut(pid) {
            holders.remove(&tid);
            if holders.is_empty() {
                state.page_to_tids.remove(pid);
                state.page_to_mode.remove(pid);
            }
        }
        if let Some(pages) = state.tid_to_pages.get_mut(&tid) {
            pages.remove(pid);
            if pages.is_empty() {
                state.tid_to_pages.remove(&tid);
            }
        }
    }

    /// Releases every lock held by `tid` and forgets any pending wait.
    pub fn release_transaction(&self, tid: TransactionId) {
        let mut state = self.state.lock().expect(LOCK_STATE_POISONED_MSG);
        let pages: Vec<HeapPageId> = state
            .tid_to_pages
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        for pid in pages {
            Self::release_locked(&mut state, tid, &pid);
        }
        state.waiting_on.remove(&tid);
    }

    /// Whether `tid` holds any lock on `pid`. Checks both directions of
    /// the bookkeeping, which must agree.
    pub fn holds_lock(&self, tid: TransactionId, pid: &HeapPageId) -> bool {
        let state = self.state.lock().expect(LOCK_STATE_POISONED_MSG);
        let forward = state
            .tid_to_pages
            .get(&tid)
            .is_some_and(|pages| pages.contains(pid));
        let backward = state
            .page_to_tids
            .get(pid)
            .is_some_and(|tids| tids.contains(&tid));
        debug_assert_eq!(forward, backward);
        forward && backward
    }

    /// The pages currently locked by `tid`, in no particular order.
    pub fn pages_for(&self, tid: TransactionId) -> Vec<HeapPageId> {
        let state = self.state.lock().expect(LOCK_STATE_POISONED_MSG);
        state
            .tid_to_pages
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The granted mode on `pid`, if any transaction holds it.
    pub fn mode_of(&self, pid: &HeapPageId) -> Option<LockMode> {
        let state = self.state.lock().expect(LOCK_STATE_POISONED_MSG);
        state.page_to_mode.get(pid).copied()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
