// Reference-counted lock registry

use super::EntityLockStrategy;
use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use std::sync::Arc;

/// Registry slot: the lock plus the number of callers waiting for or holding it
struct LockEntry {
    lock: Arc<ReentrantMutex<()>>,
    ref_count: usize,
}

/// Lock-per-entity with lazy creation and removal once unreferenced
///
/// Both the increment on acquire and the decrement-and-remove on release run
/// under the registry shard lock for the key, so a holder is never removed
/// while another caller is about to wait on it.
#[derive(Default)]
pub struct ReferenceCountedLockStrategy {
    registry: DashMap<String, LockEntry>,
}

impl ReferenceCountedLockStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities with a live lock holder
    pub fn active_entities(&self) -> usize {
        self.registry.len()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.registry.contains_key(entity_id)
    }

    /// Callers currently waiting for or holding the lock of `entity_id`
    pub fn reference_count(&self, entity_id: &str) -> usize {
        self.registry
            .get(entity_id)
            .map(|entry| entry.ref_count)
            .unwrap_or(0)
    }

    fn retain(&self, entity_id: &str) -> Arc<ReentrantMutex<()>> {
        let mut entry = self
            .registry
            .entry(entity_id.to_string())
            .or_insert_with(|| LockEntry {
                lock: Arc::new(ReentrantMutex::new(())),
                ref_count: 0,
            });
        entry.ref_count += 1;
        entry.lock.clone()
    }

    fn release(&self, entity_id: &str) {
        self.registry.remove_if_mut(entity_id, |_, entry| {
            entry.ref_count = entry.ref_count.saturating_sub(1);
            entry.ref_count == 0
        });
    }
}

/// Drops the caller's reference once the lock guard is gone
struct Release<'a> {
    strategy: &'a ReferenceCountedLockStrategy,
    entity_id: &'a str,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.strategy.release(self.entity_id);
    }
}

impl EntityLockStrategy for ReferenceCountedLockStrategy {
    fn execute_operation<T, F>(&self, entity_id: &str, operation: F) -> T
    where
        F: FnOnce() -> T,
    {
        let lock = self.retain(entity_id);
        let _release = Release {
            strategy: self,
            entity_id,
        };
        // Re-entrant: same thread passes straight through
        let _guard = lock.lock();
        operation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Read, pause, write back: loses updates unless callers are serialized
    fn racy_append(list: &Mutex<Vec<usize>>, value: usize) {
        let mut snapshot = list.lock().clone();
        thread::sleep(Duration::from_millis(5));
        snapshot.push(value);
        *list.lock() = snapshot;
    }

    #[test]
    fn test_same_entity_is_mutually_exclusive() {
        const N: usize = 16;
        let strategy = ReferenceCountedLockStrategy::new();
        let list = Mutex::new(Vec::new());

        thread::scope(|s| {
            for i in 0..N {
                let strategy = &strategy;
                let list = &list;
                s.spawn(move || strategy.execute_operation("pi-1", || racy_append(list, i)));
            }
        });

        let mut values = list.into_inner();
        values.sort_unstable();
        assert_eq!(values, (0..N).collect::<Vec<_>>());
        assert_eq!(strategy.active_entities(), 0);
    }

    #[test]
    fn test_distinct_entities_run_in_parallel() {
        const N: usize = 8;
        const WORK: Duration = Duration::from_millis(50);
        let strategy = ReferenceCountedLockStrategy::new();

        let started = Instant::now();
        thread::scope(|s| {
            for i in 0..N {
                let strategy = &strategy;
                s.spawn(move || {
                    strategy.execute_operation(&format!("pi-{}", i), || thread::sleep(WORK))
                });
            }
        });
        let elapsed = started.elapsed();

        assert!(
            elapsed < WORK * N as u32,
            "took {:?}, sequential would be {:?}",
            elapsed,
            WORK * N as u32
        );
        assert_eq!(strategy.active_entities(), 0);
    }

    #[test]
    fn test_holder_lives_while_referenced() {
        let strategy = ReferenceCountedLockStrategy::new();
        let (held_tx, held_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel::<()>();

        thread::scope(|s| {
            let strategy_ref = &strategy;
            s.spawn(move || {
                strategy_ref.execute_operation("pi-1", || {
                    held_tx.send(()).unwrap();
                    done_rx.recv().unwrap();
                })
            });

            held_rx.recv().unwrap();
            assert!(strategy.contains("pi-1"));
            assert_eq!(strategy.reference_count("pi-1"), 1);
            done_tx.send(()).unwrap();
        });

        assert!(!strategy.contains("pi-1"));
        assert_eq!(strategy.reference_count("pi-1"), 0);
    }

    #[test]
    fn test_reentrant_on_same_thread() {
        let strategy = ReferenceCountedLockStrategy::new();

        let value = strategy.execute_operation("pi-1", || {
            strategy.execute_operation("pi-1", || {
                assert_eq!(strategy.reference_count("pi-1"), 2);
                42
            })
        });

        assert_eq!(value, 42);
        assert_eq!(strategy.active_entities(), 0);
    }

    #[test]
    fn test_error_result_passes_through() {
        let strategy = ReferenceCountedLockStrategy::new();
        let result: Result<(), String> =
            strategy.execute_operation("pi-1", || Err("boom".to_string()));

        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(strategy.active_entities(), 0);
    }

    #[test]
    fn test_panic_releases_lock() {
        let strategy = ReferenceCountedLockStrategy::new();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            strategy.execute_operation("pi-1", || panic!("operation failed"))
        }));
        assert!(outcome.is_err());
        assert_eq!(strategy.active_entities(), 0);

        // Still usable from another thread afterwards
        let value = thread::scope(|s| {
            s.spawn(|| strategy.execute_operation("pi-1", || 7))
                .join()
                .unwrap()
        });
        assert_eq!(value, 7);
    }
}
