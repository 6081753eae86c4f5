// Entity Lock - per-entity mutual exclusion for the callback endpoint

mod contextual;
mod reference_counted;

pub use contextual::{current_entity, ContextualLockStrategy};
pub use reference_counted::ReferenceCountedLockStrategy;

/// Serializes operations on one logical entity while leaving other entities free
///
/// `execute_operation` blocks the calling thread until the entity is free and
/// returns whatever `operation` returns, so errors pass through untouched.
/// The lock is released on every exit path, including a panic in `operation`.
/// A thread already holding the lock for `entity_id` may call in again.
pub trait EntityLockStrategy: Send + Sync {
    fn execute_operation<T, F>(&self, entity_id: &str, operation: F) -> T
    where
        F: FnOnce() -> T;
}
