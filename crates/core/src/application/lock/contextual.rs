// Diagnostic context around an entity lock

use super::EntityLockStrategy;
use std::cell::RefCell;
use tracing::info_span;

thread_local! {
    static CURRENT_ENTITY: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Entity whose operation is running on this thread, if any
pub fn current_entity() -> Option<String> {
    CURRENT_ENTITY.with(|current| current.borrow().clone())
}

/// Restores the previous entity on drop
struct EntityScope {
    previous: Option<String>,
}

impl EntityScope {
    fn enter(entity_id: &str) -> Self {
        let previous =
            CURRENT_ENTITY.with(|current| current.replace(Some(entity_id.to_string())));
        Self { previous }
    }
}

impl Drop for EntityScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_ENTITY.with(|current| *current.borrow_mut() = previous);
    }
}

/// Wraps a lock strategy and stamps the entity id on the thread and on a
/// tracing span while the operation runs
pub struct ContextualLockStrategy<S> {
    inner: S,
}

impl<S: EntityLockStrategy> ContextualLockStrategy<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: EntityLockStrategy> EntityLockStrategy for ContextualLockStrategy<S> {
    fn execute_operation<T, F>(&self, entity_id: &str, operation: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.inner.execute_operation(entity_id, || {
            let _scope = EntityScope::enter(entity_id);
            let _span = info_span!("entity_operation", entity_id = %entity_id).entered();
            operation()
        })
    }
}
