use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use crate::model::feature::FeatureId;

/// Exclusive locks keyed by feature id.
///
/// Work on one id is serialized while work on different ids proceeds in parallel. An entry lives
/// only while some caller holds or waits for it.
#[derive(Default)]
pub struct FeatureLocks {
    locks: Mutex<HashMap<FeatureId, Arc<Mutex<()>>>>,
}

impl FeatureLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` while holding the lock of `id`.
    pub fn with_lock<T>(&self, id: &FeatureId, operation: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(*id).or_default())
        };
        let result = {
            // The guarded value is (), a panic in another holder leaves nothing inconsistent.
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            operation()
        };

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map and ours: nobody else is holding or waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(id);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
