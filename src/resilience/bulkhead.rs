//! Per-group concurrency isolation.
//!
//! # Responsibilities
//! - Cap concurrent primaries per group key
//! - Reject immediately when a group is saturated
//!
//! # Design Decisions
//! - Non-blocking acquisition; a saturated group is a failure, not a queue
//! - Permit is held for the duration of the primary only
//! - Semaphores are created lazily with the limit current at creation time

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::IsolationConfig;

#[derive(Debug, Default)]
pub struct Bulkheads {
    groups: DashMap<String, Arc<Semaphore>>,
}

impl Bulkheads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a slot in `group_key`, or `None` if the group is saturated.
    pub fn try_acquire(
        &self,
        group_key: &str,
        isolation: &IsolationConfig,
    ) -> Option<OwnedSemaphorePermit> {
        let semaphore = match self.groups.get(group_key) {
            Some(semaphore) => semaphore.clone(),
            None => self
                .groups
                .entry(group_key.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(isolation.limit_for(group_key))))
                .clone(),
        };

        semaphore.try_acquire_owned().ok()
    }

    /// Free slots in a group, if it has been used yet.
    pub fn available(&self, group_key: &str) -> Option<usize> {
        self.groups.get(group_key).map(|s| s.available_permits())
    }

    /// Forget all groups so the next acquisition picks up new limits.
    /// Permits already handed out stay valid but return to the forgotten
    /// semaphore, so they do not count against the new limit.
    pub fn reset(&self) {
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isolation(limit: usize) -> IsolationConfig {
        IsolationConfig {
            max_concurrent: limit,
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_when_saturated() {
        let bulkheads = Bulkheads::new();
        let config = isolation(2);

        let a = bulkheads.try_acquire("inventory", &config);
        let b = bulkheads.try_acquire("inventory", &config);
        assert!(a.is_some() && b.is_some());
        assert!(bulkheads.try_acquire("inventory", &config).is_none());
        assert!(bulkheads.try_acquire("billing", &config).is_some());

        drop(a);
        assert_eq!(bulkheads.available("inventory"), Some(1));
        assert!(bulkheads.try_acquire("inventory", &config).is_some());
    }

    #[test]
    fn test_reset_applies_new_limits() {
        let bulkheads = Bulkheads::new();
        let _held = bulkheads.try_acquire("inventory", &isolation(1));
        assert!(bulkheads.try_acquire("inventory", &isolation(1)).is_none());

        bulkheads.reset();
        assert!(bulkheads.try_acquire("inventory", &isolation(3)).is_some());
        assert_eq!(bulkheads.available("inventory"), Some(2));
    }

    #[test]
    fn test_permits_held_across_reset_are_not_counted() {
        let bulkheads = Bulkheads::new();
        let held = bulkheads.try_acquire("inventory", &isolation(1));
        assert!(held.is_some());

        bulkheads.reset();
        let fresh = bulkheads.try_acquire("inventory", &isolation(1));
        assert!(fresh.is_some(), "new limit ignores the in-flight permit");
        assert!(bulkheads.try_acquire("inventory", &isolation(1)).is_none());

        drop(held);
        assert_eq!(bulkheads.available("inventory"), Some(0));
    }
}
