//! Poison-tolerant access to `std::sync::RwLock`.
//!
//! Every critical section guarded here is a single map operation, so the data
//! behind a poisoned lock is still consistent; recovering beats failing every
//! later request.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) trait RecoverLock<T> {
    fn read_or_recover(&self, owner: &'static str, op: &'static str) -> RwLockReadGuard<'_, T>;
    fn write_or_recover(&self, owner: &'static str, op: &'static str)
    -> RwLockWriteGuard<'_, T>;
}

impl<T> RecoverLock<T> for RwLock<T> {
    fn read_or_recover(&self, owner: &'static str, op: &'static str) -> RwLockReadGuard<'_, T> {
        self.read()
            .unwrap_or_else(|poisoned| recovered(poisoned, owner, op, "rwlock.read"))
    }

    fn write_or_recover(
        &self,
        owner: &'static str,
        op: &'static str,
    ) -> RwLockWriteGuard<'_, T> {
        self.write()
            .unwrap_or_else(|poisoned| recovered(poisoned, owner, op, "rwlock.write"))
    }
}

fn recovered<G>(
    poisoned: PoisonError<G>,
    owner: &'static str,
    op: &'static str,
    lock_kind: &'static str,
) -> G {
    warn!(
        op,
        owner,
        lock_kind,
        result = "poisoned_recovered",
        "Recovered from poisoned lock"
    );
    poisoned.into_inner()
}
