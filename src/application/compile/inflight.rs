use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::{TemplateFailure, TemplateId};

use super::CompileOutcome;

/// Tracks compiles currently queued or running so concurrent requests for the
/// same template share one compile instead of each enqueuing their own.
///
/// The first requester for an id becomes the leader and enqueues the job; later
/// requesters only register a waiter. Whoever finishes the job calls
/// [`InFlightCompiles::complete`], which fans the outcome out to every waiter.
#[derive(Default, Clone)]
pub struct InFlightCompiles {
    waiters: Arc<DashMap<TemplateId, Vec<oneshot::Sender<CompileOutcome>>>>,
}

pub(crate) struct Subscription {
    pub(crate) receiver: oneshot::Receiver<CompileOutcome>,
    pub(crate) leader: bool,
}

impl InFlightCompiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self, id: &TemplateId) -> Subscription {
        let (tx, rx) = oneshot::channel();
        let leader = match self.waiters.entry(id.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(vec![tx]);
                true
            }
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().push(tx);
                false
            }
        };

        if !leader {
            debug!(template_id = %id, "Joined in-flight compile");
        }

        Subscription {
            receiver: rx,
            leader,
        }
    }

    /// Deliver `outcome` to everyone waiting on `id` and forget the compile.
    pub(crate) fn complete(&self, id: &TemplateId, outcome: &CompileOutcome) {
        let Some((_id, waiters)) = self.waiters.remove(id) else {
            return;
        };
        for waiter in waiters {
            // A waiter that gave up (timed out) has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Fail every waiter on `id`, e.g. when the job could not be queued.
    pub(crate) fn abandon(&self, id: &TemplateId, reason: &str) {
        self.complete(id, &Err(TemplateFailure::unexpected(reason)));
    }

    pub fn in_flight(&self) -> usize {
        self.waiters.len()
    }
}
