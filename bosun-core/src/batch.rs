//! Batched status probes and coalesced kills
//!
//! Remote backends charge per round-trip: probing fifty queued jobs one by
//! one is fifty scheduler calls, while one bulk query answers all of them.
//! [`BatchContext`] lets handlers of the same concrete type share a single
//! probe per poll cycle, and [`BatchCleanup`] coalesces the kill calls
//! issued while draining the running queue on shutdown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Remote status of a backend job as reported by a bulk probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    /// Accepted by the backend but not yet running
    Pending,
    /// Currently executing
    Running,
    /// Reached a terminal state
    Terminated,
}

/// Capability of handlers whose status probes can be coalesced
///
/// The monitor groups batch-aware handlers by [`batch_key`] at the start of
/// each poll cycle and installs one shared [`BatchContext`] per group.
///
/// [`batch_key`]: BatchHandler::batch_key
pub trait BatchHandler: Send + Sync {
    /// Stable key grouping handlers that can share one status probe
    fn batch_key(&self) -> &str;

    /// Installs the shared collector used by the next completion check
    fn batch(&self, context: Arc<BatchContext>);
}

/// Per-poll-cycle aggregation of status probes
///
/// Created by the monitor when at least one batch-aware handler is in the
/// running queue, attached to every handler in the group, and discarded at
/// cycle end. The first handler probed performs the bulk query and fills
/// the cache; the rest read from it.
#[derive(Default)]
pub struct BatchContext {
    /// Remote ids collected for the coming bulk probe, in attach order
    collected: Mutex<Vec<String>>,

    /// Statuses filled in by the first bulk probe of the cycle
    cache: Mutex<HashMap<String, RemoteState>>,
}

impl BatchContext {
    /// Creates an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a remote id for the coming bulk probe
    pub fn collect(&self, id: impl Into<String>) {
        let id = id.into();
        let mut collected = self.collected.lock().unwrap();
        if !collected.contains(&id) {
            collected.push(id);
        }
    }

    /// All ids registered so far, in attach order
    pub fn collected(&self) -> Vec<String> {
        self.collected.lock().unwrap().clone()
    }

    /// Number of ids registered so far
    pub fn len(&self) -> usize {
        self.collected.lock().unwrap().len()
    }

    /// Whether no id has been registered
    pub fn is_empty(&self) -> bool {
        self.collected.lock().unwrap().is_empty()
    }

    /// Whether the bulk probe already ran this cycle
    pub fn is_probed(&self) -> bool {
        !self.cache.lock().unwrap().is_empty()
    }

    /// Stores the status of one remote id
    pub fn put_state(&self, id: impl Into<String>, state: RemoteState) {
        self.cache.lock().unwrap().insert(id.into(), state);
    }

    /// Cached status of a remote id, if the bulk probe reported one
    pub fn state(&self, id: &str) -> Option<RemoteState> {
        self.cache.lock().unwrap().get(id).copied()
    }
}

/// Capability of handlers whose kill calls can be coalesced on shutdown
pub trait GridHandler: Send + Sync {
    /// Installs the shared kill aggregator used during session teardown
    ///
    /// A handler with an aggregator installed defers its [`kill`] into it
    /// instead of issuing an individual backend call.
    ///
    /// [`kill`]: crate::handler::TaskHandler::kill
    fn cleanup(&self, batch: Arc<BatchCleanup>);
}

/// One coalesced backend kill for a group of jobs
#[async_trait]
pub trait BatchKiller: Send + Sync {
    /// Name grouping jobs killable by the same backend call
    fn name(&self) -> &str;

    /// Terminates all the given jobs in a single backend call
    async fn kill_all(&self, job_ids: Vec<String>) -> Result<()>;
}

/// Shutdown-time kill aggregator
///
/// Grid handlers deposit their remote job ids here while the running queue
/// drains; [`kill`](BatchCleanup::kill) flushes each group with one backend
/// call at the end. Per-group failures are logged and swallowed so teardown
/// always completes.
#[derive(Default)]
pub struct BatchCleanup {
    groups: Mutex<HashMap<String, (Arc<dyn BatchKiller>, Vec<String>)>>,
}

impl BatchCleanup {
    /// Creates an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Defers the kill of one remote job to the final flush
    pub fn defer(&self, killer: Arc<dyn BatchKiller>, job_id: impl Into<String>) {
        let mut groups = self.groups.lock().unwrap();
        groups
            .entry(killer.name().to_string())
            .or_insert_with(|| (killer, Vec::new()))
            .1
            .push(job_id.into());
    }

    /// Number of deferred kills across all groups
    pub fn len(&self) -> usize {
        self.groups.lock().unwrap().values().map(|(_, ids)| ids.len()).sum()
    }

    /// Whether no kill has been deferred
    pub fn is_empty(&self) -> bool {
        self.groups.lock().unwrap().is_empty()
    }

    /// Flushes every group with one backend call each
    pub async fn kill(&self) {
        let groups: Vec<_> = {
            let mut groups = self.groups.lock().unwrap();
            groups.drain().collect()
        };

        for (name, (killer, job_ids)) in groups {
            debug!("Killing {} job(s) via batch group '{}'", job_ids.len(), name);

            if let Err(e) = killer.kill_all(job_ids).await {
                warn!("Batch kill for group '{}' failed: {:#}", name, e);
            }
        }
    }
}
