// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Run Registry
//!
//! Concurrent map from [`RunId`] to the [`RunData`] of every governed build
//! that has not been finalized. Sole source of truth for "is this build
//! governed, and what does it know about its relatives".
//!
//! Backed by a sharded `DashMap`: operations on one key are linearizable,
//! operations on unrelated keys are unordered.
//!
//! # Locking rule
//!
//! Closures passed to [`RunRegistry::with_data`] and
//! [`RunRegistry::with_data_mut`] run under the shard lock of their key.
//! They must not call back into the registry or into the host; copy what is
//! needed out and act after the closure returns.

use dashmap::mapref::entry::Entry;
#[cfg(test)]
use dashmap::try_result::TryResult;
use dashmap::DashMap;
use tracing::debug;

use crate::domain::run::RunId;
use crate::domain::run_data::{RunData, RunSnapshot};
use crate::infrastructure::telemetry::Telemetry;

#[derive(Debug, Default)]
pub struct RunRegistry {
    entries: DashMap<RunId, RunData>,
    telemetry: Telemetry,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::with_telemetry(Telemetry::default())
    }

    pub fn with_telemetry(telemetry: Telemetry) -> Self {
        Self {
            entries: DashMap::new(),
            telemetry,
        }
    }

    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    /// Insert `data` under its run's id. An existing entry is left untouched
    /// and `false` is returned.
    pub fn register(&self, data: RunData) -> bool {
        let id = data.run().id();
        let inserted = match self.entries.entry(id) {
            Entry::Occupied(existing) => {
                debug!(run_id = %existing.key(), "Run already registered, keeping existing entry");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(data);
                true
            }
        };
        if inserted {
            self.telemetry.record_registration();
            self.telemetry.record_registry_size(self.entries.len());
        }
        inserted
    }

    pub fn contains(&self, id: &RunId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn lookup(&self, id: &RunId) -> Option<RunSnapshot> {
        self.entries.get(id).map(|entry| RunSnapshot::from(entry.value()))
    }

    pub fn with_data<R>(&self, id: &RunId, f: impl FnOnce(&RunData) -> R) -> Option<R> {
        self.entries.get(id).map(|entry| f(entry.value()))
    }

    pub fn with_data_mut<R>(&self, id: &RunId, f: impl FnOnce(&mut RunData) -> R) -> Option<R> {
        self.entries.get_mut(id).map(|mut entry| f(entry.value_mut()))
    }

    /// Remove the entry for `id`. Removing an absent key is a no-op.
    pub fn unregister(&self, id: &RunId) -> Option<RunData> {
        let removed = self.entries.remove(id).map(|(_, data)| data);
        if removed.is_some() {
            self.telemetry.record_registry_size(self.entries.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<RunId> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Whether another caller currently holds the shard lock for `id`.
    #[cfg(test)]
    pub(crate) fn is_locked(&self, id: &RunId) -> bool {
        matches!(self.entries.try_get(id), TryResult::Locked)
    }

    /// Drop every entry, returning the ids that were tracked.
    pub fn clear(&self) -> Vec<RunId> {
        let ids = self.ids();
        for id in &ids {
            self.entries.remove(id);
        }
        self.telemetry.record_registry_size(self.entries.len());
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::Run;
    use crate::domain::run_data::DownstreamLink;
    use crate::infrastructure::simulation::{BufferedListener, SimulatedRun};
    use std::sync::Arc;

    fn data_for(id: &str) -> RunData {
        RunData::new(
            Arc::new(SimulatedRun::builder(id).build()),
            Arc::new(BufferedListener::new()),
        )
    }

    #[test]
    fn test_register_lookup_unregister() {
        let registry = RunRegistry::new();
        let id = RunId::from("job/a/1");

        assert!(registry.register(data_for("job/a/1")));
        assert!(registry.contains(&id));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(&id).unwrap().id, id);

        assert!(registry.unregister(&id).is_some());
        assert!(registry.lookup(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = RunRegistry::new();
        let id = RunId::from("job/a/1");
        registry.register(data_for("job/a/1"));
        assert!(registry.unregister(&id).is_some());
        assert!(registry.unregister(&id).is_none());
        assert!(registry.unregister(&RunId::from("job/never/1")).is_none());
    }

    #[test]
    fn test_second_register_keeps_first_entry() {
        let registry = RunRegistry::new();
        let id = RunId::from("job/a/1");
        registry.register(data_for("job/a/1"));
        let child: Arc<dyn Run> = Arc::new(SimulatedRun::builder("job/b/1").build());
        let link = DownstreamLink::new(child.id(), &child);
        registry.with_data_mut(&id, |data| data.add_downstream(link));

        assert!(!registry.register(data_for("job/a/1")));
        assert_eq!(registry.lookup(&id).unwrap().downstream, vec![RunId::from("job/b/1")]);
    }

    #[test]
    fn test_with_data_mut_on_absent_key() {
        let registry = RunRegistry::new();
        let touched = registry.with_data_mut(&RunId::from("job/a/1"), |_| ());
        assert!(touched.is_none());
    }

    #[test]
    fn test_concurrent_registration_is_lossless() {
        let registry = RunRegistry::new();
        std::thread::scope(|scope| {
            for t in 0..8 {
                let registry = &registry;
                scope.spawn(move || {
                    for i in 0..50 {
                        registry.register(data_for(&format!("job/t{}/{}", t, i)));
                    }
                });
            }
        });
        assert_eq!(registry.len(), 400);

        let cleared = registry.clear();
        assert_eq!(cleared.len(), 400);
        assert!(registry.is_empty());
    }
}
