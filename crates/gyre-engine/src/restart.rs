//! Restart records and stores.
//!
//! A restart is one [`RestartRecord`] per allocated field, keyed by field
//! name and iteration. The on-disk codec is the store's business; the
//! engine only relies on the [`RestartStore`] contract.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use gyre_arena::{FieldData, State};
use gyre_core::Iteration;
use tracing::{debug, info};

use crate::error::RestartError;

/// One field's persisted value.
#[derive(Clone, Debug, PartialEq)]
pub struct RestartRecord {
    /// Field name.
    pub field: String,
    /// Iteration at which the record was written.
    pub iteration: Iteration,
    /// Full storage. Time levels are in logical order (previous,
    /// current, next) as produced by [`State::export`].
    pub data: FieldData,
}

/// Persistence of restart records.
pub trait RestartStore: Send {
    /// The record for `field` at `iteration`, or `None` if absent.
    fn read(&self, field: &str, iteration: Iteration)
        -> Result<Option<RestartRecord>, RestartError>;

    /// Persist every allocated field of `state` at `iteration`.
    fn write(&mut self, state: &State, iteration: Iteration) -> Result<(), RestartError>;
}

/// Populate `state` in place from the records at `iteration`.
///
/// Fields without a record keep their zero initialisation. A record
/// whose shape or element type disagrees with the allocation is an error.
/// Returns the number of fields loaded.
pub fn read_restart(
    store: &dyn RestartStore,
    state: &mut State,
    iteration: Iteration,
) -> Result<usize, RestartError> {
    info!(%iteration, "reading restarts");
    let names: Vec<&'static str> = state.field_names().collect();
    let mut loaded = 0;
    for name in names {
        match store.read(name, iteration)? {
            Some(record) => {
                state.load(name, record.data)?;
                debug!(field = name, "restored from restart");
                loaded += 1;
            }
            None => debug!(field = name, "no restart record"),
        }
    }
    info!(loaded, "restart read complete");
    Ok(loaded)
}

type Records = BTreeMap<(String, Iteration), RestartRecord>;

/// In-memory store. Clones share the same records.
#[derive(Clone, Debug, Default)]
pub struct MemoryRestartStore {
    records: Arc<Mutex<Records>>,
}

impl MemoryRestartStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one record.
    pub fn insert(&self, record: RestartRecord) -> Result<(), RestartError> {
        let key = (record.field.clone(), record.iteration);
        self.lock()?.insert(key, record);
        Ok(())
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize, RestartError> {
        Ok(self.lock()?.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> Result<bool, RestartError> {
        Ok(self.lock()?.is_empty())
    }

    /// Iterations for which at least one record exists, ascending.
    pub fn iterations(&self) -> Result<Vec<Iteration>, RestartError> {
        let records = self.lock()?;
        let its: BTreeSet<Iteration> = records.keys().map(|(_, it)| *it).collect();
        Ok(its.into_iter().collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Records>, RestartError> {
        self.records.lock().map_err(|_| RestartError::Store {
            reason: "restart store lock poisoned".to_string(),
        })
    }
}

impl RestartStore for MemoryRestartStore {
    fn read(
        &self,
        field: &str,
        iteration: Iteration,
    ) -> Result<Option<RestartRecord>, RestartError> {
        Ok(self.lock()?.get(&(field.to_string(), iteration)).cloned())
    }

    fn write(&mut self, state: &State, iteration: Iteration) -> Result<(), RestartError> {
        let mut records = self.lock()?;
        for name in state.field_names() {
            records.insert(
                (name.to_string(), iteration),
                RestartRecord {
                    field: name.to_string(),
                    iteration,
                    data: state.export(name)?,
                },
            );
        }
        debug!(%iteration, fields = state.len(), "restart written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gyre_arena::{Catalog, Dim, GridShape, Slot, VariableDescriptor};
    use gyre_core::{FieldError, Settings};
    use ndarray::{ArrayD, IxDyn};

    fn state() -> State {
        let catalog = Catalog::from_descriptors([
            VariableDescriptor::new("ht", &[Dim::Xt, Dim::Yt], "m", "depth"),
            VariableDescriptor::new("temp", &[Dim::Xt, Dim::Yt, Dim::Zt], "deg C", "temperature")
                .time_dependent(),
        ])
        .unwrap();
        State::allocate(&catalog, &Settings::defaults(), &GridShape::ocean(2, 2, 3)).unwrap()
    }

    #[test]
    fn write_then_read_restores_every_slot() {
        let mut original = state();
        original.float_mut("ht").unwrap().fill(4000.0);
        original.slot_mut("temp", Slot::Current).unwrap().fill(12.5);
        original.slot_mut("temp", Slot::Previous).unwrap().fill(12.0);

        let mut store = MemoryRestartStore::new();
        store.write(&original, Iteration(10)).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.iterations().unwrap(), vec![Iteration(10)]);

        let mut restored = state();
        assert_eq!(read_restart(&store, &mut restored, Iteration(10)).unwrap(), 2);
        assert_eq!(restored.data("ht").unwrap(), original.data("ht").unwrap());
        assert_eq!(restored.data("temp").unwrap(), original.data("temp").unwrap());
    }

    #[test]
    fn rotated_state_restores_under_the_same_labels() {
        let mut original = state();
        original.advance_time();
        for (slot, value) in Slot::ALL.into_iter().zip([1.0, 2.0, 3.0]) {
            original.slot_mut("temp", slot).unwrap().fill(value);
        }
        let mut store = MemoryRestartStore::new();
        store.write(&original, Iteration(1)).unwrap();

        let mut restored = state();
        read_restart(&store, &mut restored, Iteration(1)).unwrap();
        assert!(restored.time_index().is_identity());
        for slot in Slot::ALL {
            assert_eq!(
                restored.slot("temp", slot).unwrap(),
                original.slot("temp", slot).unwrap(),
                "{slot} level differs after restart"
            );
        }
    }

    #[test]
    fn poisoned_store_reports_an_error() {
        let store = MemoryRestartStore::new();
        let shared = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.records.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(matches!(store.len(), Err(RestartError::Store { .. })));
        assert!(matches!(store.is_empty(), Err(RestartError::Store { .. })));
    }

    #[test]
    fn missing_records_leave_fields_zeroed() {
        let store = MemoryRestartStore::new();
        let mut fresh = state();
        assert_eq!(read_restart(&store, &mut fresh, Iteration(0)).unwrap(), 0);
        assert!(fresh.float("ht").unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let store = MemoryRestartStore::new();
        store
            .insert(RestartRecord {
                field: "ht".to_string(),
                iteration: Iteration(0),
                data: FieldData::Float(ArrayD::zeros(IxDyn(&[3, 3]))),
            })
            .unwrap();
        let mut fresh = state();
        assert_eq!(
            read_restart(&store, &mut fresh, Iteration(0)).unwrap_err(),
            RestartError::Field(FieldError::ShapeMismatch {
                name: "ht".to_string(),
                expected: vec![6, 6],
                found: vec![3, 3],
            })
        );
    }

    #[test]
    fn clones_share_records() {
        let a = MemoryRestartStore::new();
        let mut b = a.clone();
        b.write(&state(), Iteration(3)).unwrap();
        assert_eq!(a.len().unwrap(), 2);
        assert!(a.read("temp", Iteration(3)).unwrap().is_some());
        assert!(a.read("temp", Iteration(4)).unwrap().is_none());
    }
}
