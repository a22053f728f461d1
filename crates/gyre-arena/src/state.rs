//! Allocated model state.

use gyre_core::{FieldError, Settings};
use indexmap::IndexMap;
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::descriptor::{ElementType, VariableDescriptor};
use crate::error::ArenaError;
use crate::grid::GridShape;
use crate::time_level::{Slot, TimeIndex};

/// Storage of one field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    /// `f64` elements.
    Float(ArrayD<f64>),
    /// `i32` elements.
    Int(ArrayD<i32>),
}

impl FieldData {
    /// Zero-filled storage of the given type and shape.
    pub fn zeros(element: ElementType, shape: &[usize]) -> Self {
        match element {
            ElementType::Float => Self::Float(ArrayD::zeros(IxDyn(shape))),
            ElementType::Int => Self::Int(ArrayD::zeros(IxDyn(shape))),
        }
    }

    /// Element type held.
    pub fn element(&self) -> ElementType {
        match self {
            Self::Float(_) => ElementType::Float,
            Self::Int(_) => ElementType::Int,
        }
    }

    /// Extents, including the time axis if present.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float(a) => a.shape(),
            Self::Int(a) => a.shape(),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(a) => a.len(),
            Self::Int(a) => a.len(),
        }
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reorder the trailing time axis: entry `i` of the result is entry
    /// `order[i]` of `self`.
    fn select_time(&self, order: &[usize]) -> Self {
        match self {
            Self::Float(a) => Self::Float(a.select(Axis(a.ndim() - 1), order)),
            Self::Int(a) => Self::Int(a.select(Axis(a.ndim() - 1), order)),
        }
    }

    fn size_bytes(&self) -> usize {
        match self {
            Self::Float(a) => a.len() * std::mem::size_of::<f64>(),
            Self::Int(a) => a.len() * std::mem::size_of::<i32>(),
        }
    }
}

#[derive(Clone, Debug)]
struct Field {
    descriptor: VariableDescriptor,
    data: FieldData,
}

/// Every allocated field of a run plus the shared [`TimeIndex`].
///
/// Fields whose enable-predicate was false are remembered by name; any
/// access to them fails with [`FieldError::Unallocated`]. Names outside
/// the catalog fail with [`FieldError::Unknown`].
#[derive(Clone, Debug)]
pub struct State {
    fields: IndexMap<&'static str, Field>,
    disabled: IndexMap<&'static str, VariableDescriptor>,
    time: TimeIndex,
}

impl State {
    /// Allocate every enabled field of `catalog`, zero-initialised.
    ///
    /// Predicates are checked against `settings` before anything is
    /// allocated. Every descriptor's shape is resolved, enabled or not, so
    /// an axis the grid lacks is reported even on disabled fields.
    pub fn allocate(
        catalog: &Catalog,
        settings: &Settings,
        grid: &GridShape,
    ) -> Result<Self, ArenaError> {
        catalog.check_settings(settings)?;

        let mut fields = IndexMap::with_capacity(catalog.len());
        let mut disabled = IndexMap::new();
        for entry in catalog.iter() {
            let descriptor = *entry.descriptor();
            let levels = descriptor.time_dependent.then_some(TimeIndex::LEVELS);
            let shape = grid.resolve(descriptor.name, descriptor.dims, levels)?;
            if !entry.is_enabled(settings)? {
                debug!(
                    field = descriptor.name,
                    condition = descriptor.condition.unwrap_or_default(),
                    "skipping disabled field"
                );
                disabled.insert(descriptor.name, descriptor);
                continue;
            }
            debug!(field = descriptor.name, shape = ?shape.as_slice(), "allocating");
            let data = FieldData::zeros(descriptor.element, &shape);
            fields.insert(descriptor.name, Field { descriptor, data });
        }

        let state = Self {
            fields,
            disabled,
            time: TimeIndex::identity(),
        };
        info!(
            allocated = state.fields.len(),
            skipped = state.disabled.len(),
            bytes = state.memory_bytes(),
            "state allocated"
        );
        Ok(state)
    }

    /// Whether `name` is allocated.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Whether `name` is catalogued but was not allocated.
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains_key(name)
    }

    /// Declaration of an allocated field.
    pub fn descriptor(&self, name: &str) -> Result<&VariableDescriptor, FieldError> {
        self.field(name).map(|f| &f.descriptor)
    }

    /// Full storage of a field, including all time levels.
    pub fn data(&self, name: &str) -> Result<&FieldData, FieldError> {
        self.field(name).map(|f| &f.data)
    }

    /// Extents of a field, including the time axis if present.
    pub fn shape(&self, name: &str) -> Result<&[usize], FieldError> {
        self.field(name).map(|f| f.data.shape())
    }

    /// Whole `f64` array of a field.
    pub fn float(&self, name: &str) -> Result<ArrayViewD<'_, f64>, FieldError> {
        match &self.field(name)?.data {
            FieldData::Float(a) => Ok(a.view()),
            FieldData::Int(_) => Err(type_mismatch(name, ElementType::Int, ElementType::Float)),
        }
    }

    /// Whole `f64` array of a field, mutably.
    pub fn float_mut(&mut self, name: &str) -> Result<ArrayViewMutD<'_, f64>, FieldError> {
        match &mut self.field_mut(name)?.data {
            FieldData::Float(a) => Ok(a.view_mut()),
            FieldData::Int(_) => Err(type_mismatch(name, ElementType::Int, ElementType::Float)),
        }
    }

    /// Whole `i32` array of a field.
    pub fn int(&self, name: &str) -> Result<ArrayViewD<'_, i32>, FieldError> {
        match &self.field(name)?.data {
            FieldData::Int(a) => Ok(a.view()),
            FieldData::Float(_) => Err(type_mismatch(name, ElementType::Float, ElementType::Int)),
        }
    }

    /// Whole `i32` array of a field, mutably.
    pub fn int_mut(&mut self, name: &str) -> Result<ArrayViewMutD<'_, i32>, FieldError> {
        match &mut self.field_mut(name)?.data {
            FieldData::Int(a) => Ok(a.view_mut()),
            FieldData::Float(_) => Err(type_mismatch(name, ElementType::Float, ElementType::Int)),
        }
    }

    /// One time level of a time-dependent `f64` field. No data is copied.
    pub fn slot(&self, name: &str, slot: Slot) -> Result<ArrayViewD<'_, f64>, FieldError> {
        let position = self.time.position(slot);
        let field = self.field(name)?;
        if !field.descriptor.time_dependent {
            return Err(FieldError::NotTimeDependent {
                name: name.to_string(),
            });
        }
        match &field.data {
            FieldData::Float(a) => Ok(a.index_axis(Axis(a.ndim() - 1), position)),
            FieldData::Int(_) => Err(type_mismatch(name, ElementType::Int, ElementType::Float)),
        }
    }

    /// One time level of a time-dependent `f64` field, mutably.
    pub fn slot_mut(
        &mut self,
        name: &str,
        slot: Slot,
    ) -> Result<ArrayViewMutD<'_, f64>, FieldError> {
        let position = self.time.position(slot);
        let field = self.field_mut(name)?;
        if !field.descriptor.time_dependent {
            return Err(FieldError::NotTimeDependent {
                name: name.to_string(),
            });
        }
        match &mut field.data {
            FieldData::Float(a) => {
                let last = Axis(a.ndim() - 1);
                Ok(a.index_axis_mut(last, position))
            }
            FieldData::Int(_) => Err(type_mismatch(name, ElementType::Int, ElementType::Float)),
        }
    }

    /// Copy of a field's storage with the time axis in logical order:
    /// previous, current, next. Static fields are copied as stored.
    ///
    /// This is the layout [`State::load`] expects, so an export survives
    /// into a state with a different [`TimeIndex`].
    pub fn export(&self, name: &str) -> Result<FieldData, FieldError> {
        let field = self.field(name)?;
        if !field.descriptor.time_dependent {
            return Ok(field.data.clone());
        }
        Ok(field.data.select_time(&self.time.logical_order()))
    }

    /// Replace a field's storage, e.g. from a restart record.
    ///
    /// The element type and shape must match the allocation exactly.
    /// Time-dependent data is taken in logical order (see
    /// [`State::export`]) and placed under the current [`TimeIndex`].
    pub fn load(&mut self, name: &str, data: FieldData) -> Result<(), FieldError> {
        let time = self.time;
        let field = self.field_mut(name)?;
        if field.data.element() != data.element() {
            return Err(type_mismatch(name, field.data.element(), data.element()));
        }
        if field.data.shape() != data.shape() {
            return Err(FieldError::ShapeMismatch {
                name: name.to_string(),
                expected: field.data.shape().to_vec(),
                found: data.shape().to_vec(),
            });
        }
        field.data = if field.descriptor.time_dependent {
            data.select_time(&time.physical_order())
        } else {
            data
        };
        Ok(())
    }

    /// The shared time-level permutation.
    pub fn time_index(&self) -> TimeIndex {
        self.time
    }

    /// Rotate the time levels of every time-dependent field at once.
    pub fn advance_time(&mut self) {
        self.time.rotate();
    }

    /// Allocated fields in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&VariableDescriptor, &FieldData)> {
        self.fields.values().map(|f| (&f.descriptor, &f.data))
    }

    /// Names of allocated fields in catalog order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    /// Names of catalogued fields that were not allocated.
    pub fn disabled_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.disabled.keys().copied()
    }

    /// Number of allocated fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is allocated.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total bytes of field storage.
    pub fn memory_bytes(&self) -> usize {
        self.fields.values().map(|f| f.data.size_bytes()).sum()
    }

    fn field(&self, name: &str) -> Result<&Field, FieldError> {
        self.fields
            .get(name)
            .ok_or_else(|| missing(&self.disabled, name))
    }

    fn field_mut(&mut self, name: &str) -> Result<&mut Field, FieldError> {
        let disabled = &self.disabled;
        self.fields
            .get_mut(name)
            .ok_or_else(|| missing(disabled, name))
    }
}

fn missing(disabled: &IndexMap<&'static str, VariableDescriptor>, name: &str) -> FieldError {
    if disabled.contains_key(name) {
        FieldError::Unallocated {
            name: name.to_string(),
        }
    } else {
        FieldError::Unknown {
            name: name.to_string(),
        }
    }
}

fn type_mismatch(name: &str, stored: ElementType, requested: ElementType) -> FieldError {
    FieldError::ElementTypeMismatch {
        name: name.to_string(),
        stored: stored.as_str(),
        requested: requested.as_str(),
    }
}
