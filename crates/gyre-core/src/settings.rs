//! The settings registry.
//!
//! Every configuration value the model consults is declared once in a
//! table of [`SettingDef`]s with a typed default. A [`SettingsBuilder`]
//! starts from those defaults, accepts overrides (programmatic or from a
//! TOML document), and is frozen by [`SettingsBuilder::build`] into an
//! immutable [`Settings`]. After that point nothing can change a value,
//! so every stage in a run observes the same configuration.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// The type a setting is declared with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingKind {
    /// Boolean flag.
    Bool,
    /// Signed integer.
    Int,
    /// Floating-point scalar.
    Float,
    /// Free text.
    Text,
}

impl SettingKind {
    /// Lower-case name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed setting value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Free text.
    Text(Cow<'static, str>),
}

impl SettingValue {
    /// The kind of this value.
    pub fn kind(&self) -> SettingKind {
        match self {
            Self::Bool(_) => SettingKind::Bool,
            Self::Int(_) => SettingKind::Int,
            Self::Float(_) => SettingKind::Float,
            Self::Text(_) => SettingKind::Text,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:e}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&'static str> for SettingValue {
    fn from(v: &'static str) -> Self {
        Self::Text(Cow::Borrowed(v))
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        Self::Text(Cow::Owned(v))
    }
}

/// Declaration of one setting: its name, typed default, and a one-line
/// description.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingDef {
    /// Registry key.
    pub name: &'static str,
    /// Default value; its variant fixes the setting's kind.
    pub default: SettingValue,
    /// One-line description.
    pub doc: &'static str,
}

const fn flag(name: &'static str, default: bool, doc: &'static str) -> SettingDef {
    SettingDef {
        name,
        default: SettingValue::Bool(default),
        doc,
    }
}

const fn int(name: &'static str, default: i64, doc: &'static str) -> SettingDef {
    SettingDef {
        name,
        default: SettingValue::Int(default),
        doc,
    }
}

const fn float(name: &'static str, default: f64, doc: &'static str) -> SettingDef {
    SettingDef {
        name,
        default: SettingValue::Float(default),
        doc,
    }
}

/// Settings known to the ocean model.
pub const SETTINGS: &[SettingDef] = &[
    SettingDef {
        name: "identifier",
        default: SettingValue::Text(Cow::Borrowed("UNNAMED")),
        doc: "Identifier of the current simulation, used in output file names",
    },
    // grid
    int("nx", 0, "Grid points in zonal (x) direction"),
    int("ny", 0, "Grid points in meridional (y) direction"),
    int("nz", 0, "Grid points in vertical (z) direction"),
    int("np", 0, "Spectral bins of the internal-wave M2/NIW closures"),
    int("nisle", 0, "Number of islands for the streamfunction solver"),
    // time stepping
    float("dt_mom", 0.0, "Time step in seconds for momentum"),
    float("dt_tracer", 0.0, "Time step in seconds for tracers"),
    float("runlen", 0.0, "Requested run length in seconds"),
    float("snapint", 0.0, "Snapshot interval in seconds"),
    // domain and solver
    flag("enable_cyclic_x", false, "Enable cyclic boundary conditions in x"),
    flag("enable_hydrostatic", true, "Enable hydrostatic approximation"),
    flag("enable_streamfunction", false, "Solve for the barotropic streamfunction"),
    float("congr_epsilon", 1e-12, "Convergence criterion of the elliptic solver"),
    int("congr_max_iterations", 1000, "Maximum iterations of the elliptic solver"),
    // friction and mixing
    flag(
        "enable_implicit_vert_friction",
        false,
        "Treat vertical friction implicitly",
    ),
    flag("enable_neutral_diffusion", false, "Enable isoneutral mixing"),
    float("k_gm_0", 0.0, "Background GM thickness diffusivity"),
    float("k_iso_0", 0.0, "Background isoneutral diffusivity"),
    float("kappa_h_0", 0.0, "Background vertical diffusivity"),
    float("kappa_m_0", 0.0, "Background vertical viscosity"),
    // closures
    flag("enable_tke", false, "Enable the turbulent kinetic energy closure"),
    flag("enable_eke", false, "Enable the eddy kinetic energy closure"),
    flag("enable_idemix", false, "Enable the internal-wave energy closure"),
    flag("enable_idemix_m2", false, "Enable the M2 tidal internal-wave compartment"),
    flag(
        "enable_idemix_niw",
        false,
        "Enable the near-inertial internal-wave compartment",
    ),
    // diagnostics
    flag("enable_diag_averages", false, "Enable running time averages"),
    flag("enable_diag_energy", false, "Enable energy budget diagnostics"),
    flag(
        "enable_diag_overturning",
        false,
        "Enable overturning circulation diagnostics",
    ),
    flag("enable_diag_particles", false, "Enable particle tracking"),
];

#[derive(Clone, Debug)]
struct Entry {
    def: SettingDef,
    value: SettingValue,
}

fn checked(name: &str, kind: SettingKind, value: SettingValue) -> Result<SettingValue, SettingsError> {
    match (kind, value) {
        (SettingKind::Float, SettingValue::Int(v)) => Ok(SettingValue::Float(v as f64)),
        (kind, value) if value.kind() == kind => Ok(value),
        (kind, value) => Err(SettingsError::TypeMismatch {
            name: name.to_string(),
            expected: kind.as_str(),
            found: value.kind().as_str(),
        }),
    }
}

/// Mutable settings under construction.
///
/// Created from a table of declarations with every value at its default.
/// Overrides are type-checked against the declared kind; an integer may
/// set a float setting.
#[derive(Clone, Debug)]
pub struct SettingsBuilder {
    entries: IndexMap<&'static str, Entry>,
}

impl SettingsBuilder {
    /// Builder over the model's [`SETTINGS`] table.
    pub fn new() -> Self {
        Self::with_table(SETTINGS)
    }

    /// Builder over an arbitrary declaration table.
    ///
    /// Later duplicates in `table` replace earlier ones.
    pub fn with_table(table: &[SettingDef]) -> Self {
        let mut entries = IndexMap::with_capacity(table.len());
        for def in table {
            entries.insert(
                def.name,
                Entry {
                    value: def.default.clone(),
                    def: def.clone(),
                },
            );
        }
        Self { entries }
    }

    /// Register an additional setting, e.g. a model-specific parameter.
    pub fn register(&mut self, def: SettingDef) -> Result<&mut Self, SettingsError> {
        if self.entries.contains_key(def.name) {
            return Err(SettingsError::Duplicate {
                name: def.name.to_string(),
            });
        }
        self.entries.insert(
            def.name,
            Entry {
                value: def.default.clone(),
                def,
            },
        );
        Ok(self)
    }

    /// Reset every registered setting to its declared default.
    pub fn set_defaults(&mut self) -> &mut Self {
        for entry in self.entries.values_mut() {
            entry.value = entry.def.default.clone();
        }
        self
    }

    /// Override one setting.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<SettingValue>,
    ) -> Result<&mut Self, SettingsError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| SettingsError::UnknownSetting {
                name: name.to_string(),
            })?;
        entry.value = checked(name, entry.def.default.kind(), value.into())?;
        Ok(self)
    }

    /// Apply every top-level key of a TOML document as an override.
    ///
    /// The whole document is validated before any value is applied, so a
    /// rejected document leaves the builder unchanged.
    pub fn apply_toml(&mut self, document: &str) -> Result<&mut Self, SettingsError> {
        let overrides: BTreeMap<String, SettingValue> =
            toml::from_str(document).map_err(|e| SettingsError::Parse {
                reason: e.to_string(),
            })?;
        let mut staged = self.clone();
        for (name, value) in overrides {
            staged.set(&name, value)?;
        }
        *self = staged;
        Ok(self)
    }

    /// Freeze the settings for the duration of a run.
    pub fn build(self) -> Settings {
        Settings {
            entries: self.entries,
        }
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen, read-only settings.
///
/// Lookups of unregistered names fail with
/// [`SettingsError::UnknownSetting`]; typed accessors fail with
/// [`SettingsError::TypeMismatch`] when the kind differs.
#[derive(Clone, Debug)]
pub struct Settings {
    entries: IndexMap<&'static str, Entry>,
}

impl Settings {
    /// The model's settings with every value at its default.
    pub fn defaults() -> Self {
        SettingsBuilder::new().build()
    }

    /// Look up a setting's current value.
    pub fn get(&self, name: &str) -> Result<&SettingValue, SettingsError> {
        self.entries
            .get(name)
            .map(|e| &e.value)
            .ok_or_else(|| SettingsError::UnknownSetting {
                name: name.to_string(),
            })
    }

    /// Declared kind of a setting.
    pub fn kind(&self, name: &str) -> Result<SettingKind, SettingsError> {
        self.entries
            .get(name)
            .map(|e| e.def.default.kind())
            .ok_or_else(|| SettingsError::UnknownSetting {
                name: name.to_string(),
            })
    }

    /// Whether a setting is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Read a boolean flag.
    pub fn flag(&self, name: &str) -> Result<bool, SettingsError> {
        match self.get(name)? {
            SettingValue::Bool(v) => Ok(*v),
            other => Err(mismatch(name, SettingKind::Bool, other)),
        }
    }

    /// Read an integer setting.
    pub fn int(&self, name: &str) -> Result<i64, SettingsError> {
        match self.get(name)? {
            SettingValue::Int(v) => Ok(*v),
            other => Err(mismatch(name, SettingKind::Int, other)),
        }
    }

    /// Read a float setting.
    pub fn float(&self, name: &str) -> Result<f64, SettingsError> {
        match self.get(name)? {
            SettingValue::Float(v) => Ok(*v),
            other => Err(mismatch(name, SettingKind::Float, other)),
        }
    }

    /// Read a text setting.
    pub fn text(&self, name: &str) -> Result<&str, SettingsError> {
        match self.get(name)? {
            SettingValue::Text(v) => Ok(&**v),
            other => Err(mismatch(name, SettingKind::Text, other)),
        }
    }

    /// Iterate over `(name, value)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SettingValue)> {
        self.entries.iter().map(|(name, e)| (*name, &e.value))
    }

    /// Names whose current value differs from the declared default.
    pub fn overridden(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(|(_, e)| e.value != e.def.default)
            .map(|(name, _)| *name)
    }

    /// Number of registered settings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn mismatch(name: &str, requested: SettingKind, found: &SettingValue) -> SettingsError {
    SettingsError::TypeMismatch {
        name: name.to_string(),
        expected: found.kind().as_str(),
        found: requested.as_str(),
    }
}
