//! Conditional allocation over the built-in ocean catalog.

use gyre_arena::{Catalog, GridShape, Predicate, Slot, State, OCEAN_VARIABLES};
use gyre_core::{FieldError, Settings, SettingsBuilder};
use proptest::prelude::*;

const GATING_FLAGS: [&str; 7] = [
    "enable_hydrostatic",
    "enable_streamfunction",
    "enable_tke",
    "enable_eke",
    "enable_idemix",
    "enable_idemix_m2",
    "enable_idemix_niw",
];

fn settings_with(flags: &[bool]) -> Settings {
    let mut builder = SettingsBuilder::new();
    for (name, &on) in GATING_FLAGS.iter().zip(flags) {
        builder.set(name, on).unwrap();
    }
    builder.set("enable_implicit_vert_friction", true).unwrap();
    builder.set("nx", 3_i64).unwrap();
    builder.set("ny", 2_i64).unwrap();
    builder.set("nz", 2_i64).unwrap();
    builder.set("np", 4_i64).unwrap();
    builder.set("nisle", 1_i64).unwrap();
    builder.build()
}

#[test]
fn every_gating_flag_is_a_registered_bool() {
    let defaults = Settings::defaults();
    for d in OCEAN_VARIABLES {
        if let Some(expr) = d.condition {
            let p = Predicate::parse(expr).unwrap();
            assert!(GATING_FLAGS.contains(&p.flag()), "{} gated on {}", d.name, p.flag());
            defaults.flag(p.flag()).unwrap();
        }
    }
}

#[test]
fn default_settings_allocate_only_unconditional_fields() {
    let settings = settings_with(&[true, false, false, false, false, false, false]);
    let grid = GridShape::from_settings(&settings).unwrap();
    let state = State::allocate(&Catalog::ocean().unwrap(), &settings, &grid).unwrap();
    let expected = OCEAN_VARIABLES.iter().filter(|d| d.condition.is_none()).count();
    assert_eq!(state.len(), expected);
    for name in ["tke", "eke", "e_iw", "e_m2", "e_niw", "psi", "p_non_hydro"] {
        assert_eq!(
            state.slot(name, Slot::Next).unwrap_err(),
            FieldError::Unallocated {
                name: name.to_string()
            }
        );
    }
}

#[test]
fn wave_fields_carry_direction_axis() {
    let settings = settings_with(&[true, false, false, false, true, true, true]);
    let grid = GridShape::from_settings(&settings).unwrap();
    let state = State::allocate(&Catalog::ocean().unwrap(), &settings, &grid).unwrap();
    assert_eq!(state.shape("e_m2").unwrap(), &[7, 6, 4, 3]);
    assert_eq!(state.shape("e_niw").unwrap(), &[7, 6, 4, 3]);
    assert_eq!(state.slot("e_m2", Slot::Next).unwrap().shape(), &[7, 6, 4]);
}

proptest! {
    #[test]
    fn field_allocated_iff_predicate_holds(flags in prop::collection::vec(any::<bool>(), 7)) {
        let settings = settings_with(&flags);
        let grid = GridShape::from_settings(&settings).unwrap();
        let catalog = Catalog::ocean().unwrap();
        let state = State::allocate(&catalog, &settings, &grid).unwrap();
        for entry in catalog.iter() {
            let name = entry.descriptor().name;
            let enabled = entry.is_enabled(&settings).unwrap();
            prop_assert_eq!(state.contains(name), enabled, "field {}", name);
            prop_assert_eq!(state.is_disabled(name), !enabled);
        }
        prop_assert_eq!(state.len() + state.disabled_names().count(), catalog.len());
        prop_assert!(state.time_index().is_identity());
    }
}
