//! The variable catalog: every field the model may allocate.
//!
//! [`OCEAN_VARIABLES`] is the built-in table. [`Catalog`] parses each
//! descriptor's enable-predicate once, up front, so that malformed
//! predicates and duplicate names are configuration errors at setup
//! rather than surprises during allocation.

use gyre_core::{Settings, SettingsError};
use indexmap::IndexMap;

use crate::descriptor::VariableDescriptor;
use crate::error::CatalogError;
use crate::grid::Dim::{self, Isle, Np, Xt, Xu, Yt, Yu, Zt, Zw};
use crate::predicate::Predicate;

const T_HOR: &[Dim] = &[Xt, Yt];
const U_HOR: &[Dim] = &[Xu, Yt];
const V_HOR: &[Dim] = &[Xt, Yu];
const ZETA_HOR: &[Dim] = &[Xu, Yu];
const T_GRID: &[Dim] = &[Xt, Yt, Zt];
const U_GRID: &[Dim] = &[Xu, Yt, Zt];
const V_GRID: &[Dim] = &[Xt, Yu, Zt];
const W_GRID: &[Dim] = &[Xt, Yt, Zw];
const T_WAVE: &[Dim] = &[Xt, Yt, Np];

type V = VariableDescriptor;

/// Fields of the ocean model, in allocation order.
pub static OCEAN_VARIABLES: &[VariableDescriptor] = &[
    // grid
    V::new("dxt", &[Xt], "m", "Zonal T-grid spacing"),
    V::new("dxu", &[Xu], "m", "Zonal U-grid spacing"),
    V::new("dyt", &[Yt], "m", "Meridional T-grid spacing"),
    V::new("dyu", &[Yu], "m", "Meridional U-grid spacing"),
    V::new("zt", &[Zt], "m", "Vertical coordinate"),
    V::new("zw", &[Zw], "m", "Vertical coordinate of interfaces"),
    V::new("dzt", &[Zt], "m", "Vertical spacing"),
    V::new("dzw", &[Zw], "m", "Vertical spacing of interfaces"),
    V::new("cost", &[Yt], "1", "Metric factor for spherical coordinates"),
    V::new("cosu", &[Yu], "1", "Metric factor for spherical coordinates"),
    V::new("tantr", &[Yt], "1", "Metric factor for spherical coordinates"),
    V::new("coriolis_t", T_HOR, "1/s", "Coriolis frequency at T grid point"),
    V::new("coriolis_h", T_HOR, "1/s", "Horizontal Coriolis frequency"),
    // topography
    V::new("kbot", T_HOR, "", "Index of the deepest grid cell").int(),
    V::new("ht", T_HOR, "m", "Total depth at T grid point"),
    V::new("hu", U_HOR, "m", "Total depth at U grid point"),
    V::new("hv", V_HOR, "m", "Total depth at V grid point"),
    V::new("hur", U_HOR, "1/m", "Inverse depth at U grid point"),
    V::new("hvr", V_HOR, "1/m", "Inverse depth at V grid point"),
    V::new("mask_t", T_GRID, "", "Mask in physical space for tracer points"),
    V::new("mask_u", U_GRID, "", "Mask in physical space for U points"),
    V::new("mask_v", V_GRID, "", "Mask in physical space for V points"),
    V::new("mask_w", W_GRID, "", "Mask in physical space for W points"),
    V::new("mask_z", &[Xu, Yu, Zt], "", "Mask in physical space for Zeta points"),
    // tracers and density
    V::new("temp", T_GRID, "deg C", "Conservative temperature").time_dependent(),
    V::new("dtemp", T_GRID, "deg C/s", "Conservative temperature tendency").time_dependent(),
    V::new("salt", T_GRID, "g/kg", "Salinity").time_dependent(),
    V::new("dsalt", T_GRID, "g/(kg s)", "Salinity tendency").time_dependent(),
    V::new("rho", T_GRID, "kg/m^3", "In-situ density anomaly").time_dependent(),
    V::new("p_hydro", T_GRID, "m^2/s^2", "Hydrostatic pressure"),
    V::new("p_non_hydro", T_GRID, "m^2/s^2", "Non-hydrostatic pressure")
        .time_dependent()
        .when("not enable_hydrostatic"),
    // momentum
    V::new("u", U_GRID, "m/s", "Zonal velocity").time_dependent(),
    V::new("v", V_GRID, "m/s", "Meridional velocity").time_dependent(),
    V::new("w", W_GRID, "m/s", "Vertical velocity").time_dependent(),
    V::new("du", U_GRID, "m/s^2", "Zonal velocity tendency").time_dependent(),
    V::new("dv", V_GRID, "m/s^2", "Meridional velocity tendency").time_dependent(),
    V::new("du_cor", U_GRID, "m/s^2", "Change of u by Coriolis force"),
    V::new("dv_cor", V_GRID, "m/s^2", "Change of v by Coriolis force"),
    V::new("du_mix", U_GRID, "m/s^2", "Change of u by vertical mixing"),
    V::new("dv_mix", V_GRID, "m/s^2", "Change of v by vertical mixing"),
    V::new("u_wgrid", &[Xu, Yt, Zw], "m/s", "Zonal velocity on W grid"),
    V::new("v_wgrid", &[Xt, Yu, Zw], "m/s", "Meridional velocity on W grid"),
    V::new("w_wgrid", W_GRID, "m/s", "Vertical velocity on W grid"),
    // forcing
    V::new("surface_taux", U_HOR, "N/m^2", "Zonal surface wind stress"),
    V::new("surface_tauy", V_HOR, "N/m^2", "Meridional surface wind stress"),
    V::new("forc_temp_surface", T_HOR, "m K/s", "Surface temperature flux"),
    V::new("forc_salt_surface", T_HOR, "m g/(kg s)", "Surface salinity flux"),
    // mixing
    V::new("kappa_m", W_GRID, "m^2/s", "Vertical viscosity"),
    V::new("kappa_h", W_GRID, "m^2/s", "Vertical diffusivity"),
    V::new("k_gm", W_GRID, "m^2/s", "Gent-McWilliams diffusivity"),
    V::new("k_iso", W_GRID, "m^2/s", "Isopycnal diffusivity"),
    // streamfunction
    V::new("psi", ZETA_HOR, "m^3/s", "Barotropic streamfunction")
        .time_dependent()
        .when("enable_streamfunction"),
    V::new("dpsi", ZETA_HOR, "m^3/s^2", "Streamfunction tendency")
        .time_dependent()
        .when("enable_streamfunction"),
    V::new("psin", &[Xu, Yu, Isle], "m^3/s", "Boundary streamfunction")
        .when("enable_streamfunction"),
    V::new("line_psin", &[Isle, Isle], "m^4/s^2", "Boundary line integrals")
        .when("enable_streamfunction"),
    // turbulent kinetic energy
    V::new("tke", W_GRID, "m^2/s^2", "Turbulent kinetic energy")
        .time_dependent()
        .when("enable_tke"),
    V::new("dtke", W_GRID, "m^2/s^3", "Turbulent kinetic energy tendency")
        .time_dependent()
        .when("enable_tke"),
    V::new("mxl", W_GRID, "m", "Mixing length").when("enable_tke"),
    V::new("prandtl", W_GRID, "", "Prandtl number").when("enable_tke"),
    // eddy kinetic energy
    V::new("eke", W_GRID, "m^2/s^2", "Meso-scale eddy energy")
        .time_dependent()
        .when("enable_eke"),
    V::new("deke", W_GRID, "m^2/s^3", "Meso-scale eddy energy tendency")
        .time_dependent()
        .when("enable_eke"),
    V::new("l_rossby", T_HOR, "m", "Rossby radius").when("enable_eke"),
    // internal waves
    V::new("e_iw", W_GRID, "m^2/s^2", "Internal wave energy")
        .time_dependent()
        .when("enable_idemix"),
    V::new("de_iw", W_GRID, "m^2/s^3", "Internal wave energy tendency")
        .time_dependent()
        .when("enable_idemix"),
    V::new("c0", W_GRID, "m/s", "Vertical internal wave group velocity").when("enable_idemix"),
    V::new("v0", W_GRID, "m/s", "Horizontal internal wave group velocity").when("enable_idemix"),
    V::new("alpha_c", W_GRID, "m^2/s", "Internal wave dissipation coefficient")
        .when("enable_idemix"),
    V::new("e_m2", T_WAVE, "m^3/s^2", "Energy of the M2 tide")
        .time_dependent()
        .when("enable_idemix_m2"),
    V::new("omega_m2", &[], "1/s", "Frequency of the M2 tide").when("enable_idemix_m2"),
    V::new("e_niw", T_WAVE, "m^3/s^2", "Energy of near-inertial waves")
        .time_dependent()
        .when("enable_idemix_niw"),
    V::new("omega_niw", T_HOR, "1/s", "Frequency of near-inertial waves")
        .when("enable_idemix_niw"),
];

/// One catalogued field and its parsed enable-predicate.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    descriptor: VariableDescriptor,
    predicate: Option<Predicate>,
}

impl CatalogEntry {
    /// The static declaration.
    pub fn descriptor(&self) -> &VariableDescriptor {
        &self.descriptor
    }

    /// The parsed predicate, if the field is conditional.
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Whether the field is allocated under `settings`.
    pub fn is_enabled(&self, settings: &Settings) -> Result<bool, SettingsError> {
        match &self.predicate {
            None => Ok(true),
            Some(p) => p.evaluate(settings),
        }
    }
}

/// Validated set of field declarations, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: IndexMap<&'static str, CatalogEntry>,
}

impl Catalog {
    /// Validate and index a set of descriptors.
    ///
    /// # Errors
    ///
    /// [`CatalogError::DuplicateVariable`] on a repeated name and
    /// [`CatalogError::InvalidPredicate`] on a predicate that is neither
    /// `<flag>` nor `not <flag>`.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = VariableDescriptor>,
    ) -> Result<Self, CatalogError> {
        let mut entries = IndexMap::new();
        for descriptor in descriptors {
            let predicate = descriptor
                .condition
                .map(|expr| {
                    Predicate::parse(expr).map_err(|reason| CatalogError::InvalidPredicate {
                        field: descriptor.name.to_string(),
                        expr: expr.to_string(),
                        reason,
                    })
                })
                .transpose()?;
            if entries.contains_key(descriptor.name) {
                return Err(CatalogError::DuplicateVariable {
                    name: descriptor.name.to_string(),
                });
            }
            entries.insert(
                descriptor.name,
                CatalogEntry {
                    descriptor,
                    predicate,
                },
            );
        }
        Ok(Self { entries })
    }

    /// The built-in ocean catalog.
    pub fn ocean() -> Result<Self, CatalogError> {
        Self::from_descriptors(OCEAN_VARIABLES.iter().copied())
    }

    /// Check that every predicate refers to a registered boolean setting.
    pub fn check_settings(&self, settings: &Settings) -> Result<(), CatalogError> {
        for (name, entry) in &self.entries {
            let Some(predicate) = &entry.predicate else {
                continue;
            };
            predicate.check(settings).map_err(|e| match e {
                SettingsError::TypeMismatch { found, .. } => CatalogError::NonBooleanFlag {
                    field: name.to_string(),
                    flag: predicate.flag().to_string(),
                    kind: found,
                },
                _ => CatalogError::UnregisteredFlag {
                    field: name.to_string(),
                    flag: predicate.flag().to_string(),
                },
            })?;
        }
        Ok(())
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Number of catalogued fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocean_catalog_is_valid() {
        let catalog = Catalog::ocean().unwrap();
        assert_eq!(catalog.len(), OCEAN_VARIABLES.len());
        catalog.check_settings(&Settings::defaults()).unwrap();
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let d = VariableDescriptor::new("u", &[Dim::Xu], "m/s", "");
        assert_eq!(
            Catalog::from_descriptors([d, d]).unwrap_err(),
            CatalogError::DuplicateVariable {
                name: "u".to_string()
            }
        );
    }

    #[test]
    fn invalid_predicate_fails_at_catalog_build() {
        let d = VariableDescriptor::new("e_wave", &[Dim::Xt], "", "")
            .when("enable_idemix_m2 or enable_idemix_niw");
        assert!(matches!(
            Catalog::from_descriptors([d]),
            Err(CatalogError::InvalidPredicate { .. })
        ));
    }

    #[test]
    fn predicate_on_unregistered_flag_is_rejected() {
        let d = VariableDescriptor::new("x", &[Dim::Xt], "", "").when("not enable_warp");
        let catalog = Catalog::from_descriptors([d]).unwrap();
        assert_eq!(
            catalog.check_settings(&Settings::defaults()).unwrap_err(),
            CatalogError::UnregisteredFlag {
                field: "x".to_string(),
                flag: "enable_warp".to_string(),
            }
        );
    }

    #[test]
    fn predicate_on_scalar_setting_is_rejected() {
        let d = VariableDescriptor::new("x", &[Dim::Xt], "", "").when("dt_tracer");
        let catalog = Catalog::from_descriptors([d]).unwrap();
        assert!(matches!(
            catalog.check_settings(&Settings::defaults()),
            Err(CatalogError::NonBooleanFlag { kind: "float", .. })
        ));
    }

    #[test]
    fn entries_keep_declaration_order() {
        let catalog = Catalog::ocean().unwrap();
        let names: Vec<_> = catalog.iter().map(|e| e.descriptor().name).collect();
        let expected: Vec<_> = OCEAN_VARIABLES.iter().map(|d| d.name).collect();
        assert_eq!(names, expected);
        assert!(catalog.get("kbot").unwrap().predicate().is_none());
        assert_eq!(
            catalog.get("p_non_hydro").unwrap().predicate(),
            Some(&Predicate::Not("enable_hydrostatic".to_string()))
        );
    }
}
