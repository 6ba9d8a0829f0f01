//! Solar radiation pressure (cannonball model).
//!
//! a = ν · P(r☉) · Cr · A / m, directed from the Sun to the spacecraft,
//! where ν is the shadow illumination factor and P scales with the inverse
//! square of the Sun distance.

use std::sync::Arc;

use astroprop_core::constants::AU_KM;
use astroprop_core::state::StateVector;
use astroprop_core::units;
use astroprop_core::vector;

use crate::shadow::{self, ShadowGeometry};
use crate::{ForceContribution, ForceError, ForceModel};
use astroprop_frames::{Body, EphemerisProvider};

/// Shadow/eclipse model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowModel {
    /// Always in sunlight.
    None,
    /// Cylindrical central-body shadow.
    Cylindrical,
    /// Conical umbra/penumbra.
    Conical,
}

/// Cannonball solar radiation pressure model.
pub struct SolarRadiationPressure {
    reflectivity_coefficient: f64,
    area_m2: f64,
    spacecraft_mass_kg: Option<f64>,
    pressure_1au_n_m2: f64,
    shadow_model: ShadowModel,
    geometry: ShadowGeometry,
    ephemeris: Arc<dyn EphemerisProvider>,
}

impl SolarRadiationPressure {
    const NAME: &'static str = "solar_radiation_pressure";

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reflectivity_coefficient: f64,
        area_m2: f64,
        spacecraft_mass_kg: Option<f64>,
        pressure_1au_n_m2: f64,
        shadow_model: ShadowModel,
        geometry: ShadowGeometry,
        ephemeris: Arc<dyn EphemerisProvider>,
    ) -> Result<Self, ForceError> {
        if reflectivity_coefficient <= 0.0 || area_m2 <= 0.0 {
            return Err(ForceError::Configuration {
                model: Self::NAME.to_string(),
                message: "reflectivity coefficient and area must be positive".to_string(),
            });
        }
        Ok(Self {
            reflectivity_coefficient,
            area_m2,
            spacecraft_mass_kg,
            pressure_1au_n_m2,
            shadow_model,
            geometry,
            ephemeris,
        })
    }

    fn illumination(&self, state: &StateVector, sun_position: &[f64; 3]) -> f64 {
        match self.shadow_model {
            ShadowModel::None => 1.0,
            ShadowModel::Cylindrical => {
                let sun_dir = vector::unit(sun_position);
                let along = vector::dot(&state.position_km, &sun_dir);
                if along > 0.0 {
                    return 1.0;
                }
                let perp = vector::sub(&state.position_km, &vector::scale(&sun_dir, along));
                if vector::norm(&perp) > self.geometry.body_radius_km {
                    1.0
                } else {
                    0.0
                }
            }
            ShadowModel::Conical => {
                shadow::illumination_factor(&state.position_km, sun_position, &self.geometry)
            }
        }
    }
}

impl ForceModel for SolarRadiationPressure {
    fn contribution(&self, state: &StateVector) -> Result<ForceContribution, ForceError> {
        let (sun_position, _) = self.ephemeris.body_state(Body::Sun, state.epoch)?;
        let illumination = self.illumination(state, &sun_position);
        if illumination == 0.0 {
            return Ok(ForceContribution::ZERO);
        }
        let mass = state
            .mass_kg
            .or(self.spacecraft_mass_kg)
            .ok_or_else(|| ForceError::MissingMass {
                model: Self::NAME.to_string(),
            })?;

        // Sun → spacecraft direction and distance.
        let offset = vector::sub(&state.position_km, &sun_position);
        let distance = vector::norm(&offset);
        let direction = vector::scale(&offset, 1.0 / distance);

        let pressure = self.pressure_1au_n_m2 * (AU_KM / distance).powi(2);
        let accel_m_s2 =
            illumination * pressure * self.reflectivity_coefficient * self.area_m2 / mass;

        Ok(ForceContribution::from_acceleration(vector::scale(
            &direction,
            units::m_to_km(accel_m_s2),
        )))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astroprop_core::constants::{
        EARTH_RADIUS_KM, SOLAR_PRESSURE_1AU_N_M2, SUN_RADIUS_KM,
    };
    use astroprop_core::state::Frame;
    use astroprop_core::time::{Epoch, TimeScale};
    use astroprop_core::vector::Vector3;
    use astroprop_frames::FrameError;

    /// Sun pinned on the +x axis at 1 AU.
    struct FixedSun;

    impl EphemerisProvider for FixedSun {
        fn body_state(
            &self,
            _body: Body,
            _epoch: Epoch,
        ) -> Result<(Vector3, Vector3), FrameError> {
            Ok(([AU_KM, 0.0, 0.0], [0.0, 0.0, 0.0]))
        }
    }

    fn model(shadow: ShadowModel) -> SolarRadiationPressure {
        SolarRadiationPressure::new(
            1.8,
            20.0,
            Some(1_000.0),
            SOLAR_PRESSURE_1AU_N_M2,
            shadow,
            ShadowGeometry {
                body_radius_km: EARTH_RADIUS_KM,
                sun_radius_km: SUN_RADIUS_KM,
            },
            Arc::new(FixedSun),
        )
        .unwrap()
    }

    fn state_at(position: Vector3) -> StateVector {
        StateVector::new(
            position,
            [0.0, 7.5, 0.0],
            Frame::Gcrf,
            Epoch::from_seconds_since_j2000(0.0, TimeScale::Tdb),
        )
    }

    #[test]
    fn srp_pushes_away_from_sun() {
        let srp = model(ShadowModel::None);
        let accel = srp
            .contribution(&state_at([7_000.0, 0.0, 0.0]))
            .unwrap()
            .acceleration_km_s2;
        assert!(accel[0] < 0.0, "SRP should push along −x, got {accel:?}");

        // Magnitude: P·Cr·A/m at ~1 AU.
        let expected = units::m_to_km(SOLAR_PRESSURE_1AU_N_M2 * 1.8 * 20.0 / 1_000.0);
        let got = vector::norm(&accel);
        assert!((got - expected).abs() / expected < 1e-3, "|a| = {got}");
    }

    #[test]
    fn umbra_kills_srp() {
        let srp = model(ShadowModel::Conical);
        let total = srp.contribution(&state_at([-7_000.0, 0.0, 0.0])).unwrap();
        assert_eq!(total, ForceContribution::ZERO);
    }

    #[test]
    fn cylindrical_shadow_matches_axis_case() {
        let srp = model(ShadowModel::Cylindrical);
        let behind = srp.contribution(&state_at([-7_000.0, 0.0, 0.0])).unwrap();
        assert_eq!(behind, ForceContribution::ZERO);
        let beside = srp
            .contribution(&state_at([-7_000.0, EARTH_RADIUS_KM + 1_000.0, 0.0]))
            .unwrap();
        assert!(vector::norm(&beside.acceleration_km_s2) > 0.0);
    }
}
