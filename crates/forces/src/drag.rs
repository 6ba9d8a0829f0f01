//! Atmospheric drag.
//!
//! a = −½ ρ |v_rel| (Cd·A/m) v_rel, with v_rel the velocity relative to an
//! atmosphere co-rotating with the central body.

use astroprop_core::state::StateVector;
use astroprop_core::units;
use astroprop_core::vector::{self, Vector3};

use crate::{ForceContribution, ForceError, ForceModel};

/// Atmospheric density as a function of altitude.
#[derive(Debug, Clone)]
pub enum Atmosphere {
    /// ρ(h) = ρ₀ · exp(−h / H).
    Exponential {
        rho0_kg_m3: f64,
        scale_height_km: f64,
    },
    /// Log-linear interpolation over `(altitude_km, density_kg_m3)` points,
    /// sorted by altitude. Density is zero above the last point and clamped
    /// to the first below it.
    Tabulated { points: Vec<(f64, f64)> },
}

impl Atmosphere {
    /// Standard sea-level exponential profile.
    pub fn standard_exponential() -> Self {
        Self::Exponential {
            rho0_kg_m3: 1.225,
            scale_height_km: 8.5,
        }
    }

    pub fn density_kg_m3(&self, altitude_km: f64) -> f64 {
        match self {
            Self::Exponential {
                rho0_kg_m3,
                scale_height_km,
            } => rho0_kg_m3 * (-altitude_km / scale_height_km).exp(),
            Self::Tabulated { points } => {
                if points.is_empty() {
                    return 0.0;
                }
                let first = points[0];
                let last = points[points.len() - 1];
                if altitude_km <= first.0 {
                    return first.1;
                }
                if altitude_km >= last.0 {
                    return 0.0;
                }
                for pair in points.windows(2) {
                    let (h0, rho0) = pair[0];
                    let (h1, rho1) = pair[1];
                    if altitude_km <= h1 {
                        if rho0 <= 0.0 || rho1 <= 0.0 {
                            // Degenerate table entries fall back to linear.
                            let f = (altitude_km - h0) / (h1 - h0);
                            return rho0 + f * (rho1 - rho0);
                        }
                        let f = (altitude_km - h0) / (h1 - h0);
                        return (rho0.ln() + f * (rho1.ln() - rho0.ln())).exp();
                    }
                }
                0.0
            }
        }
    }
}

/// Drag force model.
#[derive(Debug, Clone)]
pub struct AtmosphericDrag {
    drag_coefficient: f64,
    area_m2: f64,
    /// Fallback when the state itself carries no mass.
    spacecraft_mass_kg: Option<f64>,
    atmosphere: Atmosphere,
    body_radius_km: f64,
    /// Central-body rotation rate for the co-rotation term (rad/s, about z).
    rotation_rate_rad_s: f64,
}

impl AtmosphericDrag {
    const NAME: &'static str = "drag";

    pub fn new(
        drag_coefficient: f64,
        area_m2: f64,
        spacecraft_mass_kg: Option<f64>,
        atmosphere: Atmosphere,
        body_radius_km: f64,
        rotation_rate_rad_s: f64,
    ) -> Result<Self, ForceError> {
        if drag_coefficient <= 0.0 || area_m2 <= 0.0 {
            return Err(ForceError::Configuration {
                model: Self::NAME.to_string(),
                message: "drag coefficient and area must be positive".to_string(),
            });
        }
        Ok(Self {
            drag_coefficient,
            area_m2,
            spacecraft_mass_kg,
            atmosphere,
            body_radius_km,
            rotation_rate_rad_s,
        })
    }

    fn mass_kg(&self, state: &StateVector) -> Result<f64, ForceError> {
        state
            .mass_kg
            .or(self.spacecraft_mass_kg)
            .ok_or_else(|| ForceError::MissingMass {
                model: Self::NAME.to_string(),
            })
    }
}

impl ForceModel for AtmosphericDrag {
    fn contribution(&self, state: &StateVector) -> Result<ForceContribution, ForceError> {
        let altitude_km = state.radius_km() - self.body_radius_km;
        let density = self.atmosphere.density_kg_m3(altitude_km);
        if density <= 0.0 {
            return Ok(ForceContribution::ZERO);
        }
        let mass = self.mass_kg(state)?;

        // Atmosphere co-rotates with the body: v_rel = v − ω × r.
        let omega: Vector3 = [0.0, 0.0, self.rotation_rate_rad_s];
        let v_rel_km_s = vector::sub(
            &state.velocity_km_s,
            &vector::cross(&omega, &state.position_km),
        );

        let v_rel_m_s = vector::scale(&v_rel_km_s, units::kms_to_ms(1.0));
        let speed_m_s = vector::norm(&v_rel_m_s);
        let ballistic = self.drag_coefficient * self.area_m2 / mass;
        let accel_m_s2 = vector::scale(&v_rel_m_s, -0.5 * density * speed_m_s * ballistic);

        Ok(ForceContribution::from_acceleration(vector::scale(
            &accel_m_s2,
            units::m_to_km(1.0),
        )))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astroprop_core::constants::{EARTH_RADIUS_KM, OMEGA_EARTH_RAD_S};
    use astroprop_core::state::Frame;
    use astroprop_core::time::{Epoch, TimeScale};

    fn leo_state() -> StateVector {
        StateVector::new(
            [EARTH_RADIUS_KM + 300.0, 0.0, 0.0],
            [0.0, 7.73, 0.0],
            Frame::Gcrf,
            Epoch::from_seconds_since_j2000(0.0, TimeScale::Tdb),
        )
    }

    #[test]
    fn drag_opposes_relative_velocity() {
        let drag = AtmosphericDrag::new(
            2.2,
            4.0,
            Some(500.0),
            Atmosphere::Tabulated {
                points: vec![(200.0, 2.5e-10), (300.0, 2.0e-11), (500.0, 5.0e-13)],
            },
            EARTH_RADIUS_KM,
            OMEGA_EARTH_RAD_S,
        )
        .unwrap();
        let accel = drag.contribution(&leo_state()).unwrap().acceleration_km_s2;
        // Prograde orbit: drag mostly along −y, small +x from co-rotation.
        assert!(accel[1] < 0.0);
        assert!(vector::norm(&accel) > 0.0);
    }

    #[test]
    fn no_density_no_drag() {
        let drag = AtmosphericDrag::new(
            2.2,
            4.0,
            Some(500.0),
            Atmosphere::Tabulated {
                points: vec![(100.0, 1e-9), (150.0, 1e-11)],
            },
            EARTH_RADIUS_KM,
            OMEGA_EARTH_RAD_S,
        )
        .unwrap();
        let accel = drag.contribution(&leo_state()).unwrap();
        assert_eq!(accel, ForceContribution::ZERO);
    }

    #[test]
    fn missing_mass_is_an_error() {
        let drag = AtmosphericDrag::new(
            2.2,
            4.0,
            None,
            Atmosphere::standard_exponential(),
            EARTH_RADIUS_KM,
            OMEGA_EARTH_RAD_S,
        )
        .unwrap();
        let err = drag.contribution(&leo_state()).unwrap_err();
        assert!(matches!(err, ForceError::MissingMass { .. }));
    }

    #[test]
    fn exponential_density_decays() {
        let atm = Atmosphere::standard_exponential();
        assert!(atm.density_kg_m3(0.0) > atm.density_kg_m3(8.5));
        assert!((atm.density_kg_m3(8.5) / atm.density_kg_m3(0.0) - (-1.0f64).exp()).abs() < 1e-12);
    }
}
