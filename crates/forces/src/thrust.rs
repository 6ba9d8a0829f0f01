//! Finite-burn thrust with propellant mass flow.

use astroprop_core::constants::G0;
use astroprop_core::state::StateVector;
use astroprop_core::units;
use astroprop_core::vector::{self, Vector3};

use crate::{ForceContribution, ForceError, ForceModel};
use astroprop_core::time::Epoch;

/// Direction the thrust vector points in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrustDirection {
    /// Along the instantaneous velocity (prograde).
    AlongVelocity,
    /// Against the instantaneous velocity (retrograde).
    AntiVelocity,
    /// A fixed inertial direction (normalized at construction).
    Inertial(Vector3),
}

/// Constant-thrust burn over a fixed window.
///
/// Inside `[start, start + duration]` the model contributes T/m along the
/// configured direction and a propellant mass flow of −T/(Isp·g₀); outside
/// the window it contributes nothing.
#[derive(Debug, Clone)]
pub struct ConstantThrust {
    thrust_newtons: f64,
    isp_seconds: f64,
    direction: ThrustDirection,
    start: Epoch,
    duration_s: f64,
    spacecraft_mass_kg: Option<f64>,
}

impl ConstantThrust {
    const NAME: &'static str = "constant_thrust";

    pub fn new(
        thrust_newtons: f64,
        isp_seconds: f64,
        direction: ThrustDirection,
        start: Epoch,
        duration_s: f64,
        spacecraft_mass_kg: Option<f64>,
    ) -> Result<Self, ForceError> {
        if thrust_newtons <= 0.0 || isp_seconds <= 0.0 || duration_s <= 0.0 {
            return Err(ForceError::Configuration {
                model: Self::NAME.to_string(),
                message: "thrust, Isp, and burn duration must be positive".to_string(),
            });
        }
        let direction = match direction {
            ThrustDirection::Inertial(v) => {
                if vector::norm(&v) == 0.0 {
                    return Err(ForceError::Configuration {
                        model: Self::NAME.to_string(),
                        message: "inertial thrust direction must be non-zero".to_string(),
                    });
                }
                ThrustDirection::Inertial(vector::unit(&v))
            }
            other => other,
        };
        Ok(Self {
            thrust_newtons,
            isp_seconds,
            direction,
            start,
            duration_s,
            spacecraft_mass_kg,
        })
    }

    fn unit_direction(&self, state: &StateVector) -> Vector3 {
        match self.direction {
            ThrustDirection::AlongVelocity => vector::unit(&state.velocity_km_s),
            ThrustDirection::AntiVelocity => vector::neg(&vector::unit(&state.velocity_km_s)),
            ThrustDirection::Inertial(v) => v,
        }
    }
}

impl ForceModel for ConstantThrust {
    fn contribution(&self, state: &StateVector) -> Result<ForceContribution, ForceError> {
        let elapsed =
            state
                .epoch
                .duration_since(&self.start)
                .map_err(|e| ForceError::Configuration {
                    model: Self::NAME.to_string(),
                    message: e.to_string(),
                })?;
        if elapsed < 0.0 || elapsed > self.duration_s {
            return Ok(ForceContribution::ZERO);
        }
        let mass = state
            .mass_kg
            .or(self.spacecraft_mass_kg)
            .ok_or_else(|| ForceError::MissingMass {
                model: Self::NAME.to_string(),
            })?;

        let accel_m_s2 = self.thrust_newtons / mass;
        let acceleration =
            vector::scale(&self.unit_direction(state), units::m_to_km(accel_m_s2));
        Ok(ForceContribution {
            acceleration_km_s2: acceleration,
            mass_flow_kg_s: -self.thrust_newtons / (self.isp_seconds * G0),
            torque_n_m: vector::ZERO,
        })
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
