//! Third-body gravitational perturbations.
//!
//! Standard difference-of-accelerations form for a body B perturbing a
//! geocentric orbit:
//!
//! a = μ_B · ( (r_B − r) / |r_B − r|³ − r_B / |r_B|³ )

use std::sync::Arc;

use astroprop_core::constants::{MU_MOON_KM3_S2, MU_SUN_KM3_S2};
use astroprop_core::state::StateVector;
use astroprop_core::vector::{self, Vector3};

use crate::{ForceContribution, ForceError, ForceModel};
use astroprop_frames::{Body, EphemerisProvider};

/// Third-body perturbation from a configurable body list.
pub struct ThirdBody {
    /// Perturbing bodies with their gravitational parameters (km³/s²).
    bodies: Vec<(Body, f64)>,
    ephemeris: Arc<dyn EphemerisProvider>,
}

impl ThirdBody {
    pub fn new(bodies: Vec<(Body, f64)>, ephemeris: Arc<dyn EphemerisProvider>) -> Self {
        Self { bodies, ephemeris }
    }

    /// Sun and Moon with their standard gravitational parameters.
    pub fn sun_and_moon(ephemeris: Arc<dyn EphemerisProvider>) -> Self {
        Self::new(
            vec![(Body::Sun, MU_SUN_KM3_S2), (Body::Moon, MU_MOON_KM3_S2)],
            ephemeris,
        )
    }

    fn body_acceleration(satellite: &Vector3, body_position: &Vector3, mu: f64) -> Vector3 {
        let to_body = vector::sub(body_position, satellite);
        let to_body_distance = vector::norm(&to_body);
        let body_distance = vector::norm(body_position);
        if to_body_distance < 1e-3 || body_distance < 1e-3 {
            return vector::ZERO;
        }
        let direct = vector::scale(&to_body, 1.0 / to_body_distance.powi(3));
        let indirect = vector::scale(body_position, 1.0 / body_distance.powi(3));
        vector::scale(&vector::sub(&direct, &indirect), mu)
    }
}

impl ForceModel for ThirdBody {
    fn contribution(&self, state: &StateVector) -> Result<ForceContribution, ForceError> {
        let mut accel = vector::ZERO;
        for &(body, mu) in &self.bodies {
            let (body_position, _) = self.ephemeris.body_state(body, state.epoch)?;
            accel = vector::add(
                &accel,
                &Self::body_acceleration(&state.position_km, &body_position, mu),
            );
        }
        Ok(ForceContribution::from_acceleration(accel))
    }

    fn name(&self) -> &str {
        "third_body"
    }
}
