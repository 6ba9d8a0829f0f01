//! Central-body gravity models.

use astroprop_core::state::StateVector;
use astroprop_core::vector::{self, Vector3};

use crate::{ForceContribution, ForceError, ForceModel};

/// Point-mass gravity: a = −μ/r³ · r.
#[derive(Debug, Clone)]
pub struct PointMassGravity {
    mu_km3_s2: f64,
}

impl PointMassGravity {
    pub fn new(mu_km3_s2: f64) -> Self {
        Self { mu_km3_s2 }
    }
}

impl ForceModel for PointMassGravity {
    fn contribution(&self, state: &StateVector) -> Result<ForceContribution, ForceError> {
        let r = state.radius_km();
        if r < 1e-3 {
            // Inside the singularity guard radius; nothing sensible to add.
            return Ok(ForceContribution::ZERO);
        }
        let factor = -self.mu_km3_s2 / (r * r * r);
        Ok(ForceContribution::from_acceleration(vector::scale(
            &state.position_km,
            factor,
        )))
    }

    fn name(&self) -> &str {
        "point_mass_gravity"
    }
}

/// Zonal spherical-harmonic gravity perturbation (J2 and up).
///
/// Adds only the perturbation series; pair it with [`PointMassGravity`] for
/// the central term. The acceleration is the gradient of
///
/// U = −(μ/r) Σₙ Jₙ (Rₑ/r)ⁿ Pₙ(sin φ)
///
/// evaluated with the standard Legendre recursions, so the degree is
/// limited only by the supplied coefficient list. Tesseral terms (order
/// > 0) need a normalized Cnm/Snm table and are rejected at construction.
#[derive(Debug, Clone)]
pub struct HarmonicGravity {
    mu_km3_s2: f64,
    reference_radius_km: f64,
    /// Zonal coefficients starting at J2: `zonal[0]` is J2.
    zonal: Vec<f64>,
}

impl HarmonicGravity {
    const NAME: &'static str = "harmonic_gravity";

    /// Model from explicit zonal coefficients (`zonal[0]` = J2).
    pub fn new(
        mu_km3_s2: f64,
        reference_radius_km: f64,
        zonal: Vec<f64>,
    ) -> Result<Self, ForceError> {
        if zonal.is_empty() {
            return Err(ForceError::configuration(
                Self::NAME,
                "at least one zonal coefficient (J2) is required",
            ));
        }
        Ok(Self {
            mu_km3_s2,
            reference_radius_km,
            zonal,
        })
    }

    /// Model from a requested degree/order, truncating the supplied
    /// coefficient list to `degree`. `order > 0` is not supported without a
    /// tesseral coefficient table.
    pub fn with_degree_order(
        mu_km3_s2: f64,
        reference_radius_km: f64,
        degree: u32,
        order: u32,
        zonal: Vec<f64>,
    ) -> Result<Self, ForceError> {
        if order > 0 {
            return Err(ForceError::configuration(
                Self::NAME,
                format!("tesseral order {order} requires a Cnm/Snm coefficient table"),
            ));
        }
        if degree < 2 {
            return Err(ForceError::configuration(
                Self::NAME,
                format!("degree must be at least 2, got {degree}"),
            ));
        }
        let keep = (degree - 1) as usize;
        if zonal.len() < keep {
            return Err(ForceError::configuration(
                Self::NAME,
                format!(
                    "degree {degree} needs {keep} zonal coefficients, got {}",
                    zonal.len()
                ),
            ));
        }
        let mut zonal = zonal;
        zonal.truncate(keep);
        Self::new(mu_km3_s2, reference_radius_km, zonal)
    }

    pub fn degree(&self) -> u32 {
        self.zonal.len() as u32 + 1
    }
}

impl ForceModel for HarmonicGravity {
    fn contribution(&self, state: &StateVector) -> Result<ForceContribution, ForceError> {
        let [x, y, z] = state.position_km;
        let r = state.radius_km();
        if r < 1e-3 {
            return Ok(ForceContribution::ZERO);
        }
        let u = z / r;
        let mu_r2 = self.mu_km3_s2 / (r * r);
        let re_r = self.reference_radius_km / r;

        // Legendre recursions: Pₙ and Pₙ' seeded at n = 1.
        let mut p_prev = 1.0; // P₀
        let mut p = u; // P₁
        let mut dp = 1.0; // P₁'
        let mut rho = re_r; // (Rₑ/r)¹

        let mut accel: Vector3 = vector::ZERO;
        for (i, &jn) in self.zonal.iter().enumerate() {
            let n = (i + 2) as f64;
            let p_next = ((2.0 * n - 1.0) * u * p - (n - 1.0) * p_prev) / n;
            let dp_next = u * dp + n * p;
            p_prev = p;
            p = p_next;
            dp = dp_next;
            rho *= re_r;

            let common = mu_r2 * jn * rho;
            let planar = common * ((n + 1.0) * p + u * dp) / r;
            accel[0] += planar * x;
            accel[1] += planar * y;
            accel[2] += common * ((n + 1.0) * u * p - (1.0 - u * u) * dp);
        }
        Ok(ForceContribution::from_acceleration(accel))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
