//! Flat state layout and the combined equations-of-motion right-hand side.

use astroprop_core::state::{Attitude, StateVector};
use astroprop_core::time::Epoch;
use astroprop_core::vector;
use astroprop_forces::ForceRegistry;
use astroprop_integrate::{OdeSystem, RhsError};

/// Which optional degrees of freedom are propagated alongside
/// position/velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateLayout {
    pub mass: bool,
    pub attitude: bool,
}

impl StateLayout {
    pub const TRANSLATIONAL: Self = Self {
        mass: false,
        attitude: false,
    };

    /// Flat vector length: 3 position + 3 velocity, +1 mass, +7 attitude
    /// (scalar-last quaternion and body rates).
    pub fn dim(&self) -> usize {
        let mut dim = 6;
        if self.mass {
            dim += 1;
        }
        if self.attitude {
            dim += 7;
        }
        dim
    }

    fn attitude_offset(&self) -> usize {
        if self.mass { 7 } else { 6 }
    }

    /// Flatten a state into `y` (length `self.dim()`).
    pub fn pack(&self, state: &StateVector, y: &mut [f64]) {
        y[0..3].copy_from_slice(&state.position_km);
        y[3..6].copy_from_slice(&state.velocity_km_s);
        if self.mass {
            y[6] = state.mass_kg.unwrap_or(0.0);
        }
        if self.attitude {
            let base = self.attitude_offset();
            let attitude = state.attitude.unwrap_or_else(Attitude::identity);
            y[base..base + 4].copy_from_slice(&attitude.quaternion);
            y[base + 4..base + 7].copy_from_slice(&attitude.angular_rate_rad_s);
        }
    }

    /// Rebuild a tagged state from a flat vector. Degrees of freedom outside
    /// the layout (a constant mass, a frozen attitude) are carried over from
    /// `template` so force models keep seeing them.
    pub fn unpack(&self, y: &[f64], template: &StateVector, epoch: Epoch) -> StateVector {
        let mut state = *template;
        state.epoch = epoch;
        state.position_km = [y[0], y[1], y[2]];
        state.velocity_km_s = [y[3], y[4], y[5]];
        if self.mass {
            state.mass_kg = Some(y[6]);
        }
        if self.attitude {
            let base = self.attitude_offset();
            state.attitude = Some(Attitude {
                quaternion: [y[base], y[base + 1], y[base + 2], y[base + 3]],
                angular_rate_rad_s: [y[base + 4], y[base + 5], y[base + 6]],
            });
        }
        state
    }

    /// Renormalize the quaternion block in place (integration drifts it off
    /// the unit sphere slowly; once per accepted step is plenty).
    pub fn renormalize_quaternion(&self, y: &mut [f64]) {
        if !self.attitude {
            return;
        }
        let base = self.attitude_offset();
        let q = &mut y[base..base + 4];
        let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
        if norm > 0.0 {
            for component in q {
                *component /= norm;
            }
        }
    }
}

/// The state-derivative function: bridges the force registry into the
/// integrator's flat-vector world.
///
/// d(position)/dt = velocity; d(velocity)/dt = registry acceleration sum;
/// d(mass)/dt = registry mass flow; attitude follows quaternion kinematics
/// and Euler's rigid-body equation with a diagonal inertia.
pub struct Dynamics<'a> {
    registry: &'a ForceRegistry,
    layout: StateLayout,
    /// The state the propagate call started from; supplies the frame, the
    /// time origin, and any constant (non-propagated) degrees of freedom.
    template: StateVector,
    inertia_kg_m2: [f64; 3],
}

impl<'a> Dynamics<'a> {
    pub fn new(
        registry: &'a ForceRegistry,
        layout: StateLayout,
        template: StateVector,
        inertia_kg_m2: [f64; 3],
    ) -> Self {
        Self {
            registry,
            layout,
            template,
            inertia_kg_m2,
        }
    }
}

impl OdeSystem for Dynamics<'_> {
    fn dim(&self) -> usize {
        self.layout.dim()
    }

    fn eval(&self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), RhsError> {
        let epoch = self.template.epoch.offset_by(t);
        let state = self.layout.unpack(y, &self.template, epoch);
        let contribution = self.registry.evaluate(&state)?;

        dydt[0..3].copy_from_slice(&state.velocity_km_s);
        dydt[3..6].copy_from_slice(&contribution.acceleration_km_s2);
        if self.layout.mass {
            dydt[6] = contribution.mass_flow_kg_s;
        }
        if self.layout.attitude {
            let base = if self.layout.mass { 7 } else { 6 };
            let q = [y[base], y[base + 1], y[base + 2], y[base + 3]];
            let omega = [y[base + 4], y[base + 5], y[base + 6]];

            // Quaternion kinematics, scalar-last: q̇ = ½ q ⊗ (ω, 0).
            let qv = [q[0], q[1], q[2]];
            let qw = q[3];
            let v = vector::add(&vector::scale(&omega, qw), &vector::cross(&qv, &omega));
            dydt[base] = 0.5 * v[0];
            dydt[base + 1] = 0.5 * v[1];
            dydt[base + 2] = 0.5 * v[2];
            dydt[base + 3] = -0.5 * vector::dot(&qv, &omega);

            // Euler's equation with diagonal inertia:
            // ω̇ = I⁻¹ (τ − ω × Iω).
            let inertia = self.inertia_kg_m2;
            let angular_momentum = [
                inertia[0] * omega[0],
                inertia[1] * omega[1],
                inertia[2] * omega[2],
            ];
            let gyroscopic = vector::cross(&omega, &angular_momentum);
            let torque = contribution.torque_n_m;
            dydt[base + 4] = (torque[0] - gyroscopic[0]) / inertia[0];
            dydt[base + 5] = (torque[1] - gyroscopic[1]) / inertia[1];
            dydt[base + 6] = (torque[2] - gyroscopic[2]) / inertia[2];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astroprop_core::state::Frame;
    use astroprop_core::time::TimeScale;

    #[test]
    fn pack_unpack_round_trip() {
        let layout = StateLayout {
            mass: true,
            attitude: true,
        };
        let epoch = Epoch::from_seconds_since_j2000(12.5, TimeScale::Tdb);
        let state = StateVector::new([1.0, 2.0, 3.0], [4.0, 5.0, 6.0], Frame::Gcrf, epoch)
            .with_mass(750.0)
            .with_attitude(Attitude {
                quaternion: [0.0, 0.0, 0.382_683_4, 0.923_879_5],
                angular_rate_rad_s: [0.01, -0.02, 0.03],
            });
        let mut y = vec![0.0; layout.dim()];
        layout.pack(&state, &mut y);
        let back = layout.unpack(&y, &state, epoch);
        assert_eq!(back, state);
    }

    #[test]
    fn constant_mass_survives_unpack_outside_the_layout() {
        let layout = StateLayout::TRANSLATIONAL;
        let epoch = Epoch::from_seconds_since_j2000(0.0, TimeScale::Tdb);
        let state = StateVector::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], Frame::Gcrf, epoch)
            .with_mass(321.0);
        let mut y = vec![0.0; layout.dim()];
        layout.pack(&state, &mut y);
        let back = layout.unpack(&y, &state, epoch.offset_by(10.0));
        assert_eq!(back.mass_kg, Some(321.0));
    }

    #[test]
    fn translational_layout_is_six_wide() {
        assert_eq!(StateLayout::TRANSLATIONAL.dim(), 6);
        assert_eq!(
            StateLayout {
                mass: true,
                attitude: true
            }
            .dim(),
            14
        );
    }

    #[test]
    fn renormalize_restores_unit_quaternion() {
        let layout = StateLayout {
            mass: false,
            attitude: true,
        };
        let mut y = vec![0.0; layout.dim()];
        y[6] = 0.0;
        y[7] = 0.0;
        y[8] = 0.6;
        y[9] = 1.2;
        layout.renormalize_quaternion(&mut y);
        let norm = (y[6] * y[6] + y[7] * y[7] + y[8] * y[8] + y[9] * y[9]).sqrt();
        assert!((norm - 1.0).abs() < 1e-15);
    }
}
