//! Frame and time conversions behind narrow provider traits.
//!
//! The propagation kernel never reads ephemeris or Earth-orientation data
//! itself. It consumes three traits — [`EphemerisProvider`],
//! [`FrameProvider`], and [`TimeScaleProvider`] — and routes every
//! conversion through the pure [`FrameAdapter`]. The [`builtin`] module
//! supplies low-precision analytic implementations so the engine works
//! without external data files; production users plug in their own
//! providers.

use std::fmt;
use std::sync::Arc;

use astroprop_core::matrix::{self, Matrix3};
use astroprop_core::state::{Frame, StateVector};
use astroprop_core::time::{Epoch, TimeScale};
use astroprop_core::vector::{self, Vector3};
use thiserror::Error;

pub mod builtin;

/// Solar-system bodies an ephemeris provider can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Body {
    Sun,
    Moon,
    Earth,
}

impl Body {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sun => "Sun",
            Self::Moon => "Moon",
            Self::Earth => "Earth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SUN" => Some(Self::Sun),
            "MOON" => Some(Self::Moon),
            "EARTH" => Some(Self::Earth),
            _ => None,
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by frame, time, and ephemeris conversions.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    #[error("no conversion path from frame {from} to {to}")]
    UnsupportedFrame { from: Frame, to: Frame },
    #[error("no conversion path from time scale {from} to {to}")]
    UnsupportedTimeScale { from: TimeScale, to: TimeScale },
    #[error("{what} unavailable at J2000{epoch_seconds:+.3}s {scale}")]
    DataUnavailable {
        what: String,
        epoch_seconds: f64,
        scale: TimeScale,
    },
}

impl FrameError {
    /// Shorthand for a data-gap error at a given epoch.
    pub fn data_unavailable(what: impl Into<String>, epoch: Epoch) -> Self {
        Self::DataUnavailable {
            what: what.into(),
            epoch_seconds: epoch.seconds_since_j2000(),
            scale: epoch.scale(),
        }
    }
}

/// A frame rotation at an epoch: the rotation matrix from the source frame
/// into the target frame, plus the target frame's angular velocity relative
/// to the source (expressed in source coordinates, rad/s). The rate term is
/// zero between inertial frames and is what makes velocity transformations
/// into rotating frames correct: `v_t = R (v_s − ω × r_s)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRotation {
    pub matrix: Matrix3,
    pub angular_velocity_rad_s: Vector3,
}

impl FrameRotation {
    pub fn inertial(matrix: Matrix3) -> Self {
        Self {
            matrix,
            angular_velocity_rad_s: vector::ZERO,
        }
    }
}

/// Supplies body states in GCRF. Position in km, velocity in km/s, both
/// geocentric.
pub trait EphemerisProvider: Send + Sync {
    fn body_state(&self, body: Body, epoch: Epoch) -> Result<(Vector3, Vector3), FrameError>;
}

/// Supplies frame rotations at an epoch.
pub trait FrameProvider: Send + Sync {
    fn rotation(&self, from: Frame, to: Frame, epoch: Epoch) -> Result<FrameRotation, FrameError>;
}

/// Converts epochs between time scales.
pub trait TimeScaleProvider: Send + Sync {
    fn convert(&self, epoch: Epoch, target: TimeScale) -> Result<Epoch, FrameError>;
}

/// Pure conversion front-end over the provider traits.
///
/// Identical inputs yield bit-identical outputs as long as the underlying
/// providers are deterministic; the adapter holds no mutable state and
/// performs no caching.
#[derive(Clone)]
pub struct FrameAdapter {
    frames: Arc<dyn FrameProvider>,
    time: Arc<dyn TimeScaleProvider>,
}

impl FrameAdapter {
    pub fn new(frames: Arc<dyn FrameProvider>, time: Arc<dyn TimeScaleProvider>) -> Self {
        Self { frames, time }
    }

    /// Re-express a state vector in `target`, leaving the input untouched.
    pub fn convert_state(
        &self,
        state: &StateVector,
        target: Frame,
    ) -> Result<StateVector, FrameError> {
        if state.frame == target {
            return Ok(*state);
        }
        let rotation = self.frames.rotation(state.frame, target, state.epoch)?;
        let omega = rotation.angular_velocity_rad_s;
        let position = matrix::mul_vec(&rotation.matrix, &state.position_km);
        let velocity = matrix::mul_vec(
            &rotation.matrix,
            &vector::sub(
                &state.velocity_km_s,
                &vector::cross(&omega, &state.position_km),
            ),
        );
        let mut out = *state;
        out.position_km = position;
        out.velocity_km_s = velocity;
        out.frame = target;
        Ok(out)
    }

    /// Convert an epoch to `target` through the time-scale provider.
    pub fn convert_epoch(&self, epoch: Epoch, target: TimeScale) -> Result<Epoch, FrameError> {
        if epoch.scale() == target {
            return Ok(epoch);
        }
        self.time.convert(epoch, target)
    }
}

/// Rotation from GCRF into the Local Vertical Local Horizontal frame of a
/// spacecraft: z toward the Earth's center, y along the negative orbit
/// normal, x completing the right-handed triad (near the velocity for
/// near-circular orbits). Pure function of the instantaneous position and
/// velocity.
pub fn lvlh_rotation(position_km: &Vector3, velocity_km_s: &Vector3) -> Matrix3 {
    let z = vector::neg(&vector::unit(position_km));
    let normal = vector::cross(position_km, velocity_km_s);
    let y = vector::neg(&vector::unit(&normal));
    let x = vector::cross(&y, &z);
    matrix::from_rows(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use astroprop_core::time::TimeScale;

    #[test]
    fn lvlh_axes_are_orthonormal() {
        let r = [7_000.0, 0.0, 0.0];
        let v = [0.0, 7.5, 0.0];
        let m = lvlh_rotation(&r, &v);
        // z points toward the center, y along −(r×v).
        assert!((m[2][0] + 1.0).abs() < 1e-15);
        assert!((m[1][2] + 1.0).abs() < 1e-15);
        for row in &m {
            assert!((vector::norm(row) - 1.0).abs() < 1e-12);
        }
        assert!(vector::dot(&m[0], &m[1]).abs() < 1e-12);
        assert!(vector::dot(&m[0], &m[2]).abs() < 1e-12);
    }

    #[test]
    fn adapter_same_frame_is_identity() {
        let adapter = FrameAdapter::new(
            Arc::new(builtin::GmstFrameProvider::new()),
            Arc::new(builtin::TableTimeProvider::with_bundled_table()),
        );
        let state = StateVector::new(
            [7_000.0, 0.0, 0.0],
            [0.0, 7.5, 0.0],
            Frame::Gcrf,
            Epoch::from_seconds_since_j2000(0.0, TimeScale::Tdb),
        );
        let out = adapter.convert_state(&state, Frame::Gcrf).unwrap();
        assert_eq!(out, state);
    }
}
