//! Frame- and epoch-tagged kinematic state of a spacecraft.

use std::fmt;

use crate::time::Epoch;
use crate::vector::{self, Vector3};

/// Reference frames a [`StateVector`] can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frame {
    /// Geocentric Celestial Reference Frame (Earth-centered inertial).
    Gcrf,
    /// International Terrestrial Reference Frame (Earth-fixed, rotating).
    Itrf,
    /// True Equator Mean Equinox (the SGP4/TLE frame).
    Teme,
}

impl Frame {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gcrf => "GCRF",
            Self::Itrf => "ITRF",
            Self::Teme => "TEME",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GCRF" => Some(Self::Gcrf),
            "ITRF" => Some(Self::Itrf),
            "TEME" => Some(Self::Teme),
            _ => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Body attitude: scalar-last quaternion (body → frame) plus the body-frame
/// angular rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    /// Rotation from the body frame into the state's reference frame,
    /// stored `[x, y, z, w]`.
    pub quaternion: [f64; 4],
    /// Angular rate in the body frame (rad/s).
    pub angular_rate_rad_s: Vector3,
}

impl Attitude {
    /// Identity attitude at rest.
    pub fn identity() -> Self {
        Self {
            quaternion: [0.0, 0.0, 0.0, 1.0],
            angular_rate_rad_s: vector::ZERO,
        }
    }
}

/// A spacecraft state: position/velocity (plus optional mass and attitude),
/// meaningful only together with its `(frame, epoch)` tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position_km: Vector3,
    pub velocity_km_s: Vector3,
    pub mass_kg: Option<f64>,
    pub attitude: Option<Attitude>,
    pub frame: Frame,
    pub epoch: Epoch,
}

impl StateVector {
    pub fn new(position_km: Vector3, velocity_km_s: Vector3, frame: Frame, epoch: Epoch) -> Self {
        Self {
            position_km,
            velocity_km_s,
            mass_kg: None,
            attitude: None,
            frame,
            epoch,
        }
    }

    pub fn with_mass(mut self, mass_kg: f64) -> Self {
        self.mass_kg = Some(mass_kg);
        self
    }

    pub fn with_attitude(mut self, attitude: Attitude) -> Self {
        self.attitude = Some(attitude);
        self
    }

    /// Distance from the frame origin (km).
    pub fn radius_km(&self) -> f64 {
        vector::norm(&self.position_km)
    }

    /// Speed (km/s).
    pub fn speed_km_s(&self) -> f64 {
        vector::norm(&self.velocity_km_s)
    }

    /// Radial velocity (r·v)/|r| in km/s. Zero at an apsis.
    pub fn radial_velocity_km_s(&self) -> f64 {
        let r = self.radius_km();
        if r == 0.0 {
            return 0.0;
        }
        vector::dot(&self.position_km, &self.velocity_km_s) / r
    }

    /// Specific orbital energy v²/2 − μ/r (km²/s²) for the given
    /// gravitational parameter.
    pub fn specific_energy_km2_s2(&self, mu_km3_s2: f64) -> f64 {
        let v = self.speed_km_s();
        0.5 * v * v - mu_km3_s2 / self.radius_km()
    }

    /// Specific angular momentum r × v (km²/s).
    pub fn specific_angular_momentum_km2_s(&self) -> Vector3 {
        vector::cross(&self.position_km, &self.velocity_km_s)
    }
}
