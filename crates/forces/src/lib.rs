//! Force models for orbit propagation.
//!
//! Each force model implements the [`ForceModel`] trait, contributing an
//! acceleration (plus optional mass-flow and torque terms) at a given
//! spacecraft state. Models are collected in an ordered [`ForceRegistry`],
//! which reconciles frames through the [`FrameAdapter`] and sums every
//! enabled contribution.
//!
//! # Available models
//!
//! - [`PointMassGravity`]: central-body gravity μ/r²
//! - [`HarmonicGravity`]: zonal spherical-harmonic perturbations (J2+)
//! - [`AtmosphericDrag`]: drag with exponential or tabulated density
//! - [`SolarRadiationPressure`]: cannonball SRP with shadow modeling
//! - [`ThirdBody`]: Sun/Moon/other perturbations from an ephemeris provider
//! - [`ConstantThrust`]: finite burn with propellant mass flow

mod drag;
mod gravity;
pub mod shadow;
mod srp;
mod third_body;
mod thrust;

pub use drag::{Atmosphere, AtmosphericDrag};
pub use gravity::{HarmonicGravity, PointMassGravity};
pub use srp::{ShadowModel, SolarRadiationPressure};
pub use third_body::ThirdBody;
pub use thrust::{ConstantThrust, ThrustDirection};

use std::cell::RefCell;
use std::sync::Arc;

use astroprop_core::state::{Frame, StateVector};
use astroprop_core::vector::{self, Vector3};
use astroprop_frames::{FrameAdapter, FrameError};
use thiserror::Error;

/// One force model's contribution at a state: acceleration in the state's
/// frame, propellant mass flow, and body torque.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceContribution {
    pub acceleration_km_s2: Vector3,
    pub mass_flow_kg_s: f64,
    pub torque_n_m: Vector3,
}

impl ForceContribution {
    pub const ZERO: Self = Self {
        acceleration_km_s2: vector::ZERO,
        mass_flow_kg_s: 0.0,
        torque_n_m: vector::ZERO,
    };

    /// Acceleration-only contribution.
    pub fn from_acceleration(acceleration_km_s2: Vector3) -> Self {
        Self {
            acceleration_km_s2,
            ..Self::ZERO
        }
    }

    fn accumulate(&mut self, other: &Self) {
        self.acceleration_km_s2 = vector::add(&self.acceleration_km_s2, &other.acceleration_km_s2);
        self.mass_flow_kg_s += other.mass_flow_kg_s;
        self.torque_n_m = vector::add(&self.torque_n_m, &other.torque_n_m);
    }
}

/// Errors from force-model configuration and evaluation.
#[derive(Debug, Error)]
pub enum ForceError {
    /// The active model set was mutated while a derivative evaluation was in
    /// flight. Programming error; reconfigure only between sessions.
    #[error("force model set mutated during an in-flight evaluation")]
    ConcurrentConfiguration,
    #[error("force model `{model}` misconfigured: {message}")]
    Configuration { model: String, message: String },
    /// A model that divides by spacecraft mass found none on the state and
    /// no configured fallback.
    #[error("force model `{model}` requires a spacecraft mass")]
    MissingMass { model: String },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl ForceError {
    fn configuration(model: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            model: model.to_string(),
            message: message.into(),
        }
    }
}

/// Trait for force model contributions.
///
/// Implementations must be pure with respect to their inputs: identical
/// `(state, parameters)` always produce identical output, which is what
/// keeps whole propagations reproducible.
pub trait ForceModel: Send + Sync {
    /// Contribution at the given state. The state arrives already converted
    /// into [`ForceModel::frame`].
    fn contribution(&self, state: &StateVector) -> Result<ForceContribution, ForceError>;

    /// Model name for configuration lookup and logging.
    fn name(&self) -> &str;

    /// Frame this model evaluates in; the registry converts the state first.
    fn frame(&self) -> Frame {
        Frame::Gcrf
    }
}

struct RegistryEntry {
    model: Box<dyn ForceModel>,
    enabled: bool,
}

/// Ordered collection of force models with frame reconciliation.
///
/// The entry list lives behind a `RefCell`: an evaluation holds the shared
/// borrow for its whole duration, so any attempt to reconfigure the set
/// from within an in-flight evaluation fails with
/// [`ForceError::ConcurrentConfiguration`] instead of corrupting the sum.
/// This also makes the registry `!Sync`; concurrent sessions each own their
/// own registry (models themselves are immutable and cheap to rebuild).
pub struct ForceRegistry {
    adapter: Arc<FrameAdapter>,
    entries: RefCell<Vec<RegistryEntry>>,
}

impl ForceRegistry {
    pub fn new(adapter: Arc<FrameAdapter>) -> Self {
        Self {
            adapter,
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Append a model to the evaluation order.
    pub fn add(&self, model: Box<dyn ForceModel>) -> Result<(), ForceError> {
        let mut entries = self
            .entries
            .try_borrow_mut()
            .map_err(|_| ForceError::ConcurrentConfiguration)?;
        log::debug!("adding force model: {}", model.name());
        entries.push(RegistryEntry {
            model,
            enabled: true,
        });
        Ok(())
    }

    /// Enable or disable a model by name. Returns whether a model matched.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool, ForceError> {
        let mut entries = self
            .entries
            .try_borrow_mut()
            .map_err(|_| ForceError::ConcurrentConfiguration)?;
        let mut found = false;
        for entry in entries.iter_mut() {
            if entry.model.name() == name {
                entry.enabled = enabled;
                found = true;
            }
        }
        Ok(found)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Names of all registered models, in evaluation order.
    pub fn model_names(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.model.name().to_string())
            .collect()
    }

    pub fn adapter(&self) -> &Arc<FrameAdapter> {
        &self.adapter
    }

    /// Sum of every enabled model's contribution, expressed in the frame of
    /// the input state. Each model sees the state converted into its own
    /// frame; accelerations are rotated back before summing.
    pub fn evaluate(&self, state: &StateVector) -> Result<ForceContribution, ForceError> {
        let entries = self
            .entries
            .try_borrow()
            .map_err(|_| ForceError::ConcurrentConfiguration)?;
        let mut total = ForceContribution::ZERO;
        for entry in entries.iter().filter(|e| e.enabled) {
            let model_frame = entry.model.frame();
            let contribution = if model_frame == state.frame {
                entry.model.contribution(state)?
            } else {
                let converted = self.adapter.convert_state(state, model_frame)?;
                let mut c = entry.model.contribution(&converted)?;
                // Rotate the acceleration back into the caller's frame. The
                // rate term does not apply to free vectors.
                let back = self
                    .adapter
                    .convert_state(
                        &StateVector::new(
                            c.acceleration_km_s2,
                            vector::ZERO,
                            model_frame,
                            state.epoch,
                        ),
                        state.frame,
                    )?
                    .position_km;
                c.acceleration_km_s2 = back;
                c
            };
            total.accumulate(&contribution);
        }
        Ok(total)
    }
}
