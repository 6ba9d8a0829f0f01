//! Propagation sessions: the orchestrator that drives the integrator,
//! scans for events, and accumulates the trajectory.
//!
//! A [`PropagationSession`] owns one spacecraft's current state, a force
//! model registry, and an integrator configuration. `propagate_to` /
//! `propagate_by` walk the state machine
//! `Initialized → Running → {Completed, Failed}`; a failed call retains the
//! last good state so the caller can diagnose or explicitly retry with a
//! different configuration.

pub mod derivative;

pub use derivative::{Dynamics, StateLayout};

use std::cell::Cell;

use astroprop_core::state::StateVector;
use astroprop_core::time::{Epoch, TimeError};
use astroprop_events::{Detector, EventDefinition, EventOccurrence, RefinementFailure};
use astroprop_forces::{ForceError, ForceRegistry};
use astroprop_integrate::{
    DormandPrince45, IntegrateError, Integrator, Rk4, StepBounds, Tolerances,
};
use thiserror::Error;

/// Integration method selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorMethod {
    /// Classical fixed-step 4th-order Runge-Kutta.
    Fixed4,
    /// Adaptive Dormand–Prince 5(4).
    Adaptive45,
}

/// Session configuration. Validated exhaustively at construction; a session
/// never discovers a bad option mid-step.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub method: IntegratorMethod,
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
    pub min_step_s: f64,
    pub max_step_s: f64,
    pub initial_step_s: f64,
    pub max_step_rejections: u32,
    /// Hard cap on accepted steps per propagate call.
    pub max_steps: usize,
    /// Dense-output sub-intervals sampled per step for event detection.
    pub event_samples: usize,
    pub layout: StateLayout,
    /// Diagonal body inertia, used only when attitude propagation is on.
    pub inertia_kg_m2: [f64; 3],
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            method: IntegratorMethod::Adaptive45,
            relative_tolerance: 1e-10,
            absolute_tolerance: 1e-9,
            min_step_s: 1e-3,
            max_step_s: 600.0,
            initial_step_s: 10.0,
            max_step_rejections: 16,
            max_steps: 1_000_000,
            event_samples: 8,
            layout: StateLayout::TRANSLATIONAL,
            inertia_kg_m2: [1.0, 1.0, 1.0],
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), SessionError> {
        let fail = |message: String| Err(SessionError::Configuration { message });
        if !(self.absolute_tolerance.is_finite() && self.absolute_tolerance > 0.0) {
            return fail(format!(
                "absolute_tolerance must be positive and finite, got {}",
                self.absolute_tolerance
            ));
        }
        if !(self.relative_tolerance.is_finite() && self.relative_tolerance >= 0.0) {
            return fail(format!(
                "relative_tolerance must be non-negative and finite, got {}",
                self.relative_tolerance
            ));
        }
        if !(self.min_step_s.is_finite() && self.min_step_s > 0.0) {
            return fail(format!(
                "min_step_s must be positive and finite, got {}",
                self.min_step_s
            ));
        }
        if self.min_step_s > self.max_step_s {
            return fail(format!(
                "min_step_s ({}) exceeds max_step_s ({})",
                self.min_step_s, self.max_step_s
            ));
        }
        if self.initial_step_s < self.min_step_s || self.initial_step_s > self.max_step_s {
            return fail(format!(
                "initial_step_s ({}) outside [min_step_s, max_step_s]",
                self.initial_step_s
            ));
        }
        if self.max_step_rejections == 0 {
            return fail("max_step_rejections must be at least 1".to_string());
        }
        if self.max_steps == 0 {
            return fail("max_steps must be at least 1".to_string());
        }
        if self.event_samples == 0 {
            return fail("event_samples must be at least 1".to_string());
        }
        if self.layout.attitude && self.inertia_kg_m2.iter().any(|&i| !(i.is_finite() && i > 0.0))
        {
            return fail("attitude propagation requires positive inertia components".to_string());
        }
        Ok(())
    }

    fn build_integrator(&self) -> Box<dyn Integrator> {
        match self.method {
            IntegratorMethod::Fixed4 => Box::new(Rk4::new()),
            IntegratorMethod::Adaptive45 => Box::new(DormandPrince45::new()),
        }
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    Running,
    Completed,
    Failed,
}

/// Errors surfaced at the session boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {message}")]
    Configuration { message: String },
    /// A propagate call is already in flight on this session.
    #[error("session is busy: a propagate call is already running")]
    SessionBusy,
    #[error(transparent)]
    Time(#[from] TimeError),
    #[error(transparent)]
    Force(#[from] ForceError),
    /// The integrator could not meet the tolerance above the minimum step.
    /// The session keeps its last good state.
    #[error("integrator gave up at {epoch}")]
    StepRejectionLimit {
        epoch: Epoch,
        #[source]
        source: IntegrateError,
    },
    /// Any other integration failure (data gaps surface here through the
    /// derivative evaluation). The session keeps its last good state.
    #[error("propagation failed at {epoch}")]
    Integration {
        epoch: Epoch,
        #[source]
        source: IntegrateError,
    },
    #[error("step budget ({steps}) exhausted at {epoch}")]
    StepBudgetExhausted { epoch: Epoch, steps: usize },
}

/// One accepted step as recorded in the session history. The dense-output
/// interpolant is deliberately not retained; it dies with the step once
/// event refinement is done.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// State at the end of the step.
    pub state: StateVector,
    /// Signed step taken (seconds).
    pub step_s: f64,
    /// Scaled local error estimate of the accepted attempt.
    pub error_estimate: f64,
    /// Rejected attempts before acceptance.
    pub rejections: u32,
}

/// What one propagate call produced.
#[derive(Debug, Clone)]
pub struct PropagationOutcome {
    pub final_state: StateVector,
    pub steps: Vec<StepRecord>,
    pub events: Vec<EventOccurrence>,
    pub refinement_failures: Vec<RefinementFailure>,
}

/// A single spacecraft's propagation session.
pub struct PropagationSession {
    config: SessionConfig,
    registry: ForceRegistry,
    integrator: Box<dyn Integrator>,
    detector: Detector,
    event_definitions: Vec<EventDefinition>,
    current: StateVector,
    state: Cell<SessionState>,
    steps: Vec<StepRecord>,
    events: Vec<EventOccurrence>,
    refinement_failures: Vec<RefinementFailure>,
}

impl std::fmt::Debug for PropagationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationSession")
            .field("config", &self.config)
            .field("event_definitions", &self.event_definitions)
            .field("current", &self.current)
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("events", &self.events)
            .field("refinement_failures", &self.refinement_failures)
            .finish_non_exhaustive()
    }
}

impl PropagationSession {
    /// Build a session, validating the configuration against the initial
    /// state. All configuration errors surface here, never at step time.
    pub fn new(
        initial: StateVector,
        registry: ForceRegistry,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if config.layout.mass && initial.mass_kg.is_none() {
            return Err(SessionError::Configuration {
                message: "mass propagation enabled but the initial state carries no mass"
                    .to_string(),
            });
        }
        if config.layout.attitude && initial.attitude.is_none() {
            return Err(SessionError::Configuration {
                message: "attitude propagation enabled but the initial state carries no attitude"
                    .to_string(),
            });
        }
        let integrator = config.build_integrator();
        let detector = Detector::new(config.event_samples);
        Ok(Self {
            config,
            registry,
            integrator,
            detector,
            event_definitions: Vec::new(),
            current: initial,
            state: Cell::new(SessionState::Initialized),
            steps: Vec::new(),
            events: Vec::new(),
            refinement_failures: Vec::new(),
        })
    }

    pub fn session_state(&self) -> SessionState {
        self.state.get()
    }

    pub fn current_state(&self) -> &StateVector {
        &self.current
    }

    pub fn registry(&self) -> &ForceRegistry {
        &self.registry
    }

    /// Register an event definition for subsequent propagate calls.
    pub fn add_event(&mut self, definition: EventDefinition) {
        self.event_definitions.push(definition);
    }

    /// Full accepted-step history across all propagate calls.
    pub fn step_history(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Full event history across all propagate calls.
    pub fn event_history(&self) -> &[EventOccurrence] {
        &self.events
    }

    pub fn refinement_failures(&self) -> &[RefinementFailure] {
        &self.refinement_failures
    }

    /// Propagate for a signed duration in seconds.
    pub fn propagate_by(&mut self, duration_s: f64) -> Result<PropagationOutcome, SessionError> {
        let target = self.current.epoch.offset_by(duration_s);
        self.propagate_to(target)
    }

    /// Propagate to a target epoch (forward or backward), reporting the
    /// steps taken and the events found along the way.
    pub fn propagate_to(&mut self, target: Epoch) -> Result<PropagationOutcome, SessionError> {
        if self.state.get() == SessionState::Running {
            return Err(SessionError::SessionBusy);
        }
        // Scale mismatches are caller errors, not propagation failures: the
        // session state is untouched.
        let duration = target.duration_since(&self.current.epoch)?;
        self.state.set(SessionState::Running);
        match self.run(duration) {
            Ok(outcome) => {
                self.state.set(SessionState::Completed);
                Ok(outcome)
            }
            Err(error) => {
                self.state.set(SessionState::Failed);
                Err(error)
            }
        }
    }

    fn run(&mut self, duration: f64) -> Result<PropagationOutcome, SessionError> {
        let layout = self.config.layout;
        let dim = layout.dim();
        let template = self.current;
        let start = template.epoch;

        let tolerances = Tolerances::uniform(
            dim,
            self.config.absolute_tolerance,
            self.config.relative_tolerance,
        );
        let bounds = StepBounds {
            min_step: self.config.min_step_s,
            max_step: self.config.max_step_s,
            max_rejections: self.config.max_step_rejections,
        };

        let mut y = vec![0.0; dim];
        layout.pack(&self.current, &mut y);

        let mut t = 0.0_f64;
        let mut h = self.config.initial_step_s;
        let epsilon = 1e-9_f64.max(duration.abs() * 1e-14);

        let mut steps = Vec::new();
        let mut events = Vec::new();
        let mut refinement_failures = Vec::new();

        log::debug!(
            "propagating {duration:.3} s from {start} with {} ({} force models)",
            self.integrator.name(),
            self.registry.len()
        );

        while (duration - t).abs() > epsilon {
            if steps.len() >= self.config.max_steps {
                return Err(SessionError::StepBudgetExhausted {
                    epoch: start.offset_by(t),
                    steps: steps.len(),
                });
            }

            let dynamics = Dynamics::new(
                &self.registry,
                layout,
                template,
                self.config.inertia_kg_m2,
            );
            let step = self
                .integrator
                .advance(&dynamics, t, &y, h, duration, &tolerances, &bounds)
                .map_err(|source| {
                    let epoch = start.offset_by(t);
                    match source {
                        IntegrateError::StepRejectionLimitExceeded { .. } => {
                            SessionError::StepRejectionLimit { epoch, source }
                        }
                        source => SessionError::Integration { epoch, source },
                    }
                })?;

            if step.rejections > 0 {
                log::warn!(
                    "step at t = {:.3} s accepted after {} rejections (h = {:.3e} s)",
                    step.t0,
                    step.rejections,
                    step.step()
                );
            }

            let (mut found, mut failed) =
                self.detector
                    .scan(&self.event_definitions, &step, |tt: f64| {
                        let mut buffer = vec![0.0; dim];
                        step.dense.evaluate(tt, &mut buffer);
                        layout.unpack(&buffer, &template, start.offset_by(tt))
                    });
            events.append(&mut found);
            refinement_failures.append(&mut failed);

            t = step.t1;
            let mut y1 = step.y1;
            layout.renormalize_quaternion(&mut y1);
            y = y1;
            h = step.h_next;

            steps.push(StepRecord {
                state: layout.unpack(&y, &template, start.offset_by(t)),
                step_s: step.t1 - step.t0,
                error_estimate: step.error_estimate,
                rejections: step.rejections,
            });
        }

        self.current = layout.unpack(&y, &template, start.offset_by(duration));
        self.steps.extend(steps.iter().cloned());
        self.events.extend(events.iter().cloned());
        self.refinement_failures
            .extend(refinement_failures.iter().cloned());

        Ok(PropagationOutcome {
            final_state: self.current,
            steps,
            events,
            refinement_failures,
        })
    }
}
