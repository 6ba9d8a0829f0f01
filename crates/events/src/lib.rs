//! Trajectory events: scalar zero-crossings located on dense output.
//!
//! An [`EventDefinition`] pairs a scalar function of the spacecraft state
//! with a threshold and a crossing-direction filter. After every accepted
//! integrator step the [`Detector`] samples the step's dense-output
//! interpolant, looks for direction-consistent sign changes, and refines
//! each crossing by bisection to the event's time tolerance.
//!
//! A crossing that enters and leaves again between two adjacent sample
//! points cannot be seen; that is a documented sampling limitation, and
//! callers who need guaranteed detection bound the integrator's maximum
//! step (or raise the sample count) accordingly.

use std::fmt;

use astroprop_core::state::StateVector;
use astroprop_core::time::Epoch;
use astroprop_integrate::AcceptedStep;

/// Which zero-crossings of the scalar function are of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDirection {
    /// Negative to positive.
    Rising,
    /// Positive to negative.
    Falling,
    /// Either direction.
    Either,
}

/// The sense in which a detected crossing actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingDirection {
    Rising,
    Falling,
}

/// Scalar function of the spacecraft state driving an event.
pub type ScalarFn = Box<dyn Fn(&StateVector) -> f64 + Send + Sync>;

/// A named scalar-threshold event. Owned by the caller; the detector only
/// borrows definitions for the duration of a scan.
pub struct EventDefinition {
    pub name: String,
    function: ScalarFn,
    pub threshold: f64,
    pub direction: EventDirection,
    /// Crossing-time refinement tolerance (seconds).
    pub time_tolerance_s: f64,
    /// Bisection iteration budget before the crossing is dropped.
    pub max_iterations: u32,
}

impl EventDefinition {
    pub fn new(
        name: impl Into<String>,
        function: ScalarFn,
        threshold: f64,
        direction: EventDirection,
        time_tolerance_s: f64,
    ) -> Self {
        Self {
            name: name.into(),
            function,
            threshold,
            direction,
            time_tolerance_s,
            max_iterations: 64,
        }
    }

    /// g(state) = f(state) − threshold; events sit at g = 0.
    pub fn value(&self, state: &StateVector) -> f64 {
        (self.function)(state) - self.threshold
    }

    /// Altitude above a spherical body crossing `altitude_km`.
    pub fn altitude(
        name: impl Into<String>,
        body_radius_km: f64,
        altitude_km: f64,
        direction: EventDirection,
        time_tolerance_s: f64,
    ) -> Self {
        Self::new(
            name,
            Box::new(move |state| state.radius_km() - body_radius_km),
            altitude_km,
            direction,
            time_tolerance_s,
        )
    }

    /// Apsis passage: radial velocity crossing zero. Rising means periapsis
    /// (radial velocity turns positive), falling means apoapsis.
    pub fn apsis(
        name: impl Into<String>,
        direction: EventDirection,
        time_tolerance_s: f64,
    ) -> Self {
        Self::new(
            name,
            Box::new(|state| state.radial_velocity_km_s()),
            0.0,
            direction,
            time_tolerance_s,
        )
    }

    /// Equator crossing: z coordinate through zero. Rising is the ascending
    /// node.
    pub fn node(
        name: impl Into<String>,
        direction: EventDirection,
        time_tolerance_s: f64,
    ) -> Self {
        Self::new(
            name,
            Box::new(|state| state.position_km[2]),
            0.0,
            direction,
            time_tolerance_s,
        )
    }
}

impl fmt::Debug for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDefinition")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .field("direction", &self.direction)
            .field("time_tolerance_s", &self.time_tolerance_s)
            .finish_non_exhaustive()
    }
}

/// An immutable record of one detected crossing.
#[derive(Debug, Clone)]
pub struct EventOccurrence {
    /// Name of the definition that fired.
    pub event: String,
    pub epoch: Epoch,
    pub state: StateVector,
    pub direction: CrossingDirection,
}

/// A crossing that was bracketed but could not be refined within the
/// iteration budget. The step remains valid; only this event was dropped.
#[derive(Debug, Clone)]
pub struct RefinementFailure {
    pub event: String,
    pub window_start: Epoch,
    pub window_end: Epoch,
}

fn sign_change(g_prev: f64, g_next: f64, direction: EventDirection) -> Option<CrossingDirection> {
    if g_prev.is_nan() || g_next.is_nan() {
        return None;
    }
    let rising = g_prev < 0.0 && g_next >= 0.0;
    let falling = g_prev > 0.0 && g_next <= 0.0;
    match direction {
        EventDirection::Rising if rising => Some(CrossingDirection::Rising),
        EventDirection::Falling if falling => Some(CrossingDirection::Falling),
        EventDirection::Either if rising => Some(CrossingDirection::Rising),
        EventDirection::Either if falling => Some(CrossingDirection::Falling),
        _ => None,
    }
}

/// Scans accepted steps for event crossings.
#[derive(Debug, Clone, Copy)]
pub struct Detector {
    /// Sub-intervals the dense output is sampled at per step (endpoints
    /// always included).
    pub samples: usize,
}

impl Default for Detector {
    fn default() -> Self {
        Self { samples: 8 }
    }
}

impl Detector {
    pub fn new(samples: usize) -> Self {
        Self {
            samples: samples.max(1),
        }
    }

    /// Scan one accepted step against every definition.
    ///
    /// `state_at` reconstructs a full [`StateVector`] from an integrator
    /// time inside the step (the session closes over its dense output and
    /// state layout). Occurrences are returned ordered by crossing time.
    pub fn scan<F>(
        &self,
        definitions: &[EventDefinition],
        step: &AcceptedStep,
        state_at: F,
    ) -> (Vec<EventOccurrence>, Vec<RefinementFailure>)
    where
        F: Fn(f64) -> StateVector,
    {
        let mut occurrences: Vec<(f64, EventOccurrence)> = Vec::new();
        let mut failures = Vec::new();
        if definitions.is_empty() {
            return (Vec::new(), failures);
        }

        let span = step.t1 - step.t0;
        for definition in definitions {
            let g = |t: f64| definition.value(&state_at(t));

            let mut t_prev = step.t0;
            let mut g_prev = g(t_prev);
            for sample in 1..=self.samples {
                let t_next = if sample == self.samples {
                    step.t1
                } else {
                    step.t0 + span * (sample as f64) / (self.samples as f64)
                };
                let g_next = g(t_next);
                if let Some(crossing) = sign_change(g_prev, g_next, definition.direction) {
                    match self.refine(definition, &g, t_prev, t_next, g_prev) {
                        Some(t_event) => {
                            let state = state_at(t_event);
                            occurrences.push((
                                t_event,
                                EventOccurrence {
                                    event: definition.name.clone(),
                                    epoch: state.epoch,
                                    state,
                                    direction: crossing,
                                },
                            ));
                        }
                        None => {
                            log::warn!(
                                "event `{}` bracketed in [{t_prev}, {t_next}] but did not refine; dropping",
                                definition.name
                            );
                            failures.push(RefinementFailure {
                                event: definition.name.clone(),
                                window_start: state_at(t_prev).epoch,
                                window_end: state_at(t_next).epoch,
                            });
                        }
                    }
                }
                t_prev = t_next;
                g_prev = g_next;
            }
        }

        // Traversal order: ascending in time going forward, descending when
        // the step runs backward.
        occurrences.sort_by(|a, b| a.0.total_cmp(&b.0));
        if span < 0.0 {
            occurrences.reverse();
        }
        (occurrences.into_iter().map(|(_, e)| e).collect(), failures)
    }

    /// Bisection on the interpolated g over a bracketing interval. Returns
    /// the crossing time, or `None` past the iteration budget.
    fn refine<G>(
        &self,
        definition: &EventDefinition,
        g: &G,
        mut a: f64,
        mut b: f64,
        mut g_a: f64,
    ) -> Option<f64>
    where
        G: Fn(f64) -> f64,
    {
        if g_a == 0.0 {
            return Some(a);
        }
        let mut iterations = 0;
        while (b - a).abs() > definition.time_tolerance_s {
            iterations += 1;
            if iterations > definition.max_iterations {
                return None;
            }
            let mid = 0.5 * (a + b);
            let g_mid = g(mid);
            if g_mid.is_nan() {
                return None;
            }
            if g_mid == 0.0 {
                return Some(mid);
            }
            if (g_a < 0.0) == (g_mid < 0.0) {
                a = mid;
                g_a = g_mid;
            } else {
                b = mid;
            }
        }
        Some(0.5 * (a + b))
    }
}
