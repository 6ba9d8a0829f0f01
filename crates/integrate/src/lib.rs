//! Numerical integrators for state propagation.
//!
//! The integrators work on flat `&[f64]` state vectors through the
//! [`OdeSystem`] trait and produce [`AcceptedStep`]s carrying a dense-output
//! interpolant, so callers can evaluate the state anywhere inside an
//! accepted step without re-integrating.
//!
//! # Available integrators
//!
//! - [`Rk4`]: classical fixed-step 4th order, Hermite dense output
//! - [`DormandPrince45`]: embedded 5(4) pair with error control and the
//!   published 4th-order continuous extension
//!
//! Everything is deterministic: identical inputs produce identical steps.

mod dp45;
mod rk4;

pub use dp45::DormandPrince45;
pub use rk4::Rk4;

use thiserror::Error;

/// Boxed error type derivative evaluations may fail with.
pub type RhsError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A first-order ODE system dy/dt = f(t, y).
pub trait OdeSystem {
    /// State dimension.
    fn dim(&self) -> usize;

    /// Evaluate the right-hand side at `(t, y)` into `dydt`.
    ///
    /// Must be a pure function of its inputs: integrator reproducibility
    /// (and any future finite-difference Jacobian) depends on it.
    fn eval(&self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), RhsError>;
}

/// Relative and absolute tolerance per component.
///
/// The scaled error of a step is `maxᵢ |errᵢ| / (atolᵢ + rtolᵢ·|yᵢ|)`; a
/// step is accepted iff it is ≤ 1.
#[derive(Debug, Clone)]
pub struct Tolerances {
    pub atol: Vec<f64>,
    pub rtol: Vec<f64>,
}

impl Tolerances {
    /// Uniform tolerances across all components.
    pub fn uniform(dim: usize, atol: f64, rtol: f64) -> Self {
        Self {
            atol: vec![atol; dim],
            rtol: vec![rtol; dim],
        }
    }

    fn validate(&self, dim: usize) -> Result<(), IntegrateError> {
        if self.atol.len() != dim || self.rtol.len() != dim {
            return Err(IntegrateError::InvalidInput {
                message: format!(
                    "tolerance vectors must match the state dimension {dim} (got atol {}, rtol {})",
                    self.atol.len(),
                    self.rtol.len()
                ),
            });
        }
        for (i, (&a, &r)) in self.atol.iter().zip(self.rtol.iter()).enumerate() {
            if !a.is_finite() || a <= 0.0 {
                return Err(IntegrateError::InvalidInput {
                    message: format!("atol[{i}] must be positive and finite"),
                });
            }
            if !r.is_finite() || r < 0.0 {
                return Err(IntegrateError::InvalidInput {
                    message: format!("rtol[{i}] must be non-negative and finite"),
                });
            }
        }
        Ok(())
    }

    /// Scaled max-norm of an error vector against a reference state.
    fn scaled_error(&self, err: &[f64], reference: &[f64]) -> f64 {
        let mut max_err: f64 = 0.0;
        for i in 0..err.len() {
            let scale = self.atol[i] + self.rtol[i] * reference[i].abs();
            max_err = max_err.max(err[i].abs() / scale);
        }
        max_err
    }
}

/// Step-size limits and the retry budget for the shrink-and-retry loop.
#[derive(Debug, Clone, Copy)]
pub struct StepBounds {
    /// Smallest allowed |h| (seconds). The final step to a target epoch may
    /// undercut it; nothing else does.
    pub min_step: f64,
    /// Largest allowed |h| (seconds).
    pub max_step: f64,
    /// Rejections tolerated within a single `advance` call.
    pub max_rejections: u32,
}

impl Default for StepBounds {
    fn default() -> Self {
        Self {
            min_step: 1e-3,
            max_step: 600.0,
            max_rejections: 16,
        }
    }
}

/// Power-law step-size controller.
///
/// h_new = h · clamp(safety · error^(−1/(order)), min_factor, max_factor)
#[derive(Debug, Clone, Copy)]
pub struct StepController {
    pub safety: f64,
    /// Shrink floor per retry.
    pub min_factor: f64,
    /// Growth cap per accepted step.
    pub max_factor: f64,
    exponent: f64,
}

impl StepController {
    pub fn new(safety: f64, min_factor: f64, max_factor: f64, error_order: u32) -> Self {
        Self {
            safety,
            min_factor,
            max_factor,
            exponent: 1.0 / f64::from(error_order),
        }
    }

    /// Controller tuned for an embedded 5(4) pair.
    pub fn for_order5() -> Self {
        Self::new(0.9, 0.2, 5.0, 5)
    }

    pub fn factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        (self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
    }
}

/// Dense-output interpolant over one accepted step.
///
/// Valid only over that step's interval and meant to be dropped as soon as
/// event refinement for the step is done.
#[derive(Debug, Clone)]
pub enum DenseOutput {
    /// Cubic Hermite from the states and derivatives at the endpoints
    /// (O(h⁴) accurate).
    Hermite {
        t0: f64,
        h: f64,
        y0: Vec<f64>,
        y1: Vec<f64>,
        f0: Vec<f64>,
        f1: Vec<f64>,
    },
    /// The published Dormand–Prince 4th-order continuous extension.
    DormandPrince {
        t0: f64,
        h: f64,
        rcont1: Vec<f64>,
        rcont2: Vec<f64>,
        rcont3: Vec<f64>,
        rcont4: Vec<f64>,
        rcont5: Vec<f64>,
    },
}

impl DenseOutput {
    /// Evaluate the interpolated state at `t` (inside the step interval)
    /// into `out`.
    pub fn evaluate(&self, t: f64, out: &mut [f64]) {
        match self {
            DenseOutput::Hermite {
                t0,
                h,
                y0,
                y1,
                f0,
                f1,
            } => {
                let theta = (t - t0) / h;
                let t2 = theta * theta;
                let t3 = t2 * theta;
                let h00 = 1.0 - 3.0 * t2 + 2.0 * t3;
                let h10 = theta - 2.0 * t2 + t3;
                let h01 = 3.0 * t2 - 2.0 * t3;
                let h11 = t3 - t2;
                for i in 0..out.len() {
                    out[i] = h00 * y0[i] + h10 * h * f0[i] + h01 * y1[i] + h11 * h * f1[i];
                }
            }
            DenseOutput::DormandPrince {
                t0,
                h,
                rcont1,
                rcont2,
                rcont3,
                rcont4,
                rcont5,
            } => {
                let theta = (t - t0) / h;
                let theta1 = 1.0 - theta;
                for i in 0..out.len() {
                    out[i] = rcont1[i]
                        + theta
                            * (rcont2[i]
                                + theta1 * (rcont3[i] + theta * (rcont4[i] + theta1 * rcont5[i])));
                }
            }
        }
    }
}

/// One accepted integration step.
#[derive(Debug, Clone)]
pub struct AcceptedStep {
    /// Step start time.
    pub t0: f64,
    /// Step end time.
    pub t1: f64,
    /// State at `t0`.
    pub y0: Vec<f64>,
    /// State at `t1`.
    pub y1: Vec<f64>,
    /// Scaled local error estimate of the accepted attempt (≤ 1; zero for
    /// fixed-step methods).
    pub error_estimate: f64,
    /// Rejected attempts before this step was accepted.
    pub rejections: u32,
    /// Suggested magnitude for the next step (seconds).
    pub h_next: f64,
    /// Interpolant over `[t0, t1]`.
    pub dense: DenseOutput,
}

impl AcceptedStep {
    /// Signed step actually taken.
    pub fn step(&self) -> f64 {
        self.t1 - self.t0
    }
}

/// Errors surfaced by the integrators.
#[derive(Debug, Error)]
pub enum IntegrateError {
    /// The shrink-and-retry loop hit its rejection budget (or the minimum
    /// step) without meeting the tolerance.
    #[error(
        "step rejected {rejections} times at t = {t:.3} s (last |h| = {step:.3e} s); \
         tolerance cannot be met above the minimum step"
    )]
    StepRejectionLimitExceeded { t: f64, step: f64, rejections: u32 },
    #[error("invalid integrator input: {message}")]
    InvalidInput { message: String },
    #[error("state became non-finite at t = {t:.3} s")]
    NonFiniteState { t: f64 },
    /// Derivative evaluation failed; carries the underlying cause (e.g. an
    /// ephemeris data gap).
    #[error("derivative evaluation failed at t = {t:.3} s")]
    Rhs {
        t: f64,
        #[source]
        source: RhsError,
    },
}

/// A single-step integrator with dense output.
pub trait Integrator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Order of the propagated solution.
    fn order(&self) -> u8;

    /// Advance one accepted step from `(t, y)` toward `t_target`.
    ///
    /// `h_suggest` is the suggested magnitude for this step; the integrator
    /// clamps it to `bounds`, never steps past `t_target`, and (for
    /// adaptive methods) shrinks and retries until the scaled error is
    /// within tolerance or the retry budget runs out.
    fn advance(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        h_suggest: f64,
        t_target: f64,
        tolerances: &Tolerances,
        bounds: &StepBounds,
    ) -> Result<AcceptedStep, IntegrateError>;
}

/// Clamp a suggested step magnitude to the bounds and the remaining span.
/// Returns the signed step. The final step to the target may undercut
/// `min_step`; that is the only exception.
fn clamp_step(h_suggest: f64, t: f64, t_target: f64, bounds: &StepBounds) -> f64 {
    let remaining = t_target - t;
    let direction = remaining.signum();
    let magnitude = h_suggest.abs().clamp(bounds.min_step, bounds.max_step);
    if magnitude >= remaining.abs() {
        remaining
    } else {
        direction * magnitude
    }
}

fn check_finite(y: &[f64], t: f64) -> Result<(), IntegrateError> {
    if y.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(IntegrateError::NonFiniteState { t })
    }
}

fn validate_advance_inputs(
    system: &dyn OdeSystem,
    y: &[f64],
    tolerances: &Tolerances,
    bounds: &StepBounds,
) -> Result<(), IntegrateError> {
    let dim = system.dim();
    if y.len() != dim {
        return Err(IntegrateError::InvalidInput {
            message: format!("state length {} does not match system dimension {dim}", y.len()),
        });
    }
    tolerances.validate(dim)?;
    if !(bounds.min_step > 0.0 && bounds.max_step >= bounds.min_step) {
        return Err(IntegrateError::InvalidInput {
            message: "step bounds must satisfy 0 < min_step <= max_step".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y' = cos t, exact y = sin t.
    struct Cosine;

    impl OdeSystem for Cosine {
        fn dim(&self) -> usize {
            1
        }

        fn eval(&self, t: f64, _y: &[f64], dydt: &mut [f64]) -> Result<(), RhsError> {
            dydt[0] = t.cos();
            Ok(())
        }
    }

    fn drive(
        integrator: &dyn Integrator,
        system: &dyn OdeSystem,
        mut t: f64,
        mut y: Vec<f64>,
        t_target: f64,
        h0: f64,
        tol: &Tolerances,
        bounds: &StepBounds,
    ) -> (f64, Vec<f64>) {
        let mut h = h0;
        while (t_target - t).abs() > 1e-12 {
            let step = integrator
                .advance(system, t, &y, h, t_target, tol, bounds)
                .unwrap();
            t = step.t1;
            y = step.y1;
            h = step.h_next;
        }
        (t, y)
    }

    #[test]
    fn both_integrators_track_the_exact_solution() {
        let tol = Tolerances::uniform(1, 1e-12, 1e-12);
        let bounds = StepBounds {
            min_step: 1e-6,
            max_step: 0.25,
            max_rejections: 16,
        };
        for integrator in [&Rk4::new() as &dyn Integrator, &DormandPrince45::new()] {
            let (t, y) = drive(
                integrator,
                &Cosine,
                0.0,
                vec![0.0],
                2.0,
                0.1,
                &tol,
                &bounds,
            );
            assert!((t - 2.0).abs() < 1e-12);
            assert!(
                (y[0] - 2.0f64.sin()).abs() < 1e-8,
                "{}: y(2) = {}, expected {}",
                integrator.name(),
                y[0],
                2.0f64.sin()
            );
        }
    }

    #[test]
    fn dense_output_matches_interior_solution() {
        let tol = Tolerances::uniform(1, 1e-12, 1e-12);
        let bounds = StepBounds {
            min_step: 1e-6,
            max_step: 0.5,
            max_rejections: 16,
        };
        for integrator in [&Rk4::new() as &dyn Integrator, &DormandPrince45::new()] {
            let step = integrator
                .advance(&Cosine, 0.0, &[0.0], 0.5, 10.0, &tol, &bounds)
                .unwrap();
            let mut out = [0.0];
            for k in 0..=10 {
                let t = step.t0 + (step.t1 - step.t0) * f64::from(k) / 10.0;
                step.dense.evaluate(t, &mut out);
                assert!(
                    (out[0] - t.sin()).abs() < 1e-7,
                    "{} dense at t = {t}: {} vs {}",
                    integrator.name(),
                    out[0],
                    t.sin()
                );
            }
        }
    }

    #[test]
    fn never_oversteps_the_target() {
        let tol = Tolerances::uniform(1, 1e-9, 1e-9);
        let bounds = StepBounds::default();
        let step = DormandPrince45::new()
            .advance(&Cosine, 0.0, &[0.0], 500.0, 0.125, &tol, &bounds)
            .unwrap();
        assert_eq!(step.t1, 0.125);
    }

    #[test]
    fn backward_steps_work() {
        let tol = Tolerances::uniform(1, 1e-12, 1e-12);
        let bounds = StepBounds {
            min_step: 1e-6,
            max_step: 0.25,
            max_rejections: 16,
        };
        let (t, y) = drive(
            &DormandPrince45::new(),
            &Cosine,
            2.0,
            vec![2.0f64.sin()],
            0.0,
            0.1,
            &tol,
            &bounds,
        );
        assert!((t - 0.0).abs() < 1e-12);
        assert!(y[0].abs() < 1e-8, "y(0) = {}", y[0]);
    }

    /// A stiff-looking RHS that forces rejections at any coarse tolerance.
    struct Spike;

    impl OdeSystem for Spike {
        fn dim(&self) -> usize {
            1
        }

        fn eval(&self, _t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), RhsError> {
            dydt[0] = -1.0 / (y[0] * y[0] + 1e-30);
            Ok(())
        }
    }

    #[test]
    fn rejection_budget_is_enforced() {
        let tol = Tolerances::uniform(1, 1e-14, 1e-14);
        let bounds = StepBounds {
            min_step: 1e-4,
            max_step: 10.0,
            max_rejections: 4,
        };
        let result = DormandPrince45::new().advance(&Spike, 0.0, &[1e-3], 1.0, 10.0, &tol, &bounds);
        assert!(matches!(
            result,
            Err(IntegrateError::StepRejectionLimitExceeded { .. })
        ));
    }
}
