//! Classical 4th-order Runge-Kutta with fixed steps.

use crate::{
    AcceptedStep, DenseOutput, IntegrateError, Integrator, OdeSystem, StepBounds, Tolerances,
    check_finite, clamp_step, validate_advance_inputs,
};

/// Fixed-step classical RK4.
///
/// Takes whatever step it is handed (clamped to the bounds and the target)
/// and reports a zero error estimate; there is no rejection path. The dense
/// output is a cubic Hermite built from the endpoint derivatives, which
/// costs one extra evaluation per step.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rk4;

impl Rk4 {
    pub fn new() -> Self {
        Self
    }
}

impl Integrator for Rk4 {
    fn name(&self) -> &'static str {
        "rk4"
    }

    fn order(&self) -> u8 {
        4
    }

    fn advance(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        h_suggest: f64,
        t_target: f64,
        tolerances: &Tolerances,
        bounds: &StepBounds,
    ) -> Result<AcceptedStep, IntegrateError> {
        validate_advance_inputs(system, y, tolerances, bounds)?;
        let dim = system.dim();
        let h = clamp_step(h_suggest, t, t_target, bounds);
        let t1 = if h == t_target - t { t_target } else { t + h };

        let eval = |tt: f64, yy: &[f64], out: &mut [f64]| -> Result<(), IntegrateError> {
            system
                .eval(tt, yy, out)
                .map_err(|source| IntegrateError::Rhs { t: tt, source })
        };

        let mut k1 = vec![0.0; dim];
        let mut k2 = vec![0.0; dim];
        let mut k3 = vec![0.0; dim];
        let mut k4 = vec![0.0; dim];
        let mut work = vec![0.0; dim];

        eval(t, y, &mut k1)?;
        for i in 0..dim {
            work[i] = y[i] + 0.5 * h * k1[i];
        }
        eval(t + 0.5 * h, &work, &mut k2)?;
        for i in 0..dim {
            work[i] = y[i] + 0.5 * h * k2[i];
        }
        eval(t + 0.5 * h, &work, &mut k3)?;
        for i in 0..dim {
            work[i] = y[i] + h * k3[i];
        }
        eval(t + h, &work, &mut k4)?;

        let mut y1 = vec![0.0; dim];
        for i in 0..dim {
            y1[i] = y[i] + h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
        check_finite(&y1, t1)?;

        // Endpoint derivative for the Hermite interpolant.
        let mut f1 = vec![0.0; dim];
        eval(t1, &y1, &mut f1)?;

        Ok(AcceptedStep {
            t0: t,
            t1,
            y0: y.to_vec(),
            y1: y1.clone(),
            error_estimate: 0.0,
            rejections: 0,
            h_next: h_suggest.abs(),
            dense: DenseOutput::Hermite {
                t0: t,
                h,
                y0: y.to_vec(),
                y1,
                f0: k1,
                f1,
            },
        })
    }
}
