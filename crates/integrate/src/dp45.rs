//! Dormand–Prince 5(4) embedded pair with dense output.
//!
//! Coefficients are the published DOPRI5 values (Dormand & Prince 1980;
//! dense-output weights after Hairer, Nørsett & Wanner). The pair is FSAL:
//! the 7th stage is the derivative at the step end and seeds both the error
//! estimate and the continuous extension.

use crate::{
    AcceptedStep, DenseOutput, IntegrateError, Integrator, OdeSystem, StepBounds, StepController,
    Tolerances, check_finite, clamp_step, validate_advance_inputs,
};

const STAGES: usize = 7;

/// Stage nodes.
const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

/// Runge-Kutta matrix (strictly lower triangular, row-packed).
const A: [[f64; 6]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// 5th-order solution weights (row 7 of A; FSAL).
const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// Error weights: b − b̂ (5th minus embedded 4th order).
const B_ERR: [f64; STAGES] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

/// Dense-output weights.
const D: [f64; STAGES] = [
    -12715105075.0 / 11282082432.0,
    0.0,
    87487479700.0 / 32700410799.0,
    -10690763975.0 / 1880347072.0,
    701980252875.0 / 199316789632.0,
    -1453857185.0 / 822651844.0,
    69997945.0 / 29380423.0,
];

/// Adaptive Dormand–Prince 5(4) integrator.
#[derive(Debug, Clone, Copy)]
pub struct DormandPrince45 {
    controller: StepController,
}

impl Default for DormandPrince45 {
    fn default() -> Self {
        Self::new()
    }
}

impl DormandPrince45 {
    pub fn new() -> Self {
        Self {
            controller: StepController::for_order5(),
        }
    }

    pub fn with_controller(controller: StepController) -> Self {
        Self { controller }
    }
}

impl Integrator for DormandPrince45 {
    fn name(&self) -> &'static str {
        "dormand_prince_45"
    }

    fn order(&self) -> u8 {
        5
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

        let eval = |tt: f64, yy: &[f64], out: &mut [f64]| -> Result<(), IntegrateError> {
            system
                .eval(tt, yy, out)
                .map_err(|source| IntegrateError::Rhs { t: tt, source })
        };

        let mut k = vec![vec![0.0; dim]; STAGES];
        let mut work = vec![0.0; dim];
        let mut y1 = vec![0.0; dim];
        let mut err = vec![0.0; dim];

        let mut h = clamp_step(h_suggest, t, t_target, bounds);
        let mut rejections = 0u32;

        loop {
            // Stages. k1 is recomputed per attempt; the FSAL pairing across
            // steps is intentionally not exploited so each attempt is a pure
            // function of (t, y, h).
            eval(t + C[0] * h, y, &mut k[0])?;
            for s in 1..STAGES {
                for i in 0..dim {
                    let mut sum = 0.0;
                    for j in 0..s {
                        sum += A[s][j] * k[j][i];
                    }
                    work[i] = y[i] + h * sum;
                }
                eval(t + C[s] * h, &work, &mut k[s])?;
            }

            for i in 0..dim {
                let mut sum = 0.0;
                let mut esum = 0.0;
                for s in 0..STAGES {
                    sum += B[s] * k[s][i];
                    esum += B_ERR[s] * k[s][i];
                }
                y1[i] = y[i] + h * sum;
                err[i] = h * esum;
            }

            let error = tolerances.scaled_error(&err, &y1);
            if error <= 1.0 {
                let t1 = if h == t_target - t { t_target } else { t + h };
                check_finite(&y1, t1)?;

                let h_next = (h.abs() * self.controller.factor(error))
                    .clamp(bounds.min_step, bounds.max_step);

                // Continuous extension coefficients.
                let mut rcont1 = vec![0.0; dim];
                let mut rcont2 = vec![0.0; dim];
                let mut rcont3 = vec![0.0; dim];
                let mut rcont4 = vec![0.0; dim];
                let mut rcont5 = vec![0.0; dim];
                for i in 0..dim {
                    let dy = y1[i] - y[i];
                    rcont1[i] = y[i];
                    rcont2[i] = dy;
                    rcont3[i] = h * k[0][i] - dy;
                    rcont4[i] = dy - h * k[6][i] - rcont3[i];
                    let mut dsum = 0.0;
                    for s in 0..STAGES {
                        dsum += D[s] * k[s][i];
                    }
                    rcont5[i] = h * dsum;
                }

                return Ok(AcceptedStep {
                    t0: t,
                    t1,
                    y0: y.to_vec(),
                    y1: y1.clone(),
                    error_estimate: error,
                    rejections,
                    h_next,
                    dense: DenseOutput::DormandPrince {
                        t0: t,
                        h,
                        rcont1,
                        rcont2,
                        rcont3,
                        rcont4,
                        rcont5,
                    },
                });
            }

            // Rejected: shrink and retry.
            rejections += 1;
            if rejections > bounds.max_rejections {
                return Err(IntegrateError::StepRejectionLimitExceeded {
                    t,
                    step: h.abs(),
                    rejections,
                });
            }
            let shrink = self.controller.factor(error).min(1.0);
            let magnitude = h.abs() * shrink;
            if magnitude < bounds.min_step {
                if h.abs() <= bounds.min_step {
                    return Err(IntegrateError::StepRejectionLimitExceeded {
                        t,
                        step: h.abs(),
                        rejections,
                    });
                }
                h = bounds.min_step * h.signum();
            } else {
                h = magnitude * h.signum();
            }
        }
    }
}
