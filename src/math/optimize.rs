//! Bounded quasi-Newton minimization.
//!
//! Thin wrapper around argmin's L-BFGS with a More-Thuente line search. Box
//! constraints are removed by running the solver on unconstrained coordinates:
//! each bounded parameter is mapped through a bijection onto its interval, so
//! every point the line search visits is strictly inside the box.

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;

use crate::domain::OptimizerConfig;

/// Result of a bounded minimization.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Best parameters found (inside the bounds).
    pub parameters: Vec<f64>,
    /// Objective value at `parameters`.
    pub fval: f64,
    pub n_iter: u64,
    /// Whether the solver stopped on its own convergence criterion.
    pub converged: bool,
    pub message: String,
}

/// Scalar objective to minimize.
pub trait ObjectiveFunction: Send + Sync {
    fn eval(&self, params: &[f64]) -> f64;

    /// Gradient by central differences unless overridden.
    ///
    /// When one side of the stencil is not finite (a pole or support edge next
    /// to `params`), the other side is used as a one-sided difference.
    fn gradient(&self, params: &[f64]) -> Vec<f64> {
        let f0 = self.eval(params);
        let mut grad = vec![0.0; params.len()];
        let mut shifted = params.to_vec();
        for i in 0..params.len() {
            let eps = 1e-8 * params[i].abs().max(1.0);

            shifted[i] = params[i] + eps;
            let f_plus = self.eval(&shifted);
            shifted[i] = params[i] - eps;
            let f_minus = self.eval(&shifted);
            shifted[i] = params[i];

            grad[i] = match (f_plus.is_finite(), f_minus.is_finite()) {
                (true, true) => (f_plus - f_minus) / (2.0 * eps),
                (true, false) => (f_plus - f0) / eps,
                (false, true) => (f0 - f_minus) / eps,
                (false, false) => f64::NAN,
            };
        }
        grad
    }
}

/// Smallest relative distance kept from a finite bound when mapping a start point.
const INTERIOR_MARGIN: f64 = 1e-12;

/// Bijection from the real line onto one parameter's admissible interval.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BoxTransform {
    Free,
    /// `x = lo + exp(z)`
    Lower(f64),
    /// `x = hi - exp(z)`
    Upper(f64),
    /// `x = lo + (hi - lo) * sigmoid(z)`
    Interval(f64, f64),
}

fn sigmoid(z: f64) -> f64 {
    let e = (-z.abs()).exp();
    let recip = 1.0 / (1.0 + e);
    if z >= 0.0 { recip } else { e * recip }
}

impl BoxTransform {
    fn from_bounds((lo, hi): (f64, f64)) -> Self {
        match (lo.is_finite(), hi.is_finite()) {
            (false, false) => Self::Free,
            (true, false) => Self::Lower(lo),
            (false, true) => Self::Upper(hi),
            (true, true) if hi > lo => Self::Interval(lo, hi),
            (true, true) => Self::Free,
        }
    }

    fn forward(self, z: f64) -> f64 {
        match self {
            Self::Free => z,
            Self::Lower(lo) => lo + z.exp(),
            Self::Upper(hi) => hi - z.exp(),
            Self::Interval(lo, hi) => lo + (hi - lo) * sigmoid(z),
        }
    }

    /// `dx/dz`
    fn jacobian(self, z: f64) -> f64 {
        match self {
            Self::Free => 1.0,
            Self::Lower(_) => z.exp(),
            Self::Upper(_) => -z.exp(),
            Self::Interval(lo, hi) => {
                let s = sigmoid(z);
                (hi - lo) * s * (1.0 - s)
            }
        }
    }

    /// Start points on or outside a bound are pulled just inside it.
    fn inverse(self, x: f64) -> f64 {
        let margin = |bound: f64| INTERIOR_MARGIN * bound.abs().max(1.0);
        match self {
            Self::Free => x,
            Self::Lower(lo) => (x - lo).max(margin(lo)).ln(),
            Self::Upper(hi) => (hi - x).max(margin(hi)).ln(),
            Self::Interval(lo, hi) => {
                let p = ((x - lo) / (hi - lo)).clamp(INTERIOR_MARGIN, 1.0 - INTERIOR_MARGIN);
                (p / (1.0 - p)).ln()
            }
        }
    }
}

struct ArgminProblem<'a> {
    objective: &'a dyn ObjectiveFunction,
    transforms: &'a [BoxTransform],
}

impl ArgminProblem<'_> {
    fn to_box(&self, z: &[f64]) -> Vec<f64> {
        z.iter().zip(self.transforms).map(|(&zi, t)| t.forward(zi)).collect()
    }
}

impl CostFunction for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, z: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let value = self.objective.eval(&self.to_box(z));
        if value.is_finite() {
            Ok(value)
        } else {
            Err(argmin::core::Error::msg("objective is not finite"))
        }
    }
}

impl Gradient for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, z: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let g: Vec<f64> = self
            .objective
            .gradient(&self.to_box(z))
            .iter()
            .zip(z.iter().zip(self.transforms))
            .map(|(&gx, (&zi, t))| gx * t.jacobian(zi))
            .collect();
        if g.iter().any(|v| !v.is_finite()) {
            return Err(argmin::core::Error::msg("gradient is not finite"));
        }
        Ok(g)
    }
}

/// L-BFGS with box constraints.
#[derive(Debug, Clone, Default)]
pub struct LbfgsbOptimizer {
    config: OptimizerConfig,
}

impl LbfgsbOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimize `objective` from `init` inside `bounds`.
    ///
    /// Returns `None` when the solver cannot run to completion (invalid
    /// configuration, non-finite objective, failed line search).
    pub fn minimize(
        &self,
        objective: &dyn ObjectiveFunction,
        init: &[f64],
        bounds: &[(f64, f64)],
    ) -> Option<OptimizationResult> {
        if init.len() != bounds.len() {
            tracing::debug!(n_init = init.len(), n_bounds = bounds.len(), "parameter/bounds length mismatch");
            return None;
        }

        let transforms: Vec<BoxTransform> = bounds.iter().map(|&b| BoxTransform::from_bounds(b)).collect();
        let problem = ArgminProblem {
            objective,
            transforms: &transforms,
        };
        let linesearch = MoreThuenteLineSearch::new();
        let tol_cost = (0.1 * self.config.tol).max(1e-12);
        let solver = LBFGS::new(linesearch, self.config.m)
            .with_tolerance_grad(self.config.tol)
            .and_then(|s| s.with_tolerance_cost(tol_cost));
        let solver = match solver {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(error = %e, "invalid optimizer configuration");
                return None;
            }
        };

        let z0: Vec<f64> = init.iter().zip(&transforms).map(|(&x, t)| t.inverse(x)).collect();
        let res = match Executor::new(problem, solver)
            .configure(|state| state.param(z0).max_iters(self.config.max_iter))
            .run()
        {
            Ok(res) => res,
            Err(e) => {
                tracing::debug!(error = %e, "optimizer run failed");
                return None;
            }
        };

        let state = res.state();
        let best = state.get_best_param()?;
        let parameters: Vec<f64> = best.iter().zip(&transforms).map(|(&z, t)| t.forward(z)).collect();
        let fval = state.get_best_cost();
        let termination = state.get_termination_status();
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
                | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
        );

        Some(OptimizationResult {
            parameters,
            fval,
            n_iter: state.get_iter(),
            converged,
            message: termination.to_string(),
        })
    }
}
