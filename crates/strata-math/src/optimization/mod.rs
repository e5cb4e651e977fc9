//! Optimization algorithms.
//!
//! This module provides the gradient-based minimizer used for curve fitting.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::MathResult;

/// Configuration for optimization algorithms.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationConfig {
    /// Tolerance on the gradient norm for convergence.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 200,
        }
    }
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Optimal parameters found.
    pub parameters: Vec<f64>,
    /// Final objective function value.
    pub objective_value: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Whether the optimization converged.
    pub converged: bool,
}

/// BFGS quasi-Newton minimizer with a caller-supplied analytic gradient.
///
/// Maintains an inverse-Hessian approximation updated by the standard BFGS
/// rank-two formula, with Armijo backtracking line search. The analytic
/// gradient matters here: the curve-fitting objectives this serves are
/// O(nodes x bonds x cashflows) per evaluation, so finite differences would
/// multiply the cost by the parameter count.
///
/// # Arguments
///
/// * `f` - Objective function
/// * `grad` - Analytic gradient of `f`
/// * `initial` - Starting parameter vector
/// * `config` - Optimization configuration
///
/// # Example
///
/// ```rust
/// use strata_math::optimization::{bfgs, OptimizationConfig};
///
/// // Minimize (x - 3)^2 + (y + 1)^2
/// let f = |p: &[f64]| (p[0] - 3.0).powi(2) + (p[1] + 1.0).powi(2);
/// let grad = |p: &[f64]| vec![2.0 * (p[0] - 3.0), 2.0 * (p[1] + 1.0)];
///
/// let result = bfgs(f, grad, &[0.0, 0.0], &OptimizationConfig::default()).unwrap();
/// assert!((result.parameters[0] - 3.0).abs() < 1e-6);
/// assert!((result.parameters[1] + 1.0).abs() < 1e-6);
/// ```
pub fn bfgs<F, G>(
    mut f: F,
    mut grad: G,
    initial: &[f64],
    config: &OptimizationConfig,
) -> MathResult<OptimizationResult>
where
    F: FnMut(&[f64]) -> f64,
    G: FnMut(&[f64]) -> Vec<f64>,
{
    let n = initial.len();
    let mut x = DVector::from_column_slice(initial);
    let mut fx = f(x.as_slice());
    let mut g = DVector::from_vec(grad(x.as_slice()));

    // Inverse Hessian approximation, seeded at identity
    let mut h_inv = DMatrix::<f64>::identity(n, n);

    for iteration in 0..config.max_iterations {
        let g_norm = g.norm();
        if g_norm < config.tolerance {
            debug!("bfgs converged in {iteration} iterations (objective {fx:.3e})");
            return Ok(OptimizationResult {
                parameters: x.as_slice().to_vec(),
                objective_value: fx,
                iterations: iteration,
                converged: true,
            });
        }

        // Search direction
        let direction = -(&h_inv * &g);

        // Armijo backtracking line search
        let slope = g.dot(&direction);
        let mut step = 1.0;
        let c = 1e-4;

        let (x_new, fx_new) = loop {
            let candidate = &x + &direction * step;
            let f_candidate = f(candidate.as_slice());

            if f_candidate <= fx + c * step * slope {
                break (candidate, f_candidate);
            }

            step *= 0.5;
            if step < 1e-15 {
                // Line search cannot make progress
                return Ok(OptimizationResult {
                    parameters: x.as_slice().to_vec(),
                    objective_value: fx,
                    iterations: iteration,
                    converged: false,
                });
            }
        };

        let g_new = DVector::from_vec(grad(x_new.as_slice()));

        // BFGS inverse-Hessian update
        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);

        if sy > 1e-12 {
            let rho = 1.0 / sy;
            let identity = DMatrix::<f64>::identity(n, n);
            let left = &identity - (&s * y.transpose()) * rho;
            let right = &identity - (&y * s.transpose()) * rho;
            h_inv = &left * h_inv * &right + (&s * s.transpose()) * rho;
        }

        x = x_new;
        fx = fx_new;
        g = g_new;
    }

    Ok(OptimizationResult {
        parameters: x.as_slice().to_vec(),
        objective_value: fx,
        iterations: config.max_iterations,
        converged: false,
    })
}
