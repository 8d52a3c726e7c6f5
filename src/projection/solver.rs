//! Two-dimensional Newton iteration for inverting polynomial plate models
//!
//! The plate and DSS models map pixels to standard coordinates with a pair
//! of bivariate polynomials and have no closed-form inverse. A model
//! supplies its residual against the target and the analytic partials; the
//! solver inverts the 2×2 Jacobian each step.

use log::trace;
use thiserror::Error;

/// Iteration budget of [`solve`]
pub const MAX_ITERATIONS: usize = 50;
/// Step size below which [`solve`] stops, on both axes
pub const TOLERANCE: f64 = 5.0e-7;

/// Residuals of both model axes and their partial derivatives at a point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelEval {
    pub f: f64,
    pub fx: f64,
    pub fy: f64,
    pub g: f64,
    pub gx: f64,
    pub gy: f64,
}

/// A pair of functions `f(x, y)`, `g(x, y)` whose common root is sought
pub trait BivariateModel {
    fn evaluate(&self, x: f64, y: f64) -> ModelEval;
}

impl<F> BivariateModel for F
where
    F: Fn(f64, f64) -> ModelEval,
{
    fn evaluate(&self, x: f64, y: f64) -> ModelEval {
        self(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonSolution {
    pub x: f64,
    pub y: f64,
    /// Newton steps taken, including the final one below tolerance
    pub iterations: usize,
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SolverError {
    /// Iteration budget exhausted; (x, y) is the last estimate
    #[error("Newton iteration did not converge after {iterations} steps (last estimate {x}, {y})")]
    NotConverged { x: f64, y: f64, iterations: usize },

    #[error("Singular Jacobian at Newton step {iteration}")]
    SingularJacobian { iteration: usize },
}

/// Solves `model = 0` from `initial` with the default budget and tolerance
pub fn solve<M: BivariateModel + ?Sized>(
    model: &M,
    initial: (f64, f64),
) -> Result<NewtonSolution, SolverError> {
    solve_with(model, initial, MAX_ITERATIONS, TOLERANCE)
}

pub fn solve_with<M: BivariateModel + ?Sized>(
    model: &M,
    initial: (f64, f64),
    max_iterations: usize,
    tolerance: f64,
) -> Result<NewtonSolution, SolverError> {
    let (mut x, mut y) = initial;

    for iteration in 1..=max_iterations {
        let e = model.evaluate(x, y);
        let det = e.fx * e.gy - e.fy * e.gx;
        let dx = (-e.f * e.gy + e.g * e.fy) / det;
        let dy = (-e.g * e.fx + e.f * e.gx) / det;

        if !dx.is_finite() || !dy.is_finite() {
            return Err(SolverError::SingularJacobian { iteration });
        }

        x += dx;
        y += dy;
        trace!("newton step {}: dx={:e} dy={:e} -> ({}, {})", iteration, dx, dy, x, y);

        if dx.abs() < tolerance && dy.abs() < tolerance {
            return Ok(NewtonSolution { x, y, iterations: iteration });
        }
    }

    Err(SolverError::NotConverged {
        x,
        y,
        iterations: max_iterations,
    })
}
