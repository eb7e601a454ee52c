//! Local Newton root finders for scalar equations and square systems.
//!
//! Both solvers report non-convergence through [`RootResult::failure`]
//! rather than through `Err`; `Err` is reserved for invalid inputs.

use crate::dedup::{push_distinct_scalar, round_to};
use crate::error::RootFailure;
use crate::grid::linspace;
use anyhow::{bail, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_steps: usize,
    /// 1-D: converged when `|f(x)| < tolerance`.
    /// N-D: converged when the Newton step is shorter than `tolerance`.
    pub tolerance: f64,
    /// Scale-relative threshold below which the derivative or Jacobian
    /// determinant counts as singular. Zero reproduces an exact-zero test.
    pub singular_tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 20,
            tolerance: 1e-8,
            singular_tolerance: 1e-14,
        }
    }
}

impl NewtonSettings {
    /// Defaults for the scalar solver, which gets a larger iteration budget.
    pub fn scalar() -> Self {
        Self {
            max_steps: 50,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            bail!("max_steps must be greater than zero.");
        }
        if !(self.tolerance > 0.0) {
            bail!("tolerance must be positive.");
        }
        if !(self.singular_tolerance >= 0.0) {
            bail!("singular_tolerance must be non-negative.");
        }
        Ok(())
    }
}

/// Outcome of one Newton solve. The value is the last iterate, whether or
/// not the solve converged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootResult<V> {
    pub value: V,
    pub iterations: usize,
    /// `|f|` (1-D) or `‖F‖₂` (N-D) at `value`.
    pub residual_norm: f64,
    pub failure: Option<RootFailure>,
}

impl<V> RootResult<V> {
    pub fn converged(&self) -> bool {
        self.failure.is_none()
    }

    /// The root, if the solve converged.
    pub fn root(&self) -> Option<&V> {
        if self.converged() {
            Some(&self.value)
        } else {
            None
        }
    }
}

/// Scalar Newton iteration `x ← x - f(x)/f'(x)`.
///
/// Converges when `|f(x_n)| < tolerance` and returns that `x_n` unchanged.
pub fn newton_1d<F, D>(f: F, df: D, x0: f64, settings: NewtonSettings) -> Result<RootResult<f64>>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    settings.validate()?;

    let mut x = x0;
    for n in 0..settings.max_steps {
        let fx = f(x);
        if fx.abs() < settings.tolerance {
            return Ok(RootResult {
                value: x,
                iterations: n,
                residual_norm: fx.abs(),
                failure: None,
            });
        }
        let dfx = df(x);
        if is_singular_derivative(dfx, fx, settings.singular_tolerance) {
            return Ok(RootResult {
                value: x,
                iterations: n,
                residual_norm: fx.abs(),
                failure: Some(RootFailure::ZeroOrSingularDerivative),
            });
        }
        x -= fx / dfx;
    }

    Ok(RootResult {
        value: x,
        iterations: settings.max_steps,
        residual_norm: f(x).abs(),
        failure: Some(RootFailure::MaxIterationsExceeded),
    })
}

fn is_singular_derivative(dfx: f64, fx: f64, tol: f64) -> bool {
    dfx.abs() <= tol * fx.abs().max(1.0)
}

/// Newton–Raphson for `F(p) = 0` with `F: Rⁿ → Rⁿ`.
///
/// `f` writes `F(p)` into its output buffer; `jacobian` writes `J(p)`
/// row-major (`n * n`). Iterates `p ← p - J(p)⁻¹ F(p)` until the step is
/// shorter than the tolerance.
pub fn newton_nd<F, J>(
    f: F,
    jacobian: J,
    p0: &[f64],
    settings: NewtonSettings,
) -> Result<RootResult<Vec<f64>>>
where
    F: Fn(&[f64], &mut [f64]),
    J: Fn(&[f64], &mut [f64]),
{
    settings.validate()?;
    let dim = p0.len();
    if dim == 0 {
        bail!("Initial guess has zero dimension.");
    }

    let mut state = p0.to_vec();
    let mut residual = vec![0.0; dim];
    let mut jac = vec![0.0; dim * dim];

    for k in 0..settings.max_steps {
        f(&state, &mut residual);
        jacobian(&state, &mut jac);

        let j_matrix = DMatrix::from_row_slice(dim, dim, &jac);
        let inverse = if is_singular_matrix(&j_matrix, settings.singular_tolerance) {
            None
        } else {
            j_matrix.try_inverse()
        };
        let Some(inverse) = inverse else {
            return Ok(finish_nd(
                &f,
                state,
                k,
                Some(RootFailure::ZeroOrSingularDerivative),
            ));
        };

        let delta = inverse * DVector::from_column_slice(&residual);
        for (x, d) in state.iter_mut().zip(delta.iter()) {
            *x -= d;
        }

        if delta.norm() < settings.tolerance {
            return Ok(finish_nd(&f, state, k + 1, None));
        }
    }

    Ok(finish_nd(
        &f,
        state,
        settings.max_steps,
        Some(RootFailure::MaxIterationsExceeded),
    ))
}

fn finish_nd<F>(
    f: &F,
    state: Vec<f64>,
    iterations: usize,
    failure: Option<RootFailure>,
) -> RootResult<Vec<f64>>
where
    F: Fn(&[f64], &mut [f64]),
{
    let mut residual = DVector::zeros(state.len());
    f(&state, residual.as_mut_slice());
    RootResult {
        residual_norm: residual.norm(),
        value: state,
        iterations,
        failure,
    }
}

/// `|det J| <= tol * Π‖J[:, j]‖`. The Hadamard bound makes the test
/// independent of the overall scale of `J`.
pub(crate) fn is_singular_matrix(matrix: &DMatrix<f64>, tol: f64) -> bool {
    let det = matrix.determinant();
    let scale: f64 = matrix.column_iter().map(|c| c.norm()).product();
    det.abs() <= tol * scale
}

/// Runs [`newton_1d`] from `samples` evenly spaced seeds in `[x_min, x_max]`
/// and returns the distinct converged roots, rounded to `decimals`, in the
/// order they were first found. Seeds that fail are dropped.
pub fn find_zeros<F, D>(
    f: F,
    df: D,
    x_min: f64,
    x_max: f64,
    samples: usize,
    decimals: u32,
    settings: NewtonSettings,
) -> Result<Vec<f64>>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    if samples == 0 {
        bail!("find_zeros needs at least one seed.");
    }
    let mut zeros = Vec::new();
    for x0 in linspace(x_min, x_max, samples) {
        let result = newton_1d(&f, &df, x0, settings)?;
        if let Some(&root) = result.root() {
            push_distinct_scalar(&mut zeros, round_to(root, decimals));
        }
    }
    Ok(zeros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn tight() -> NewtonSettings {
        NewtonSettings {
            tolerance: 1e-14,
            ..NewtonSettings::scalar()
        }
    }

    #[test]
    fn newton_1d_finds_both_roots_of_parabola() {
        let f = |x: f64| x * x - 4.0;
        let df = |x: f64| 2.0 * x;

        let right = newton_1d(f, df, 3.0, tight()).expect("valid settings");
        assert!(right.converged());
        assert_eq!(right.value, 2.0);

        let left = newton_1d(f, df, -1.5, tight()).expect("valid settings");
        assert!(left.converged());
        assert_eq!(left.value, -2.0);
    }

    #[test]
    fn newton_1d_handles_parameterized_and_transcendental_functions() {
        let r = 3.0;
        let result = newton_1d(|x| r * x - x * x, |x| r - 2.0 * x, 2.0, tight())
            .expect("valid settings");
        assert_abs_diff_eq!(result.value, 3.0, epsilon = 1e-12);

        let result = newton_1d(f64::sin, f64::cos, 0.5, tight()).expect("valid settings");
        assert!(result.converged());
        assert_abs_diff_eq!(result.value, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn newton_1d_returns_seed_when_already_converged() {
        let result = newton_1d(|x| x, |_| 1.0, 0.0, tight()).expect("valid settings");
        assert_eq!(result.iterations, 0);
        assert_eq!(result.value, 0.0);
    }

    #[test]
    fn newton_1d_reports_zero_derivative() {
        let result = newton_1d(|x| x * x - 4.0, |x| 2.0 * x, 0.0, tight()).expect("valid settings");
        assert!(!result.converged());
        assert_eq!(result.failure, Some(RootFailure::ZeroOrSingularDerivative));
        assert_eq!(result.root(), None);
    }

    #[test]
    fn exact_zero_check_when_singular_tolerance_is_zero() {
        let settings = NewtonSettings {
            singular_tolerance: 0.0,
            ..tight()
        };
        // A tiny but non-zero derivative is accepted with a zero tolerance...
        let result = newton_1d(|x| x - 1.0, |_| 1e-300, 0.0, NewtonSettings {
            max_steps: 1,
            ..settings
        })
        .expect("valid settings");
        assert_ne!(result.failure, Some(RootFailure::ZeroOrSingularDerivative));
        // ...and rejected by the default relative threshold.
        let result = newton_1d(|x| x - 1.0, |_| 1e-300, 0.0, tight()).expect("valid settings");
        assert_eq!(result.failure, Some(RootFailure::ZeroOrSingularDerivative));
    }

    #[test]
    fn newton_1d_reports_iteration_budget_exhaustion() {
        // x^2 + 1 has no real root.
        let settings = NewtonSettings {
            max_steps: 10,
            ..tight()
        };
        let result = newton_1d(|x| x * x + 1.0, |x| 2.0 * x, 0.3, settings).expect("valid settings");
        assert_eq!(result.failure, Some(RootFailure::MaxIterationsExceeded));
        assert_eq!(result.iterations, 10);
    }

    #[test]
    fn settings_are_validated() {
        let bad = NewtonSettings {
            max_steps: 0,
            ..NewtonSettings::default()
        };
        assert_err_contains(newton_1d(|x| x, |_| 1.0, 0.0, bad), "max_steps");
        let bad = NewtonSettings {
            tolerance: 0.0,
            ..NewtonSettings::default()
        };
        assert_err_contains(newton_1d(|x| x, |_| 1.0, 0.0, bad), "tolerance");
        let bad = NewtonSettings {
            tolerance: f64::NAN,
            ..NewtonSettings::default()
        };
        assert_err_contains(newton_1d(|x| x, |_| 1.0, 0.0, bad), "tolerance");
    }

    fn polynomial_system(p: &[f64], out: &mut [f64]) {
        let (x, y) = (p[0], p[1]);
        out[0] = 1.0 - 4.0 * x + 2.0 * x * x - 2.0 * y.powi(3);
        out[1] = -4.0 + x.powi(4) + 4.0 * y + 4.0 * y.powi(4);
    }

    fn polynomial_jacobian(p: &[f64], out: &mut [f64]) {
        let (x, y) = (p[0], p[1]);
        out[0] = -4.0 + 4.0 * x;
        out[1] = -6.0 * y * y;
        out[2] = 4.0 * x.powi(3);
        out[3] = 4.0 + 16.0 * y.powi(3);
    }

    #[test]
    fn newton_nd_solves_polynomial_system() {
        let result = newton_nd(
            polynomial_system,
            polynomial_jacobian,
            &[0.1, 0.7],
            NewtonSettings::default(),
        )
        .expect("valid input");
        assert!(result.converged());
        assert_abs_diff_eq!(result.value[0], 0.0618, epsilon = 1e-4);
        assert_abs_diff_eq!(result.value[1], 0.7245, epsilon = 1e-4);
        assert_abs_diff_eq!(result.value[0], 0.061770, epsilon = 1e-6);
        assert_abs_diff_eq!(result.value[1], 0.724491, epsilon = 1e-6);
        assert!(result.residual_norm < 1e-8);
    }

    #[test]
    fn newton_nd_solves_linear_system_in_one_step() {
        let result = newton_nd(
            |p, out| out.copy_from_slice(p),
            |_, out| out.copy_from_slice(&[1.0, 0.0, 0.0, 1.0]),
            &[0.5, -2.0],
            NewtonSettings::default(),
        )
        .expect("valid input");
        assert!(result.converged());
        assert_eq!(result.value, vec![0.0, 0.0]);
        assert_eq!(result.iterations, 2);
    }

    #[test]
    fn newton_nd_flags_singular_jacobian_for_any_seed() {
        for seed in [[0.0, 0.0], [1.0, -3.0], [1e6, 1e-6]] {
            let result = newton_nd(
                |_, out| out.copy_from_slice(&[1.0, 2.0]),
                |_, out| out.fill(0.0),
                &seed,
                NewtonSettings::default(),
            )
            .expect("valid input");
            assert!(!result.converged());
            assert_eq!(result.failure, Some(RootFailure::ZeroOrSingularDerivative));
            assert_eq!(result.value, seed.to_vec());
            assert_eq!(result.iterations, 0);
        }
    }

    #[test]
    fn newton_nd_flags_rank_deficient_jacobian() {
        let result = newton_nd(
            |p, out| {
                out[0] = p[0] + p[1] - 1.0;
                out[1] = 2.0 * p[0] + 2.0 * p[1] - 3.0;
            },
            |_, out| out.copy_from_slice(&[1.0, 1.0, 2.0, 2.0]),
            &[0.0, 0.0],
            NewtonSettings::default(),
        )
        .expect("valid input");
        assert_eq!(result.failure, Some(RootFailure::ZeroOrSingularDerivative));
    }

    #[test]
    fn newton_nd_reports_iteration_budget_exhaustion() {
        // x^2 + 1 = 0, y = 0 has no real solution.
        let result = newton_nd(
            |p, out| {
                out[0] = p[0] * p[0] + 1.0;
                out[1] = p[1];
            },
            |p, out| out.copy_from_slice(&[2.0 * p[0], 0.0, 0.0, 1.0]),
            &[0.3, 1.0],
            NewtonSettings::default(),
        )
        .expect("valid input");
        assert_eq!(result.failure, Some(RootFailure::MaxIterationsExceeded));
        assert_eq!(result.iterations, 20);
    }

    #[test]
    fn newton_nd_rejects_empty_seed() {
        assert_err_contains(
            newton_nd(|_, _| {}, |_, _| {}, &[], NewtonSettings::default()),
            "zero dimension",
        );
    }

    #[test]
    fn find_zeros_returns_distinct_roots_in_seed_order() {
        let r = 2.0;
        let zeros = find_zeros(
            |x| x * x - r,
            |x| 2.0 * x,
            -5.0,
            5.0,
            100,
            4,
            tight(),
        )
        .expect("valid input");
        assert_eq!(zeros, vec![-1.4142, 1.4142]);
    }

    #[test]
    fn find_zeros_drops_failed_seeds() {
        // Seed 0 hits the zero derivative; the others converge.
        let zeros = find_zeros(|x| x * x - 1.0, |x| 2.0 * x, -2.0, 2.0, 5, 6, tight())
            .expect("valid input");
        assert_eq!(zeros, vec![-1.0, 1.0]);

        let none = find_zeros(|x| x * x + 1.0, |x| 2.0 * x, -2.0, 2.0, 7, 6, tight())
            .expect("valid input");
        assert!(none.is_empty());
    }

    #[test]
    fn find_zeros_is_deterministic_and_monotone_in_precision() {
        // Roots at 0, 0.001 and 1.
        let f = |x: f64| x * (x - 0.001) * (x - 1.0);
        let df = |x: f64| 3.0 * x * x - 2.002 * x + 0.001;
        let settings = tight();
        let fine = find_zeros(f, df, -1.0, 2.0, 301, 6, settings).expect("valid input");
        let again = find_zeros(f, df, -1.0, 2.0, 301, 6, settings).expect("valid input");
        assert_eq!(fine, again);
        assert_eq!(fine.len(), 3);

        let mut previous = fine.len();
        for decimals in (0..6).rev() {
            let coarse = find_zeros(f, df, -1.0, 2.0, 301, decimals, settings).expect("valid input");
            assert!(coarse.len() <= previous);
            previous = coarse.len();
        }
        let merged = find_zeros(f, df, -1.0, 2.0, 301, 2, settings).expect("valid input");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn find_zeros_rejects_zero_seeds() {
        assert_err_contains(
            find_zeros(|x| x, |_| 1.0, 0.0, 1.0, 0, 4, tight()),
            "at least one seed",
        );
    }
}
