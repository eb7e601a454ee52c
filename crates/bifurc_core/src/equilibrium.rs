use crate::newton::{newton_1d, newton_nd, NewtonSettings, RootResult};
use crate::traits::ParameterizedModel;
use anyhow::{bail, Result};
use nalgebra::DMatrix;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Unstable,
}

impl Stability {
    pub fn is_stable(self) -> bool {
        self == Stability::Stable
    }
}

/// A classified equilibrium at one value of the scan parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    pub parameter: f64,
    pub state: Vec<f64>,
    pub stability: Stability,
    /// Eigenvalues of the Jacobian at `state` (the derivative itself in 1-D).
    #[serde(default)]
    pub eigenvalues: Vec<Complex<f64>>,
}

/// 1-D rule: stable iff `f'(x*) <= 0`.
pub fn classify_scalar(derivative: f64) -> Stability {
    if derivative <= 0.0 {
        Stability::Stable
    } else {
        Stability::Unstable
    }
}

/// N-D rule: unstable iff any eigenvalue has a non-negative (or undefined)
/// real part. The result does not depend on eigenvalue order.
pub fn classify_eigenvalues(eigenvalues: &[Complex<f64>]) -> Stability {
    if eigenvalues.iter().any(|lambda| !(lambda.re < 0.0)) {
        Stability::Unstable
    } else {
        Stability::Stable
    }
}

/// Eigenvalues of a row-major `dim x dim` matrix. A matrix with non-finite
/// entries yields NaN eigenvalues instead of an iterating decomposition.
pub fn compute_eigenvalues(dim: usize, jacobian: &[f64]) -> Result<Vec<Complex<f64>>> {
    if jacobian.len() != dim * dim {
        bail!(
            "Jacobian has {} entries, expected {}.",
            jacobian.len(),
            dim * dim
        );
    }
    if jacobian.iter().any(|v| !v.is_finite()) {
        return Ok(vec![Complex::new(f64::NAN, f64::NAN); dim]);
    }
    let matrix = DMatrix::from_row_slice(dim, dim, jacobian);
    Ok(matrix.complex_eigenvalues().iter().copied().collect())
}

/// Newton solve for an equilibrium of `model` at `param`, starting at `seed`.
/// One-dimensional models use the scalar iteration.
pub fn solve_equilibrium<M: ParameterizedModel>(
    model: &M,
    param: f64,
    seed: &[f64],
    settings: NewtonSettings,
) -> Result<RootResult<Vec<f64>>> {
    let dim = model.dimension();
    if dim == 0 {
        bail!("System has zero dimension.");
    }
    if seed.len() != dim {
        bail!(
            "Initial guess dimension mismatch. Expected {}, got {}.",
            dim,
            seed.len()
        );
    }

    if dim == 1 {
        let f = |x: f64| {
            let mut out = [0.0];
            model.vector_field(param, &[x], &mut out);
            out[0]
        };
        let df = |x: f64| {
            let mut out = [0.0];
            model.jacobian(param, &[x], &mut out);
            out[0]
        };
        let result = newton_1d(f, df, seed[0], settings)?;
        return Ok(RootResult {
            value: vec![result.value],
            iterations: result.iterations,
            residual_norm: result.residual_norm,
            failure: result.failure,
        });
    }

    newton_nd(
        |x, out| model.vector_field(param, x, out),
        |x, out| model.jacobian(param, x, out),
        seed,
        settings,
    )
}

/// Classifies `state` as an equilibrium of `model` at `param`.
pub fn classify_equilibrium<M: ParameterizedModel>(
    model: &M,
    param: f64,
    state: Vec<f64>,
) -> Result<Equilibrium> {
    let dim = model.dimension();
    if state.len() != dim {
        bail!(
            "State dimension mismatch. Expected {}, got {}.",
            dim,
            state.len()
        );
    }
    let mut jacobian = vec![0.0; dim * dim];
    model.jacobian(param, &state, &mut jacobian);

    let (stability, eigenvalues) = if dim == 1 {
        (
            classify_scalar(jacobian[0]),
            vec![Complex::new(jacobian[0], 0.0)],
        )
    } else {
        let eigenvalues = compute_eigenvalues(dim, &jacobian)?;
        (classify_eigenvalues(&eigenvalues), eigenvalues)
    };

    Ok(Equilibrium {
        parameter: param,
        state,
        stability,
        eigenvalues,
    })
}
