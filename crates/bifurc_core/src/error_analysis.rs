//! Global truncation error of the RK4 integrator against a closed-form
//! solution, and a least-squares fit of that error against a power of `dt`.

use crate::traits::DynamicalSystem;
use crate::trajectory::integrate;
use anyhow::{bail, Result};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorSample {
    pub dt: f64,
    pub steps: usize,
    /// Time actually reached, `t0 + steps * dt` up to rounding.
    pub final_time: f64,
    /// Euclidean distance from the exact state at `final_time`.
    pub error: f64,
}

/// Integrates `system` over `horizon` with each step size and measures the
/// final-state error. The step count is `round(horizon / dt)`.
pub fn global_errors<S, E>(
    system: &S,
    exact: E,
    y0: &[f64],
    t0: f64,
    horizon: f64,
    step_sizes: &[f64],
) -> Result<Vec<ErrorSample>>
where
    S: DynamicalSystem<f64>,
    E: Fn(f64) -> Vec<f64>,
{
    if !horizon.is_finite() || horizon <= 0.0 {
        bail!("Horizon must be positive and finite, got {}.", horizon);
    }
    let mut samples = Vec::with_capacity(step_sizes.len());
    for &dt in step_sizes {
        if !dt.is_finite() || dt <= 0.0 {
            bail!("Step sizes must be positive and finite, got {}.", dt);
        }
        let steps = (horizon / dt).round() as usize;
        if steps == 0 {
            bail!("Step size {} exceeds the horizon {}.", dt, horizon);
        }
        let trajectory = integrate(system, dt, y0, t0, steps)?;
        let final_time = trajectory.final_time();
        let expected = exact(final_time);
        if expected.len() != y0.len() {
            bail!(
                "Exact solution has dimension {}, expected {}.",
                expected.len(),
                y0.len()
            );
        }
        let diff =
            DVector::from_column_slice(trajectory.final_state()) - DVector::from_vec(expected);
        samples.push(ErrorSample {
            dt,
            steps,
            final_time,
            error: diff.norm(),
        });
    }
    Ok(samples)
}

/// `error ~ slope * dt^order + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerFit {
    pub order: i32,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl PowerFit {
    pub fn predict(&self, dt: f64) -> f64 {
        self.slope * dt.powi(self.order) + self.intercept
    }
}

/// Ordinary least squares of the sample errors against `dt^order`.
pub fn fit_power(samples: &[ErrorSample], order: i32) -> Result<PowerFit> {
    if samples.len() < 2 {
        bail!("Need at least two samples to fit, got {}.", samples.len());
    }
    let xs: Vec<f64> = samples.iter().map(|s| s.dt.powi(order)).collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.error).collect();
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        bail!("Step sizes must not all be equal.");
    }
    let sxy: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let r_squared = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };

    Ok(PowerFit {
        order,
        slope,
        intercept,
        r_squared,
    })
}
