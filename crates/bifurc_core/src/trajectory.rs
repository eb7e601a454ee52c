//! Fixed-step trajectories of scalar ODEs and coupled systems.
//!
//! `integrate` drives an [`RK4`] stepper for a fixed number of steps and
//! records every intermediate state. A negative `dt` integrates backward in
//! time. Non-finite values produced by the vector field are recorded as-is;
//! use [`Trajectory::is_finite`] to check a result before consuming it.

use crate::solvers::RK4;
use crate::traits::{DynamicalSystem, Scalar, Steppable};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Sampled solution of an ODE: `n_steps + 1` times and states, starting at
/// the initial condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory<T = f64> {
    pub dimension: usize,
    pub times: Vec<T>,
    /// Row-major: state `i` occupies `states[i * dimension..(i + 1) * dimension]`.
    pub states: Vec<T>,
}

impl<T: Scalar> Trajectory<T> {
    /// Number of recorded samples (always `n_steps + 1`).
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn state(&self, index: usize) -> &[T] {
        &self.states[index * self.dimension..(index + 1) * self.dimension]
    }

    pub fn final_state(&self) -> &[T] {
        self.state(self.len() - 1)
    }

    pub fn final_time(&self) -> T {
        self.times[self.len() - 1]
    }

    /// Values of one state component over time.
    pub fn component(&self, index: usize) -> Vec<T> {
        self.states
            .iter()
            .skip(index)
            .step_by(self.dimension)
            .copied()
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.times.iter().chain(self.states.iter()).all(|v| v.is_finite())
    }
}

/// Integrates `system` from `(t0, y0)` for `n_steps` steps of size `dt`.
pub fn integrate<T, S>(system: &S, dt: T, y0: &[T], t0: T, n_steps: usize) -> Result<Trajectory<T>>
where
    T: Scalar,
    S: DynamicalSystem<T>,
{
    let dim = system.dimension();
    if dim == 0 {
        bail!("System has zero dimension.");
    }
    if y0.len() != dim {
        bail!(
            "Initial state dimension mismatch. Expected {}, got {}.",
            dim,
            y0.len()
        );
    }
    Ok(run_rk4(system, dt, y0, t0, n_steps))
}

/// Integrates the scalar ODE `dy/dt = f(t, y)`.
pub fn integrate_scalar<T, F>(f: F, dt: T, y0: T, t0: T, n_steps: usize) -> Trajectory<T>
where
    T: Scalar,
    F: Fn(T, T) -> T,
{
    run_rk4(&ScalarSystem(f), dt, &[y0], t0, n_steps)
}

fn run_rk4<T, S>(system: &S, dt: T, y0: &[T], t0: T, n_steps: usize) -> Trajectory<T>
where
    T: Scalar,
    S: DynamicalSystem<T>,
{
    let dim = y0.len();
    let mut times = Vec::with_capacity(n_steps + 1);
    let mut states = Vec::with_capacity((n_steps + 1) * dim);
    let mut stepper = RK4::new(dim);
    let mut state = y0.to_vec();
    let mut t = t0;

    times.push(t);
    states.extend_from_slice(&state);
    for _ in 0..n_steps {
        stepper.step(system, &mut t, &mut state, dt);
        times.push(t);
        states.extend_from_slice(&state);
    }

    Trajectory {
        dimension: dim,
        times,
        states,
    }
}

struct ScalarSystem<F>(F);

impl<T: Scalar, F: Fn(T, T) -> T> DynamicalSystem<T> for ScalarSystem<F> {
    fn dimension(&self) -> usize {
        1
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        out[0] = (self.0)(t, x[0]);
    }
}

type ComponentFn<T> = Box<dyn Fn(T, &[T]) -> T + Send + Sync>;

/// A coupled system given as one derivative function per component,
/// `dy_i/dt = f_i(t, y_1, ..., y_n)`.
pub struct ComponentSystem<T: Scalar> {
    components: Vec<ComponentFn<T>>,
}

impl<T: Scalar> ComponentSystem<T> {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn with<F>(mut self, f: F) -> Self
    where
        F: Fn(T, &[T]) -> T + Send + Sync + 'static,
    {
        self.components.push(Box::new(f));
        self
    }
}

impl<T: Scalar> Default for ComponentSystem<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> DynamicalSystem<T> for ComponentSystem<T> {
    fn dimension(&self) -> usize {
        self.components.len()
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        for (slot, f) in out.iter_mut().zip(&self.components) {
            *slot = f(t, x);
        }
    }
}
