pub mod dedup;
pub mod equilibrium;
pub mod error;
pub mod error_analysis;
pub mod grid;
pub mod models;
pub mod newton;
pub mod peaks;
pub mod solvers;
pub mod sweep;
/// The `bifurc_core` crate is the numerical engine behind the `bifurc` CLI.
/// It locates equilibria of low-dimensional ODE models as a parameter is
/// scanned, classifies their stability, and characterizes the limit cycle
/// that appears once the stable branch is lost.
///
/// Key components:
/// - **Traits**: `Scalar`, `DynamicalSystem`, `Steppable`, and `ParameterizedModel` (vector field plus Jacobian with an explicit scan parameter).
/// - **Newton**: scalar and vector Newton iterations with multi-seed root collection.
/// - **Solvers**: the fixed-step RK4 integrator and the trajectory drivers built on it.
/// - **Sweep**: the bifurcation pipeline, fanned out over parameter values with rayon.
pub mod traits;
pub mod trajectory;
