use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in the integrators.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + Send + Sync + 'static {}

impl<T: Float + FromPrimitive + Debug + Send + Sync + 'static> Scalar for T {}

/// A continuous-time vector field `dy/dt = f(t, y)`.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// t: current time
    /// x: current state
    /// out: buffer to write dx/dt into
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A trait for fixed-step solvers that advance a system by one step.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt (negative dt integrates backward).
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}

/// An autonomous model whose vector field depends on one scanned parameter.
///
/// The parameter is always passed explicitly, so a model is a pure function
/// of `(parameter, state)` and can be evaluated from several sweep workers
/// at once.
pub trait ParameterizedModel: Sync {
    /// Dimension of the state space.
    fn dimension(&self) -> usize;

    /// Writes the vector field `f(x; p)` into `out`.
    fn vector_field(&self, param: f64, state: &[f64], out: &mut [f64]);

    /// Writes the Jacobian `df/dx` at `x` into `out`, row-major (`dim * dim`).
    fn jacobian(&self, param: f64, state: &[f64], out: &mut [f64]);

    /// Binds the scan parameter, yielding a system the integrators can step.
    fn at(&self, param: f64) -> BoundModel<'_, Self>
    where
        Self: Sized,
    {
        BoundModel { model: self, param }
    }
}

/// A [`ParameterizedModel`] with its parameter fixed to one value.
pub struct BoundModel<'a, M: ?Sized> {
    model: &'a M,
    param: f64,
}

impl<M: ParameterizedModel + ?Sized> DynamicalSystem<f64> for BoundModel<'_, M> {
    fn dimension(&self) -> usize {
        self.model.dimension()
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        self.model.vector_field(self.param, x, out);
    }
}
