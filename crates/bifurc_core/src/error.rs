//! Failure kinds that are folded into results instead of aborting a sweep.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a Newton solve did not converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RootFailure {
    /// The derivative (1-D) or Jacobian determinant (N-D) vanished within
    /// the configured singular tolerance.
    #[error("derivative or Jacobian is singular")]
    ZeroOrSingularDerivative,
    #[error("maximum number of iterations reached")]
    MaxIterationsExceeded,
}

/// Why a limit-cycle estimate could not be produced from a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OscillationError {
    #[error("no oscillation detected ({peaks} peak(s) above threshold, need at least 2)")]
    NoOscillationDetected { peaks: usize },
    #[error("signal contains non-finite values")]
    NumericOverflow,
}
