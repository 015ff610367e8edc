#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::NUMERIC_MAX_ITERS;

/// Settings for the Newton-Raphson solution of Kepler's equation.
///
/// # Example
/// ```
/// use kepler_transfer::KeplerSolverConfig;
///
/// let config = KeplerSolverConfig {
///     tolerance: 1e-10,
///     ..Default::default()
/// };
/// assert_eq!(config.max_iterations, 1000);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerSolverConfig {
    /// The iteration stops once a Newton step is smaller than this
    /// (scaled by the magnitude of the anomaly for hyperbolic orbits).
    pub tolerance: f64,

    /// Hard cap on the number of Newton steps.
    ///
    /// Exceeding it yields [`OrbitError::ConvergenceFailure`][crate::OrbitError::ConvergenceFailure].
    pub max_iterations: u32,
}

impl Default for KeplerSolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: NUMERIC_MAX_ITERS,
        }
    }
}

/// Tuning constants of the transfer-orbit search.
///
/// The precision and semi-major axis limit are part of each
/// [`TransferRequest`][crate::TransferRequest]; the values here only shape
/// how the search walks along the hyperbola.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferSolverConfig {
    /// Fail-safe cap on the number of candidate ellipses evaluated.
    pub max_iterations: u32,

    /// Initial step along the hyperbolic parameter of the focus locus.
    pub initial_step: f64,

    /// Factor applied to the step once the duration error has changed sign
    /// `flips_per_damping` times.
    pub step_damping: f64,

    /// Sign changes of the duration error between two dampings of the step.
    pub flips_per_damping: u32,

    /// The search stops on a plateau when successive durations differ by
    /// less than `precision * plateau_ratio`.
    pub plateau_ratio: f64,
}

impl Default for TransferSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: NUMERIC_MAX_ITERS,
            initial_step: 0.5,
            step_damping: 0.5,
            flips_per_damping: 2,
            plateau_ratio: 1.0,
        }
    }
}
