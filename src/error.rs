use thiserror::Error;

use crate::TransferStatus;

/// An error raised by orbit construction, propagation, or the
/// interception solver.
///
/// Numerical degeneracies that occur during ordinary orbit evolution
/// (exactly circular or exactly radial orbits, zero focal parameter)
/// are not errors; they resolve to fallback formulas or zero vectors.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum OrbitError {
    /// The orbit fails [`is_valid_orbit`][crate::KeplerOrbit::is_valid_orbit].
    #[error(
        "orbit is not valid (eccentricity {eccentricity}, period {period}, attractor mass {attractor_mass})"
    )]
    InvalidOrbit {
        /// Eccentricity of the rejected orbit.
        eccentricity: f64,
        /// Period of the rejected orbit.
        period: f64,
        /// Attractor mass of the rejected orbit.
        attractor_mass: f64,
    },

    /// A conic section could not be built from the given points.
    #[error("degenerate conic: {0}")]
    DegenerateConic(#[from] DegenerateConic),

    /// The axis vectors given to an orbit constructor do not span a plane.
    #[error("orbit axis vectors do not span a plane")]
    DegenerateBasis,

    /// Kepler's equation did not converge within the iteration cap.
    #[error("kepler equation did not converge after {iterations} iterations (residual {residual:e})")]
    ConvergenceFailure {
        /// Number of iterations performed.
        iterations: u32,
        /// Last Newton step size.
        residual: f64,
    },

    /// The transfer search produced no usable trajectory.
    #[error("no usable transfer trajectory (search ended with {status:?})")]
    NoTrajectory {
        /// How the search ended.
        status: TransferStatus,
    },
}

/// The reason a conic section could not be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DegenerateConic {
    /// Both foci are at the same position, so the main axis is undefined.
    #[error("the foci coincide")]
    CoincidentFoci,
    /// The point on the curve coincides with one of the foci.
    #[error("the point on the curve lies on a focus")]
    PointOnFocus,
    /// The point on the curve lies on the line through both foci,
    /// so the plane of the conic is undefined.
    #[error("the point on the curve is collinear with the foci")]
    CollinearPoints,
}
