//! Conversions between the true, eccentric and mean anomaly, and the
//! root finders for Kepler's equation.
//!
//! Every function branches on the conic regime ([`OrbitKind`]).
//! For parabolic trajectories the "eccentric anomaly" is the parabolic
//! anomaly `D = tan(ν / 2)` and the mean anomaly follows Barker's equation
//! `M = D + D³ / 3`.

use core::f64::consts::{PI, TAU};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    keplers_equation, keplers_equation_derivative, sinhcosh, KeplerSolverConfig, OrbitError, B,
};

/// The conic regime of an orbit, selected by its eccentricity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrbitKind {
    /// `e < 1`: closed orbit with a finite period.
    Elliptic,
    /// `e == 1`: boundary case, infinite period.
    Parabolic,
    /// `e > 1`: open trajectory, infinite period.
    Hyperbolic,
}

impl OrbitKind {
    /// Classifies an eccentricity.
    ///
    /// The comparison is exact: only `e == 1.0` is parabolic.
    /// NaN is classified as parabolic; such orbits fail
    /// [`is_valid_orbit`][crate::KeplerOrbit::is_valid_orbit] anyway.
    ///
    /// # Example
    /// ```
    /// use kepler_transfer::OrbitKind;
    ///
    /// assert_eq!(OrbitKind::from_eccentricity(0.5), OrbitKind::Elliptic);
    /// assert_eq!(OrbitKind::from_eccentricity(1.0), OrbitKind::Parabolic);
    /// assert_eq!(OrbitKind::from_eccentricity(1.5), OrbitKind::Hyperbolic);
    /// ```
    pub fn from_eccentricity(eccentricity: f64) -> Self {
        if eccentricity < 1.0 {
            Self::Elliptic
        } else if eccentricity > 1.0 {
            Self::Hyperbolic
        } else {
            Self::Parabolic
        }
    }
}

/// Wraps an angle into `(-π, π]`.
#[inline]
pub(crate) fn wrap_signed(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// The largest true anomaly reachable on the trajectory.
///
/// For hyperbolic and parabolic trajectories this is the asymptote
/// angle `acos(-1/e)`; elliptic orbits reach every angle, so `π` is returned.
pub fn true_anomaly_asymptote(eccentricity: f64) -> f64 {
    if eccentricity < 1.0 {
        PI
    } else {
        (-eccentricity.recip()).acos()
    }
}

/// Converts a true anomaly into an eccentric anomaly.
///
/// Elliptic results are wrapped into `[0, 2π)`. Hyperbolic and parabolic
/// inputs are first wrapped into `(-π, π]`; true anomalies past the
/// asymptote produce NaN for hyperbolic orbits.
pub fn true_to_eccentric_anomaly(true_anomaly: f64, eccentricity: f64) -> f64 {
    match OrbitKind::from_eccentricity(eccentricity) {
        OrbitKind::Elliptic => {
            // tan(E/2) = sqrt((1 - e)/(1 + e)) tan(ν/2), written with atan2
            // so the quadrant survives
            let (sin_v, cos_v) = true_anomaly.sin_cos();
            let root = (1.0 - eccentricity * eccentricity).sqrt();
            (root * sin_v).atan2(eccentricity + cos_v).rem_euclid(TAU)
        }
        OrbitKind::Hyperbolic => {
            let half = wrap_signed(true_anomaly) * 0.5;
            2.0 * (((eccentricity - 1.0) / (eccentricity + 1.0)).sqrt() * half.tan()).atanh()
        }
        OrbitKind::Parabolic => (wrap_signed(true_anomaly) * 0.5).tan(),
    }
}

/// Converts an eccentric anomaly into a true anomaly.
///
/// Elliptic results are wrapped into `[0, 2π)`; the `atan2` form stays
/// accurate near `E = π`. Hyperbolic and parabolic results lie in `(-π, π)`.
pub fn eccentric_to_true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    match OrbitKind::from_eccentricity(eccentricity) {
        OrbitKind::Elliptic => {
            let (sin_e, cos_e) = eccentric_anomaly.sin_cos();
            let root = (1.0 - eccentricity * eccentricity).sqrt();
            (root * sin_e).atan2(cos_e - eccentricity).rem_euclid(TAU)
        }
        OrbitKind::Hyperbolic => {
            2.0 * (((eccentricity + 1.0) / (eccentricity - 1.0)).sqrt()
                * (eccentric_anomaly * 0.5).tanh())
            .atan()
        }
        OrbitKind::Parabolic => 2.0 * eccentric_anomaly.atan(),
    }
}

/// Converts an eccentric anomaly into a mean anomaly.
///
/// - Elliptic: `M = E - e sin E`
/// - Hyperbolic: `M = e sinh H - H`
/// - Parabolic: `M = D + D³ / 3`
pub fn eccentric_to_mean_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    match OrbitKind::from_eccentricity(eccentricity) {
        OrbitKind::Elliptic => eccentric_anomaly - eccentricity * eccentric_anomaly.sin(),
        OrbitKind::Hyperbolic => eccentricity * eccentric_anomaly.sinh() - eccentric_anomaly,
        OrbitKind::Parabolic => {
            eccentric_anomaly + eccentric_anomaly * eccentric_anomaly * eccentric_anomaly / 3.0
        }
    }
}

/// Converts a mean anomaly into an eccentric anomaly by solving Kepler's
/// equation for the orbit's regime.
///
/// # Errors
/// [`OrbitError::ConvergenceFailure`] if the Newton iteration does not
/// converge within `config.max_iterations`.
pub fn mean_to_eccentric_anomaly(
    mean_anomaly: f64,
    eccentricity: f64,
    config: &KeplerSolverConfig,
) -> Result<f64, OrbitError> {
    match OrbitKind::from_eccentricity(eccentricity) {
        OrbitKind::Elliptic => solve_elliptic_kepler(eccentricity, mean_anomaly, config),
        OrbitKind::Hyperbolic => solve_hyperbolic_kepler(eccentricity, mean_anomaly, config),
        OrbitKind::Parabolic => Ok(solve_barker(mean_anomaly)),
    }
}

/// Converts a true anomaly into a mean anomaly.
pub fn true_to_mean_anomaly(true_anomaly: f64, eccentricity: f64) -> f64 {
    eccentric_to_mean_anomaly(
        true_to_eccentric_anomaly(true_anomaly, eccentricity),
        eccentricity,
    )
}

/// Converts a mean anomaly into a true anomaly.
///
/// # Errors
/// See [`mean_to_eccentric_anomaly`].
pub fn mean_to_true_anomaly(
    mean_anomaly: f64,
    eccentricity: f64,
    config: &KeplerSolverConfig,
) -> Result<f64, OrbitError> {
    mean_to_eccentric_anomaly(mean_anomaly, eccentricity, config)
        .map(|ecc| eccentric_to_true_anomaly(ecc, eccentricity))
}

/// Solves the elliptic Kepler equation `M = E - e sin E` for `E`.
///
/// The result lies in `[0, 2π)`.
///
/// # Unchecked Operation
/// This function does not check whether the eccentricity is below 1.
///
/// # Source
/// The starting guess is the "rational seed" (equation 19) from
/// "Two fast and accurate routines for solving the elliptic Kepler
/// equation for all values of the eccentricity and mean anomaly"
/// by Daniele Tommasini and David N. Olivieri, applied after reducing
/// the mean anomaly into `[0, π]` by symmetry. Newton-Raphson refines it.
pub(crate) fn solve_elliptic_kepler(
    eccentricity: f64,
    mean_anomaly: f64,
    config: &KeplerSolverConfig,
) -> Result<f64, OrbitError> {
    let mut mean_anomaly = mean_anomaly.rem_euclid(TAU);

    // M(2π - E) = 2π - M(E)
    let reflected = mean_anomaly > PI;
    if reflected {
        mean_anomaly = TAU - mean_anomaly;
    }

    // E_0 = M + (4beM(pi - M)) / (8eM + 4e(e-pi) + pi^2)
    let mut eccentric_anomaly = mean_anomaly
        + (4.0 * eccentricity * B * mean_anomaly * (PI - mean_anomaly))
            / (8.0 * eccentricity * mean_anomaly
                + 4.0 * eccentricity * (eccentricity - PI)
                + (PI * PI));

    let mut step = f64::INFINITY;
    for _ in 0..config.max_iterations {
        let f = keplers_equation(mean_anomaly, eccentric_anomaly, eccentricity);
        let fp = keplers_equation_derivative(eccentric_anomaly, eccentricity);

        step = f / fp;
        if !step.is_finite() {
            break;
        }

        eccentric_anomaly -= step;

        if step.abs() < config.tolerance {
            return Ok(if reflected {
                TAU - eccentric_anomaly
            } else {
                eccentric_anomaly
            });
        }
    }

    log::warn!(
        "elliptic kepler solver gave up (e = {eccentricity}, M = {mean_anomaly}, last step {step:e})"
    );
    Err(OrbitError::ConvergenceFailure {
        iterations: config.max_iterations,
        residual: step,
    })
}

/// Solves the hyperbolic Kepler equation `M = e sinh H - H` for `H`.
///
/// # Unchecked Operation
/// This function does not check whether the eccentricity is above 1.
///
/// The equation is odd in `H`, so it is solved for `|M|` and the sign
/// restored afterwards. The starting guess `ln(2|M|/e + 1.8)` stays on
/// the convex side of the root for small mean anomalies, which keeps
/// Newton's method from overshooting.
pub(crate) fn solve_hyperbolic_kepler(
    eccentricity: f64,
    mean_anomaly: f64,
    config: &KeplerSolverConfig,
) -> Result<f64, OrbitError> {
    let sign = if mean_anomaly < 0.0 { -1.0 } else { 1.0 };
    let mean_anomaly = mean_anomaly.abs();

    let mut ecc_anom = (2.0 * mean_anomaly / eccentricity + 1.8).ln();

    let mut step = f64::INFINITY;
    for _ in 0..config.max_iterations {
        let (sinh_eca, cosh_eca) = sinhcosh(ecc_anom);

        let h = eccentricity * sinh_eca - ecc_anom - mean_anomaly;
        let hp = eccentricity * cosh_eca - 1.0;

        step = h / hp;
        if !step.is_finite() {
            break;
        }

        ecc_anom -= step;

        if step.abs() < config.tolerance * ecc_anom.abs().max(1.0) {
            return Ok(sign * ecc_anom);
        }
    }

    log::warn!(
        "hyperbolic kepler solver gave up (e = {eccentricity}, M = {mean_anomaly}, last step {step:e})"
    );
    Err(OrbitError::ConvergenceFailure {
        iterations: config.max_iterations,
        residual: step,
    })
}

/// Solves Barker's equation `M = D + D³ / 3` for the parabolic anomaly `D`.
///
/// The depressed cubic `D³ + 3D - 3M = 0` has the single real root
/// `D = y - 1/y` with `y = cbrt(3M/2 + sqrt(9M²/4 + 1))`. The odd
/// symmetry is used to avoid cancellation for negative mean anomalies.
pub(crate) fn solve_barker(mean_anomaly: f64) -> f64 {
    let sign = if mean_anomaly < 0.0 { -1.0 } else { 1.0 };
    let half_m = 1.5 * mean_anomaly.abs();
    let y = (half_m + (half_m * half_m + 1.0).sqrt()).cbrt();
    sign * (y - y.recip())
}
