//! # Kepler orbits and elliptic transfers
//! This library crate contains a double-precision Keplerian orbit model and
//! a geometric solver for transfer orbits between two points around a
//! common attractor.
//!
//! An orbit is described both by its Cartesian state (position and velocity
//! relative to the attractor) and by its classical elements (eccentricity,
//! axes, anomalies). Either description can be derived from the other, and
//! the orbit can be advanced analytically in time for elliptic, parabolic
//! and hyperbolic trajectories alike.
//!
//! ## Getting started
//! This crate provides these main items:
//! - [`KeplerOrbit`]: The mutable orbit state, convertible between state
//!   vectors and orbital elements.
//! - [`EllipseData`] and [`HyperbolaData`]: Conic sections built from two foci
//!   and a point on the curve.
//! - [`TransferSolver`]: Searches for an elliptic transfer arc connecting two
//!   points in a requested time.
//! - [`InterceptionSolver`]: Wraps the transfer solver for two orbiting
//!   bodies and reports the velocity changes required.
//! - [`Universe`]: A registry of bodies and their attractors.
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//!
//! use kepler_transfer::KeplerOrbit;
//!
//! # fn main() {
//! // A circular orbit of radius 10 around an attractor with mg = 100
//! let mut orbit = KeplerOrbit::from_state_vectors(
//!     DVec3::new(10.0, 0.0, 0.0),
//!     DVec3::new(0.0, 10.0_f64.sqrt(), 0.0),
//!     100.0,
//!     1.0,
//! );
//! assert!(orbit.get_eccentricity() < 1e-9);
//!
//! let period = orbit.get_period();
//! orbit.update_orbit_data_by_time(period * 0.5).unwrap();
//! assert!((orbit.get_position() - DVec3::new(-10.0, 0.0, 0.0)).length() < 1e-9);
//! # }
//! ```

#![warn(missing_docs)]

pub mod anomaly;
mod body;
mod config;
mod conic;
mod error;
mod interception;
mod math;
mod orbit;
mod transfer;
mod universe;

use glam::DVec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use anomaly::OrbitKind;
pub use body::Body;
pub use config::{KeplerSolverConfig, TransferSolverConfig};
pub use conic::{EllipseData, HyperbolaBranch, HyperbolaData};
pub use error::{DegenerateConic, OrbitError};
pub use interception::{Attractor, InterceptionSolver, TransitionOrbitData};
pub use math::{DMat4Ext, DVec3Ext, VECTOR_EQ_EPSILON};
pub use orbit::KeplerOrbit;
pub use transfer::{TrajectoryData, TransferRequest, TransferSolver, TransferStatus};
pub use universe::{BodyAddError, BodyRelation, SpawnEvent, SpawnNotifier, SubscriptionId, Universe};

/// The reference direction of zero longitude in the ecliptic plane.
pub const ECLIPTIC_RIGHT: DVec3 = DVec3::X;

/// The in-plane direction perpendicular to [`ECLIPTIC_RIGHT`].
pub const ECLIPTIC_UP: DVec3 = DVec3::Y;

/// The normal of the ecliptic (reference) plane.
///
/// Inclinations and ascending nodes are measured against this plane.
pub const ECLIPTIC_NORMAL: DVec3 = DVec3::Z;

/// A constant used to get the initial seed for the eccentric anomaly.
///
/// It's very arbitrary, but according to some testing, a value just
/// below 1 works better than exactly 1.
///
/// Source:
/// "Two fast and accurate routines for solving the elliptic Kepler
/// equation for all values of the eccentricity and mean anomaly"
/// by Daniele Tommasini and David N. Olivieri,
/// section 2.1.2, 'The "rational seed"'
///
/// <https://doi.org/10.1051/0004-6361/202141423>
const B: f64 = 0.999999;

/// The maximum number of iterations for the numerical approach algorithms.
///
/// This is used to prevent infinite loops in case the method fails to converge.
const NUMERIC_MAX_ITERS: u32 = 1000;

/// A struct representing a position and velocity at a point in the orbit.
///
/// Both vectors are relative to the attractor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateVectors {
    /// The 3D position at a point in the orbit.
    pub position: DVec3,
    /// The 3D velocity at a point in the orbit.
    pub velocity: DVec3,
}

impl StateVectors {
    /// Create a new [`KeplerOrbit`] from the state vectors, the attractor
    /// mass and the gravitational constant.
    ///
    /// # Constraints
    /// The position must not be at the origin. If the velocity is parallel
    /// to the position (a radial trajectory), the resulting orbit has no
    /// defined eccentricity vector and fails
    /// [`is_valid_orbit`][KeplerOrbit::is_valid_orbit].
    #[must_use]
    pub fn to_orbit(self, attractor_mass: f64, gravitational_constant: f64) -> KeplerOrbit {
        KeplerOrbit::from_state_vectors(
            self.position,
            self.velocity,
            attractor_mass,
            gravitational_constant,
        )
    }
}


#[inline]
fn keplers_equation(mean_anomaly: f64, eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    eccentric_anomaly - (eccentricity * eccentric_anomaly.sin()) - mean_anomaly
}
#[inline]
fn keplers_equation_derivative(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    1.0 - (eccentricity * eccentric_anomaly.cos())
}

/// Get the hyperbolic sine and cosine of a number.
///
/// Usually faster than calling `x.sinh()` and `x.cosh()` separately.
///
/// Returns a tuple which contains:
/// - 0: The hyperbolic sine of the number.
/// - 1: The hyperbolic cosine of the number.
pub fn sinhcosh(x: f64) -> (f64, f64) {
    let e_x = x.exp();
    let e_neg_x = (-x).exp();

    ((e_x - e_neg_x) * 0.5, (e_x + e_neg_x) * 0.5)
}
