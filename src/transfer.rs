//! Elliptic transfer arcs between two points around a common attractor.
//!
//! Every ellipse through `p0` and `p1` with the attractor at one focus has
//! its second focus on one branch of the hyperbola whose foci are `p0` and
//! `p1` and which passes through the attractor. The solver walks along that
//! branch, evaluating the flight time of each candidate ellipse, until the
//! time matches the request.

use core::f64::consts::TAU;

use glam::DVec3;
use log::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    anomaly, EllipseData, HyperbolaBranch, HyperbolaData, KeplerOrbit, OrbitError,
    TransferSolverConfig,
};

/// The inputs of a single transfer search.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferRequest {
    /// Where the transfer starts (`p0`), in world coordinates.
    pub departure: DVec3,
    /// Where the transfer ends (`p1`), in world coordinates.
    pub arrival: DVec3,
    /// The attractor position (`f0`), in world coordinates.
    pub attractor_position: DVec3,
    /// The requested flight time.
    pub target_duration: f64,
    /// Go the long way around: the transfer orbit turns against the
    /// normal of `p0 × p1`.
    pub is_reverse_orbit: bool,
    /// The mass of the attractor.
    pub attractor_mass: f64,
    /// The gravitational constant.
    pub gravitational_constant: f64,
    /// Accepted absolute error of the flight time.
    pub precision: f64,
    /// Candidates with a larger semi-major axis stop the search.
    pub semi_major_axis_upper_limit: f64,
    /// Normal of the transfer plane, used only when the departure point,
    /// the arrival point and the attractor are collinear (a transfer
    /// between opposite sides of the attractor).
    pub plane_normal: Option<DVec3>,
}

impl TransferRequest {
    /// The hyperbola with foci at the departure and arrival points,
    /// passing through the attractor.
    ///
    /// # Errors
    /// [`OrbitError::DegenerateConic`] when the departure and arrival points
    /// coincide, when either coincides with the attractor, or when all three
    /// are collinear and no usable [`plane_normal`][Self::plane_normal] is
    /// given.
    pub fn hyperbola(&self) -> Result<HyperbolaData, OrbitError> {
        HyperbolaData::with_normal_hint(
            self.departure,
            self.arrival,
            self.attractor_position,
            self.plane_normal,
        )
    }
}

/// Why the transfer search stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransferStatus {
    /// The flight time is within the requested precision.
    Converged,
    /// Successive flight times stopped changing.
    Plateau,
    /// The candidate's semi-major axis exceeded the upper limit. The
    /// reported orbit is that over-limit candidate.
    SemiMajorAxisLimit,
    /// The iteration cap was reached.
    IterationLimit,
    /// A candidate ellipse could not be built, or its flight time was not
    /// finite.
    Degenerate,
}

/// The outcome of a transfer search.
///
/// The search never fails outright: it always reports the last candidate it
/// evaluated, which may be unusable. Check [`is_valid`][Self::is_valid]
/// before relying on it, and [`status`][Self::status] to see whether the
/// requested time was actually met.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryData {
    /// The transfer orbit, relative to the attractor, positioned at the
    /// departure point. `None` if no candidate could be built.
    pub orbit: Option<KeplerOrbit>,
    /// The flight time from departure to arrival.
    pub duration: f64,
    /// The eccentric anomaly at departure.
    pub ecc_anomaly_start: f64,
    /// The eccentric anomaly at arrival; at least `ecc_anomaly_start`.
    pub ecc_anomaly_end: f64,
    /// The number of candidates evaluated.
    pub iterations: u32,
    /// Why the search stopped.
    pub status: TransferStatus,
}

impl TrajectoryData {
    fn empty(status: TransferStatus) -> Self {
        Self {
            orbit: None,
            duration: 0.0,
            ecc_anomaly_start: 0.0,
            ecc_anomaly_end: 0.0,
            iterations: 0,
            status,
        }
    }

    /// Whether the trajectory is usable: the orbit is valid, and the
    /// duration is positive and finite.
    pub fn is_valid(&self) -> bool {
        self.orbit.as_ref().is_some_and(KeplerOrbit::is_valid_orbit)
            && self.duration > 0.0
            && self.duration.is_finite()
    }

    /// Whether the search met the requested flight time.
    pub fn has_converged(&self) -> bool {
        self.status == TransferStatus::Converged
    }
}

/// One evaluated point of the search.
struct Candidate {
    orbit: KeplerOrbit,
    semi_major_axis: f64,
    duration: f64,
    ecc_anomaly_start: f64,
    ecc_anomaly_end: f64,
}

impl Candidate {
    fn into_trajectory(self, iterations: u32, status: TransferStatus) -> TrajectoryData {
        TrajectoryData {
            orbit: Some(self.orbit),
            duration: self.duration,
            ecc_anomaly_start: self.ecc_anomaly_start,
            ecc_anomaly_end: self.ecc_anomaly_end,
            iterations,
            status,
        }
    }
}

/// Searches for elliptic transfer orbits.
///
/// # Example
/// ```
/// use glam::DVec3;
/// use kepler_transfer::{TransferRequest, TransferSolver, TransferStatus};
///
/// let angle = 150f64.to_radians();
/// let request = TransferRequest {
///     departure: DVec3::new(10.0, 0.0, 0.0),
///     arrival: DVec3::new(angle.cos(), angle.sin(), 0.0) * 20.0,
///     attractor_position: DVec3::ZERO,
///     target_duration: 18.5,
///     is_reverse_orbit: false,
///     attractor_mass: 100.0,
///     gravitational_constant: 1.0,
///     precision: 1e-6,
///     semi_major_axis_upper_limit: 1e4,
///     plane_normal: None,
/// };
///
/// let trajectory = TransferSolver::default().solve(&request);
/// assert_eq!(trajectory.status, TransferStatus::Converged);
/// assert!((trajectory.duration - 18.5).abs() < 1e-6);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferSolver {
    /// Step and stopping settings of the search.
    pub config: TransferSolverConfig,
}

impl TransferSolver {
    /// Creates a solver with the given settings.
    pub fn new(config: TransferSolverConfig) -> Self {
        Self { config }
    }

    /// Builds the request's hyperbola and runs
    /// [`calc_transition_trajectory`][Self::calc_transition_trajectory].
    ///
    /// A degenerate hyperbola yields an empty trajectory with
    /// [`TransferStatus::Degenerate`].
    pub fn solve(&self, request: &TransferRequest) -> TrajectoryData {
        match request.hyperbola() {
            Ok(hyperbola) => self.calc_transition_trajectory(request, &hyperbola),
            Err(err) => {
                warn!("transfer geometry is degenerate: {err}");
                TrajectoryData::empty(TransferStatus::Degenerate)
            }
        }
    }

    /// Searches for a transfer orbit from `request.departure` to
    /// `request.arrival` taking `request.target_duration`.
    ///
    /// `hyperbola` must be the hyperbola from
    /// [`TransferRequest::hyperbola`]. The search starts at the
    /// minimum-energy transfer (second focus on the chord between the
    /// points) and steps the hyperbolic parameter toward the requested
    /// flight time, damping the step after every
    /// [`flips_per_damping`][TransferSolverConfig::flips_per_damping] sign
    /// changes of the error.
    pub fn calc_transition_trajectory(
        &self,
        request: &TransferRequest,
        hyperbola: &HyperbolaData,
    ) -> TrajectoryData {
        let departure_distance = request.departure.distance(request.attractor_position);
        let arrival_distance = request.arrival.distance(request.attractor_position);

        // The attractor lies on the main branch; the second focus of every
        // transfer ellipse lies on the branch nearer the farther point.
        let branch = hyperbola.branch_toward(if departure_distance < arrival_distance {
            request.arrival
        } else {
            request.departure
        });

        let mut result = TrajectoryData::empty(TransferStatus::IterationLimit);
        let mut value = 0.0;
        let mut delta = self.config.initial_step;
        let mut direction = 1.0;
        let mut sign_flips = 0;
        let mut previous: Option<(f64, f64, f64)> = None;

        for iteration in 1..=self.config.max_iterations {
            let candidate = match evaluate(request, hyperbola, branch, value) {
                Ok(candidate) if !candidate.duration.is_finite() => {
                    warn!(
                        "transfer candidate at t = {value} has a non-finite duration ({})",
                        candidate.duration
                    );
                    return candidate.into_trajectory(iteration, TransferStatus::Degenerate);
                }
                Ok(candidate) if candidate.semi_major_axis > request.semi_major_axis_upper_limit => {
                    debug!(
                        "transfer search stopped: semi-major axis {} exceeds {}",
                        candidate.semi_major_axis, request.semi_major_axis_upper_limit
                    );
                    return candidate.into_trajectory(iteration, TransferStatus::SemiMajorAxisLimit);
                }
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!("transfer candidate at t = {value} is degenerate: {err}");
                    result.status = TransferStatus::Degenerate;
                    return result;
                }
            };

            let duration = candidate.duration;
            let diff = duration - request.target_duration;
            trace!("transfer iteration {iteration}: t = {value}, duration = {duration}, error = {diff}");

            result = candidate.into_trajectory(iteration, TransferStatus::IterationLimit);

            if diff.abs() < request.precision {
                result.status = TransferStatus::Converged;
                return result;
            }

            if let Some((previous_value, previous_duration, previous_diff)) = previous {
                let change = duration - previous_duration;
                if change.abs() < request.precision * self.config.plateau_ratio {
                    debug!("transfer search reached a plateau at duration {duration}");
                    result.status = TransferStatus::Plateau;
                    return result;
                }
                if diff.signum() != previous_diff.signum() {
                    sign_flips += 1;
                    if sign_flips >= self.config.flips_per_damping {
                        delta *= self.config.step_damping;
                        sign_flips = 0;
                    }
                }
                let slope = change / (value - previous_value);
                direction = -diff.signum() * slope.signum();
            }

            previous = Some((value, duration, diff));
            value += direction * delta;
        }

        debug!(
            "transfer search hit the iteration cap with error {}",
            result.duration - request.target_duration
        );
        result
    }
}

/// Evaluates the transfer ellipse whose second focus sits at hyperbolic
/// parameter `value` on `branch`.
fn evaluate(
    request: &TransferRequest,
    hyperbola: &HyperbolaData,
    branch: HyperbolaBranch,
    value: f64,
) -> Result<Candidate, OrbitError> {
    let focus = hyperbola.get_sample_point_on_branch(value, branch);
    let mut ellipse = EllipseData::with_normal_hint(
        request.attractor_position,
        focus,
        request.departure,
        Some(hyperbola.normal()),
    )?;

    if ellipse.normal().dot(hyperbola.normal()) < 0.0 {
        ellipse = ellipse.with_flipped_secondary_axis();
    }
    if request.is_reverse_orbit {
        ellipse = ellipse.with_flipped_secondary_axis();
    }

    let e = ellipse.eccentricity();
    let ecc_anomaly_start = ellipse.get_eccentric_anomaly_for_point(request.departure);
    let mut ecc_anomaly_end = ellipse.get_eccentric_anomaly_for_point(request.arrival);
    if ecc_anomaly_end < ecc_anomaly_start {
        ecc_anomaly_end += TAU;
    }

    let mean_anomaly_start = anomaly::eccentric_to_mean_anomaly(ecc_anomaly_start, e);
    let mean_anomaly_end = anomaly::eccentric_to_mean_anomaly(ecc_anomaly_end, e);

    // Periapsis lies opposite the second focus
    let orbit = KeplerOrbit::from_axes(
        e,
        -ellipse.axis_main() * ellipse.a(),
        -ellipse.axis_secondary() * ellipse.b(),
        mean_anomaly_start,
        request.attractor_mass,
        request.gravitational_constant,
    )?;

    let mean_anomaly_change = mean_anomaly_end - mean_anomaly_start;
    let duration = if mean_anomaly_change > 0.0 {
        mean_anomaly_change / orbit.get_mean_motion()
    } else {
        0.0
    };

    Ok(Candidate {
        orbit,
        semi_major_axis: ellipse.a(),
        duration,
        ecc_anomaly_start,
        ecc_anomaly_end,
    })
}
