//! Transfers between two bodies orbiting the same attractor.

use glam::DVec3;
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{KeplerOrbit, OrbitError, TransferRequest, TransferSolver, TransferSolverConfig};

/// The body both orbits revolve around.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attractor {
    /// The attractor mass.
    pub mass: f64,
    /// The gravitational constant.
    pub gravitational_constant: f64,
    /// The attractor position in world coordinates.
    pub position: DVec3,
}

impl Attractor {
    /// The gravitational parameter, `mass * gravitational_constant`.
    pub fn mg(&self) -> f64 {
        self.mass * self.gravitational_constant
    }
}

/// A transfer found by [`InterceptionSolver`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitionOrbitData {
    /// The attractor of all three orbits.
    pub attractor: Attractor,
    /// The transfer orbit, positioned at departure.
    pub orbit: KeplerOrbit,
    /// The eccentric anomaly of the transfer orbit at departure.
    pub ecc_anomaly_start: f64,
    /// The eccentric anomaly of the transfer orbit at arrival.
    pub ecc_anomaly_end: f64,
    /// The velocity changes at departure and at arrival.
    pub velocity_differences: [DVec3; 2],
    /// The sum of the magnitudes of both velocity changes.
    pub total_delta_v: f64,
    /// The flight time, within the solver's precision of the request.
    pub duration: f64,
}

/// Finds a transfer from a body's current position to where a target body
/// will be after a given time.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterceptionSolver {
    /// Settings of the underlying transfer search.
    pub config: TransferSolverConfig,
    /// Accepted absolute error of the flight time.
    pub precision: f64,
    /// Upper bound on the transfer's semi-major axis.
    pub semi_major_axis_upper_limit: f64,
}

impl Default for InterceptionSolver {
    fn default() -> Self {
        Self {
            config: TransferSolverConfig::default(),
            precision: 1e-6,
            semi_major_axis_upper_limit: 1e12,
        }
    }
}

impl InterceptionSolver {
    /// Solves the transfer from `departure`'s current position to the
    /// position `target` reaches after `duration`.
    ///
    /// Both orbits are relative to `attractor`. Neither is modified. The
    /// departure orbit's plane is used when the departure point, the
    /// arrival point and the attractor are collinear.
    ///
    /// # Errors
    /// - [`OrbitError::InvalidOrbit`] if either orbit is invalid.
    /// - [`OrbitError::ConvergenceFailure`] if the target cannot be
    ///   propagated.
    /// - [`OrbitError::DegenerateConic`] if the departure point, the arrival
    ///   point and the attractor coincide, or are collinear with the
    ///   departure orbit's normal along that line.
    /// - [`OrbitError::NoTrajectory`] if the search does not converge on a
    ///   usable trajectory, for example when the flight time is shorter
    ///   than any elliptic transfer within the semi-major axis limit.
    pub fn solve(
        &self,
        departure: &KeplerOrbit,
        target: &KeplerOrbit,
        attractor: Attractor,
        duration: f64,
        is_reverse_orbit: bool,
    ) -> Result<TransitionOrbitData, OrbitError> {
        for orbit in [departure, target] {
            if !orbit.is_valid_orbit() {
                return Err(OrbitError::InvalidOrbit {
                    eccentricity: orbit.get_eccentricity(),
                    period: orbit.get_period(),
                    attractor_mass: orbit.get_attractor_mass(),
                });
            }
        }

        let mut target_at_arrival = target.clone();
        target_at_arrival.update_orbit_data_by_time(duration)?;

        let request = TransferRequest {
            departure: attractor.position + departure.get_position(),
            arrival: attractor.position + target_at_arrival.get_position(),
            attractor_position: attractor.position,
            target_duration: duration,
            is_reverse_orbit,
            attractor_mass: attractor.mass,
            gravitational_constant: attractor.gravitational_constant,
            precision: self.precision,
            semi_major_axis_upper_limit: self.semi_major_axis_upper_limit,
            plane_normal: Some(departure.get_orbit_normal()),
        };
        let hyperbola = request.hyperbola()?;
        let trajectory = TransferSolver::new(self.config).calc_transition_trajectory(&request, &hyperbola);

        let usable = trajectory.is_valid() && trajectory.has_converged();
        let orbit = match trajectory.orbit {
            Some(orbit) if usable => orbit,
            _ => {
                return Err(OrbitError::NoTrajectory {
                    status: trajectory.status,
                })
            }
        };

        let start_velocity = orbit.get_velocity_at_eccentric_anomaly(trajectory.ecc_anomaly_start);
        let end_velocity = orbit.get_velocity_at_eccentric_anomaly(trajectory.ecc_anomaly_end);
        let velocity_differences = [
            start_velocity - departure.get_velocity(),
            target_at_arrival.get_velocity() - end_velocity,
        ];
        let total_delta_v = velocity_differences[0].length() + velocity_differences[1].length();

        debug!(
            "transfer found after {} iterations: duration {}, delta-v {total_delta_v}",
            trajectory.iterations, trajectory.duration
        );

        Ok(TransitionOrbitData {
            attractor,
            orbit,
            ecc_anomaly_start: trajectory.ecc_anomaly_start,
            ecc_anomaly_end: trajectory.ecc_anomaly_end,
            velocity_differences,
            total_delta_v,
            duration: trajectory.duration,
        })
    }
}
