use glam::{DMat4, DQuat, DVec3, DVec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    anomaly::{self, wrap_signed, OrbitKind},
    DMat4Ext, DVec3Ext, KeplerSolverConfig, OrbitError, StateVectors, ECLIPTIC_NORMAL,
    ECLIPTIC_RIGHT, ECLIPTIC_UP,
};

use core::f64::consts::{PI, TAU};

/// Eccentricities below this are treated as circular when choosing the
/// periapsis direction; the position direction is used instead of the
/// (noise-dominated) eccentricity vector.
const CIRCULAR_ECCENTRICITY: f64 = 1e-12;

/// A Keplerian orbit holding both its Cartesian state and its classical
/// orbital elements.
///
/// All positions are relative to the attractor, which sits at one focus of
/// the conic. The two representations are kept in sync by full
/// recomputation:
/// [`calculate_orbit_state_from_orbital_vectors`][Self::calculate_orbit_state_from_orbital_vectors]
/// derives the elements from position and velocity, and
/// [`calculate_orbit_state_from_orbital_elements`][Self::calculate_orbit_state_from_orbital_elements]
/// goes the other way.
///
/// # Conventions
/// - The semi-major axis basis points from the attractor toward periapsis.
/// - The semi-minor axis basis is `orbit_normal × semi_major_axis_basis`,
///   the direction of motion at periapsis.
/// - The semi-major axis is a positive length for elliptic and hyperbolic
///   orbits, and zero for parabolic ones, whose size is carried by the
///   periapsis distance instead.
///
/// # Example
/// ```
/// use glam::DVec3;
/// use kepler_transfer::KeplerOrbit;
///
/// let orbit = KeplerOrbit::from_axes(
///     // Eccentricity
///     0.5,
///     // Semi-major axis vector, pointing at periapsis
///     DVec3::new(10.0, 0.0, 0.0),
///     // Semi-minor axis vector, direction of motion at periapsis
///     DVec3::new(0.0, 1.0, 0.0),
///     // Mean anomaly
///     0.0,
///     // Attractor mass and gravitational constant
///     100.0,
///     1.0,
/// ).unwrap();
///
/// assert!((orbit.get_periapsis_distance() - 5.0).abs() < 1e-12);
/// assert!((orbit.get_apoapsis_distance() - 15.0).abs() < 1e-12);
/// assert!(orbit.is_valid_orbit());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerOrbit {
    position: DVec3,
    velocity: DVec3,
    attractor_mass: f64,
    gravitational_constant: f64,
    /// `attractor_mass * gravitational_constant`.
    mg: f64,
    attractor_distance: f64,
    /// Specific orbital energy, `v²/2 - mg/r`.
    energy: f64,

    eccentricity: f64,
    semi_major_axis: f64,
    semi_minor_axis: f64,
    focal_parameter: f64,
    period: f64,
    mean_motion: f64,

    true_anomaly: f64,
    eccentric_anomaly: f64,
    mean_anomaly: f64,

    orbit_normal: DVec3,
    semi_major_axis_basis: DVec3,
    semi_minor_axis_basis: DVec3,
    center_point: DVec3,
    periapsis: DVec3,
    apoapsis: DVec3,
    periapsis_distance: f64,
    apoapsis_distance: f64,

    solver: KeplerSolverConfig,
}

// Initialization
impl KeplerOrbit {
    fn blank(attractor_mass: f64, gravitational_constant: f64) -> Self {
        Self {
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            attractor_mass,
            gravitational_constant,
            mg: attractor_mass * gravitational_constant,
            attractor_distance: 0.0,
            energy: 0.0,
            eccentricity: 0.0,
            semi_major_axis: 0.0,
            semi_minor_axis: 0.0,
            focal_parameter: 0.0,
            period: 0.0,
            mean_motion: 0.0,
            true_anomaly: 0.0,
            eccentric_anomaly: 0.0,
            mean_anomaly: 0.0,
            orbit_normal: ECLIPTIC_NORMAL,
            semi_major_axis_basis: ECLIPTIC_RIGHT,
            semi_minor_axis_basis: ECLIPTIC_UP,
            center_point: DVec3::ZERO,
            periapsis: DVec3::ZERO,
            apoapsis: DVec3::ZERO,
            periapsis_distance: 0.0,
            apoapsis_distance: 0.0,
            solver: KeplerSolverConfig::default(),
        }
    }

    /// Creates an orbit from a position and velocity relative to the
    /// attractor.
    ///
    /// A radial or stationary state (zero angular momentum) produces an
    /// orbit with zero eccentricity and zero focal parameter, which fails
    /// [`is_valid_orbit`][Self::is_valid_orbit].
    pub fn from_state_vectors(
        position: DVec3,
        velocity: DVec3,
        attractor_mass: f64,
        gravitational_constant: f64,
    ) -> Self {
        let mut orbit = Self::blank(attractor_mass, gravitational_constant);
        orbit.position = position;
        orbit.velocity = velocity;
        orbit.calculate_orbit_state_from_orbital_vectors();
        orbit
    }

    /// Creates an orbit from its eccentricity and axis vectors.
    ///
    /// - `semi_major_axis` points from the attractor toward periapsis; its
    ///   length is the semi-major axis. For a parabolic orbit (`e == 1`) its
    ///   length is taken as the periapsis distance.
    /// - `semi_minor_axis` gives the direction of motion at periapsis; only
    ///   its direction matters, the semi-minor length is derived.
    /// - `mean_anomaly` is in radians.
    ///
    /// # Errors
    /// [`OrbitError::DegenerateBasis`] if the two axis vectors do not span
    /// a plane, or [`OrbitError::ConvergenceFailure`] if Kepler's equation
    /// cannot be solved for the mean anomaly.
    pub fn from_axes(
        eccentricity: f64,
        semi_major_axis: DVec3,
        semi_minor_axis: DVec3,
        mean_anomaly: f64,
        attractor_mass: f64,
        gravitational_constant: f64,
    ) -> Result<Self, OrbitError> {
        let basis = semi_major_axis
            .try_normalize()
            .ok_or(OrbitError::DegenerateBasis)?;
        let normal = semi_major_axis
            .cross(semi_minor_axis)
            .try_normalize()
            .ok_or(OrbitError::DegenerateBasis)?;

        let mut orbit = Self::blank(attractor_mass, gravitational_constant);
        orbit.eccentricity = eccentricity.abs();
        orbit.semi_major_axis = semi_major_axis.length();
        orbit.periapsis_distance = semi_major_axis.length();
        orbit.semi_major_axis_basis = basis;
        orbit.orbit_normal = normal;
        orbit.mean_anomaly = mean_anomaly;
        orbit.calculate_orbit_state_from_orbital_elements()?;
        Ok(orbit)
    }

    /// Creates an orbit from classical angular elements.
    ///
    /// All angles are in radians. The orientation is built by rotating the
    /// perifocal frame by the argument of periapsis about the ecliptic
    /// normal, then by the inclination about the ecliptic right axis, then
    /// by the longitude of the ascending node about the ecliptic normal.
    ///
    /// For a parabolic orbit (`e == 1`) `semi_major_axis` is taken as the
    /// periapsis distance.
    ///
    /// # Errors
    /// [`OrbitError::ConvergenceFailure`] if Kepler's equation cannot be
    /// solved for the mean anomaly.
    ///
    /// # Example
    /// ```
    /// use kepler_transfer::KeplerOrbit;
    ///
    /// let orbit = KeplerOrbit::from_angular_elements(
    ///     0.2, 40.0, 1.0, 0.3, 0.7, 2.1, 10.0, 1.0,
    /// ).unwrap();
    ///
    /// assert!((orbit.get_inclination() - 0.3).abs() < 1e-9);
    /// assert!((orbit.get_argument_of_periapsis() - 0.7).abs() < 1e-9);
    /// assert!((orbit.get_ascending_node_longitude() - 2.1).abs() < 1e-9);
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub fn from_angular_elements(
        eccentricity: f64,
        semi_major_axis: f64,
        mean_anomaly: f64,
        inclination: f64,
        arg_of_periapsis: f64,
        ascending_node_longitude: f64,
        attractor_mass: f64,
        gravitational_constant: f64,
    ) -> Result<Self, OrbitError> {
        let rotation = DQuat::from_axis_angle(ECLIPTIC_NORMAL, ascending_node_longitude)
            * DQuat::from_axis_angle(ECLIPTIC_RIGHT, inclination)
            * DQuat::from_axis_angle(ECLIPTIC_NORMAL, arg_of_periapsis);

        let mut orbit = Self::blank(attractor_mass, gravitational_constant);
        orbit.eccentricity = eccentricity.abs();
        orbit.semi_major_axis = semi_major_axis.abs();
        orbit.periapsis_distance = semi_major_axis.abs();
        orbit.semi_major_axis_basis = rotation * ECLIPTIC_RIGHT;
        orbit.orbit_normal = rotation * ECLIPTIC_NORMAL;
        orbit.mean_anomaly = mean_anomaly;
        orbit.calculate_orbit_state_from_orbital_elements()?;
        Ok(orbit)
    }

    /// Replaces the solver settings used for Kepler's equation.
    #[must_use]
    pub fn with_solver_config(mut self, solver: KeplerSolverConfig) -> Self {
        self.solver = solver;
        self
    }
}

impl Default for KeplerOrbit {
    /// A circular orbit of radius 1 around an attractor with `mg = 1`,
    /// starting on the ecliptic right axis.
    fn default() -> Self {
        Self::from_state_vectors(ECLIPTIC_RIGHT, ECLIPTIC_UP, 1.0, 1.0)
    }
}

// Recalculation
impl KeplerOrbit {
    /// Derives every orbital element from the current position, velocity,
    /// attractor mass and gravitational constant.
    ///
    /// When the angular momentum vanishes (a radial or stationary state) the
    /// orbit normal falls back to `normalize(position × ecliptic up)` and the
    /// eccentricity vector is taken as zero.
    pub fn calculate_orbit_state_from_orbital_vectors(&mut self) {
        self.mg = self.attractor_mass * self.gravitational_constant;
        self.attractor_distance = self.position.length();

        let angular_momentum = self.position.cross(self.velocity);
        let mut normal = angular_momentum.safe_normalize();
        let eccentricity_vector = if normal.length_squared() < 0.99 {
            normal = fallback_normal(self.position);
            DVec3::ZERO
        } else {
            self.velocity.cross(angular_momentum) / self.mg
                - self.position / self.attractor_distance
        };

        self.orbit_normal = normal;
        self.focal_parameter = angular_momentum.length_squared() / self.mg;
        self.eccentricity = eccentricity_vector.length();
        self.energy =
            0.5 * self.velocity.length_squared() - self.mg / self.attractor_distance;

        self.semi_major_axis_basis = if self.eccentricity > CIRCULAR_ECCENTRICITY {
            eccentricity_vector / self.eccentricity
        } else {
            let radial = self.position.safe_normalize();
            if radial == DVec3::ZERO {
                fallback_in_plane(normal)
            } else {
                radial
            }
        };
        self.semi_minor_axis_basis = normal.cross(self.semi_major_axis_basis).safe_normalize();

        self.derive_conic_shape();

        let true_anomaly = self
            .position
            .angle_in_plane(self.semi_major_axis_basis, self.semi_minor_axis_basis);
        self.true_anomaly = match self.get_kind() {
            OrbitKind::Elliptic => true_anomaly,
            OrbitKind::Parabolic | OrbitKind::Hyperbolic => wrap_signed(true_anomaly),
        };
        self.eccentric_anomaly =
            anomaly::true_to_eccentric_anomaly(self.true_anomaly, self.eccentricity);
        self.mean_anomaly =
            anomaly::eccentric_to_mean_anomaly(self.eccentric_anomaly, self.eccentricity);
    }

    /// Derives the period, mean motion, center point, apsides, anomalies and
    /// finally the position and velocity from the eccentricity, the size
    /// (semi-major axis, or periapsis distance for a parabola), the
    /// periapsis direction, the orbit normal and the mean anomaly.
    ///
    /// # Errors
    /// [`OrbitError::ConvergenceFailure`] if Kepler's equation cannot be
    /// solved for the current mean anomaly.
    pub fn calculate_orbit_state_from_orbital_elements(&mut self) -> Result<(), OrbitError> {
        self.mg = self.attractor_mass * self.gravitational_constant;
        self.semi_major_axis_basis = self.semi_major_axis_basis.safe_normalize();
        self.orbit_normal = self.orbit_normal.safe_normalize();
        self.semi_minor_axis_basis = self
            .orbit_normal
            .cross(self.semi_major_axis_basis)
            .safe_normalize();

        let e = self.eccentricity;
        self.focal_parameter = match self.get_kind() {
            OrbitKind::Elliptic => self.semi_major_axis * (1.0 - e) * (1.0 + e),
            OrbitKind::Hyperbolic => self.semi_major_axis * (e - 1.0) * (e + 1.0),
            OrbitKind::Parabolic => 2.0 * self.periapsis_distance,
        };
        self.derive_conic_shape();

        if self.get_kind() == OrbitKind::Elliptic {
            self.mean_anomaly = self.mean_anomaly.rem_euclid(TAU);
        }
        self.eccentric_anomaly =
            anomaly::mean_to_eccentric_anomaly(self.mean_anomaly, e, &self.solver)?;
        self.true_anomaly = anomaly::eccentric_to_true_anomaly(self.eccentric_anomaly, e);
        self.set_state_by_current_anomaly();
        Ok(())
    }

    /// Fills the size-and-shape quantities from the eccentricity, focal
    /// parameter, axis bases and `mg`.
    fn derive_conic_shape(&mut self) {
        let e = self.eccentricity;
        let p = self.focal_parameter;
        let major = self.semi_major_axis_basis;

        match self.get_kind() {
            OrbitKind::Elliptic => {
                // Factored to keep precision close to e = 1
                let compression = (1.0 - e) * (1.0 + e);
                let a = p / compression;
                self.semi_major_axis = a;
                self.semi_minor_axis = a * compression.sqrt();
                self.center_point = major * (-a * e);
                self.mean_motion = (self.mg / (a * a * a)).sqrt();
                self.period = TAU / self.mean_motion;
                self.periapsis = major * (a * (1.0 - e));
                self.apoapsis = major * (-a * (1.0 + e));
                self.periapsis_distance = a * (1.0 - e);
                self.apoapsis_distance = a * (1.0 + e);
            }
            OrbitKind::Hyperbolic => {
                let compression = (e - 1.0) * (e + 1.0);
                let a = p / compression;
                self.semi_major_axis = a;
                self.semi_minor_axis = a * compression.sqrt();
                self.center_point = major * (a * e);
                self.mean_motion = (self.mg / (a * a * a)).sqrt();
                self.period = f64::INFINITY;
                self.periapsis = major * (a * (e - 1.0));
                self.apoapsis = DVec3::INFINITY;
                self.periapsis_distance = a * (e - 1.0);
                self.apoapsis_distance = f64::INFINITY;
            }
            OrbitKind::Parabolic => {
                let q = p * 0.5;
                self.semi_major_axis = 0.0;
                self.semi_minor_axis = 0.0;
                self.center_point = DVec3::ZERO;
                // Barker's equation, M = D + D³/3, advances at sqrt(mg / 2q³)
                self.mean_motion = (self.mg / (2.0 * q * q * q)).sqrt();
                self.period = f64::INFINITY;
                self.periapsis = major * q;
                self.apoapsis = DVec3::INFINITY;
                self.periapsis_distance = q;
                self.apoapsis_distance = f64::INFINITY;
            }
        }
    }

    fn set_state_by_current_anomaly(&mut self) {
        self.position = self.get_focal_position_at_true_anomaly(self.true_anomaly);
        self.velocity = self.get_velocity_at_true_anomaly(self.true_anomaly);
        self.attractor_distance = self.position.length();
        self.energy =
            0.5 * self.velocity.length_squared() - self.mg / self.attractor_distance;
    }

    fn ensure_valid(&self) -> Result<(), OrbitError> {
        if self.is_valid_orbit() {
            Ok(())
        } else {
            Err(OrbitError::InvalidOrbit {
                eccentricity: self.eccentricity,
                period: self.period,
                attractor_mass: self.attractor_mass,
            })
        }
    }
}

// Time integration and setters
impl KeplerOrbit {
    /// Advances the mean anomaly by `mean_motion * delta_time` and
    /// re-derives the eccentric and true anomalies.
    ///
    /// Elliptic mean anomalies are wrapped into `[0, 2π)`; hyperbolic and
    /// parabolic ones are left unwrapped since the motion is not periodic.
    /// Position and velocity are not touched; see
    /// [`update_orbit_data_by_time`][Self::update_orbit_data_by_time].
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbit`] on an invalid orbit, or
    /// [`OrbitError::ConvergenceFailure`] from Kepler's equation.
    pub fn update_orbit_anomalies_by_time(&mut self, delta_time: f64) -> Result<(), OrbitError> {
        self.ensure_valid()?;

        let mean_anomaly = self.mean_anomaly + self.mean_motion * delta_time;
        self.apply_mean_anomaly(mean_anomaly)
    }

    /// Advances the orbit in time and resynchronizes position and velocity.
    ///
    /// # Errors
    /// See [`update_orbit_anomalies_by_time`][Self::update_orbit_anomalies_by_time].
    pub fn update_orbit_data_by_time(&mut self, delta_time: f64) -> Result<(), OrbitError> {
        self.update_orbit_anomalies_by_time(delta_time)?;
        self.set_state_by_current_anomaly();
        Ok(())
    }

    fn apply_mean_anomaly(&mut self, mean_anomaly: f64) -> Result<(), OrbitError> {
        let e = self.eccentricity;
        let mean_anomaly = match self.get_kind() {
            OrbitKind::Elliptic => mean_anomaly.rem_euclid(TAU),
            OrbitKind::Parabolic | OrbitKind::Hyperbolic => mean_anomaly,
        };
        let eccentric_anomaly = anomaly::mean_to_eccentric_anomaly(mean_anomaly, e, &self.solver)?;

        self.mean_anomaly = mean_anomaly;
        self.eccentric_anomaly = eccentric_anomaly;
        self.true_anomaly = anomaly::eccentric_to_true_anomaly(eccentric_anomaly, e);
        Ok(())
    }

    /// Moves the body to the given mean anomaly (radians), updating
    /// position and velocity.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbit`] on an invalid orbit, or
    /// [`OrbitError::ConvergenceFailure`] from Kepler's equation.
    pub fn set_mean_anomaly(&mut self, mean_anomaly: f64) -> Result<(), OrbitError> {
        self.ensure_valid()?;
        self.apply_mean_anomaly(mean_anomaly)?;
        self.set_state_by_current_anomaly();
        Ok(())
    }

    /// Moves the body to the given true anomaly (radians), updating
    /// position and velocity.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbit`] on an invalid orbit.
    pub fn set_true_anomaly(&mut self, true_anomaly: f64) -> Result<(), OrbitError> {
        self.ensure_valid()?;

        let e = self.eccentricity;
        self.true_anomaly = match self.get_kind() {
            OrbitKind::Elliptic => true_anomaly.rem_euclid(TAU),
            OrbitKind::Parabolic | OrbitKind::Hyperbolic => wrap_signed(true_anomaly),
        };
        self.eccentric_anomaly = anomaly::true_to_eccentric_anomaly(self.true_anomaly, e);
        self.mean_anomaly = anomaly::eccentric_to_mean_anomaly(self.eccentric_anomaly, e);
        self.set_state_by_current_anomaly();
        Ok(())
    }

    /// Moves the body to the given eccentric anomaly (radians; the
    /// parabolic anomaly for parabolic orbits), updating position and
    /// velocity.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbit`] on an invalid orbit.
    pub fn set_eccentric_anomaly(&mut self, eccentric_anomaly: f64) -> Result<(), OrbitError> {
        self.ensure_valid()?;

        let e = self.eccentricity;
        self.eccentric_anomaly = match self.get_kind() {
            OrbitKind::Elliptic => eccentric_anomaly.rem_euclid(TAU),
            OrbitKind::Parabolic | OrbitKind::Hyperbolic => eccentric_anomaly,
        };
        self.true_anomaly = anomaly::eccentric_to_true_anomaly(self.eccentric_anomaly, e);
        self.mean_anomaly = anomaly::eccentric_to_mean_anomaly(self.eccentric_anomaly, e);
        self.set_state_by_current_anomaly();
        Ok(())
    }

    /// Changes the eccentricity while keeping the periapsis distance, the
    /// orientation and the mean anomaly.
    ///
    /// Negative values are taken by magnitude. Crossing `e = 1` moves the
    /// orbit into another regime.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbit`] on an invalid orbit, or
    /// [`OrbitError::ConvergenceFailure`] from Kepler's equation.
    ///
    /// # Example
    /// ```
    /// use kepler_transfer::{KeplerOrbit, OrbitKind};
    ///
    /// let mut orbit = KeplerOrbit::default();
    /// orbit.set_eccentricity(1.0).unwrap();
    /// assert_eq!(orbit.get_kind(), OrbitKind::Parabolic);
    /// assert!(orbit.get_period().is_infinite());
    /// ```
    pub fn set_eccentricity(&mut self, eccentricity: f64) -> Result<(), OrbitError> {
        self.ensure_valid()?;

        let periapsis_distance = self.periapsis_distance;
        let eccentricity = eccentricity.abs();

        self.eccentricity = eccentricity;
        self.periapsis_distance = periapsis_distance;
        self.semi_major_axis = match OrbitKind::from_eccentricity(eccentricity) {
            OrbitKind::Parabolic => 0.0,
            OrbitKind::Elliptic | OrbitKind::Hyperbolic => {
                periapsis_distance / (1.0 - eccentricity).abs()
            }
        };
        self.calculate_orbit_state_from_orbital_elements()
    }

    /// Replaces the position and velocity and re-derives every element.
    pub fn set_state_vectors(&mut self, position: DVec3, velocity: DVec3) {
        self.position = position;
        self.velocity = velocity;
        self.calculate_orbit_state_from_orbital_vectors();
    }

    /// Re-targets the orbit to another attractor while keeping the current
    /// position and velocity.
    pub fn set_attractor(&mut self, attractor_mass: f64, gravitational_constant: f64) {
        self.attractor_mass = attractor_mass;
        self.gravitational_constant = gravitational_constant;
        self.calculate_orbit_state_from_orbital_vectors();
    }

    /// Rotates the whole orbit (position and velocity) about the attractor.
    pub fn rotate(&mut self, rotation: DQuat) {
        self.position = rotation * self.position;
        self.velocity = rotation * self.velocity;
        self.calculate_orbit_state_from_orbital_vectors();
    }
}

// Queries
impl KeplerOrbit {
    /// Whether the orbit describes a usable trajectory:
    /// `eccentricity >= 0`, `period > 0` and `attractor_mass > 0`.
    ///
    /// Results of other methods on an invalid orbit are unspecified.
    pub fn is_valid_orbit(&self) -> bool {
        self.eccentricity >= 0.0 && self.period > 0.0 && self.attractor_mass > 0.0
    }

    /// The conic regime of this orbit.
    pub fn get_kind(&self) -> OrbitKind {
        OrbitKind::from_eccentricity(self.eccentricity)
    }

    /// The position relative to the attractor at the given true anomaly.
    ///
    /// Returns the zero vector when the focal parameter is not positive.
    pub fn get_focal_position_at_true_anomaly(&self, true_anomaly: f64) -> DVec3 {
        if !(self.focal_parameter > 0.0) {
            return DVec3::ZERO;
        }
        let (sin_v, cos_v) = true_anomaly.sin_cos();
        let radius = self.focal_parameter / (1.0 + self.eccentricity * cos_v);
        (self.semi_major_axis_basis * cos_v + self.semi_minor_axis_basis * sin_v) * radius
    }

    /// The position relative to the attractor at the given eccentric anomaly
    /// (the parabolic anomaly for parabolic orbits).
    ///
    /// Returns the zero vector when the focal parameter is not positive.
    pub fn get_focal_position_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> DVec3 {
        if !(self.focal_parameter > 0.0) {
            return DVec3::ZERO;
        }
        let e = self.eccentricity;
        let a = self.semi_major_axis;
        let b = self.semi_minor_axis;
        let (x, y) = match self.get_kind() {
            OrbitKind::Elliptic => {
                let (sin_e, cos_e) = eccentric_anomaly.sin_cos();
                (a * (cos_e - e), b * sin_e)
            }
            OrbitKind::Hyperbolic => {
                let (sinh_h, cosh_h) = crate::sinhcosh(eccentric_anomaly);
                (a * (e - cosh_h), b * sinh_h)
            }
            OrbitKind::Parabolic => {
                let q = self.periapsis_distance;
                let d = eccentric_anomaly;
                (q * (1.0 - d * d), 2.0 * q * d)
            }
        };
        self.semi_major_axis_basis * x + self.semi_minor_axis_basis * y
    }

    /// The position relative to the center of the conic at the given
    /// eccentric anomaly.
    pub fn get_central_position_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> DVec3 {
        self.get_focal_position_at_eccentric_anomaly(eccentric_anomaly) - self.center_point
    }

    /// The velocity at the given true anomaly.
    ///
    /// Returns the zero vector when the focal parameter is not positive.
    pub fn get_velocity_at_true_anomaly(&self, true_anomaly: f64) -> DVec3 {
        if !(self.focal_parameter > 0.0) {
            return DVec3::ZERO;
        }
        let (sin_v, cos_v) = true_anomaly.sin_cos();
        let speed_scale = (self.mg / self.focal_parameter).sqrt();
        (self.semi_major_axis_basis * -sin_v
            + self.semi_minor_axis_basis * (self.eccentricity + cos_v))
            * speed_scale
    }

    /// The velocity at the given eccentric anomaly.
    pub fn get_velocity_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> DVec3 {
        self.get_velocity_at_true_anomaly(anomaly::eccentric_to_true_anomaly(
            eccentric_anomaly,
            self.eccentricity,
        ))
    }

    /// The position and velocity at the given true anomaly.
    pub fn get_state_vectors_at_true_anomaly(&self, true_anomaly: f64) -> StateVectors {
        StateVectors {
            position: self.get_focal_position_at_true_anomaly(true_anomaly),
            velocity: self.get_velocity_at_true_anomaly(true_anomaly),
        }
    }

    /// The true anomaly (in `[0, π]`) at which the orbit reaches `distance`
    /// from the attractor.
    ///
    /// Distances below periapsis give 0; distances never reached give `π`
    /// for closed orbits and the asymptote angle for open ones.
    pub fn get_true_anomaly_for_distance(&self, distance: f64) -> f64 {
        let e = self.eccentricity;
        if e < CIRCULAR_ECCENTRICITY {
            return if distance < self.focal_parameter { 0.0 } else { PI };
        }
        let cos_v = ((self.focal_parameter / distance - 1.0) / e).clamp(-1.0, 1.0);
        cos_v.acos().min(anomaly::true_anomaly_asymptote(e))
    }

    /// The ascending node: where the orbit crosses the ecliptic plane
    /// heading toward the ecliptic normal.
    ///
    /// Returns `None` for orbits lying in the ecliptic plane, or when the
    /// node lies beyond the asymptote of a hyperbolic or parabolic trajectory.
    pub fn get_ascending_node(&self) -> Option<DVec3> {
        self.get_node(ECLIPTIC_NORMAL.cross(self.orbit_normal))
    }

    /// The descending node. See [`get_ascending_node`][Self::get_ascending_node].
    pub fn get_descending_node(&self) -> Option<DVec3> {
        self.get_node(self.orbit_normal.cross(ECLIPTIC_NORMAL))
    }

    fn get_node(&self, direction: DVec3) -> Option<DVec3> {
        let direction = direction.try_normalize()?;
        let true_anomaly =
            direction.angle_in_plane(self.semi_major_axis_basis, self.semi_minor_axis_basis);

        let true_anomaly = match self.get_kind() {
            OrbitKind::Elliptic => true_anomaly,
            OrbitKind::Parabolic | OrbitKind::Hyperbolic => {
                let signed = wrap_signed(true_anomaly);
                if signed.abs() >= anomaly::true_anomaly_asymptote(self.eccentricity) {
                    return None;
                }
                signed
            }
        };
        Some(self.get_focal_position_at_true_anomaly(true_anomaly))
    }

    /// Samples points along the orbit, relative to the attractor.
    ///
    /// See [`fill_orbit_points`][Self::fill_orbit_points].
    pub fn get_orbit_points(&self, points_count: usize, max_distance: f64) -> Vec<DVec3> {
        let mut points = Vec::with_capacity(points_count);
        self.fill_orbit_points(&mut points, points_count, max_distance);
        points
    }

    /// Replaces the contents of `points` with samples along the orbit.
    ///
    /// A closed orbit whose apoapsis lies within `max_distance` is sampled
    /// over the whole revolution, with the last point repeating the first.
    /// Otherwise the arc within `max_distance` of the attractor is sampled
    /// symmetrically around periapsis. Nothing is produced for fewer than two
    /// points, or when periapsis already lies beyond `max_distance`.
    pub fn fill_orbit_points(&self, points: &mut Vec<DVec3>, points_count: usize, max_distance: f64) {
        points.clear();
        if points_count < 2 {
            return;
        }
        let last = (points_count - 1) as f64;

        if self.get_kind() == OrbitKind::Elliptic && self.apoapsis_distance < max_distance {
            points.extend(
                (0..points_count)
                    .map(|i| self.get_focal_position_at_eccentric_anomaly(i as f64 * TAU / last)),
            );
            return;
        }

        if max_distance < self.periapsis_distance {
            return;
        }

        let max_angle = self.get_true_anomaly_for_distance(max_distance);
        points.extend((0..points_count).map(|i| {
            self.get_focal_position_at_true_anomaly(-max_angle + i as f64 * 2.0 * max_angle / last)
        }));
    }

    /// The inclination against the ecliptic plane, in `[0, π]`.
    pub fn get_inclination(&self) -> f64 {
        self.orbit_normal.angle_between(ECLIPTIC_NORMAL)
    }

    /// The longitude of the ascending node, in `[0, 2π)`.
    ///
    /// Zero for orbits lying in the ecliptic plane.
    pub fn get_ascending_node_longitude(&self) -> f64 {
        match ECLIPTIC_NORMAL.cross(self.orbit_normal).try_normalize() {
            Some(node) => node
                .dot(ECLIPTIC_UP)
                .atan2(node.dot(ECLIPTIC_RIGHT))
                .rem_euclid(TAU),
            None => 0.0,
        }
    }

    /// The argument of periapsis, in `[0, 2π)`, measured in the direction of
    /// motion from the ascending node (or from the ecliptic right axis for
    /// orbits in the ecliptic plane).
    pub fn get_argument_of_periapsis(&self) -> f64 {
        let reference = ECLIPTIC_NORMAL
            .cross(self.orbit_normal)
            .try_normalize()
            .unwrap_or(ECLIPTIC_RIGHT);
        let periapsis = self.semi_major_axis_basis;
        self.orbit_normal
            .dot(reference.cross(periapsis))
            .atan2(reference.dot(periapsis))
            .rem_euclid(TAU)
    }

    /// The matrix mapping perifocal coordinates (x toward periapsis, y along
    /// the semi-minor basis, z along the orbit normal) to attractor-relative
    /// coordinates.
    pub fn perifocal_frame(&self) -> DMat4 {
        DMat4::from_cols(
            self.semi_major_axis_basis.extend(0.0),
            self.semi_minor_axis_basis.extend(0.0),
            self.orbit_normal.extend(0.0),
            DVec4::W,
        )
    }

    /// The inverse of [`perifocal_frame`][Self::perifocal_frame], or `None`
    /// if the axis bases are degenerate.
    pub fn world_to_perifocal(&self) -> Option<DMat4> {
        self.perifocal_frame().try_invert()
    }
}

// Accessors
impl KeplerOrbit {
    /// The position relative to the attractor.
    pub fn get_position(&self) -> DVec3 {
        self.position
    }

    /// The velocity relative to the attractor.
    pub fn get_velocity(&self) -> DVec3 {
        self.velocity
    }

    /// The position and velocity relative to the attractor.
    pub fn get_state_vectors(&self) -> StateVectors {
        StateVectors {
            position: self.position,
            velocity: self.velocity,
        }
    }

    /// The mass of the attractor.
    pub fn get_attractor_mass(&self) -> f64 {
        self.attractor_mass
    }

    /// The gravitational constant.
    pub fn get_gravitational_constant(&self) -> f64 {
        self.gravitational_constant
    }

    /// The gravitational parameter, `attractor_mass * gravitational_constant`.
    #[doc(alias = "get_mu")]
    pub fn get_mg(&self) -> f64 {
        self.mg
    }

    /// The current distance from the attractor.
    pub fn get_attractor_distance(&self) -> f64 {
        self.attractor_distance
    }

    /// The specific orbital energy, `v²/2 - mg/r`.
    pub fn get_energy(&self) -> f64 {
        self.energy
    }

    /// The eccentricity.
    pub fn get_eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// The semi-major axis; zero for parabolic orbits.
    pub fn get_semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    /// The semi-minor axis; zero for parabolic orbits.
    pub fn get_semi_minor_axis(&self) -> f64 {
        self.semi_minor_axis
    }

    /// The focal parameter (semi-latus rectum).
    pub fn get_focal_parameter(&self) -> f64 {
        self.focal_parameter
    }

    /// The orbital period; infinite for open trajectories.
    pub fn get_period(&self) -> f64 {
        self.period
    }

    /// The rate of change of the mean anomaly, in radians per unit time.
    pub fn get_mean_motion(&self) -> f64 {
        self.mean_motion
    }

    /// The current true anomaly.
    pub fn get_true_anomaly(&self) -> f64 {
        self.true_anomaly
    }

    /// The current eccentric anomaly (parabolic anomaly for parabolas).
    pub fn get_eccentric_anomaly(&self) -> f64 {
        self.eccentric_anomaly
    }

    /// The current mean anomaly.
    pub fn get_mean_anomaly(&self) -> f64 {
        self.mean_anomaly
    }

    /// The unit normal of the orbital plane.
    pub fn get_orbit_normal(&self) -> DVec3 {
        self.orbit_normal
    }

    /// The unit vector from the attractor toward periapsis.
    pub fn get_semi_major_axis_basis(&self) -> DVec3 {
        self.semi_major_axis_basis
    }

    /// The unit vector along the direction of motion at periapsis.
    pub fn get_semi_minor_axis_basis(&self) -> DVec3 {
        self.semi_minor_axis_basis
    }

    /// The center of the conic, relative to the attractor.
    pub fn get_center_point(&self) -> DVec3 {
        self.center_point
    }

    /// The periapsis point, relative to the attractor.
    pub fn get_periapsis(&self) -> DVec3 {
        self.periapsis
    }

    /// The apoapsis point; infinite for open trajectories.
    pub fn get_apoapsis(&self) -> DVec3 {
        self.apoapsis
    }

    /// The distance from the attractor to periapsis.
    pub fn get_periapsis_distance(&self) -> f64 {
        self.periapsis_distance
    }

    /// The distance from the attractor to apoapsis; infinite for open
    /// trajectories.
    pub fn get_apoapsis_distance(&self) -> f64 {
        self.apoapsis_distance
    }

    /// The settings used to solve Kepler's equation.
    pub fn get_solver_config(&self) -> &KeplerSolverConfig {
        &self.solver
    }
}

/// An orbit normal for a state without angular momentum.
fn fallback_normal(position: DVec3) -> DVec3 {
    position
        .cross(ECLIPTIC_UP)
        .try_normalize()
        .or_else(|| position.cross(ECLIPTIC_RIGHT).try_normalize())
        .unwrap_or(ECLIPTIC_NORMAL)
}

/// Any unit vector perpendicular to `normal`.
fn fallback_in_plane(normal: DVec3) -> DVec3 {
    normal
        .cross(ECLIPTIC_UP)
        .try_normalize()
        .or_else(|| normal.cross(ECLIPTIC_RIGHT).try_normalize())
        .unwrap_or(ECLIPTIC_RIGHT)
}
