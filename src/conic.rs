//! Ellipses and hyperbolas built from two foci and one point on the curve.

use glam::DVec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{anomaly, DVec3Ext, DegenerateConic, OrbitError};

/// Relative threshold below which the point is considered to lie on the
/// line through both foci.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// The frame shared by both conic kinds: foci, center, and an orthonormal
/// in-plane basis whose secondary axis points toward the defining point.
///
/// A point on the line through the foci leaves the plane undefined; the
/// optional normal hint then picks it, with the secondary axis set to
/// `normalize(hint × axis_main)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct ConicFrame {
    focus0: DVec3,
    focus1: DVec3,
    center: DVec3,
    axis_main: DVec3,
    axis_secondary: DVec3,
    /// Distance from the center to each focus.
    c: f64,
    distance0: f64,
    distance1: f64,
}

impl ConicFrame {
    fn new(
        focus0: DVec3,
        focus1: DVec3,
        point: DVec3,
        normal_hint: Option<DVec3>,
    ) -> Result<Self, DegenerateConic> {
        let separation = focus1 - focus0;
        let axis_main = separation
            .try_normalize()
            .ok_or(DegenerateConic::CoincidentFoci)?;

        let to_point = point - focus0;
        let distance0 = to_point.length();
        let distance1 = point.distance(focus1);
        if distance0 == 0.0 || distance1 == 0.0 {
            return Err(DegenerateConic::PointOnFocus);
        }

        let perpendicular = to_point - axis_main * to_point.dot(axis_main);
        let axis_secondary = if perpendicular.length() > COLLINEAR_TOLERANCE * distance0 {
            perpendicular.normalize()
        } else {
            normal_hint
                .and_then(|normal| normal.cross(axis_main).try_normalize())
                .ok_or(DegenerateConic::CollinearPoints)?
        };

        Ok(Self {
            focus0,
            focus1,
            center: (focus0 + focus1) * 0.5,
            axis_main,
            axis_secondary,
            c: separation.length() * 0.5,
            distance0,
            distance1,
        })
    }
}

/// An ellipse defined by its two foci and a point on the curve.
///
/// Anomalies are measured about `focus0`: the eccentric anomaly is zero at
/// the vertex nearest to `focus0` and increases in the sense given by
/// [`normal`][Self::normal], so an orbit around `focus0` with the same
/// normal visits the sample points in order.
///
/// # Example
/// ```
/// use glam::DVec3;
/// use kepler_transfer::EllipseData;
///
/// let ellipse = EllipseData::new(
///     DVec3::ZERO,
///     DVec3::new(6.0, 0.0, 0.0),
///     DVec3::new(3.0, 4.0, 0.0),
/// ).unwrap();
///
/// assert!((ellipse.a() - 5.0).abs() < 1e-12);
/// assert!((ellipse.b() - 4.0).abs() < 1e-12);
/// assert!((ellipse.eccentricity() - 0.6).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EllipseData {
    frame: ConicFrame,
    a: f64,
    b: f64,
    eccentricity: f64,
}

impl EllipseData {
    /// Builds the ellipse with foci `focus0`, `focus1` passing through `point`.
    ///
    /// # Errors
    /// [`OrbitError::DegenerateConic`] when the foci coincide (a circle has
    /// no defined main axis), when `point` is on a focus, or when `point` is
    /// collinear with the foci.
    pub fn new(focus0: DVec3, focus1: DVec3, point: DVec3) -> Result<Self, OrbitError> {
        Self::with_normal_hint(focus0, focus1, point, None)
    }

    /// Like [`new`][Self::new], but a `point` collinear with the foci is
    /// accepted when `normal_hint` is given and not parallel to the main
    /// axis. The ellipse then lies in the plane perpendicular to the hint.
    ///
    /// # Errors
    /// See [`new`][Self::new].
    pub fn with_normal_hint(
        focus0: DVec3,
        focus1: DVec3,
        point: DVec3,
        normal_hint: Option<DVec3>,
    ) -> Result<Self, OrbitError> {
        let frame = ConicFrame::new(focus0, focus1, point, normal_hint)?;
        let a = (frame.distance0 + frame.distance1) * 0.5;

        Ok(Self {
            frame,
            a,
            b: (a * a - frame.c * frame.c).max(0.0).sqrt(),
            eccentricity: frame.c / a,
        })
    }

    /// The same ellipse with its secondary axis negated, reversing the
    /// direction in which anomalies advance.
    #[must_use]
    pub fn with_flipped_secondary_axis(mut self) -> Self {
        self.frame.axis_secondary = -self.frame.axis_secondary;
        self
    }

    /// The semi-major axis.
    pub fn a(&self) -> f64 {
        self.a
    }

    /// The semi-minor axis.
    pub fn b(&self) -> f64 {
        self.b
    }

    /// Half the distance between the foci.
    pub fn c(&self) -> f64 {
        self.frame.c
    }

    /// `c / a`.
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// The first focus.
    pub fn focus0(&self) -> DVec3 {
        self.frame.focus0
    }

    /// The second focus.
    pub fn focus1(&self) -> DVec3 {
        self.frame.focus1
    }

    /// The midpoint between the foci.
    pub fn center(&self) -> DVec3 {
        self.frame.center
    }

    /// Unit vector from `focus0` toward `focus1`.
    pub fn axis_main(&self) -> DVec3 {
        self.frame.axis_main
    }

    /// Unit vector in the plane, perpendicular to the main axis.
    pub fn axis_secondary(&self) -> DVec3 {
        self.frame.axis_secondary
    }

    /// `normalize(axis_main × axis_secondary)`.
    pub fn normal(&self) -> DVec3 {
        self.frame
            .axis_main
            .cross(self.frame.axis_secondary)
            .safe_normalize()
    }

    /// The point on the ellipse at the given eccentric anomaly.
    pub fn get_sample_point(&self, eccentric_anomaly: f64) -> DVec3 {
        let (sin_e, cos_e) = eccentric_anomaly.sin_cos();
        self.frame.center
            - self.frame.axis_main * (self.a * cos_e)
            - self.frame.axis_secondary * (self.b * sin_e)
    }

    /// The true anomaly of `point` about `focus0`, in `[0, 2π)`.
    pub fn get_true_anomaly_for_point(&self, point: DVec3) -> f64 {
        (point - self.frame.focus0)
            .angle_in_plane(-self.frame.axis_main, -self.frame.axis_secondary)
    }

    /// The eccentric anomaly of `point`, in `[0, 2π)`.
    ///
    /// `point` is assumed to lie on the ellipse; for other points this is
    /// the anomaly of the ellipse point in the same direction from `focus0`.
    pub fn get_eccentric_anomaly_for_point(&self, point: DVec3) -> f64 {
        anomaly::true_to_eccentric_anomaly(self.get_true_anomaly_for_point(point), self.eccentricity)
    }
}

/// One of the two disconnected branches of a hyperbola.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HyperbolaBranch {
    /// The branch containing the point the hyperbola was built from.
    Main,
    /// The other branch.
    Opposite,
}

/// A hyperbola defined by its two foci and a point on the curve.
///
/// When the point is equidistant from both foci, `a` is zero and the
/// eccentricity infinite: the "hyperbola" collapses onto the perpendicular
/// bisector of the foci, which both branches then share. Sample points
/// remain valid in that case.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HyperbolaData {
    frame: ConicFrame,
    a: f64,
    b: f64,
    eccentricity: f64,
    /// +1 when the main branch lies on the `focus1` side of the center.
    main_branch_sign: f64,
}

impl HyperbolaData {
    /// Builds the hyperbola with foci `focus0`, `focus1` passing through `point`.
    ///
    /// # Errors
    /// [`OrbitError::DegenerateConic`] when the foci coincide, when `point`
    /// is on a focus, or when `point` is collinear with the foci.
    pub fn new(focus0: DVec3, focus1: DVec3, point: DVec3) -> Result<Self, OrbitError> {
        Self::with_normal_hint(focus0, focus1, point, None)
    }

    /// Like [`new`][Self::new], but a `point` collinear with the foci is
    /// accepted when `normal_hint` is given and not parallel to the main
    /// axis.
    ///
    /// # Errors
    /// See [`new`][Self::new].
    ///
    /// # Example
    /// ```
    /// use glam::DVec3;
    /// use kepler_transfer::HyperbolaData;
    ///
    /// let (p0, p1, attractor) = (DVec3::new(10.0, 0.0, 0.0), DVec3::new(-20.0, 0.0, 0.0), DVec3::ZERO);
    /// assert!(HyperbolaData::new(p0, p1, attractor).is_err());
    ///
    /// let hyperbola = HyperbolaData::with_normal_hint(p0, p1, attractor, Some(DVec3::Z)).unwrap();
    /// assert_eq!(hyperbola.a(), 5.0);
    /// assert_eq!(hyperbola.normal(), DVec3::Z);
    /// ```
    pub fn with_normal_hint(
        focus0: DVec3,
        focus1: DVec3,
        point: DVec3,
        normal_hint: Option<DVec3>,
    ) -> Result<Self, OrbitError> {
        let frame = ConicFrame::new(focus0, focus1, point, normal_hint)?;
        let a = (frame.distance0 - frame.distance1).abs() * 0.5;

        Ok(Self {
            frame,
            a,
            b: (frame.c * frame.c - a * a).max(0.0).sqrt(),
            eccentricity: frame.c / a,
            main_branch_sign: branch_sign(&frame, point),
        })
    }

    /// The distance from the center to either vertex.
    pub fn a(&self) -> f64 {
        self.a
    }

    /// The conjugate semi-axis.
    pub fn b(&self) -> f64 {
        self.b
    }

    /// Half the distance between the foci.
    pub fn c(&self) -> f64 {
        self.frame.c
    }

    /// `c / a`.
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// The first focus.
    pub fn focus0(&self) -> DVec3 {
        self.frame.focus0
    }

    /// The second focus.
    pub fn focus1(&self) -> DVec3 {
        self.frame.focus1
    }

    /// The midpoint between the foci.
    pub fn center(&self) -> DVec3 {
        self.frame.center
    }

    /// Unit vector from `focus0` toward `focus1`.
    pub fn axis_main(&self) -> DVec3 {
        self.frame.axis_main
    }

    /// Unit vector in the plane, perpendicular to the main axis, pointing
    /// toward the side of the defining point.
    pub fn axis_secondary(&self) -> DVec3 {
        self.frame.axis_secondary
    }

    /// `normalize(axis_main × axis_secondary)`.
    pub fn normal(&self) -> DVec3 {
        self.frame
            .axis_main
            .cross(self.frame.axis_secondary)
            .safe_normalize()
    }

    /// The branch lying on the same side of the center as `point`.
    pub fn branch_toward(&self, point: DVec3) -> HyperbolaBranch {
        if branch_sign(&self.frame, point) == self.main_branch_sign {
            HyperbolaBranch::Main
        } else {
            HyperbolaBranch::Opposite
        }
    }

    /// The point at hyperbolic parameter `t` on the chosen branch.
    ///
    /// `t = 0` is the branch vertex, which lies on the segment between
    /// the foci.
    pub fn get_sample_point_on_branch(&self, t: f64, branch: HyperbolaBranch) -> DVec3 {
        let side = match branch {
            HyperbolaBranch::Main => self.main_branch_sign,
            HyperbolaBranch::Opposite => -self.main_branch_sign,
        };
        self.frame.center
            + self.frame.axis_main * (side * self.a * t.cosh())
            + self.frame.axis_secondary * (self.b * t.sinh())
    }
}

fn branch_sign(frame: &ConicFrame, point: DVec3) -> f64 {
    if (point - frame.center).dot(frame.axis_main) < 0.0 {
        -1.0
    } else {
        1.0
    }
}
