//! Double-precision helpers on top of [`glam`]'s `DVec3` and `DMat4`.
//!
//! glam already provides the value types (dot and cross products,
//! lengths, column-major 4x4 matrices, exact column round-trips).
//! The traits in this module add the handful of behaviours the orbit
//! code relies on that glam spells differently or not at all.

use core::f64::consts::TAU;

use glam::{DMat4, DQuat, DVec3, DVec4};

/// Squared-distance threshold used by [`DVec3Ext::approx_eq`].
pub const VECTOR_EQ_EPSILON: f64 = 1e-10;

/// Extra operations on [`DVec3`].
pub trait DVec3Ext {
    /// Normalizes the vector, returning the zero vector instead of NaN
    /// for zero-length or non-finite input.
    fn safe_normalize(self) -> DVec3;

    /// Unsigned angle between two vectors, in degrees, within `[0, 180]`.
    ///
    /// Returns zero if either vector has zero length.
    fn angle_between_deg(self, other: DVec3) -> f64;

    /// Approximate equality: the squared distance between the vectors is
    /// below [`VECTOR_EQ_EPSILON`].
    ///
    /// This is an absolute test. It is too loose for tiny vectors and
    /// too strict for huge ones, and must not be used to detect zero vectors.
    fn approx_eq(self, other: DVec3) -> bool;

    /// Angle of this vector measured from `main_axis`, in `[0, 2π)`.
    ///
    /// The unsigned angle is taken first; if the vector lies on the
    /// negative side of `secondary_axis` the angle is reflected into
    /// `[π, 2π)`.
    ///
    /// # Example
    /// ```
    /// use glam::DVec3;
    /// use kepler_transfer::DVec3Ext;
    ///
    /// let angle = DVec3::new(0.0, -1.0, 0.0).angle_in_plane(DVec3::X, DVec3::Y);
    /// assert!((angle - 1.5 * std::f64::consts::PI).abs() < 1e-12);
    /// ```
    fn angle_in_plane(self, main_axis: DVec3, secondary_axis: DVec3) -> f64;
}

impl DVec3Ext for DVec3 {
    fn safe_normalize(self) -> DVec3 {
        self.try_normalize().unwrap_or(DVec3::ZERO)
    }

    fn angle_between_deg(self, other: DVec3) -> f64 {
        if self.length_squared() == 0.0 || other.length_squared() == 0.0 {
            return 0.0;
        }
        unsigned_angle(self, other).to_degrees()
    }

    fn approx_eq(self, other: DVec3) -> bool {
        self.distance_squared(other) < VECTOR_EQ_EPSILON
    }

    fn angle_in_plane(self, main_axis: DVec3, secondary_axis: DVec3) -> f64 {
        let angle = unsigned_angle(self, main_axis);
        if self.dot(secondary_axis) < 0.0 {
            (TAU - angle).rem_euclid(TAU)
        } else {
            angle
        }
    }
}

// atan2 keeps full precision near 0 and π, where acos does not.
#[inline]
fn unsigned_angle(a: DVec3, b: DVec3) -> f64 {
    a.cross(b).length().atan2(a.dot(b))
}

/// Extra operations on [`DMat4`].
pub trait DMat4Ext {
    /// Composes translation, rotation and scale (applied in the order
    /// scale, rotate, translate).
    fn from_trs(translation: DVec3, rotation: DQuat, scale: DVec3) -> DMat4;

    /// Inverts the matrix, or returns `None` when `|det|` is below
    /// `f64::EPSILON`.
    fn try_invert(&self) -> Option<DMat4>;

    /// Inverts the matrix, returning [`DMat4::ZERO`] when it is singular.
    ///
    /// A zero result cannot be told apart from the inverse of a legitimate
    /// matrix by value alone; prefer [`try_invert`][Self::try_invert].
    fn invert_or_zero(&self) -> DMat4;

    /// Transforms a point as an affine map (w = 1, no perspective divide).
    fn transform_point(&self, point: DVec3) -> DVec3;

    /// Transforms a point and divides by the resulting w component.
    fn transform_point_projective(&self, point: DVec3) -> DVec3;

    /// Transforms a direction (w = 0, translation ignored).
    fn transform_vector(&self, vector: DVec3) -> DVec3;
}

impl DMat4Ext for DMat4 {
    fn from_trs(translation: DVec3, rotation: DQuat, scale: DVec3) -> DMat4 {
        DMat4::from_scale_rotation_translation(scale, rotation, translation)
    }

    fn try_invert(&self) -> Option<DMat4> {
        let determinant = self.determinant();
        if !determinant.is_finite() || determinant.abs() < f64::EPSILON {
            return None;
        }
        Some(self.inverse())
    }

    fn invert_or_zero(&self) -> DMat4 {
        self.try_invert().unwrap_or(DMat4::ZERO)
    }

    fn transform_point(&self, point: DVec3) -> DVec3 {
        (*self * point.extend(1.0)).truncate()
    }

    fn transform_point_projective(&self, point: DVec3) -> DVec3 {
        let v: DVec4 = *self * point.extend(1.0);
        v.truncate() / v.w
    }

    fn transform_vector(&self, vector: DVec3) -> DVec3 {
        (*self * vector.extend(0.0)).truncate()
    }
}
