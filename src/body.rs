use crate::KeplerOrbit;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named body registered in a [`Universe`][crate::Universe].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Body {
    /// Used by [`Universe::get_body_index_with_name`][crate::Universe::get_body_index_with_name].
    pub name: String,

    /// The mass; it becomes the attractor mass of every satellite's orbit.
    pub mass: f64,

    /// The physical radius.
    pub radius: f64,

    /// The path around the parent body, relative to it. Root bodies
    /// usually have none and sit at the origin.
    pub orbit: Option<KeplerOrbit>,
}

impl Body {
    /// Creates a body. Pass `None` as the orbit for a root body.
    pub fn new(name: impl Into<String>, mass: f64, radius: f64, orbit: Option<KeplerOrbit>) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
            orbit,
        }
    }
}
