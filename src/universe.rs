use core::fmt;
use std::collections::HashMap;

use glam::DVec3;
use log::{trace, warn};
use thiserror::Error;

use super::Body;

type Id = u64;

/// A registry of bodies and the attractors they orbit.
///
/// Bodies form a tree: each body may orbit a parent, whose mass becomes the
/// attractor mass of the body's orbit.
#[derive(Debug)]
pub struct Universe {
    /// Registered bodies keyed by ID, with their place in the tree.
    bodies: HashMap<Id, BodyWrapper>,

    /// ID handed to the next added body.
    next_id: Id,

    /// Listeners for bodies entering and leaving the universe.
    notifier: SpawnNotifier,

    /// The time elapsed in the universe.
    pub time: f64,

    /// The time step of the simulation.
    pub time_step: f64,

    /// The gravitational constant.
    pub g: f64,
}

/// The position of a body in the body tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyRelation {
    /// The body this one orbits.
    pub parent: Option<Id>,
    /// The bodies orbiting this one.
    pub satellites: Vec<Id>,
}

#[derive(Clone, Debug, PartialEq)]
struct BodyWrapper {
    body: Body,
    relations: BodyRelation,
}

/// An error when adding a body to a [`Universe`].
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BodyAddError {
    /// The requested parent does not exist.
    #[error("There was no body at the specified parent index.")]
    ParentNotFound,
}

/// A change in the set of bodies of a [`Universe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpawnEvent {
    /// A body was added.
    Added {
        /// The new body's ID.
        id: Id,
        /// The new body's name.
        name: String,
    },
    /// A body was removed.
    Removed {
        /// The removed body's ID.
        id: Id,
    },
}

/// A handle to a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&SpawnEvent) + Send + Sync>;

/// Delivers [`SpawnEvent`]s to registered listeners, in registration order.
#[derive(Default)]
pub struct SpawnNotifier {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl SpawnNotifier {
    /// Registers a listener and returns the handle that removes it.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SpawnEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Sends an event to every listener.
    pub fn notify(&mut self, event: &SpawnEvent) {
        trace!("spawn event {event:?} for {} listeners", self.listeners.len());
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// The number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for SpawnNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnNotifier")
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl Universe {
    /// Creates an empty universe.
    pub fn new(time_step: Option<f64>, g: Option<f64>) -> Universe {
        Universe {
            bodies: HashMap::new(),
            next_id: 0,
            notifier: SpawnNotifier::default(),
            time: 0.0,
            time_step: time_step.unwrap_or(3.6e3),
            g: g.unwrap_or(6.67430e-11),
        }
    }

    /// Registers `body`, optionally as a satellite of `satellite_of`, and
    /// returns its new ID.
    ///
    /// The body's orbit, if any, keeps its position and velocity but is
    /// re-targeted to the universe's gravitational constant and, for a
    /// satellite, to the parent's mass. Listeners receive
    /// [`SpawnEvent::Added`].
    ///
    /// # Errors
    /// Hands the body back with [`BodyAddError::ParentNotFound`] if the
    /// parent ID is unknown.
    pub fn add_body(
        &mut self,
        mut body: Body,
        satellite_of: Option<Id>,
    ) -> Result<Id, (BodyAddError, Body)> {
        let attractor_mass = match satellite_of {
            Some(parent_index) => match self.bodies.get(&parent_index) {
                Some(parent) => Some(parent.body.mass),
                None => return Err((BodyAddError::ParentNotFound, body)),
            },
            None => None,
        };
        if let Some(orbit) = &mut body.orbit {
            let mass = attractor_mass.unwrap_or(orbit.get_attractor_mass());
            orbit.set_attractor(mass, self.g);
        }

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let event = SpawnEvent::Added {
            id,
            name: body.name.clone(),
        };

        self.bodies.insert(
            id,
            BodyWrapper {
                body,
                relations: BodyRelation {
                    parent: satellite_of,
                    satellites: Vec::new(),
                },
            },
        );
        if let Some(parent_index) = satellite_of {
            if let Some(wrapper) = self.bodies.get_mut(&parent_index) {
                wrapper.relations.satellites.push(id);
            }
        }

        self.notifier.notify(&event);
        Ok(id)
    }

    /// Removes a body together with everything orbiting it.
    ///
    /// The removed bodies are returned parent first; the list is empty if
    /// `id` is unknown. Each removal emits [`SpawnEvent::Removed`] before
    /// its satellites are removed.
    pub fn remove_body(&mut self, id: Id) -> Vec<Body> {
        let Some(BodyWrapper { body, relations }) = self.bodies.remove(&id) else {
            return Vec::new();
        };
        let mut removed = vec![body];

        if let Some(parent) = relations
            .parent
            .and_then(|parent| self.bodies.get_mut(&parent))
        {
            parent.relations.satellites.retain(|&satellite| satellite != id);
        }

        self.notifier.notify(&SpawnEvent::Removed { id });

        for satellite in relations.satellites {
            removed.extend(self.remove_body(satellite));
        }

        removed
    }

    /// Registers a listener for bodies being added and removed.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SpawnEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// All registered bodies, in no particular order.
    pub fn get_bodies(&self) -> Vec<&Body> {
        self.bodies.values().map(|wrapper| &wrapper.body).collect()
    }

    /// Gets the relations of a body.
    pub fn get_body_relation(&self, index: Id) -> Option<&BodyRelation> {
        self.bodies.get(&index).map(|wrapper| &wrapper.relations)
    }

    /// The body with the given ID, mutably.
    pub fn get_body_mut(&mut self, index: Id) -> Option<&mut Body> {
        self.bodies.get_mut(&index).map(|wrapper| &mut wrapper.body)
    }

    /// The body with the given ID.
    pub fn get_body(&self, index: Id) -> Option<&Body> {
        self.bodies.get(&index).map(|wrapper| &wrapper.body)
    }

    /// The ID of the first body found with the given name.
    pub fn get_body_index_with_name(&self, name: &str) -> Option<Id> {
        self.bodies
            .iter()
            .find(|(_, w)| w.body.name == name)
            .map(|(id, _)| *id)
    }

    /// Advances every orbit by one time step.
    pub fn tick(&mut self) {
        self.advance(self.time_step);
    }

    /// Advances the universe by multiple ticks at once.
    pub fn warp(&mut self, ticks: u32) {
        self.advance(f64::from(ticks) * self.time_step);
    }

    fn advance(&mut self, delta_time: f64) {
        self.time += delta_time;

        for (id, wrapper) in &mut self.bodies {
            let Some(orbit) = &mut wrapper.body.orbit else {
                continue;
            };
            if let Err(err) = orbit.update_orbit_data_by_time(delta_time) {
                warn!("body {id} ({}) was not advanced: {err}", wrapper.body.name);
            }
        }
    }

    /// The world position of a body: the sum of the orbit positions along
    /// its chain of parents. The root of the tree sits at the origin.
    pub fn get_body_position(&self, index: Id) -> Option<DVec3> {
        self.accumulate(index, |body| {
            body.orbit
                .as_ref()
                .map_or(DVec3::ZERO, |orbit| orbit.get_position())
        })
    }

    /// The world velocity of a body, summed like
    /// [`get_body_position`][Self::get_body_position].
    pub fn get_body_velocity(&self, index: Id) -> Option<DVec3> {
        self.accumulate(index, |body| {
            body.orbit
                .as_ref()
                .map_or(DVec3::ZERO, |orbit| orbit.get_velocity())
        })
    }

    fn accumulate(&self, index: Id, value: impl Fn(&Body) -> DVec3) -> Option<DVec3> {
        let mut wrapper = self.bodies.get(&index)?;
        let mut total = value(&wrapper.body);

        while let Some(parent) = wrapper.relations.parent {
            let Some(parent_wrapper) = self.bodies.get(&parent) else {
                break;
            };
            wrapper = parent_wrapper;
            total += value(&wrapper.body);
        }

        Some(total)
    }
}

impl Default for Universe {
    fn default() -> Self {
        Universe::new(None, None)
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bodies at t={}", self.bodies.len(), self.time)
    }
}
