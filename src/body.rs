use std::{cell::Cell, rc::Rc};

use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    math::wrap_degrees, MuSetterMode2D, OrbitError, OrbitalElements, RotatingFrame, StateVectors2D,
};

/// Something that knows where the planet's center of mass is.
///
/// The body only ever reads from it. Use a plain [`DVec2`] for a planet that
/// never moves, or an `Rc<Cell<DVec2>>` to share a planet that does.
pub trait CenterOfMass {
    /// The world position of the center of mass.
    fn center_of_mass(&self) -> DVec2;
}

impl CenterOfMass for DVec2 {
    #[inline]
    fn center_of_mass(&self) -> DVec2 {
        *self
    }
}

impl CenterOfMass for Cell<DVec2> {
    #[inline]
    fn center_of_mass(&self) -> DVec2 {
        self.get()
    }
}

impl<C: CenterOfMass + ?Sized> CenterOfMass for &C {
    #[inline]
    fn center_of_mass(&self) -> DVec2 {
        (**self).center_of_mass()
    }
}

impl<C: CenterOfMass + ?Sized> CenterOfMass for Rc<C> {
    #[inline]
    fn center_of_mass(&self) -> DVec2 {
        (**self).center_of_mass()
    }
}

/// The band of distances from the center of mass an orbit has to stay in.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct RadiusLimits {
    /// The periapsis may not drop below this.
    pub min_radius: f64,
    /// The apoapsis may not rise above this.
    pub max_radius: f64,
}

impl RadiusLimits {
    /// Creates a new set of limits.
    pub fn new(min_radius: f64, max_radius: f64) -> Self {
        Self {
            min_radius,
            max_radius,
        }
    }

    /// Checks an element set against the limits.
    ///
    /// # Errors
    /// [`OrbitError::LimitExceeded`] when the periapsis is below the minimum
    /// radius or the apoapsis is above the maximum radius.
    pub fn check(&self, elements: &OrbitalElements) -> Result<(), OrbitError> {
        let periapsis = elements.get_periapsis();
        let apoapsis = elements.get_apoapsis();

        if apoapsis > self.max_radius || periapsis < self.min_radius {
            Err(OrbitError::LimitExceeded {
                periapsis,
                apoapsis,
                min_radius: self.min_radius,
                max_radius: self.max_radius,
            })
        } else {
            Ok(())
        }
    }
}

impl Default for RadiusLimits {
    /// No limits at all.
    fn default() -> Self {
        Self {
            min_radius: 0.0,
            max_radius: f64::INFINITY,
        }
    }
}

/// A body orbiting a planet.
///
/// Wraps an [`OrbitalElements`] with a center of mass, radius limits, an
/// optional [`RotatingFrame`], and a cache of sampled trajectory points.
///
/// Positions and velocities going in and out of the body are in world space
/// (or in the rotating frame, if there is one). The element set itself is
/// always relative to the center of mass and inertial.
///
/// Call [`recalculate`][Self::recalculate] every simulation tick before reading
/// the position.
///
/// # Example
/// ```
/// use glam::DVec2;
/// use kepler2d::{OrbitalBody, RadiusLimits};
///
/// let planet = DVec2::new(100.0, 0.0);
/// let mut body = OrbitalBody::circular(0.0, DVec2::new(5100.0, 0.0), planet, 1_218_470.0)
///     .unwrap()
///     .with_limits(RadiusLimits::new(1000.0, 7000.0));
///
/// body.recalculate(1.0).unwrap();
/// assert!((body.altitude() - 5000.0).abs() < 1e-6);
///
/// let points: Vec<DVec2> = body.get_orbit_world_positions(64).collect();
/// assert_eq!(points.len(), 64);
/// ```
#[derive(Clone, Debug)]
pub struct OrbitalBody<C = DVec2> {
    pub(crate) elements: OrbitalElements,
    center: C,
    limits: RadiusLimits,
    frame: Option<RotatingFrame>,

    /// The last committed state, relative to the center of mass, in the
    /// observed frame.
    state: StateVectors2D,

    /// The time `state` belongs to.
    time: f64,

    /// Sampled orbit points relative to the center of mass, in the inertial
    /// frame. `None` when stale.
    trajectory: Option<Vec<DVec2>>,
}

impl<C: CenterOfMass> OrbitalBody<C> {
    /// Wraps an existing element set.
    ///
    /// The state is evaluated at `time`.
    pub fn new(elements: OrbitalElements, center: C, time: f64) -> Self {
        let state = elements.to_cartesian(time);
        Self {
            elements,
            center,
            limits: RadiusLimits::default(),
            frame: None,
            state,
            time,
            trajectory: None,
        }
    }

    /// Creates a body on a circular orbit through its current world position.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbitShape`] if the body sits on the center of mass.
    pub fn circular(time: f64, world_position: DVec2, center: C, mu: f64) -> Result<Self, OrbitError> {
        let relative = world_position - center.center_of_mass();
        let elements = OrbitalElements::circular(time, relative, mu)?;
        Ok(Self::new(elements, center, time))
    }

    /// Sets the radius limits.
    ///
    /// The current orbit isn't checked against them; only future delta-v is.
    #[must_use]
    pub fn with_limits(mut self, limits: RadiusLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Puts the body in a rotating frame.
    ///
    /// The element set is reinterpreted as inertial and the exposed state is
    /// re-evaluated in the new frame at the current time.
    #[must_use]
    pub fn with_frame(mut self, frame: RotatingFrame) -> Self {
        self.frame = Some(frame);
        self.state = self.observe(self.time, self.elements.to_cartesian(self.time));
        self
    }

    /// Propagates the orbit to `time` and commits the new state.
    ///
    /// # Errors
    /// [`OrbitError::NumericDegenerate`] if propagation produced non-finite
    /// vectors. The previous state is kept in that case.
    pub fn recalculate(&mut self, time: f64) -> Result<StateVectors2D, OrbitError> {
        let state = self.observe(time, self.elements.to_cartesian(time));

        if !state.is_finite() {
            return Err(OrbitError::NumericDegenerate {
                position: state.position,
                velocity: state.velocity,
            });
        }

        self.state = state;
        self.time = time;

        Ok(state)
    }

    /// Re-derives the orbit from a world position and velocity.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbitShape`] when the state isn't a bound ellipse.
    /// Nothing about the body changes in that case.
    pub fn set_orbit(&mut self, time: f64, world_position: DVec2, velocity: DVec2) -> Result<(), OrbitError> {
        let observed = StateVectors2D {
            position: world_position - self.center.center_of_mass(),
            velocity,
        };
        let inertial = self.unobserve(time, observed);

        self.elements
            .set_orbit(time, inertial.position, inertial.velocity)?;

        self.state = observed;
        self.time = time;
        self.trajectory = None;

        Ok(())
    }

    /// Derives a fresh circular orbit from the given world position.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbitShape`] if the body sits on the center of mass.
    pub fn initialize_orbit(&mut self, time: f64, world_position: DVec2) -> Result<(), OrbitError> {
        let relative = world_position - self.center.center_of_mass();
        let inertial_position = match self.frame {
            Some(frame) => frame.to_inertial_position(time, relative),
            None => relative,
        };

        self.elements.set_circular_orbit(time, inertial_position)?;
        self.state = self.observe(time, self.elements.to_cartesian(time));
        self.time = time;
        self.trajectory = None;

        Ok(())
    }

    /// Applies an instantaneous velocity change at the current position.
    ///
    /// The new orbit is derived from the last committed state with `delta_v`
    /// added to its velocity. It's only committed if it's a bound ellipse
    /// that stays inside the radius limits; otherwise the body is left
    /// exactly as it was.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbitShape`] or [`OrbitError::LimitExceeded`].
    pub fn add_delta_v(&mut self, time: f64, delta_v: DVec2) -> Result<(), OrbitError> {
        let observed = StateVectors2D {
            position: self.state.position,
            velocity: self.state.velocity + delta_v,
        };
        let inertial = self.unobserve(time, observed);

        let candidate = OrbitalElements::from_state_vectors(
            time,
            inertial,
            self.elements.get_gravitational_parameter(),
        )
        .and_then(|candidate| {
            self.limits.check(&candidate)?;
            Ok(candidate)
        });

        match candidate {
            Ok(candidate) => {
                self.elements = candidate;
                self.state = observed;
                self.time = time;
                self.trajectory = None;
                Ok(())
            }
            Err(err) => {
                debug!(time, %delta_v, "discarded delta-v: {err}");
                Err(err)
            }
        }
    }

    /// Changes the gravitational parameter, for example after the speed
    /// multiplier changed.
    ///
    /// # Errors
    /// See [`OrbitalElements::set_gravitational_parameter`].
    pub fn set_gravitational_parameter(&mut self, mu: f64, mode: MuSetterMode2D) -> Result<(), OrbitError> {
        self.elements.set_gravitational_parameter(mu, mode)?;
        self.trajectory = None;
        Ok(())
    }

    /// Gets `n` points along the orbit in world space, for drawing.
    ///
    /// The points are sampled lazily and cached until `n` changes or the orbit
    /// does. The center of mass and rotating frame are applied on the way out,
    /// so a moving planet doesn't invalidate the cache.
    ///
    /// The returned iterator can be cloned and restarted freely.
    pub fn get_orbit_world_positions(
        &mut self,
        n: usize,
    ) -> impl ExactSizeIterator<Item = DVec2> + Clone + '_ {
        let stale = self
            .trajectory
            .as_ref()
            .map_or(true, |points| points.len() != n);

        if stale {
            trace!(n, "resampling trajectory");
            self.trajectory = Some(self.elements.get_orbit_coordinates(n));
        }

        let center = self.center.center_of_mass();
        let frame = self.frame;
        let time = self.time;

        self.trajectory
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(move |&point| {
                let observed = match frame {
                    Some(frame) => frame.from_inertial_position(time, point),
                    None => point,
                };
                center + observed
            })
    }

    /// Gravitational acceleration felt at an arbitrary world position.
    pub fn gravitational_acceleration_at(&self, world_position: DVec2) -> DVec2 {
        let relative = world_position - self.center.center_of_mass();
        let distance_squared = relative.length_squared();

        -relative.normalize_or_zero() * (self.elements.get_gravitational_parameter() / distance_squared)
    }

    fn observe(&self, time: f64, inertial: StateVectors2D) -> StateVectors2D {
        match self.frame {
            Some(frame) => frame.from_inertial(time, inertial),
            None => inertial,
        }
    }

    fn unobserve(&self, time: f64, observed: StateVectors2D) -> StateVectors2D {
        match self.frame {
            Some(frame) => frame.to_inertial(time, observed),
            None => observed,
        }
    }

    /// The world position as of the last committed state.
    pub fn position(&self) -> DVec2 {
        self.center.center_of_mass() + self.state.position
    }

    /// The velocity as of the last committed state.
    pub fn velocity(&self) -> DVec2 {
        self.state.velocity
    }

    /// The position relative to the center of mass.
    pub fn relative_position(&self) -> DVec2 {
        self.state.position
    }

    /// The distance from the center of mass.
    pub fn altitude(&self) -> f64 {
        self.state.position.length()
    }

    /// Unit vector along the velocity.
    pub fn prograde(&self) -> DVec2 {
        self.state.velocity.normalize_or_zero()
    }

    /// Unit vector against the velocity.
    pub fn retrograde(&self) -> DVec2 {
        -self.prograde()
    }

    /// Unit vector pointing away from the center of mass.
    pub fn zenith(&self) -> DVec2 {
        self.state.position.normalize_or_zero()
    }

    /// Unit vector pointing towards the center of mass.
    pub fn nadir(&self) -> DVec2 {
        -self.zenith()
    }

    /// The heading of the velocity in degrees, counterclockwise from +x,
    /// in `[0, 360)`.
    pub fn prograde_rotation(&self) -> f64 {
        let velocity = self.state.velocity;
        wrap_degrees(velocity.y.atan2(velocity.x).to_degrees())
    }

    /// Gravitational acceleration at the current position, `mu / r^2` along
    /// the nadir.
    pub fn gravitational_acceleration(&self) -> DVec2 {
        self.nadir() * (self.elements.get_gravitational_parameter() / self.state.position.length_squared())
    }

    /// The current element set.
    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    /// The radius limits.
    pub fn limits(&self) -> RadiusLimits {
        self.limits
    }

    /// The rotating frame, if any.
    pub fn frame(&self) -> Option<RotatingFrame> {
        self.frame
    }

    /// The center of mass this body orbits.
    pub fn center(&self) -> &C {
        &self.center
    }

    /// The last committed state, relative to the center of mass.
    pub fn state(&self) -> StateVectors2D {
        self.state
    }

    /// The time of the last committed state.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub(crate) fn invalidate_trajectory(&mut self) {
        self.trajectory = None;
    }
}
