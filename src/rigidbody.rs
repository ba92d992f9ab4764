//! Coupling between an [`OrbitalBody`] and a physics engine's rigid body.
//!
//! [`OrbitalRigidbody::fixed_update`] is meant to be called once per fixed
//! simulation step, and [`OrbitalRigidbody::on_collision`] whenever the physics
//! engine reports contacts for the body. Within one step, call `fixed_update`
//! first: collision delta-v is applied on top of the state it commits.

use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    CenterOfMass, OrbitConfig, OrbitError, OrbitalBody, RadiusLimits, RigidbodyConfig,
};

/// The rigid body a physics engine simulates for us.
///
/// Only the handful of operations the orbit coupling needs are required.
pub trait RigidBody2D {
    /// World position.
    fn position(&self) -> DVec2;
    /// World velocity.
    fn velocity(&self) -> DVec2;
    /// Mass.
    fn mass(&self) -> f64;
    /// Teleports the body.
    fn set_position(&mut self, position: DVec2);
    /// Overwrites the velocity.
    fn set_velocity(&mut self, velocity: DVec2);
    /// Sets the heading, in degrees counterclockwise from +x.
    fn set_rotation(&mut self, degrees: f64);
    /// Adds a force to be integrated on the next physics step.
    fn add_force(&mut self, force: DVec2);
}

/// How the orbit and the rigid body are kept in sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum UpdateMode {
    /// The orbit is authoritative. Every tick the rigid body is moved onto the
    /// analytic orbit, and collisions only act through delta-v.
    #[default]
    FollowOrbit,
    /// The physics engine is authoritative. Every tick the orbit is re-derived
    /// from the rigid body's state and a gravity force is applied for the
    /// engine to integrate. When the body has a [`RotatingFrame`], the
    /// rigid body lives in rotating coordinates, so the Coriolis and
    /// centrifugal forces are added as well.
    ///
    /// [`RotatingFrame`]: crate::RotatingFrame
    Forces,
}

/// Who the other side of a contact was.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColliderTag {
    /// The player's collider. Its impulses are scaled by
    /// [`RigidbodyConfig::player_impulse_weight`].
    Player,
    /// Anything else.
    #[default]
    Other,
}

/// One contact point reported by the physics engine.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contact {
    /// Unit normal, pointing in the direction this body gets pushed.
    pub normal: DVec2,
    /// The impulse along the normal.
    pub normal_impulse: f64,
    /// The collider on the other side.
    pub collider: ColliderTag,
}

/// What a call to [`OrbitalRigidbody::fixed_update`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// The tick's results were applied to the rigid body.
    Applied,
    /// Gravity was applied, but the observed state couldn't be turned into
    /// an orbit. The previous element set is kept. Only happens in
    /// [`UpdateMode::Forces`].
    OrbitRejected(OrbitError),
    /// Nothing was applied to the rigid body this tick.
    Skipped(OrbitError),
}

/// An orbiting body bolted to a rigid body.
#[derive(Clone, Debug)]
pub struct OrbitalRigidbody<R, C = DVec2> {
    body: OrbitalBody<C>,
    rigidbody: R,
    config: RigidbodyConfig,
}

impl<R: RigidBody2D, C: CenterOfMass> OrbitalRigidbody<R, C> {
    /// Couples an existing body to a rigid body.
    pub fn new(body: OrbitalBody<C>, rigidbody: R, config: RigidbodyConfig) -> Self {
        Self {
            body,
            rigidbody,
            config,
        }
    }

    /// Creates the orbit from where the rigid body currently is, as a circular
    /// orbit around `center`.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbitShape`] if the rigid body sits on the center
    /// of mass.
    pub fn from_placement(
        time: f64,
        rigidbody: R,
        center: C,
        orbit: &OrbitConfig,
        limits: RadiusLimits,
        config: RigidbodyConfig,
    ) -> Result<Self, OrbitError> {
        let body = OrbitalBody::circular(
            time,
            rigidbody.position(),
            center,
            orbit.gravitational_parameter(),
        )?
        .with_limits(limits);

        Ok(Self::new(body, rigidbody, config))
    }

    /// Throws away the orbit and derives a circular one from where the rigid
    /// body is now.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbitShape`] if the rigid body sits on the center
    /// of mass.
    pub fn initialize_orbit(&mut self, time: f64) -> Result<(), OrbitError> {
        let position = self.rigidbody.position();
        self.body.initialize_orbit(time, position)
    }

    /// Advances one fixed simulation step.
    ///
    /// Non-finite state is never handed to the rigid body; the tick is skipped
    /// instead.
    pub fn fixed_update(&mut self, time: f64) -> TickOutcome {
        match self.config.update_mode {
            UpdateMode::FollowOrbit => self.follow_orbit(time),
            UpdateMode::Forces => self.apply_forces(time),
        }
    }

    fn follow_orbit(&mut self, time: f64) -> TickOutcome {
        if let Err(err) = self.body.recalculate(time) {
            warn!(time, "skipping tick: {err}");
            return TickOutcome::Skipped(err);
        }

        self.rigidbody.set_position(self.body.position());
        self.rigidbody.set_velocity(self.body.velocity());
        self.rigidbody.set_rotation(self.body.prograde_rotation());

        TickOutcome::Applied
    }

    fn apply_forces(&mut self, time: f64) -> TickOutcome {
        let position = self.rigidbody.position();
        let velocity = self.rigidbody.velocity();

        if !position.is_finite() || !velocity.is_finite() {
            let err = OrbitError::NumericDegenerate { position, velocity };
            warn!(time, "skipping tick: {err}");
            return TickOutcome::Skipped(err);
        }

        let mut acceleration = self.body.gravitational_acceleration_at(position);
        if let Some(frame) = self.body.frame() {
            let relative = position - self.body.center().center_of_mass();
            acceleration += frame.fictitious_acceleration(relative, velocity);
        }

        let force = acceleration * self.rigidbody.mass();
        if !force.is_finite() {
            let err = OrbitError::NumericDegenerate { position, velocity };
            warn!(time, %force, "skipping tick: {err}");
            return TickOutcome::Skipped(err);
        }

        let outcome = match self.body.set_orbit(time, position, velocity) {
            Ok(()) => TickOutcome::Applied,
            Err(err) => TickOutcome::OrbitRejected(err),
        };

        self.rigidbody.add_force(force);

        outcome
    }

    /// The delta-v a set of contacts imparts on this body.
    ///
    /// Each contact contributes `normal * normal_impulse / mass`, scaled by the
    /// player weight for player contacts. Zero-impulse contacts contribute
    /// nothing.
    pub fn collision_delta_v(&self, contacts: &[Contact]) -> DVec2 {
        let mass = self.rigidbody.mass();
        if !(mass > 0.0) {
            return DVec2::ZERO;
        }

        contacts
            .iter()
            .filter(|contact| contact.normal_impulse != 0.0)
            .map(|contact| {
                let weight = match contact.collider {
                    ColliderTag::Player => self.config.player_impulse_weight,
                    ColliderTag::Other => 1.0,
                };
                contact.normal * (contact.normal_impulse / mass * weight)
            })
            .sum()
    }

    /// Perturbs the orbit with the delta-v from a set of contacts.
    ///
    /// # Errors
    /// See [`OrbitalBody::add_delta_v`]. A rejected delta-v is discarded
    /// entirely.
    pub fn on_collision(&mut self, time: f64, contacts: &[Contact]) -> Result<(), OrbitError> {
        let delta_v = self.collision_delta_v(contacts);
        if delta_v == DVec2::ZERO {
            return Ok(());
        }

        self.body.add_delta_v(time, delta_v)
    }

    /// The orbiting body.
    pub fn body(&self) -> &OrbitalBody<C> {
        &self.body
    }

    /// The orbiting body, mutably.
    pub fn body_mut(&mut self) -> &mut OrbitalBody<C> {
        &mut self.body
    }

    /// The rigid body.
    pub fn rigidbody(&self) -> &R {
        &self.rigidbody
    }

    /// The rigid body, mutably.
    pub fn rigidbody_mut(&mut self) -> &mut R {
        &mut self.rigidbody
    }

    /// The coupling configuration.
    pub fn config(&self) -> &RigidbodyConfig {
        &self.config
    }

    /// Splits the coupling back into its parts.
    pub fn into_parts(self) -> (OrbitalBody<C>, R) {
        (self.body, self.rigidbody)
    }
}

/// The simplest possible [`RigidBody2D`]: a point mass integrated with
/// semi-implicit Euler.
///
/// Useful for running the engine headless.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointMass {
    /// World position.
    pub position: DVec2,
    /// World velocity.
    pub velocity: DVec2,
    /// Mass.
    pub mass: f64,
    /// Heading in degrees.
    pub rotation: f64,
    /// Forces accumulated since the last step.
    pub force: DVec2,
}

impl PointMass {
    /// Creates a point mass at rest.
    pub fn new(position: DVec2, mass: f64) -> Self {
        Self {
            position,
            mass,
            ..Default::default()
        }
    }

    /// Integrates the accumulated forces over `dt` and clears them.
    ///
    /// Velocity is kicked first, then position drifts with the new velocity,
    /// which keeps orbits from spiralling outwards the way explicit Euler does.
    pub fn step(&mut self, dt: f64) {
        self.velocity += self.force / self.mass * dt;
        self.position += self.velocity * dt;
        self.force = DVec2::ZERO;
    }
}

impl RigidBody2D for PointMass {
    fn position(&self) -> DVec2 {
        self.position
    }

    fn velocity(&self) -> DVec2 {
        self.velocity
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn set_position(&mut self, position: DVec2) {
        self.position = position;
    }

    fn set_velocity(&mut self, velocity: DVec2) {
        self.velocity = velocity;
    }

    fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees;
    }

    fn add_force(&mut self, force: DVec2) {
        self.force += force;
    }
}
