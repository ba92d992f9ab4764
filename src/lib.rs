//! # Planar Keplerian Orbit Engine
//! This library crate contains the orbital mechanics behind a 2D space game:
//! bodies that move around a single dominant planet, on Keplerian orbits
//! confined to the plane of the screen.
//!
//! Keplerian orbits are special in that they are more stable and predictable than
//! Newtonian orbits. Instead of stepping velocities forward in time, the orbit is
//! described by a handful of orbital elements, and the position and velocity at
//! *any* time can be computed directly from them. Collisions and thrust are
//! modelled as instantaneous velocity changes (delta-v) that re-derive the
//! elements from the perturbed state.
//!
//! ## Getting started
//! This crate is built in layers, leaf-first:
//! - [`solve_kepler`]: Newton's method on Kepler's equation, turning a mean
//!   anomaly into an eccentric anomaly.
//! - [`OrbitalElements`]: The canonical description of an elliptic orbit.
//!   Converts elements into state vectors ([`to_cartesian`][OrbitalElements::to_cartesian])
//!   and state vectors into elements ([`set_orbit`][OrbitalElements::set_orbit]).
//! - [`OrbitalBody`]: Binds an element set to a center of mass, enforces
//!   radius limits, and caches sampled trajectory points for rendering.
//! - [`OrbitalRigidbody`]: Drives a body once per fixed simulation step and
//!   couples it to a physics engine's rigid body through the [`RigidBody2D`] trait.
//!
//! Around the core there's an optional [`RotatingFrame`] layer, an
//! [`ElementOverrides`] authoring API for tools, and the [`config`] module
//! for loading engine settings.
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec2;
//!
//! use kepler2d::OrbitalElements;
//!
//! # fn main() {
//! let mu = 1_218_470.0;
//! let orbit = OrbitalElements::circular(0.0, DVec2::new(5000.0, 0.0), mu).unwrap();
//!
//! let state = orbit.to_cartesian(0.0);
//!
//! assert!((state.position - DVec2::new(5000.0, 0.0)).length() < 1e-6);
//! assert!((state.velocity.y - (mu / 5000.0_f64).sqrt()).abs() < 1e-9);
//! # }
//! ```

#![warn(missing_docs)]

pub mod authoring;
mod body;
pub mod config;
mod elements;
mod frame;
mod math;
pub mod rigidbody;
mod solvers;

use glam::DVec2;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use authoring::ElementOverrides;
pub use body::{CenterOfMass, OrbitalBody, RadiusLimits};
pub use config::{OrbitConfig, RigidbodyConfig};
pub use elements::{
    MuSetterMode2D, OrbitDirection, OrbitalElements, CIRCULAR_ECCENTRICITY, MAX_ECCENTRICITY,
};
pub use frame::RotatingFrame;
pub use math::{wrap_angle, wrap_degrees};
pub use rigidbody::{
    ColliderTag, Contact, OrbitalRigidbody, PointMass, RigidBody2D, TickOutcome, UpdateMode,
};
pub use solvers::{
    solve_kepler, KeplerSolution, KEPLER_MAX_BISECTIONS, KEPLER_MAX_ITERS, KEPLER_TOLERANCE,
};

/// A struct representing a position and velocity at a point in the orbit.
///
/// The position and velocity vectors are two-dimensional and, unless stated
/// otherwise, relative to the center of mass of the planet.
///
/// State vectors can be turned into an orbit using
/// [`OrbitalElements::from_state_vectors`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateVectors2D {
    /// The 2D position at a point in the orbit.
    pub position: DVec2,
    /// The 2D velocity at a point in the orbit.
    pub velocity: DVec2,
}

impl StateVectors2D {
    /// Whether both vectors only contain finite numbers.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// An error to describe why an orbit mutation or evaluation was refused.
///
/// None of these are fatal. Rejected mutations leave the previous element set
/// in place, and a degenerate evaluation just means the result must not be
/// used this tick.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum OrbitError {
    /// ### The state vectors do not describe a bound elliptic orbit.
    /// Orbit determination produced an eccentricity outside `[0, 1)` or a
    /// non-positive semi-major axis. Escape trajectories, radial free-fall
    /// and a body sitting on the center of mass all end up here.
    #[error("invalid orbit shape (eccentricity = {eccentricity}, semi-major axis = {semi_major_axis})")]
    InvalidOrbitShape {
        /// The eccentricity that was computed.
        eccentricity: f64,
        /// The semi-major axis that was computed.
        semi_major_axis: f64,
    },

    /// ### The orbit would leave the allowed band of radii.
    /// The delta-v would push the apoapsis above the maximum radius or the
    /// periapsis below the minimum radius. The delta-v was discarded.
    #[error(
        "orbit limits exceeded (periapsis = {periapsis}, apoapsis = {apoapsis}, \
        allowed = {min_radius}..={max_radius})"
    )]
    LimitExceeded {
        /// The periapsis of the rejected orbit.
        periapsis: f64,
        /// The apoapsis of the rejected orbit.
        apoapsis: f64,
        /// The configured minimum radius.
        min_radius: f64,
        /// The configured maximum radius.
        max_radius: f64,
    },

    /// ### The gravitational parameter is not a positive finite number.
    /// Orbits only exist around something with mass. The element set was
    /// left as it was.
    #[error("invalid gravitational parameter (mu = {mu})")]
    InvalidGravitationalParameter {
        /// The rejected gravitational parameter.
        mu: f64,
    },

    /// ### Propagation produced non-finite state vectors.
    /// The results must not be applied to anything this tick.
    #[error("orbit propagation produced non-finite state (position = {position}, velocity = {velocity})")]
    NumericDegenerate {
        /// The offending position.
        position: DVec2,
        /// The offending velocity.
        velocity: DVec2,
    },
}

#[cfg(test)]
mod tests;
