//! Direct element editing for tools and debugging.
//!
//! Gameplay code should only ever change an orbit through
//! [`set_orbit`][crate::OrbitalBody::set_orbit] and
//! [`add_delta_v`][crate::OrbitalBody::add_delta_v]. Level editors and debug
//! panels sometimes want to poke individual elements instead; they go through
//! [`ElementOverrides`], which rebuilds the whole element set and checks it
//! against the same rules before committing anything.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CenterOfMass, OrbitError, OrbitalBody, OrbitalElements};

/// A partial set of orbital elements. `None` keeps the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct ElementOverrides {
    /// New semi-major axis.
    pub semi_major_axis: Option<f64>,
    /// New eccentricity.
    pub eccentricity: Option<f64>,
    /// New argument of periapsis, in radians.
    pub arg_pe: Option<f64>,
    /// New periapsis time.
    pub periapsis_time: Option<f64>,
}

impl ElementOverrides {
    /// Whether nothing would change.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Builds the element set that results from applying these overrides.
    ///
    /// The gravitational parameter and direction of travel are kept. The epoch
    /// is moved to `time`, so the true anomaly at epoch matches wherever the
    /// new elements put the body at `time`.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbitShape`] if the result isn't a bound ellipse.
    pub fn apply_to(&self, time: f64, elements: &OrbitalElements) -> Result<OrbitalElements, OrbitError> {
        let overridden = OrbitalElements::with_elements(
            self.semi_major_axis
                .unwrap_or_else(|| elements.get_semi_major_axis()),
            self.eccentricity.unwrap_or_else(|| elements.get_eccentricity()),
            self.arg_pe.unwrap_or_else(|| elements.get_arg_pe()),
            self.periapsis_time
                .unwrap_or_else(|| elements.get_periapsis_time()),
            elements.get_gravitational_parameter(),
            elements.get_direction(),
        )?;

        Ok(overridden.with_epoch_at(time))
    }
}

impl<C: CenterOfMass> OrbitalBody<C> {
    /// Replaces individual orbital elements and re-evaluates the body at `time`.
    ///
    /// The result has to be a bound ellipse inside the radius limits, the same
    /// as any delta-v. Otherwise nothing changes.
    ///
    /// # Errors
    /// [`OrbitError::InvalidOrbitShape`], [`OrbitError::LimitExceeded`], or
    /// [`OrbitError::NumericDegenerate`] if the new orbit can't be evaluated.
    pub fn apply_overrides(&mut self, time: f64, overrides: ElementOverrides) -> Result<(), OrbitError> {
        if overrides.is_empty() {
            return Ok(());
        }

        let candidate = overrides.apply_to(time, &self.elements)?;
        self.limits().check(&candidate)?;

        let previous = std::mem::replace(&mut self.elements, candidate);
        if let Err(err) = self.recalculate(time) {
            self.elements = previous;
            return Err(err);
        }

        self.invalidate_trajectory();
        Ok(())
    }
}
