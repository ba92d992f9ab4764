use core::f64::consts::TAU;
use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{math::wrap_angle, solve_kepler, KeplerSolution, OrbitError, StateVectors2D};

/// Eccentricities below this value are treated as circular when determining
/// an orbit.
///
/// The true anomaly of a circular orbit is undefined, and computing it means
/// dividing by a near-zero eccentricity. Below this threshold the true anomaly
/// is pinned to zero, which places the periapsis at the observed position.
pub const CIRCULAR_ECCENTRICITY: f64 = 1e-3;

/// The largest eccentricity a committed orbit may have.
///
/// Anything closer to 1 is numerically a parabola: radial free-fall from rest
/// lands within an ulp of `e = 1` and would otherwise slip through as a
/// "bound" orbit whose periapsis is a rounding error, which later propagates
/// into NaN positions.
pub const MAX_ECCENTRICITY: f64 = 1.0 - 1e-9;

/// Rejects anything that isn't a bound, non-degenerate ellipse.
///
/// The negated comparisons also catch NaN.
fn check_shape(eccentricity: f64, semi_major_axis: f64) -> Result<(), OrbitError> {
    if !(eccentricity >= 0.0 && eccentricity < MAX_ECCENTRICITY)
        || !(semi_major_axis > 0.0)
        || !semi_major_axis.is_finite()
    {
        return Err(OrbitError::InvalidOrbitShape {
            eccentricity,
            semi_major_axis,
        });
    }

    Ok(())
}

fn check_gravitational_parameter(mu: f64) -> Result<(), OrbitError> {
    if !(mu > 0.0) || !mu.is_finite() {
        return Err(OrbitError::InvalidGravitationalParameter { mu });
    }

    Ok(())
}

/// The direction a body travels around its orbit, as seen with the y axis
/// pointing up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrbitDirection {
    /// The angle of the body increases with time.
    #[default]
    CounterClockwise,
    /// The angle of the body decreases with time.
    Clockwise,
}

impl OrbitDirection {
    /// Derives the direction from the scalar (z) angular momentum `r × v`.
    ///
    /// Zero angular momentum counts as counterclockwise.
    #[inline]
    pub fn from_angular_momentum(angular_momentum: f64) -> Self {
        if angular_momentum < 0.0 {
            Self::Clockwise
        } else {
            Self::CounterClockwise
        }
    }

    /// `1.0` for counterclockwise, `-1.0` for clockwise.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Self::CounterClockwise => 1.0,
            Self::Clockwise => -1.0,
        }
    }
}

/// A mode to describe how the gravitational parameter setter should behave.
///
/// # Which mode should I use?
/// If you just want to set the mu value naïvely (without touching the
/// other orbital elements), use `KeepElements`.
///
/// If you want the body to stay where it is at a given time but don't care
/// about its velocity, use `KeepPositionAtTime`.
///
/// If you want the body to keep both its position and velocity at a given
/// time, use `KeepStateVectorsAtTime`. This re-derives the whole orbit and
/// may be rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MuSetterMode2D {
    /// Keep all the other orbital elements the same.
    ///
    /// **This will change the position and velocity of the orbiting body abruptly.**
    /// It will not, however, change the shape of the orbit.
    KeepElements,
    /// Keep the shape of the orbit, but move the periapsis time so that the
    /// position at the given time stays the same.
    ///
    /// **This will change the velocity of the orbiting body abruptly.**
    KeepPositionAtTime(f64),
    /// Keep the position and velocity at the given time, re-deriving the
    /// orbit from them.
    ///
    /// **This will change the orbit's overall trajectory.**
    KeepStateVectorsAtTime(f64),
}

/// A struct representing a bound 2D Keplerian orbit around a planet.
///
/// The element set is only ever replaced as a whole, through orbit
/// determination ([`set_orbit`][Self::set_orbit] and friends). Every committed
/// element set satisfies `a > 0`, `0 <= e < 1` and `periapsis <= apoapsis`.
///
/// # Example
/// ```
/// use glam::DVec2;
/// use kepler2d::OrbitalElements;
///
/// let mut orbit = OrbitalElements::circular(0.0, DVec2::new(2.0, 0.0), 1.0).unwrap();
///
/// // Speed up at periapsis to raise the apoapsis.
/// let result = orbit.set_orbit(0.0, DVec2::new(2.0, 0.0), DVec2::new(0.0, 0.8));
///
/// assert!(result.is_ok());
/// assert!(orbit.get_apoapsis() > 2.0);
/// assert!((orbit.get_periapsis() - 2.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbitalElements {
    /// The semi-major axis of the ellipse.
    semi_major_axis: f64,

    /// The eccentricity of the orbit, in `[0, 1)`.
    ///
    /// See more: <https://en.wikipedia.org/wiki/Orbital_eccentricity>
    eccentricity: f64,

    /// The true anomaly at the time the orbit was determined, in radians.
    true_anomaly: f64,

    /// The simulation time of the periapsis passage closest to the epoch.
    periapsis_time: f64,

    /// The angle of the periapsis, measured counterclockwise from the +x
    /// axis, in radians.
    arg_pe: f64,

    /// `a(1 - e)`, the closest distance to the center of mass.
    periapsis: f64,

    /// `a(1 + e)`, the furthest distance from the center of mass.
    apoapsis: f64,

    /// The gravitational parameter of the planet.
    ///
    /// This is a constant value that represents the mass of the parent body
    /// multiplied by the gravitational constant.
    ///
    /// In other words, mu = GM.
    mu: f64,

    /// Which way around the orbit the body travels.
    direction: OrbitDirection,
}

impl OrbitalElements {
    /// Determines an orbit from an observed position and velocity.
    ///
    /// The position and velocity are relative to the planet's center of mass.
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidOrbitShape`] when the state does not
    /// describe a bound elliptic orbit (`e` outside `[0, 1)`, or `a <= 0`).
    /// Non-finite intermediate values also land here.
    /// [`OrbitError::InvalidGravitationalParameter`] unless `mu` is positive
    /// and finite.
    pub fn from_state_vectors(
        time: f64,
        state_vectors: StateVectors2D,
        mu: f64,
    ) -> Result<Self, OrbitError> {
        check_gravitational_parameter(mu)?;

        // Reference:
        // https://orbital-mechanics.space/classical-orbital-elements/orbital-elements-and-the-state-vector.html
        let StateVectors2D { position, velocity } = state_vectors;

        let altitude = position.length();
        let speed_squared = velocity.length_squared();
        let mu_recip = mu.recip();

        // z component of r × v; its sign gives the direction of travel
        let angular_momentum = position.perp_dot(velocity);
        let radial_dot = position.dot(velocity);

        // e = ((v^2 - mu/r) r - (r . v) v) / mu
        let eccentricity_vector =
            (position * (speed_squared - mu / altitude) - velocity * radial_dot) * mu_recip;
        let eccentricity = eccentricity_vector.length();

        // Vis-viva: energy = v^2/2 - mu/r = -mu / 2a
        let specific_energy = 0.5 * speed_squared - mu / altitude;
        let semi_major_axis = -mu / (2.0 * specific_energy);

        check_shape(eccentricity, semi_major_axis)?;

        let direction = OrbitDirection::from_angular_momentum(angular_momentum);

        let true_anomaly = if eccentricity < CIRCULAR_ECCENTRICITY {
            0.0
        } else {
            // Rounding can push the cosine a hair outside of [-1, 1], which
            // acos turns into NaN.
            let cos_true_anomaly =
                (eccentricity_vector.dot(position) / (altitude * eccentricity)).clamp(-1.0, 1.0);
            let tmp = cos_true_anomaly.acos();
            if radial_dot >= 0.0 {
                tmp
            } else {
                TAU - tmp
            }
        };

        let arg_pe = wrap_angle(position.y.atan2(position.x) - direction.sign() * true_anomaly);

        // tan(E / 2) = sqrt((1 - e)/(1 + e)) * tan(v / 2)
        let eccentric_anomaly = 2.0
            * (((1.0 - eccentricity) / (1.0 + eccentricity)).sqrt() * (true_anomaly * 0.5).tan())
                .atan();
        let mean_anomaly = eccentric_anomaly - eccentricity * eccentric_anomaly.sin();
        let mean_motion = (mu / semi_major_axis.powi(3)).sqrt();
        let periapsis_time = time - mean_anomaly / mean_motion;

        Ok(Self {
            semi_major_axis,
            eccentricity,
            true_anomaly,
            periapsis_time,
            arg_pe,
            periapsis: semi_major_axis * (1.0 - eccentricity),
            apoapsis: semi_major_axis * (1.0 + eccentricity),
            mu,
            direction,
        })
    }

    /// Determines the circular orbit that passes through `position` at `time`.
    ///
    /// The body travels counterclockwise at `sqrt(mu / r)`.
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidOrbitShape`] when `position` is at (or
    /// numerically indistinguishable from) the center of mass.
    pub fn circular(time: f64, position: DVec2, mu: f64) -> Result<Self, OrbitError> {
        let velocity = Self::circular_velocity(position, mu);
        Self::from_state_vectors(time, StateVectors2D { position, velocity }, mu)
    }

    /// Builds an orbit directly from its shape and orientation.
    ///
    /// The epoch is placed at periapsis, so the stored true anomaly is zero.
    ///
    /// # Errors
    /// Returns [`OrbitError::InvalidOrbitShape`] when `a <= 0` or `e` is
    /// outside `[0, 1)`, [`OrbitError::InvalidGravitationalParameter`] unless
    /// `mu` is positive and finite.
    pub fn with_elements(
        semi_major_axis: f64,
        eccentricity: f64,
        arg_pe: f64,
        periapsis_time: f64,
        mu: f64,
        direction: OrbitDirection,
    ) -> Result<Self, OrbitError> {
        check_shape(eccentricity, semi_major_axis)?;
        check_gravitational_parameter(mu)?;

        Ok(Self {
            semi_major_axis,
            eccentricity,
            true_anomaly: 0.0,
            periapsis_time,
            arg_pe: wrap_angle(arg_pe),
            periapsis: semi_major_axis * (1.0 - eccentricity),
            apoapsis: semi_major_axis * (1.0 + eccentricity),
            mu,
            direction,
        })
    }

    /// Moves the epoch to `time`, storing the true anomaly the body has there.
    ///
    /// The result is in `[0, 2pi)`, the same range orbit determination uses.
    pub(crate) fn with_epoch_at(mut self, time: f64) -> Self {
        self.true_anomaly = wrap_angle(self.get_true_anomaly_at_time(time));
        self
    }

    /// The velocity of a counterclockwise circular orbit through `position`.
    pub fn circular_velocity(position: DVec2, mu: f64) -> DVec2 {
        let altitude = position.length();
        let speed = (mu / altitude).sqrt();
        position.perp() / altitude * speed
    }

    /// Re-derives the orbit from an observed position and velocity at `time`.
    ///
    /// # Errors
    /// When the state doesn't describe a bound ellipse, the previous element
    /// set is kept untouched and [`OrbitError::InvalidOrbitShape`] is returned.
    pub fn set_orbit(&mut self, time: f64, position: DVec2, velocity: DVec2) -> Result<(), OrbitError> {
        match Self::from_state_vectors(time, StateVectors2D { position, velocity }, self.mu) {
            Ok(new) => {
                *self = new;
                Ok(())
            }
            Err(err) => {
                warn!(time, %position, %velocity, "rejected orbit determination: {err}");
                Err(err)
            }
        }
    }

    /// Re-derives the orbit as a circular orbit through `position`.
    ///
    /// # Errors
    /// See [`set_orbit`][Self::set_orbit].
    pub fn set_circular_orbit(&mut self, time: f64, position: DVec2) -> Result<(), OrbitError> {
        let velocity = Self::circular_velocity(position, self.mu);
        self.set_orbit(time, position, velocity)
    }

    /// Gets the position and velocity at a given time.
    ///
    /// # Time
    /// The time is measured in the same units as the periapsis time.
    ///
    /// # Performance
    /// This function solves Kepler's equation numerically, so consider caching
    /// the result if you need it more than once per tick.
    pub fn to_cartesian(&self, t: f64) -> StateVectors2D {
        let solution = self.get_eccentric_anomaly_at_time(t);
        if !solution.converged {
            debug!(
                t,
                iterations = solution.iterations,
                eccentricity = self.eccentricity,
                "kepler solver did not converge, using best estimate"
            );
        }

        self.get_state_vectors_at_eccentric_anomaly(solution.eccentric_anomaly)
    }

    /// Gets `n` points along the orbit, relative to the center of mass.
    ///
    /// The points are spaced uniformly in *mean* anomaly, starting at
    /// periapsis. This bunches points up near apoapsis on very eccentric
    /// orbits; it's meant for drawing, not for anything time-sensitive.
    pub fn get_orbit_coordinates(&self, n: usize) -> Vec<DVec2> {
        let step = TAU / n as f64;

        (0..n)
            .map(|i| {
                let mean_anomaly = i as f64 * step;
                let eccentric_anomaly =
                    solve_kepler(mean_anomaly, self.eccentricity).eccentric_anomaly;
                self.get_state_vectors_at_eccentric_anomaly(eccentric_anomaly)
                    .position
            })
            .collect()
    }

    /// Gets the mean anomaly at a given time, wrapped into `[0, tau)`.
    pub fn get_mean_anomaly_at_time(&self, t: f64) -> f64 {
        wrap_angle(self.get_mean_motion() * (t - self.periapsis_time))
    }

    /// Solves for the eccentric anomaly at a given time.
    pub fn get_eccentric_anomaly_at_time(&self, t: f64) -> KeplerSolution {
        solve_kepler(self.get_mean_anomaly_at_time(t), self.eccentricity)
    }

    /// Converts an eccentric anomaly into a true anomaly.
    ///
    /// The result is in `(-pi, pi]`.
    pub fn get_true_anomaly_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> f64 {
        let e = self.eccentricity;
        let (sin_half, cos_half) = (eccentric_anomaly * 0.5).sin_cos();

        2.0 * ((1.0 + e).sqrt() * sin_half).atan2((1.0 - e).sqrt() * cos_half)
    }

    /// Gets the true anomaly at a given time, in `(-pi, pi]`.
    pub fn get_true_anomaly_at_time(&self, t: f64) -> f64 {
        let eccentric_anomaly = self.get_eccentric_anomaly_at_time(t).eccentric_anomaly;
        self.get_true_anomaly_at_eccentric_anomaly(eccentric_anomaly)
    }

    /// Gets the distance from the center of mass at a given true anomaly.
    ///
    /// `r = p / (1 + e cos(v))`
    pub fn get_altitude_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        self.get_semi_latus_rectum() / (1.0 + self.eccentricity * true_anomaly.cos())
    }

    /// Gets the position and velocity at a given eccentric anomaly.
    pub fn get_state_vectors_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> StateVectors2D {
        let true_anomaly = self.get_true_anomaly_at_eccentric_anomaly(eccentric_anomaly);
        let altitude = self.semi_major_axis * (1.0 - self.eccentricity * eccentric_anomaly.cos());

        self.get_state_vectors_from_parts(true_anomaly, altitude)
    }

    /// Gets the position and velocity at a given true anomaly.
    pub fn get_state_vectors_at_true_anomaly(&self, true_anomaly: f64) -> StateVectors2D {
        let altitude = self.get_altitude_at_true_anomaly(true_anomaly);
        self.get_state_vectors_from_parts(true_anomaly, altitude)
    }

    fn get_state_vectors_from_parts(&self, true_anomaly: f64, altitude: f64) -> StateVectors2D {
        let e = self.eccentricity;
        let semi_latus_rectum = self.get_semi_latus_rectum();
        let angular_momentum = (self.mu * semi_latus_rectum).sqrt();
        let sign = self.direction.sign();

        // Argument of latitude; the angle of the body from the +x axis
        let lat = self.arg_pe + sign * true_anomaly;
        let (sin_lat, cos_lat) = lat.sin_cos();

        let position = DVec2::new(cos_lat, sin_lat) * altitude;

        // Radial part: r * h e sin(v) / (r p)
        // Transverse part: h / r, perpendicular to r in the direction of travel
        let radial_rate = angular_momentum * e * true_anomaly.sin() / (altitude * semi_latus_rectum);
        let transverse_rate = angular_momentum / altitude;
        let velocity =
            position * radial_rate + DVec2::new(-sin_lat, cos_lat) * (sign * transverse_rate);

        StateVectors2D { position, velocity }
    }

    /// Changes the gravitational parameter of the planet.
    ///
    /// # Errors
    /// [`OrbitError::InvalidGravitationalParameter`] unless the new mu is
    /// positive and finite. [`MuSetterMode2D::KeepStateVectorsAtTime`] can
    /// also fail with [`OrbitError::InvalidOrbitShape`], when the current
    /// state is no longer bound under the new mu. The element set is left
    /// untouched in both cases.
    pub fn set_gravitational_parameter(
        &mut self,
        gravitational_parameter: f64,
        mode: MuSetterMode2D,
    ) -> Result<(), OrbitError> {
        let new_mu = gravitational_parameter;
        check_gravitational_parameter(new_mu)?;

        match mode {
            MuSetterMode2D::KeepElements => {
                self.mu = new_mu;
            }
            MuSetterMode2D::KeepPositionAtTime(t) => {
                // The mean anomaly at t has to stay the same:
                // n_1 (t - T_1) = n_2 (t - T_2)
                // T_2 = t - (n_1 / n_2) (t - T_1)
                let old_mean_motion = self.get_mean_motion();
                self.mu = new_mu;
                let new_mean_motion = self.get_mean_motion();

                self.periapsis_time =
                    t - (old_mean_motion / new_mean_motion) * (t - self.periapsis_time);
            }
            MuSetterMode2D::KeepStateVectorsAtTime(t) => {
                let state_vectors = self.to_cartesian(t);
                *self = Self::from_state_vectors(t, state_vectors, new_mu)?;
            }
        }

        Ok(())
    }

    /// Gets the semi-major axis of the orbit.
    #[inline]
    pub fn get_semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    /// Gets the eccentricity of the orbit.
    #[inline]
    pub fn get_eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// Gets the true anomaly at the epoch the orbit was determined at.
    #[inline]
    pub fn get_true_anomaly_at_epoch(&self) -> f64 {
        self.true_anomaly
    }

    /// Gets the simulation time of periapsis passage.
    #[inline]
    pub fn get_periapsis_time(&self) -> f64 {
        self.periapsis_time
    }

    /// Gets the argument of periapsis, in radians, in `[0, tau)`.
    #[inline]
    pub fn get_arg_pe(&self) -> f64 {
        self.arg_pe
    }

    /// Gets the periapsis radius.
    #[inline]
    pub fn get_periapsis(&self) -> f64 {
        self.periapsis
    }

    /// Gets the apoapsis radius.
    #[inline]
    pub fn get_apoapsis(&self) -> f64 {
        self.apoapsis
    }

    /// Gets the gravitational parameter of the planet.
    #[inline]
    pub fn get_gravitational_parameter(&self) -> f64 {
        self.mu
    }

    /// Gets the direction of travel.
    #[inline]
    pub fn get_direction(&self) -> OrbitDirection {
        self.direction
    }

    /// Gets the semi-minor axis, `a sqrt(1 - e^2)`.
    pub fn get_semi_minor_axis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity.powi(2)).sqrt()
    }

    /// Gets the semi-latus rectum, `a (1 - e^2)`.
    pub fn get_semi_latus_rectum(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity.powi(2))
    }

    /// Gets the mean motion, `sqrt(mu / a^3)`, in radians per unit time.
    pub fn get_mean_motion(&self) -> f64 {
        (self.mu / self.semi_major_axis.powi(3)).sqrt()
    }

    /// Gets the time it takes to complete one revolution.
    pub fn get_orbital_period(&self) -> f64 {
        TAU / self.get_mean_motion()
    }

    /// Gets the specific orbital energy, `-mu / 2a`.
    pub fn get_specific_orbital_energy(&self) -> f64 {
        -self.mu / (2.0 * self.semi_major_axis)
    }

    /// Gets the signed specific angular momentum, `±sqrt(mu p)`.
    ///
    /// Negative for clockwise orbits.
    pub fn get_specific_angular_momentum(&self) -> f64 {
        self.direction.sign() * (self.mu * self.get_semi_latus_rectum()).sqrt()
    }

    /// Gets the time remaining until the next periapsis passage after `t`.
    pub fn get_time_to_periapsis(&self, t: f64) -> f64 {
        let mean_anomaly = self.get_mean_anomaly_at_time(t);
        if mean_anomaly == 0.0 {
            0.0
        } else {
            (TAU - mean_anomaly) / self.get_mean_motion()
        }
    }
}
