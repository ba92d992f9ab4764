use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::StateVectors2D;

/// A reference frame that spins around the center of mass at a constant rate.
///
/// Planets that rotate under the player are easier to author in a frame that
/// rotates with them. The orbit itself is still propagated in the inertial
/// frame. This type converts state vectors in and out of it, and supplies
/// the extra acceleration felt by motion integrated in the rotating frame.
///
/// At `epoch` both frames line up. After that the rotating frame has turned by
/// `angular_velocity * (t - epoch)` radians, counterclockwise when positive.
///
/// # Example
/// ```
/// use glam::DVec2;
/// use kepler2d::{RotatingFrame, StateVectors2D};
///
/// let frame = RotatingFrame::new(0.5, 0.0);
///
/// // Something standing still in the inertial frame appears to move
/// // clockwise in the rotating frame.
/// let inertial = StateVectors2D { position: DVec2::new(2.0, 0.0), velocity: DVec2::ZERO };
/// let observed = frame.from_inertial(0.0, inertial);
///
/// assert_eq!(observed.velocity, DVec2::new(0.0, -1.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct RotatingFrame {
    /// Radians per unit time.
    pub angular_velocity: f64,
    /// The time at which the frames coincide.
    pub epoch: f64,
}

impl RotatingFrame {
    /// Creates a new rotating frame.
    pub fn new(angular_velocity: f64, epoch: f64) -> Self {
        Self {
            angular_velocity,
            epoch,
        }
    }

    /// How far the frame has turned at time `t`, in radians.
    #[inline]
    pub fn angle_at(&self, t: f64) -> f64 {
        self.angular_velocity * (t - self.epoch)
    }

    /// Converts a position in this frame into the inertial frame.
    pub fn to_inertial_position(&self, t: f64, position: DVec2) -> DVec2 {
        DVec2::from_angle(self.angle_at(t)).rotate(position)
    }

    /// Converts an inertial position into this frame.
    pub fn from_inertial_position(&self, t: f64, position: DVec2) -> DVec2 {
        DVec2::from_angle(-self.angle_at(t)).rotate(position)
    }

    /// Converts state vectors in this frame into the inertial frame.
    ///
    /// `v_i = R(θ) (v_r + ω × r_r)`
    pub fn to_inertial(&self, t: f64, state_vectors: StateVectors2D) -> StateVectors2D {
        let rotation = DVec2::from_angle(self.angle_at(t));
        let frame_velocity = state_vectors.position.perp() * self.angular_velocity;

        StateVectors2D {
            position: rotation.rotate(state_vectors.position),
            velocity: rotation.rotate(state_vectors.velocity + frame_velocity),
        }
    }

    /// Converts inertial state vectors into this frame.
    ///
    /// `v_r = R(-θ) v_i - ω × r_r`
    pub fn from_inertial(&self, t: f64, state_vectors: StateVectors2D) -> StateVectors2D {
        let rotation = DVec2::from_angle(-self.angle_at(t));
        let position = rotation.rotate(state_vectors.position);
        let frame_velocity = position.perp() * self.angular_velocity;

        StateVectors2D {
            position,
            velocity: rotation.rotate(state_vectors.velocity) - frame_velocity,
        }
    }

    /// The apparent acceleration of something moving in this frame that
    /// isn't caused by any force: Coriolis plus centrifugal.
    ///
    /// `a = -2 ω × v_r - ω × (ω × r_r)`
    ///
    /// Whatever integrates motion directly in rotating coordinates has to add
    /// this on top of gravity.
    pub fn fictitious_acceleration(&self, position: DVec2, velocity: DVec2) -> DVec2 {
        let omega = self.angular_velocity;
        let coriolis = velocity.perp() * (-2.0 * omega);
        let centrifugal = position * (omega * omega);

        coriolis + centrifugal
    }
}
