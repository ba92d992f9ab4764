//! Engine configuration.
//!
//! Everything the engine needs to know about the world is passed in through
//! these structs; nothing is looked up globally.
//!
//! With the `serde` feature (on by default) a whole [`Config`] can be loaded
//! from TOML:
//!
//! ```toml
//! [orbit]
//! gravitational-constant = 1218470.0
//! speed-multiplier = 1.0
//!
//! [limits]
//! min-radius = 1000.0
//! max-radius = 7000.0
//!
//! [rigidbody]
//! update-mode = "follow-orbit"   # or "forces"
//! player-impulse-weight = 0.5
//!
//! [frame]                        # optional
//! angular-velocity = 0.01
//! epoch = 0.0
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::{fs, path::Path};
use thiserror::Error;

use crate::{RadiusLimits, RotatingFrame, UpdateMode};

/// The gravitational constant used when none is configured.
pub const DEFAULT_GRAVITATIONAL_CONSTANT: f64 = 1_218_470.0;

/// Speed multipliers at or below zero are raised to this value.
pub const MIN_SPEED_MULTIPLIER: f64 = 1e-6;

/// How strong gravity is.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct OrbitConfig {
    /// The planet's base gravitational parameter.
    pub gravitational_constant: f64,
    /// Scales the gravitational parameter, and with it how fast things orbit.
    pub speed_multiplier: f64,
}

impl OrbitConfig {
    /// The gravitational parameter `mu` to hand to the orbits.
    ///
    /// `gravitational_constant * speed_multiplier`, with the multiplier held
    /// above [`MIN_SPEED_MULTIPLIER`] so mu never reaches zero.
    pub fn gravitational_parameter(&self) -> f64 {
        self.gravitational_constant * self.speed_multiplier.max(MIN_SPEED_MULTIPLIER)
    }
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            gravitational_constant: DEFAULT_GRAVITATIONAL_CONSTANT,
            speed_multiplier: 1.0,
        }
    }
}

/// How an [`OrbitalRigidbody`][crate::OrbitalRigidbody] couples to its rigid body.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct RigidbodyConfig {
    /// Chosen once, when the body is set up.
    pub update_mode: UpdateMode,
    /// Multiplier for impulses coming from the player's collider.
    pub player_impulse_weight: f64,
}

impl Default for RigidbodyConfig {
    fn default() -> Self {
        Self {
            update_mode: UpdateMode::FollowOrbit,
            player_impulse_weight: 1.0,
        }
    }
}

/// Everything needed to set up orbiting bodies around one planet.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Config {
    /// Gravity.
    pub orbit: OrbitConfig,
    /// Radius limits for delta-v.
    pub limits: RadiusLimits,
    /// Rigid body coupling.
    pub rigidbody: RigidbodyConfig,
    /// Optional rotating frame.
    pub frame: Option<RotatingFrame>,
}

/// An error to describe why a configuration couldn't be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file couldn't be read.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),

    /// The file isn't valid TOML, or doesn't match the expected layout.
    #[cfg(feature = "serde")]
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),

    /// The values don't make sense.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Reads and validates a TOML config file.
    ///
    /// # Errors
    /// See [`ConfigError`].
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a TOML config.
    ///
    /// # Errors
    /// See [`ConfigError`].
    #[cfg(feature = "serde")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks that the values are usable.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let constant = self.orbit.gravitational_constant;
        if !(constant > 0.0) || !constant.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "gravitational constant must be positive and finite, got {constant}"
            )));
        }

        let multiplier = self.orbit.speed_multiplier;
        if !multiplier.is_finite() || !self.orbit.gravitational_parameter().is_finite() {
            return Err(ConfigError::Invalid(format!(
                "speed multiplier must give a finite gravitational parameter, got {multiplier}"
            )));
        }

        let RadiusLimits {
            min_radius,
            max_radius,
        } = self.limits;
        if !(min_radius >= 0.0) || !(min_radius < max_radius) {
            return Err(ConfigError::Invalid(format!(
                "radius limits must satisfy 0 <= min < max, got {min_radius}..={max_radius}"
            )));
        }

        let weight = self.rigidbody.player_impulse_weight;
        if !weight.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "player impulse weight must be finite, got {weight}"
            )));
        }

        if let Some(frame) = self.frame {
            if !frame.angular_velocity.is_finite() || !frame.epoch.is_finite() {
                return Err(ConfigError::Invalid(
                    "rotating frame parameters must be finite".to_string(),
                ));
            }
        }

        Ok(())
    }
}
