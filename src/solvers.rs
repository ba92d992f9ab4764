#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum number of Newton iterations the Kepler solver performs.
///
/// This is used to prevent infinite loops in case the method fails to converge.
pub const KEPLER_MAX_ITERS: u32 = 30;

/// The step size below which the Kepler solver considers itself converged.
pub const KEPLER_TOLERANCE: f64 = 1e-4;

/// The maximum number of bisection steps the Kepler solver falls back on.
///
/// The starting bracket is at most 2 radians wide, so this is enough to pin
/// the root down to a few ulps.
pub const KEPLER_MAX_BISECTIONS: u32 = 64;

/// The result of solving Kepler's equation.
///
/// The solver never fails: when it runs out of iterations it still hands back
/// its best estimate, but flags it with `converged == false` so callers (and
/// tests) can tell the two cases apart.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerSolution {
    /// The eccentric anomaly, in radians.
    pub eccentric_anomaly: f64,

    /// How many steps were taken, Newton and bisection combined.
    pub iterations: u32,

    /// Whether the root was found to within [`KEPLER_TOLERANCE`].
    pub converged: bool,
}

#[inline]
pub(crate) fn keplers_equation(mean_anomaly: f64, eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    eccentric_anomaly - (eccentricity * eccentric_anomaly.sin()) - mean_anomaly
}

#[inline]
pub(crate) fn keplers_equation_derivative(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    1.0 - (eccentricity * eccentric_anomaly.cos())
}

/// Solves Kepler's equation `E - e sin(E) = M` for the eccentric anomaly `E`.
///
/// # Method
/// Newton-Raphson seeded with `E_0 = M`:
///
/// ```text
/// E_n+1 = E_n - (E_n - e sin(E_n) - M) / (1 - e cos(E_n))
/// ```
///
/// The iteration stops once a step is smaller than [`KEPLER_TOLERANCE`], or
/// after [`KEPLER_MAX_ITERS`] steps, whichever comes first.
///
/// Seeded at `M`, Newton can cycle without converging for `e` close to 1 and
/// `M` near a multiple of 2π. When it runs out of steps, the root is found by
/// bisection instead. Kepler's equation is monotonic in `E`, and its root
/// always lies in `[M - e, M + e]`.
///
/// # Unchecked Operation
/// The eccentricity must be in `[0, 1)`. The mean anomaly may be any real
/// number; the result lies on the same branch as `M`.
///
/// # Example
/// ```
/// use kepler2d::solve_kepler;
///
/// let solution = solve_kepler(1.0, 0.5);
/// let e = solution.eccentric_anomaly;
///
/// assert!(solution.converged);
/// assert!((e - 0.5 * e.sin() - 1.0).abs() < 1e-6);
/// ```
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
    let mut eccentric_anomaly = mean_anomaly;

    for i in 1..=KEPLER_MAX_ITERS {
        let f = keplers_equation(mean_anomaly, eccentric_anomaly, eccentricity);
        let fp = keplers_equation_derivative(eccentric_anomaly, eccentricity);
        let delta = f / fp;

        eccentric_anomaly -= delta;

        if delta.abs() < KEPLER_TOLERANCE {
            return KeplerSolution {
                eccentric_anomaly,
                iterations: i,
                converged: true,
            };
        }
    }

    if !mean_anomaly.is_finite() || !eccentricity.is_finite() {
        return KeplerSolution {
            eccentric_anomaly,
            iterations: KEPLER_MAX_ITERS,
            converged: false,
        };
    }

    bisect_kepler(mean_anomaly, eccentricity)
}

/// Bisection on `[M - e, M + e]`, where `f(M - e) <= 0 <= f(M + e)`.
fn bisect_kepler(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
    let mut low = mean_anomaly - eccentricity;
    let mut high = mean_anomaly + eccentricity;

    for i in 1..=KEPLER_MAX_BISECTIONS {
        let mid = 0.5 * (low + high);

        if keplers_equation(mean_anomaly, mid, eccentricity) < 0.0 {
            low = mid;
        } else {
            high = mid;
        }

        if high - low <= f64::EPSILON * mean_anomaly.abs().max(1.0) {
            return KeplerSolution {
                eccentric_anomaly: 0.5 * (low + high),
                iterations: KEPLER_MAX_ITERS + i,
                converged: true,
            };
        }
    }

    let eccentric_anomaly = 0.5 * (low + high);
    KeplerSolution {
        eccentric_anomaly,
        iterations: KEPLER_MAX_ITERS + KEPLER_MAX_BISECTIONS,
        converged: (high - low) < KEPLER_TOLERANCE,
    }
}
