use core::f64::consts::TAU;

/// Wraps an angle in radians into `[0, tau)`.
///
/// `rem_euclid` can return exactly `tau` for tiny negative inputs
/// because of rounding, so that case is folded back to zero.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
#[inline]
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
