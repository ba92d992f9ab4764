#![cfg(test)]

use core::f64::consts::{PI, TAU};

use glam::DVec2;

use crate::{
    solve_kepler, MuSetterMode2D, OrbitDirection, OrbitError, OrbitalElements, StateVectors2D,
    CIRCULAR_ECCENTRICITY, KEPLER_MAX_BISECTIONS, KEPLER_MAX_ITERS,
};

const ORBIT_POLL_TIMES: usize = 1024;
const RANDOM_ITERS: usize = 1000;

/// The gravitational parameter of the planet in the stock scenario.
const PLANET_MU: f64 = 1_218_470.0;


use assertions::*;
use polling::*;
use seeders::*;

fn unit_orbit() -> OrbitalElements {
    OrbitalElements::circular(0.0, DVec2::new(1.0, 0.0), 1.0).unwrap()
}

#[test]
fn kepler_solver_converges() {
    const STEPS: usize = 256;

    for e_step in 0..=19 {
        let eccentricity = e_step as f64 * 0.05;

        for m_step in 0..STEPS {
            let mean_anomaly = m_step as f64 * TAU / STEPS as f64;
            let solution = solve_kepler(mean_anomaly, eccentricity);
            let e = solution.eccentric_anomaly;

            let residual = (e - eccentricity * e.sin() - mean_anomaly).rem_euclid(TAU);
            let residual = residual.min(TAU - residual);

            assert!(
                solution.converged,
                "solver did not converge for e={eccentricity}, M={mean_anomaly}: {solution:?}"
            );
            assert!(
                residual < 1e-3,
                "residual {residual} too large for e={eccentricity}, M={mean_anomaly}"
            );
        }
    }
}

#[test]
fn kepler_solver_high_eccentricity_near_periapsis() {
    const STEPS: usize = 4096;

    let near_periapsis = (0..200).flat_map(|k| [k as f64 * 1e-3, TAU - k as f64 * 1e-3]);
    let everywhere = (0..STEPS).map(|k| k as f64 * TAU / STEPS as f64);
    let mean_anomalies: Vec<f64> = near_periapsis.chain(everywhere).collect();

    for eccentricity in [0.95, 0.96, 0.97, 0.98, 0.985, 0.99, 0.995, 0.999] {
        for &mean_anomaly in &mean_anomalies {
            let solution = solve_kepler(mean_anomaly, eccentricity);
            let e = solution.eccentric_anomaly;

            let residual = (e - eccentricity * e.sin() - mean_anomaly).rem_euclid(TAU);
            let residual = residual.min(TAU - residual);

            assert!(
                solution.converged,
                "solver did not converge for e={eccentricity}, M={mean_anomaly}: {solution:?}"
            );
            assert!(
                residual < 1e-3,
                "residual {residual} too large for e={eccentricity}, M={mean_anomaly}"
            );
            assert!(
                solution.iterations <= KEPLER_MAX_ITERS + KEPLER_MAX_BISECTIONS,
                "{solution:?}"
            );
        }
    }
}

#[test]
fn kepler_solver_bisects_when_newton_cycles() {
    // Newton seeded at M bounces around periapsis here
    let (mean_anomaly, eccentricity) = (6.033, 0.99);
    let solution = solve_kepler(mean_anomaly, eccentricity);
    let e = solution.eccentric_anomaly;

    assert!(solution.converged, "{solution:?}");
    assert_almost_eq_angle(
        e - eccentricity * e.sin(),
        mean_anomaly,
        1e-6,
        "Kepler's equation after the fallback",
    );
    assert!(e > mean_anomaly - eccentricity && e < mean_anomaly + eccentricity);
}

#[test]
fn kepler_solver_random() {
    for _ in 0..RANDOM_ITERS {
        let eccentricity = rand::random_range(0.0..=0.95);
        let mean_anomaly = rand::random_range(0.0..TAU);
        let e = solve_kepler(mean_anomaly, eccentricity).eccentric_anomaly;

        assert_almost_eq_angle(
            e - eccentricity * e.sin(),
            mean_anomaly,
            1e-3,
            &format!("Kepler's equation at e={eccentricity}, M={mean_anomaly}"),
        );
    }
}

#[test]
fn kepler_solver_circular_is_identity() {
    for mean_anomaly in [0.0, 0.5, PI, 4.0, -2.0, 100.0] {
        let solution = solve_kepler(mean_anomaly, 0.0);

        assert_eq!(solution.eccentric_anomaly, mean_anomaly);
        assert_eq!(solution.iterations, 1);
        assert!(solution.converged);
    }
}

#[test]
fn kepler_solver_handles_negative_mean_anomaly() {
    let positive = solve_kepler(1.2, 0.6).eccentric_anomaly;
    let negative = solve_kepler(-1.2, 0.6).eccentric_anomaly;

    assert_almost_eq(negative, -positive, "odd symmetry of the eccentric anomaly");
}

#[test]
fn kepler_solver_reports_exhaustion() {
    let solution = solve_kepler(f64::NAN, 0.5);

    assert!(!solution.converged);
    assert_eq!(solution.iterations, KEPLER_MAX_ITERS);
}

#[test]
fn unit_orbit_positions() {
    let orbit = unit_orbit();
    let period = orbit.get_orbital_period();

    assert_almost_eq(period, TAU, "unit orbit period");

    let tests = [
        ("unit orbit 1", 0.0, DVec2::new(1.0, 0.0)),
        ("unit orbit 2", 0.25, DVec2::new(0.0, 1.0)),
        ("unit orbit 3", 0.5, DVec2::new(-1.0, 0.0)),
        ("unit orbit 4", 0.75, DVec2::new(0.0, -1.0)),
        ("unit orbit 5", 1.0, DVec2::new(1.0, 0.0)),
    ];

    for (what, fraction, expected) in tests {
        let position = orbit.to_cartesian(fraction * period).position;
        assert_almost_eq_vec2(position, expected, what);
    }
}

#[test]
fn stock_scenario() {
    let position = DVec2::new(5000.0, 0.0);
    let orbit = OrbitalElements::circular(0.0, position, PLANET_MU).unwrap();

    let state = orbit.to_cartesian(0.0);
    let expected_speed = (PLANET_MU / 5000.0).sqrt();

    assert_almost_eq(expected_speed, 15.610701457654, "circular speed at 5000");
    assert_almost_eq_vec2(state.position, position, "position at t=0");
    assert_almost_eq_vec2(
        state.velocity,
        DVec2::new(0.0, expected_speed),
        "velocity at t=0",
    );
    assert_almost_eq(orbit.get_eccentricity(), 0.0, "eccentricity");
    assert_almost_eq_rel(orbit.get_semi_major_axis(), 5000.0, 1e-12, "semi-major axis");
}

#[test]
fn circular_orbit_closure() {
    for _ in 0..RANDOM_ITERS {
        let mu = random_mu();
        let position = random_position();
        let time = rand::random_range(-1e3..1e3);

        let mut orbit = random_elliptic();
        orbit
            .set_gravitational_parameter(mu, MuSetterMode2D::KeepElements)
            .unwrap();
        orbit.set_circular_orbit(time, position).unwrap();

        let state = orbit.to_cartesian(time);

        assert_almost_eq_vec2_rel(state.position, position, 1e-9, "circular position");
        assert_almost_eq_rel(
            state.velocity.length(),
            (mu / position.length()).sqrt(),
            1e-9,
            "circular speed",
        );
        assert!(orbit.get_eccentricity() < CIRCULAR_ECCENTRICITY);
    }
}

#[test]
fn round_trip_elements() {
    for orbit in random_elliptic_iter(RANDOM_ITERS) {
        let mu = orbit.get_gravitational_parameter();

        for _ in 0..4 {
            let time = rand::random_range(-1e3..1e3);
            let state = orbit.to_cartesian(time);
            let recovered = OrbitalElements::from_state_vectors(time, state, mu).unwrap();

            assert_same_orbit(&orbit, &recovered, 1e-3, &format!("{orbit:?} at t={time}"));

            let again = recovered.to_cartesian(time);
            assert_almost_eq_vec2_rel(again.position, state.position, 1e-4, "re-propagated position");
            assert_almost_eq_vec2_rel(again.velocity, state.velocity, 1e-4, "re-propagated velocity");
        }
    }
}

#[test]
fn round_trip_near_periapsis_of_eccentric_orbits() {
    for eccentricity in [0.95, 0.98, 0.99] {
        let orbit = OrbitalElements::with_elements(
            5000.0,
            eccentricity,
            0.3,
            10.0,
            PLANET_MU,
            OrbitDirection::CounterClockwise,
        )
        .unwrap();
        let period = orbit.get_orbital_period();

        for k in 1..100 {
            let offset = k as f64 * period * 1e-4;

            for time in [10.0 + offset, 10.0 + period - offset] {
                let state = orbit.to_cartesian(time);
                let recovered =
                    OrbitalElements::from_state_vectors(time, state, PLANET_MU).unwrap();

                assert_same_orbit(&orbit, &recovered, 1e-3, &format!("e={eccentricity} at t={time}"));
            }
        }
    }
}

#[test]
fn round_trip_along_orbit() {
    for _ in 0..16 {
        let orbit = random_mildly_elliptic();
        let mu = orbit.get_gravitational_parameter();

        for (time, state) in poll_orbit(&orbit) {
            let recovered = OrbitalElements::from_state_vectors(time, state, mu).unwrap();

            if orbit.get_eccentricity() >= CIRCULAR_ECCENTRICITY {
                assert_same_orbit(&orbit, &recovered, 1e-3, &format!("{orbit:?} at t={time}"));
            } else {
                assert_almost_eq_rel(
                    recovered.get_semi_major_axis(),
                    orbit.get_semi_major_axis(),
                    1e-3,
                    "near-circular semi-major axis",
                );
            }
        }
    }
}

#[test]
fn clockwise_orbits_keep_their_direction() {
    let position = DVec2::new(0.0, 4000.0);
    let velocity = DVec2::new(20.0, 0.0);
    let orbit = OrbitalElements::from_state_vectors(
        3.0,
        StateVectors2D { position, velocity },
        PLANET_MU,
    )
    .unwrap();

    assert_eq!(orbit.get_direction(), OrbitDirection::Clockwise);
    assert!(orbit.get_specific_angular_momentum() < 0.0);

    let state = orbit.to_cartesian(3.0);
    assert_almost_eq_vec2_rel(state.position, position, 1e-8, "clockwise position");
    assert_almost_eq_vec2_rel(state.velocity, velocity, 1e-8, "clockwise velocity");

    // A little later the body should have moved clockwise (angle decreasing)
    let later = orbit.to_cartesian(4.0).position;
    assert!(position.perp_dot(later) < 0.0);
}

#[test]
fn escape_velocity_is_rejected() {
    let mut orbit = OrbitalElements::circular(0.0, DVec2::new(5000.0, 0.0), PLANET_MU).unwrap();
    let before = orbit.clone();

    let escape_speed = (2.0 * PLANET_MU / 5000.0).sqrt();
    let result = orbit.set_orbit(
        1.0,
        DVec2::new(5000.0, 0.0),
        DVec2::new(0.0, escape_speed * 1.01),
    );

    assert!(matches!(result, Err(OrbitError::InvalidOrbitShape { eccentricity, .. }) if eccentricity > 1.0));
    assert_elements_unchanged(&before, &orbit, "escape trajectory");
}

#[test]
fn hyperbolic_excess_is_rejected() {
    let mut orbit = OrbitalElements::circular(0.0, DVec2::new(3000.0, 0.0), PLANET_MU).unwrap();
    let before = orbit.clone();

    let result = orbit.set_orbit(0.0, DVec2::new(3000.0, 0.0), DVec2::new(-200.0, 50.0));

    assert!(matches!(result, Err(OrbitError::InvalidOrbitShape { .. })));
    assert_elements_unchanged(&before, &orbit, "hyperbolic trajectory");
}

/// The usual ways to end up with NaN positions are all stopped when the orbit
/// is determined, rather than when it's propagated.
#[test]
fn degenerate_states_are_rejected() {
    let cases = [
        ("body at the center of mass", DVec2::ZERO, DVec2::new(0.0, 10.0)),
        ("radial free-fall from rest", DVec2::new(5000.0, 0.0), DVec2::ZERO),
        ("purely radial motion", DVec2::new(5000.0, 0.0), DVec2::new(3.0, 0.0)),
        ("NaN velocity", DVec2::new(5000.0, 0.0), DVec2::new(f64::NAN, 0.0)),
        ("infinite position", DVec2::new(f64::INFINITY, 0.0), DVec2::new(0.0, 10.0)),
    ];

    for (what, position, velocity) in cases {
        let mut orbit = unit_orbit();
        let before = orbit.clone();

        let result = orbit.set_orbit(0.0, position, velocity);

        assert!(
            matches!(result, Err(OrbitError::InvalidOrbitShape { .. })),
            "{what} was not rejected: {result:?}"
        );
        assert_elements_unchanged(&before, &orbit, what);
    }

    let mut orbit = unit_orbit();
    assert!(orbit.set_circular_orbit(0.0, DVec2::ZERO).is_err());
}

/// At periapsis and apoapsis the cosine of the true anomaly is exactly ±1,
/// where rounding can push it out of acos's domain.
#[test]
fn apsides_determine_finite_orbits() {
    for orbit in random_elliptic_iter(RANDOM_ITERS) {
        for true_anomaly in [0.0, PI] {
            let state = orbit.get_state_vectors_at_true_anomaly(true_anomaly);
            let recovered = OrbitalElements::from_state_vectors(
                0.0,
                state,
                orbit.get_gravitational_parameter(),
            )
            .unwrap();

            assert!(recovered.get_true_anomaly_at_epoch().is_finite());
            assert!(recovered.get_periapsis_time().is_finite());
            assert!(recovered.to_cartesian(12.5).is_finite());
        }
    }
}

#[test]
fn committed_orbits_propagate_finitely() {
    for orbit in random_elliptic_iter(100) {
        for (time, state) in poll_orbit(&orbit) {
            assert!(state.is_finite(), "non-finite state at t={time} for {orbit:?}");
        }
    }
}

#[test]
fn with_elements_validates_shape() {
    let valid = OrbitalElements::with_elements(
        3000.0,
        0.5,
        1.0,
        0.0,
        PLANET_MU,
        OrbitDirection::CounterClockwise,
    );
    assert!(valid.is_ok());

    for (a, e) in [(0.0, 0.5), (-10.0, 0.5), (3000.0, 1.0), (3000.0, 1.5), (3000.0, -0.1), (f64::NAN, 0.1)] {
        let result =
            OrbitalElements::with_elements(a, e, 0.0, 0.0, PLANET_MU, OrbitDirection::default());
        assert!(
            matches!(result, Err(OrbitError::InvalidOrbitShape { .. })),
            "a={a}, e={e} was accepted"
        );
    }
}

#[test]
fn constructors_validate_mu() {
    let state = StateVectors2D {
        position: DVec2::new(5000.0, 0.0),
        velocity: DVec2::new(0.0, 15.0),
    };

    for mu in [-PLANET_MU, 0.0, f64::NAN, f64::INFINITY] {
        let from_state = OrbitalElements::from_state_vectors(0.0, state, mu);
        let from_elements =
            OrbitalElements::with_elements(3000.0, 0.5, 0.0, 0.0, mu, OrbitDirection::default());
        let circular = OrbitalElements::circular(0.0, state.position, mu);

        for result in [from_state, from_elements, circular] {
            assert!(
                matches!(result, Err(OrbitError::InvalidGravitationalParameter { .. })),
                "mu={mu} was accepted: {result:?}"
            );
        }
    }
}

#[test]
fn apsides_are_derived() {
    let orbit = OrbitalElements::with_elements(
        3000.0,
        0.25,
        0.0,
        0.0,
        PLANET_MU,
        OrbitDirection::CounterClockwise,
    )
    .unwrap();

    assert_almost_eq(orbit.get_periapsis(), 2250.0, "periapsis");
    assert_almost_eq(orbit.get_apoapsis(), 3750.0, "apoapsis");
    assert!(orbit.get_periapsis() <= orbit.get_apoapsis());

    let at_periapsis = orbit.to_cartesian(0.0).position;
    let at_apoapsis = orbit.to_cartesian(orbit.get_orbital_period() / 2.0).position;

    assert_almost_eq_vec2(at_periapsis, DVec2::new(2250.0, 0.0), "position at periapsis");
    assert_almost_eq_vec2_rel(at_apoapsis, DVec2::new(-3750.0, 0.0), 1e-9, "position at apoapsis");
}

#[test]
fn derived_quantities() {
    for orbit in random_elliptic_iter(RANDOM_ITERS) {
        let a = orbit.get_semi_major_axis();
        let e = orbit.get_eccentricity();
        let mu = orbit.get_gravitational_parameter();

        assert_almost_eq_rel(
            orbit.get_orbital_period(),
            TAU * (a.powi(3) / mu).sqrt(),
            1e-12,
            "period",
        );
        assert_almost_eq_rel(orbit.get_semi_minor_axis(), a * (1.0 - e * e).sqrt(), 1e-12, "semi-minor axis");

        let time = rand::random_range(-1e3..1e3);
        let state = orbit.to_cartesian(time);
        let energy = 0.5 * state.velocity.length_squared() - mu / state.position.length();

        assert_almost_eq_rel(energy, orbit.get_specific_orbital_energy(), 1e-6, "specific energy");
        assert_almost_eq_rel(
            state.position.perp_dot(state.velocity),
            orbit.get_specific_angular_momentum(),
            1e-6,
            "specific angular momentum",
        );
    }
}

#[test]
fn time_to_periapsis() {
    let orbit = OrbitalElements::with_elements(
        3000.0,
        0.3,
        0.4,
        10.0,
        PLANET_MU,
        OrbitDirection::CounterClockwise,
    )
    .unwrap();
    let period = orbit.get_orbital_period();

    assert_eq!(orbit.get_time_to_periapsis(10.0), 0.0);
    assert_almost_eq_rel(orbit.get_time_to_periapsis(10.0 + period / 4.0), 0.75 * period, 1e-9, "a quarter in");

    let remaining = orbit.get_time_to_periapsis(37.0);
    let at_periapsis = orbit.to_cartesian(37.0 + remaining).position;
    assert_almost_eq_vec2_rel(at_periapsis, orbit.get_state_vectors_at_true_anomaly(0.0).position, 1e-6, "next periapsis");
}

#[test]
fn orbit_coordinates() {
    let orbit = OrbitalElements::with_elements(
        3000.0,
        0.6,
        1.3,
        -40.0,
        PLANET_MU,
        OrbitDirection::Clockwise,
    )
    .unwrap();

    assert!(orbit.get_orbit_coordinates(0).is_empty());

    let points = orbit.get_orbit_coordinates(100);
    assert_eq!(points.len(), 100);

    // Starts at periapsis, regardless of where the body currently is
    assert_almost_eq_vec2_rel(
        points[0],
        DVec2::from_angle(1.3) * orbit.get_periapsis(),
        1e-9,
        "first sample",
    );

    for point in &points {
        let distance = point.length();
        assert!(distance >= orbit.get_periapsis() - 1e-6);
        assert!(distance <= orbit.get_apoapsis() + 1e-6);
    }

    // Same orbit, same points
    assert_eq!(points, orbit.get_orbit_coordinates(100));
}

mod mu_setter {
    use super::*;

    #[test]
    fn keep_elements() {
        let mut orbit = random_elliptic();
        let before = orbit.clone();

        orbit
            .set_gravitational_parameter(before.get_gravitational_parameter() * 2.0, MuSetterMode2D::KeepElements)
            .unwrap();

        assert_eq!(orbit.get_semi_major_axis(), before.get_semi_major_axis());
        assert_eq!(orbit.get_eccentricity(), before.get_eccentricity());
        assert_eq!(orbit.get_periapsis_time(), before.get_periapsis_time());
        assert_almost_eq_rel(
            orbit.get_orbital_period(),
            before.get_orbital_period() / 2f64.sqrt(),
            1e-12,
            "period after doubling mu",
        );
    }

    #[test]
    fn keep_position_at_time() {
        for orbit in random_elliptic_iter(100) {
            let mut new = orbit.clone();
            let time = rand::random_range(-1e3..1e3);

            new.set_gravitational_parameter(
                orbit.get_gravitational_parameter() * random_mult(),
                MuSetterMode2D::KeepPositionAtTime(time),
            )
            .unwrap();

            assert_almost_eq_vec2_rel(
                new.to_cartesian(time).position,
                orbit.to_cartesian(time).position,
                1e-6,
                "position after mu change",
            );
        }
    }

    #[test]
    fn keep_state_vectors_at_time() {
        for _ in 0..100 {
            let orbit = random_mildly_elliptic();
            let mut new = orbit.clone();
            let time = rand::random_range(-1e3..1e3);

            // Raising mu always keeps a bound orbit bound
            new.set_gravitational_parameter(
                orbit.get_gravitational_parameter() * rand::random_range(1.0..2.0),
                MuSetterMode2D::KeepStateVectorsAtTime(time),
            )
            .unwrap();

            let old_state = orbit.to_cartesian(time);
            let new_state = new.to_cartesian(time);

            assert_almost_eq_vec2_rel(new_state.position, old_state.position, 1e-6, "position");
            assert_almost_eq_vec2_rel(new_state.velocity, old_state.velocity, 1e-6, "velocity");
        }
    }

    #[test]
    fn keep_state_vectors_rejects_unbinding() {
        let mut orbit = OrbitalElements::circular(0.0, DVec2::new(5000.0, 0.0), PLANET_MU).unwrap();
        let before = orbit.clone();

        // Circular speed is above escape speed once mu drops below half
        let result = orbit.set_gravitational_parameter(
            PLANET_MU * 0.4,
            MuSetterMode2D::KeepStateVectorsAtTime(0.0),
        );

        assert!(matches!(result, Err(OrbitError::InvalidOrbitShape { .. })));
        assert_elements_unchanged(&before, &orbit, "unbinding mu change");
    }

    #[test]
    fn rejects_non_positive_mu() {
        let modes = [
            MuSetterMode2D::KeepElements,
            MuSetterMode2D::KeepPositionAtTime(12.0),
            MuSetterMode2D::KeepStateVectorsAtTime(12.0),
        ];

        for mu in [-5.0, 0.0, -0.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            for mode in modes {
                let mut orbit = random_elliptic();
                let before = orbit.clone();

                let result = orbit.set_gravitational_parameter(mu, mode);

                assert!(
                    matches!(result, Err(OrbitError::InvalidGravitationalParameter { .. })),
                    "mu={mu} was accepted with {mode:?}: {result:?}"
                );
                assert_elements_unchanged(&before, &orbit, &format!("mu={mu} with {mode:?}"));
                assert!(orbit.to_cartesian(12.0).is_finite());
            }
        }
    }

    fn random_mult() -> f64 {
        if rand::random_bool(0.5) {
            rand::random_range(0.1f64..0.9f64)
        } else {
            rand::random_range(1.1f64..5.0f64)
        }
    }
}
