use std::io::{self, Write};

use glam::DVec2;
use kepler2d::{
    config::Config, ColliderTag, Contact, OrbitalElements, OrbitalRigidbody, PointMass,
    RadiusLimits, RigidbodyConfig, TickOutcome, UpdateMode,
};

const SIMULATION_TICKS: u32 = 20_000;
const DT: f64 = 0.05;
const REPORT_EVERY: u32 = 1000;
const PLANET: DVec2 = DVec2::new(0.0, 0.0);

fn main() {
    tracing_subscriber::fmt::init();

    // An optional TOML config can be passed as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("couldn't load {path}: {err}");
                std::process::exit(1);
            }
        },
        None => Config {
            limits: RadiusLimits::new(1000.0, 7000.0),
            ..Default::default()
        },
    };

    let mut ships = [
        (
            "follower",
            spawn(&config, DVec2::new(3000.0, 0.0), UpdateMode::FollowOrbit),
        ),
        (
            "integrated",
            spawn(&config, DVec2::new(0.0, -4500.0), UpdateMode::Forces),
        ),
    ];

    let mut lock = io::stdout().lock();
    eprintln!("Simulating {SIMULATION_TICKS} ticks...");

    for tick in 0..SIMULATION_TICKS {
        let time = tick as f64 * DT;

        for (name, ship) in ships.iter_mut() {
            if let TickOutcome::Skipped(err) = ship.fixed_update(time) {
                writeln!(&mut lock, "{name}: skipped tick {tick}: {err}").unwrap();
            }

            // Something bumps into both ships halfway through
            if tick == SIMULATION_TICKS / 2 {
                let contacts = [Contact {
                    normal: ship.body().prograde(),
                    normal_impulse: 2.0,
                    collider: ColliderTag::Player,
                }];
                match ship.on_collision(time, &contacts) {
                    Ok(()) => writeln!(&mut lock, "{name}: bumped at tick {tick}").unwrap(),
                    Err(err) => writeln!(&mut lock, "{name}: bump discarded: {err}").unwrap(),
                }
            }

            ship.rigidbody_mut().step(DT);
        }

        if tick % REPORT_EVERY == 0 {
            writeln!(&mut lock, "=== Tick {tick} (t = {time:.2}) ===").unwrap();
            for (name, ship) in ships.iter() {
                describe(&mut lock, name, ship);
            }
        }
    }
}

fn spawn(config: &Config, position: DVec2, update_mode: UpdateMode) -> OrbitalRigidbody<PointMass> {
    let mut rigidbody = PointMass::new(PLANET + position, 1.0);
    let mu = config.orbit.gravitational_parameter();
    rigidbody.velocity = OrbitalElements::circular_velocity(position, mu);

    let mut ship = OrbitalRigidbody::from_placement(
        0.0,
        rigidbody,
        PLANET,
        &config.orbit,
        config.limits,
        RigidbodyConfig {
            update_mode,
            ..config.rigidbody
        },
    )
    .unwrap();

    if let Some(frame) = config.frame {
        let coupling = *ship.config();
        let (body, mut rigidbody) = ship.into_parts();
        let body = body.with_frame(frame);
        // Circular as seen from the rotating frame
        rigidbody.velocity = body.velocity();
        ship = OrbitalRigidbody::new(body, rigidbody, coupling);
    }

    ship
}

fn describe(out: &mut impl Write, name: &str, ship: &OrbitalRigidbody<PointMass>) {
    let body = ship.body();
    let elements = body.elements();
    writeln!(
        out,
        "{name:>10}: pos {:>9.1} {:>9.1} | alt {:>7.1} | a {:>7.1} e {:.4} | heading {:>5.1}",
        body.position().x,
        body.position().y,
        body.altitude(),
        elements.get_semi_major_axis(),
        elements.get_eccentricity(),
        ship.rigidbody().rotation,
    )
    .unwrap();
}
