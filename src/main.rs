//! Rex Chase headless runner
//!
//! Drives a session with a simple autopilot at a fixed timestep and prints
//! snapshots as JSON lines. Usage: `rex-chase [tuning.json] [seed]`.

use std::process::ExitCode;

use rex_chase::Tuning;
use rex_chase::sim::{Lane, Session, SessionPhase, SimEvent, TickInput, tick};

/// Simulation rate (Hz)
const TICK_RATE: f32 = 60.0;
/// Longest run before giving up (seconds)
const MAX_RUN_SECS: f32 = 300.0;
/// Print a snapshot this often (frames)
const REPORT_EVERY: u64 = 60;
/// How far ahead the autopilot looks for obstacles (metres)
const LOOKAHEAD: f32 = 30.0;

/// Steer away from the nearest visible obstacle in the current lane
fn autopilot(session: &Session, frame: u64) -> TickInput {
    let mut input = TickInput {
        start: frame == 0,
        ..Default::default()
    };
    let vehicle = &session.vehicle;
    if vehicle.lanes().is_transitioning() {
        return input;
    }
    let lane = vehicle.lane();
    let z = vehicle.position.z;
    let blocked = session
        .road
        .active()
        .filter_map(|id| session.road.segment(id))
        .any(|segment| {
            let ahead = segment.obstacle_z() - z;
            segment.obstacle.visible && segment.obstacle.lane() == lane && ahead > 0.0 && ahead < LOOKAHEAD
        });
    if blocked {
        let wants_left = lane != Lane::LEFT && vehicle.locked_lane() != lane.step(-1);
        input.steer_left = wants_left;
        input.steer_right = !wants_left;
    }
    input
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => {
            log::info!("Loading tuning from {path}");
            Tuning::from_json(&std::fs::read_to_string(&path)?)?
        }
        None => Tuning::default(),
    };
    let seed = match args.next() {
        Some(seed) => seed.parse()?,
        None => 0xC0FFEE,
    };

    let mut session = Session::new(&tuning, seed)?;
    let dt = 1.0 / TICK_RATE;
    let max_frames = (MAX_RUN_SECS * TICK_RATE) as u64;

    for frame in 0..max_frames {
        let input = autopilot(&session, frame);
        tick(&mut session, &input, dt);

        // Pretend every one-shot sound finishes immediately
        for event in session.drain_events() {
            match event {
                SimEvent::PlayCue {
                    handle,
                    looping: false,
                    ..
                } => session.notify_cue_complete(handle),
                SimEvent::GameOver { cause } => log::info!("Run ended: {cause:?}"),
                other => log::trace!("{other:?}"),
            }
        }

        if frame % REPORT_EVERY == 0 {
            println!("{}", serde_json::to_string(&session.snapshot())?);
        }
        if session.phase() == SessionPhase::GameOver {
            break;
        }
    }

    let snapshot = session.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    log::info!(
        "Finished after {:.1}s at {:.0}m",
        snapshot.elapsed,
        snapshot.vehicle_z
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Rex Chase (headless) starting...");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
