use crate::session::SessionSetup;
use anyhow::Result;
use log::info;
use oddball_experiment::{run_headless, ParticipantProfile, RunStatus, SimulatedParticipant};
use oddball_timing::SimulatedTimer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Longest simulated session before giving up.
const MAX_SESSION: Duration = Duration::from_secs(4 * 60 * 60);

/// Runs the session against a simulated clock and participant.
pub fn run(setup: SessionSetup) -> Result<RunStatus> {
    let seed = setup.seed;
    let timer = SimulatedTimer::new();
    let mut machine = setup.start(timer.clone(), None)?;
    let period = machine.frame_period();
    let mut participant = SimulatedParticipant::new(
        ParticipantProfile::default(),
        StdRng::seed_from_u64(seed.wrapping_add(1)),
        period,
    );
    let max_frames = (MAX_SESSION.as_secs_f64() / period.as_secs_f64()).ceil() as u64;

    let report = run_headless(&mut machine, &timer, &mut participant, max_frames)?;
    info!(
        "simulated {} frames ({:.1} s), {} tones, status {:?}",
        report.frames,
        report.elapsed.as_secs_f64(),
        report.tones,
        report.status
    );
    Ok(report.status)
}
