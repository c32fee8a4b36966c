use crate::error::ExperimentError;
use crate::state::{ExperimentStateMachine, FrameInput, RunStatus, Tick};
use log::{debug, warn};
use oddball_core::{GazePoint, Key, StimulusType};
use oddball_timing::{SimulatedTimer, Timer};
use rand::Rng;
use std::time::Duration;

/// Behaviour of a simulated participant.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantProfile {
    pub blink_rate_hz: f64,
    pub blink_duration: Duration,
    pub glance_rate_hz: f64,
    pub glance_duration: Duration,
    /// Reaction time range in milliseconds, inclusive.
    pub reaction_time_ms: (u64, u64),
    pub response_probability: f64,
    /// Time spent on an instruction slide before pressing continue.
    pub reading_time: Duration,
    /// Maximum gaze jitter around the centre, in pixels.
    pub jitter_px: f32,
}

impl Default for ParticipantProfile {
    fn default() -> Self {
        Self {
            blink_rate_hz: 0.2,
            blink_duration: Duration::from_millis(150),
            glance_rate_hz: 0.05,
            glance_duration: Duration::from_millis(400),
            reaction_time_ms: (250, 650),
            response_probability: 0.9,
            reading_time: Duration::from_millis(1500),
            jitter_px: 10.0,
        }
    }
}

impl ParticipantProfile {
    /// Never blinks or looks away and always responds.
    pub fn attentive() -> Self {
        Self {
            blink_rate_hz: 0.0,
            glance_rate_hz: 0.0,
            response_probability: 1.0,
            jitter_px: 0.0,
            ..Self::default()
        }
    }
}

/// Stands in for the eye tracker and the keyboard when no one is at the screen.
pub struct SimulatedParticipant<R: Rng> {
    profile: ParticipantProfile,
    rng: R,
    frame_period: Duration,
    blink_until: Option<Duration>,
    glance: Option<(Duration, GazePoint)>,
    respond_at: Option<Duration>,
    continue_at: Option<Duration>,
    saw_stimulus: bool,
}

impl<R: Rng> SimulatedParticipant<R> {
    pub fn new(profile: ParticipantProfile, rng: R, frame_period: Duration) -> Self {
        Self {
            profile,
            rng,
            frame_period,
            blink_until: None,
            glance: None,
            respond_at: None,
            continue_at: None,
            saw_stimulus: false,
        }
    }

    fn chance(&mut self, rate_hz: f64) -> bool {
        let p = (rate_hz * self.frame_period.as_secs_f64()).clamp(0.0, 1.0);
        p > 0.0 && self.rng.random_bool(p)
    }

    fn gaze(&mut self, now: Duration) -> Option<GazePoint> {
        self.blink_until = self.blink_until.filter(|until| now < *until);
        self.glance = self.glance.filter(|(until, _)| now < *until);
        if self.blink_until.is_some() {
            return None;
        }
        if let Some((_, point)) = self.glance {
            return Some(point);
        }
        if self.chance(self.profile.blink_rate_hz) {
            self.blink_until = Some(now + self.profile.blink_duration);
            return None;
        }
        if self.chance(self.profile.glance_rate_hz) {
            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            let point = GazePoint::new(600.0 * angle.cos(), 600.0 * angle.sin());
            self.glance = Some((now + self.profile.glance_duration, point));
            return Some(point);
        }
        let j = self.profile.jitter_px;
        if j > 0.0 {
            Some(GazePoint::new(
                self.rng.random_range(-j..=j),
                self.rng.random_range(-j..=j),
            ))
        } else {
            Some(GazePoint::default())
        }
    }

    /// Input for the refresh starting at `now`.
    pub fn input(&mut self, now: Duration) -> FrameInput {
        let mut keys = Vec::new();
        if self.respond_at.is_some_and(|t| t <= now) {
            self.respond_at = None;
            keys.push(Key::Space);
        }
        if self.continue_at.is_some_and(|t| t <= now) {
            self.continue_at = None;
            if !keys.contains(&Key::Space) {
                keys.push(Key::Space);
            }
        }
        FrameInput {
            gaze: self.gaze(now),
            keys,
        }
    }

    /// Reacts to what was shown at `now`.
    pub fn observe(&mut self, now: Duration, tick: &Tick) {
        let stimulus = !tick.cues.is_empty()
            || tick.scene.contains(|s| matches!(s, StimulusType::Ball { .. }));
        if stimulus && !self.saw_stimulus && self.rng.random_bool(self.profile.response_probability.clamp(0.0, 1.0)) {
            let (lo, hi) = self.profile.reaction_time_ms;
            let rt = Duration::from_millis(self.rng.random_range(lo.min(hi)..=hi.max(lo)));
            self.respond_at = Some(now + rt);
        }
        self.saw_stimulus = stimulus;

        if tick.awaiting_continue {
            self.continue_at.get_or_insert(now + self.profile.reading_time);
        } else {
            self.continue_at = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessReport {
    pub status: RunStatus,
    pub frames: u64,
    pub elapsed: Duration,
    pub tones: usize,
}

/// Drives a session against a simulated clock until it ends or `max_frames`
/// refreshes have passed.
pub fn run_headless<R: Rng, P: Rng>(
    machine: &mut ExperimentStateMachine<SimulatedTimer, R>,
    timer: &SimulatedTimer,
    participant: &mut SimulatedParticipant<P>,
    max_frames: u64,
) -> Result<HeadlessReport, ExperimentError> {
    let start = timer.now();
    let period = machine.frame_period();
    let mut tones = 0;
    let mut frames = 0;
    let status = loop {
        let now = timer.now();
        let input = participant.input(now);
        let tick = machine.tick(input)?;
        if tick.status != RunStatus::Running {
            break tick.status;
        }
        for cue in &tick.cues {
            debug!("cue {:?} at {:.3}s", cue, now.as_secs_f64());
        }
        tones += tick.cues.len();
        participant.observe(now, &tick);
        timer.advance(period);
        frames += 1;
        if frames >= max_frames {
            warn!("headless run stopped after {} frames", frames);
            break RunStatus::Running;
        }
    };
    Ok(HeadlessReport {
        status,
        frames,
        elapsed: timer.now().saturating_sub(start),
        tones,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oddball_core::{Color, Scene};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const PERIOD: Duration = Duration::from_millis(10);

    fn tick(scene: Scene, awaiting_continue: bool) -> Tick {
        Tick {
            scene,
            cues: Vec::new(),
            status: RunStatus::Running,
            awaiting_continue,
        }
    }

    #[test]
    fn attentive_participant_keeps_gaze_centred() {
        let mut p = SimulatedParticipant::new(ParticipantProfile::attentive(), StdRng::seed_from_u64(1), PERIOD);
        for i in 0..1000 {
            assert_eq!(p.input(PERIOD * i).gaze, Some(GazePoint::default()));
        }
    }

    #[test]
    fn default_participant_blinks_and_glances() {
        let mut p = SimulatedParticipant::new(ParticipantProfile::default(), StdRng::seed_from_u64(2), PERIOD);
        let samples: Vec<_> = (0..20_000).map(|i| p.input(PERIOD * i).gaze).collect();
        assert!(samples.iter().any(|g| g.is_none()));
        assert!(samples.iter().flatten().any(|g| g.distance_from_center() > 500.0));
        assert!(samples.iter().flatten().filter(|g| g.distance_from_center() < 20.0).count() > 15_000);
    }

    #[test]
    fn responds_once_per_stimulus_onset() {
        let mut p = SimulatedParticipant::new(ParticipantProfile::attentive(), StdRng::seed_from_u64(3), PERIOD);
        let ball = Scene::centered(Color::GREY, StimulusType::Ball { radius: 10.0, color: Color::PURPLE });
        let mut presses = 0;
        for i in 0..200u32 {
            let now = PERIOD * i;
            presses += p.input(now).keys.len();
            p.observe(now, &tick(ball.clone(), false));
        }
        assert_eq!(presses, 1);
    }

    #[test]
    fn continues_after_reading() {
        let mut p = SimulatedParticipant::new(ParticipantProfile::attentive(), StdRng::seed_from_u64(4), PERIOD);
        let slide = Scene::blank(Color::GREY);
        let mut pressed_at = None;
        for i in 0..300u32 {
            let now = PERIOD * i;
            if !p.input(now).keys.is_empty() {
                pressed_at = Some(now);
                break;
            }
            p.observe(now, &tick(slide.clone(), true));
        }
        assert_eq!(pressed_at, Some(Duration::from_millis(1500)));
    }
}
