use crate::sequence::frames_for;
use log::{info, warn};
use oddball_core::{Color, GazeMonitor, GazePoint, GazeStatus, Key, Scene, StimulusType};
use std::time::Duration;

/// Looks shared by every gaze-contingent wait of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FixationStyle {
    pub cross_size: f32,
    pub frame_period: Duration,
    pub no_data_warning: Duration,
    pub feedback_duration: Duration,
}

impl FixationStyle {
    fn redirect(&self) -> StimulusType {
        StimulusType::GazeRedirect {
            arrow_size: self.cross_size,
            arrow_distance: 5.0,
            frame_size: self.cross_size * 6.0,
            color: Color::RED,
        }
    }

    fn warning(&self) -> StimulusType {
        StimulusType::Text {
            content: "NO EYES DETECTED!".into(),
            size: self.cross_size,
            color: Color::RED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Response {
    pub timestamp: Duration,
    pub reaction_time: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSpeed {
    Fast,
    Slow,
}

impl ResponseSpeed {
    pub fn classify(reaction_time: Duration, threshold: Duration) -> Self {
        if reaction_time <= threshold {
            Self::Fast
        } else {
            Self::Slow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }
}

/// Result of one gaze-contingent wait.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaitOutcome {
    pub target: Duration,
    /// Wall clock from the first frame to completion; use this, not `target`.
    pub actual: Duration,
    pub offset: Duration,
    pub nodata: Duration,
    pub pause: Duration,
    /// How often the frame count restarted because gaze was lost or off-centre.
    pub restarts: u32,
    pub responses: Vec<Response>,
    pub first_speed: Option<ResponseSpeed>,
}

impl WaitOutcome {
    pub fn first_reaction_time(&self) -> Option<Duration> {
        self.responses.iter().find_map(|r| r.reaction_time)
    }
}

pub enum WaitStep {
    Frame(Scene),
    Done(WaitOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WaitState {
    Waiting,
    LostData { since: Duration },
    OffCenter,
}

/// Frame-locked fixation wait that only counts frames while gaze is centred.
///
/// Losing the eyes or looking away restarts the frame count; the time spent
/// in either condition is kept in its own bucket.
pub struct GazeContingentWait {
    style: FixationStyle,
    monitor: GazeMonitor,
    background: Color,
    cross_color: Color,
    target: Duration,
    target_frames: u64,
    frames: u64,
    state: WaitState,
    start: Option<Duration>,
    outcome: WaitOutcome,
    collect_responses: bool,
    response_reference: Option<Duration>,
    rt_threshold: Option<Duration>,
    feedback_until: Option<(Duration, ResponseSpeed)>,
}

impl GazeContingentWait {
    pub fn new(
        target: Duration,
        background: Color,
        cross_color: Color,
        style: FixationStyle,
        monitor: GazeMonitor,
    ) -> Self {
        Self {
            target_frames: frames_for(target, style.frame_period),
            style,
            monitor,
            background,
            cross_color,
            target,
            frames: 0,
            state: WaitState::Waiting,
            start: None,
            outcome: WaitOutcome {
                target,
                ..Default::default()
            },
            collect_responses: false,
            response_reference: None,
            rt_threshold: None,
            feedback_until: None,
        }
    }

    /// Harvest response key presses; reaction times are measured from `reference`.
    pub fn collecting_responses(mut self, reference: Option<Duration>, rt_threshold: Option<Duration>) -> Self {
        self.collect_responses = true;
        self.response_reference = reference;
        self.rt_threshold = rt_threshold;
        self
    }

    pub fn target_frames(&self) -> u64 {
        self.target_frames
    }

    pub fn add_pause(&mut self, d: Duration) {
        self.outcome.pause += d;
    }

    /// Advances by one display refresh.
    pub fn step(&mut self, now: Duration, sample: Option<GazePoint>, keys: &[Key]) -> WaitStep {
        let start = *self.start.get_or_insert(now);

        if self.state == WaitState::Waiting && self.frames >= self.target_frames {
            let mut outcome = std::mem::take(&mut self.outcome);
            outcome.actual = now.saturating_sub(start);
            info!(
                "wait done: {} frames, actual {:.3}s, nodata {:.3}s, offset {:.3}s, pause {:.3}s",
                self.target_frames,
                outcome.actual.as_secs_f64(),
                outcome.nodata.as_secs_f64(),
                outcome.offset.as_secs_f64(),
                outcome.pause.as_secs_f64(),
            );
            return WaitStep::Done(outcome);
        }

        if self.collect_responses {
            self.harvest(now, keys);
        }

        let period = self.style.frame_period;
        match self.monitor.classify(sample) {
            GazeStatus::NoData => {
                let since = match self.state {
                    WaitState::LostData { since } => since,
                    _ => {
                        warn!("warning: no eyes detected");
                        self.restart(WaitState::LostData { since: now });
                        now
                    }
                };
                self.outcome.nodata += period;
                let mut scene = Scene::blank(self.background);
                // tolerate blinks before warning
                if now.saturating_sub(since) > self.style.no_data_warning {
                    scene = scene.with(self.style.warning(), (0.0, 0.0));
                }
                WaitStep::Frame(scene)
            }
            GazeStatus::Offset => {
                if self.state != WaitState::OffCenter {
                    warn!("warning: gaze offset");
                    self.restart(WaitState::OffCenter);
                }
                self.outcome.offset += period;
                WaitStep::Frame(Scene::centered(self.background, self.style.redirect()))
            }
            GazeStatus::Centered => {
                self.state = WaitState::Waiting;
                self.frames += 1;
                WaitStep::Frame(self.fixation_scene(now))
            }
        }
    }

    fn restart(&mut self, state: WaitState) {
        self.state = state;
        self.frames = 0;
        self.outcome.restarts += 1;
    }

    /// Takes over responses given before the wait started, e.g. while the
    /// stimulus was on screen.
    pub fn carry_responses(&mut self, responses: Vec<Response>, now: Duration) {
        for response in responses {
            self.push_response(response, now);
        }
    }

    fn harvest(&mut self, now: Duration, keys: &[Key]) {
        for _ in keys.iter().filter(|k| **k == Key::Space) {
            let response = Response {
                timestamp: now,
                reaction_time: self.response_reference.map(|r| now.saturating_sub(r)),
            };
            self.push_response(response, now);
        }
    }

    fn push_response(&mut self, response: Response, now: Duration) {
        let first = self.outcome.responses.is_empty();
        self.outcome.responses.push(response);
        if let (true, Some(rt), Some(threshold)) = (first, response.reaction_time, self.rt_threshold) {
            let speed = ResponseSpeed::classify(rt, threshold);
            self.outcome.first_speed = Some(speed);
            self.feedback_until = Some((now + self.style.feedback_duration, speed));
        }
    }

    fn fixation_scene(&self, now: Duration) -> Scene {
        let mut scene = Scene::centered(
            self.background,
            StimulusType::FixationCross {
                size: self.style.cross_size,
                color: self.cross_color,
            },
        );
        if let Some((until, speed)) = self.feedback_until {
            if now < until {
                let (content, color) = match speed {
                    ResponseSpeed::Fast => ("+10", Color::GREEN),
                    ResponseSpeed::Slow => ("+0", Color::DARK_GREY),
                };
                scene = scene.with(
                    StimulusType::Text {
                        content: content.into(),
                        size: self.style.cross_size * 0.75,
                        color,
                    },
                    (0.0, self.style.cross_size * 1.5),
                );
            }
        }
        scene
    }
}
