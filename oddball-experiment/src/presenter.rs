use crate::config::{ExperimentConfig, Modality, ToneConfig};
use crate::sequence::frames_for;
use oddball_core::{Color, Level, ManipulationStep, Scene, StimulusType, TrialKind, TrialSpec};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

/// Side effects the host performs alongside drawing a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cue {
    /// Start a tone now; it is timed to coincide with the frame it arrives with.
    Tone { frequency_hz: f32, duration: Duration },
}

/// Which frequency plays the standard and which the oddball for this participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneAssignment {
    pub standard_hz: f32,
    pub oddball_hz: f32,
}

impl ToneAssignment {
    pub fn fixed(tones: &ToneConfig) -> Self {
        Self {
            standard_hz: tones.first_hz,
            oddball_hz: tones.second_hz,
        }
    }

    /// Counterbalances the two tones across participants when enabled.
    pub fn balanced<R: Rng + ?Sized>(tones: &ToneConfig, rng: &mut R) -> Self {
        let fixed = Self::fixed(tones);
        if tones.balance && rng.random_bool(0.5) {
            fixed.swapped()
        } else {
            fixed
        }
    }

    pub fn swapped(self) -> Self {
        Self {
            standard_hz: self.oddball_hz,
            oddball_hz: self.standard_hz,
        }
    }

    pub fn frequency_for(&self, kind: TrialKind) -> f32 {
        match kind {
            TrialKind::Standard | TrialKind::OddballReversed => self.standard_hz,
            TrialKind::Oddball | TrialKind::StandardReversed => self.oddball_hz,
        }
    }
}

/// Maps trials and manipulation steps onto what is drawn and played.
#[derive(Debug, Clone)]
pub struct StimulusTable {
    modality: Modality,
    background: Color,
    cross_size: f32,
    stimulus_duration: Duration,
    tones: ToneAssignment,
    ball_color: Color,
    high_salience_scale: f32,
    low_salience_scale: f32,
    squeeze_color: Color,
    relax_color: Color,
}

impl StimulusTable {
    pub fn new(config: &ExperimentConfig, tones: ToneAssignment) -> Self {
        Self {
            modality: config.modality,
            background: config.background,
            cross_size: config.fixation_cross_px,
            stimulus_duration: config.stimulus_duration(),
            tones,
            ball_color: config.balls.color,
            high_salience_scale: config.balls.high_salience_scale,
            low_salience_scale: config.balls.low_salience_scale,
            squeeze_color: config.balls.squeeze_color,
            relax_color: config.balls.relax_color,
        }
    }

    pub fn tones(&self) -> ToneAssignment {
        self.tones
    }

    pub fn ball_radius(&self, trial: &TrialSpec) -> f32 {
        if !trial.kind.is_oddball() {
            return self.cross_size;
        }
        let scale = match trial.salience.unwrap_or(Level::High) {
            Level::High => self.high_salience_scale,
            Level::Low => self.low_salience_scale,
        };
        self.cross_size * scale
    }

    pub fn trial(&self, trial: &TrialSpec) -> (Scene, Option<Cue>) {
        match self.modality {
            Modality::Visual => {
                let ball = StimulusType::Ball {
                    radius: self.ball_radius(trial),
                    color: self.ball_color,
                };
                (Scene::centered(self.background, ball), None)
            }
            Modality::Auditory => {
                let cross = StimulusType::FixationCross {
                    size: self.cross_size,
                    color: Color::BLACK,
                };
                let cue = Cue::Tone {
                    frequency_hz: self.tones.frequency_for(trial.kind),
                    duration: self.stimulus_duration,
                };
                (Scene::centered(self.background, cross), Some(cue))
            }
        }
    }

    pub fn manipulation(&self, step: ManipulationStep) -> Scene {
        let color = match step {
            ManipulationStep::Squeeze => self.squeeze_color,
            ManipulationStep::Relax => self.relax_color,
            ManipulationStep::Baseline => {
                return Scene::centered(
                    self.background,
                    StimulusType::FixationCross {
                        size: self.cross_size,
                        color: Color::BLACK,
                    },
                );
            }
        };
        Scene::centered(
            self.background,
            StimulusType::Ball {
                radius: self.cross_size,
                color,
            },
        )
    }
}

pub enum PresentStep {
    Frame { scene: Scene, cue: Option<Cue> },
    Done { actual: Duration },
}

/// Shows a fixed scene for a whole number of frames.
pub struct StimulusPresentation {
    scene: Scene,
    cue: Option<Cue>,
    frames: u64,
    shown: u64,
    onset: Option<Duration>,
}

impl StimulusPresentation {
    pub fn new(scene: Scene, cue: Option<Cue>, duration: Duration, frame_period: Duration) -> Self {
        Self {
            scene,
            cue,
            frames: frames_for(duration, frame_period),
            shown: 0,
            onset: None,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Time of the first frame, once shown.
    pub fn onset(&self) -> Option<Duration> {
        self.onset
    }

    pub fn step(&mut self, now: Duration) -> PresentStep {
        let onset = *self.onset.get_or_insert(now);
        if self.shown >= self.frames {
            return PresentStep::Done {
                actual: now.saturating_sub(onset),
            };
        }
        self.shown += 1;
        PresentStep::Frame {
            scene: self.scene.clone(),
            cue: self.cue.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn trial(label: &str) -> TrialSpec {
        label.parse().unwrap()
    }

    #[test]
    fn presentation_runs_for_rounded_frames_and_cues_once() {
        let period = Duration::from_nanos(16_666_667);
        let cue = Cue::Tone {
            frequency_hz: 500.0,
            duration: Duration::from_millis(100),
        };
        let mut p = StimulusPresentation::new(Scene::blank(Color::GREY), Some(cue), Duration::from_millis(100), period);
        assert_eq!(p.frames(), 6);

        let mut now = Duration::from_secs(2);
        let mut cues = Vec::new();
        let actual = loop {
            match p.step(now) {
                PresentStep::Frame { cue, .. } => cues.extend(cue),
                PresentStep::Done { actual } => break actual,
            }
            now += period;
        };
        assert_eq!(cues, vec![cue]);
        assert_eq!(actual, period * 6);
        assert_eq!(p.onset(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn short_stimulus_is_shown_for_one_frame_with_its_cue() {
        let period = Duration::from_nanos(16_666_667);
        let cue = Cue::Tone {
            frequency_hz: 750.0,
            duration: Duration::from_millis(5),
        };
        let mut p = StimulusPresentation::new(Scene::blank(Color::GREY), Some(cue), Duration::from_millis(5), period);
        assert_eq!(p.frames(), 1);
        let start = Duration::from_secs(1);
        match p.step(start) {
            PresentStep::Frame { cue: shown, .. } => assert_eq!(shown, Some(cue)),
            PresentStep::Done { .. } => panic!("expected a frame"),
        }
        assert_eq!(p.onset(), Some(start));
        assert!(matches!(p.step(start + period), PresentStep::Done { actual } if actual == period));
    }

    #[test]
    fn reversed_trials_swap_the_tones() {
        let tones = ToneAssignment::fixed(&ToneConfig::default());
        assert_eq!(tones.frequency_for(TrialKind::Standard), 500.0);
        assert_eq!(tones.frequency_for(TrialKind::Oddball), 750.0);
        assert_eq!(tones.frequency_for(TrialKind::StandardReversed), 750.0);
        assert_eq!(tones.frequency_for(TrialKind::OddballReversed), 500.0);
    }

    #[test]
    fn balancing_picks_both_assignments_across_participants() {
        let tones = ToneConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let picks: Vec<_> = (0..64).map(|_| ToneAssignment::balanced(&tones, &mut rng)).collect();
        assert!(picks.iter().any(|t| t.standard_hz == 500.0));
        assert!(picks.iter().any(|t| t.standard_hz == 750.0));

        let unbalanced = ToneConfig { balance: false, ..ToneConfig::default() };
        for _ in 0..16 {
            assert_eq!(ToneAssignment::balanced(&unbalanced, &mut rng).standard_hz, 500.0);
        }
    }

    #[test]
    fn visual_ball_sizes_follow_salience() {
        let config = ExperimentConfig::visual();
        let table = StimulusTable::new(&config, ToneAssignment::fixed(&config.tones));
        let cross = config.fixation_cross_px;
        assert_eq!(table.ball_radius(&trial("standard")), cross);
        assert_eq!(table.ball_radius(&trial("oddball")), cross * 0.5);
        assert_eq!(table.ball_radius(&trial("oddball:+:+")), cross * 0.5);
        assert_eq!(table.ball_radius(&trial("oddball:+:-")), cross * 0.91);

        let (scene, cue) = table.trial(&trial("oddball:-:-"));
        assert!(cue.is_none());
        assert!(scene.contains(|s| matches!(s, StimulusType::Ball { color, .. } if *color == Color::PURPLE)));
    }

    #[test]
    fn auditory_trials_keep_the_cross_and_play_a_tone() {
        let config = ExperimentConfig::auditory();
        let table = StimulusTable::new(&config, ToneAssignment::fixed(&config.tones));
        let (scene, cue) = table.trial(&trial("oddball"));
        assert!(scene.contains(|s| matches!(s, StimulusType::FixationCross { .. })));
        assert_eq!(
            cue,
            Some(Cue::Tone {
                frequency_hz: 750.0,
                duration: Duration::from_millis(100)
            })
        );
    }

    #[test]
    fn manipulation_balls_are_coloured_by_step() {
        let config = ExperimentConfig::auditory();
        let table = StimulusTable::new(&config, ToneAssignment::fixed(&config.tones));
        let squeeze = table.manipulation(ManipulationStep::Squeeze);
        assert!(squeeze.contains(|s| matches!(s, StimulusType::Ball { color, .. } if *color == Color::YELLOW)));
        let relax = table.manipulation(ManipulationStep::Relax);
        assert!(relax.contains(|s| matches!(s, StimulusType::Ball { color, .. } if *color == Color::BLUE)));
    }
}
