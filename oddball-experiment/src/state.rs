use crate::config::{ConfigError, ExperimentConfig, Modality};
use crate::control::{ControlSignal, PauseAbortHandler};
use crate::error::ExperimentError;
use crate::presenter::{Cue, PresentStep, StimulusPresentation, StimulusTable, ToneAssignment};
use crate::record::{MemorySink, Participant, RecordSink, RowContext, TrialRecord};
use crate::sequence::{expand, repetitions_for, IsiSampler, Ordering};
use crate::trigger::{DummyTriggerPort, SentTrigger, TriggerEncoder, TriggerPort};
use crate::waiter::{FixationStyle, GazeContingentWait, Response, WaitOutcome, WaitStep};
use log::{debug, info};
use oddball_core::{
    CalibrationSlide, Color, GazeMonitor, GazePoint, Key, ManipulationStep, Phase, Scene,
    StimulusType, TrialSpec,
};
use oddball_timing::Timer;
use rand::Rng;
use std::time::Duration;

/// What the host observed during one display refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub gaze: Option<GazePoint>,
    pub keys: Vec<Key>,
}

impl FrameInput {
    pub fn centered() -> Self {
        Self {
            gaze: Some(GazePoint::default()),
            keys: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.keys.push(key);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Finished,
    Aborted,
}

/// What the host has to do for one display refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub scene: Scene,
    pub cues: Vec<Cue>,
    pub status: RunStatus,
    /// An instruction slide is waiting for the continue key.
    pub awaiting_continue: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedStep {
    Instruction(usize),
    Baseline,
    Calibration(CalibrationSlide),
    Trial(TrialSpec),
    Manipulation(ManipulationStep),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPhase {
    pub phase: Phase,
    pub steps: Vec<PlannedStep>,
}

fn parse_trials(field: &'static str, labels: &[String]) -> Result<Vec<TrialSpec>, ConfigError> {
    labels
        .iter()
        .map(|label| {
            label
                .parse()
                .map_err(|source| ConfigError::TrialLabel { field, source })
        })
        .collect()
}

fn trial_steps<R: Rng + ?Sized>(
    field: &'static str,
    labels: &[String],
    n_trials: usize,
    rng: &mut R,
) -> Result<Vec<PlannedStep>, ConfigError> {
    let base = parse_trials(field, labels)?;
    let repetitions = repetitions_for(n_trials, base.len());
    Ok(expand(&base, repetitions, Ordering::Random, rng)
        .into_iter()
        .map(PlannedStep::Trial)
        .collect())
}

/// Materialises every phase and inner trial list, shuffling where the phase
/// asks for it.
pub fn plan_phases<R: Rng + ?Sized>(
    config: &ExperimentConfig,
    rng: &mut R,
) -> Result<Vec<PlannedPhase>, ConfigError> {
    config
        .phases
        .iter()
        .map(|&phase| {
            let steps = match phase {
                Phase::Instruction(slide) => vec![PlannedStep::Instruction(slide)],
                Phase::Baseline => vec![PlannedStep::Baseline],
                Phase::BaselineCalibration => expand(
                    &CalibrationSlide::SEQUENCE,
                    config.calibration_repetitions,
                    Ordering::Sequential,
                    rng,
                )
                .into_iter()
                .map(PlannedStep::Calibration)
                .collect(),
                Phase::ManipulationBlock => expand(
                    &ManipulationStep::SEQUENCE,
                    config.manipulation_repetitions,
                    Ordering::Sequential,
                    rng,
                )
                .into_iter()
                .map(PlannedStep::Manipulation)
                .collect(),
                Phase::OddballBlock => trial_steps(
                    "oddball_sequence",
                    &config.oddball_sequence,
                    config.trials_per_block,
                    rng,
                )?,
                Phase::OddballBlockReversed => trial_steps(
                    "reversed_sequence",
                    &config.reversed_sequence,
                    config.trials_per_block,
                    rng,
                )?,
                Phase::Practice => trial_steps(
                    "practice_sequence",
                    &config.practice_sequence,
                    config.practice_trials,
                    rng,
                )?,
            };
            Ok(PlannedPhase { phase, steps })
        })
        .collect()
}

/// Median of a set of reaction times; `None` when empty.
pub fn median(times: &[Duration]) -> Option<Duration> {
    let mut sorted = times.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => None,
        n if n % 2 == 1 => Some(sorted[mid]),
        _ => Some((sorted[mid - 1] + sorted[mid]) / 2),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixationRow {
    /// Baseline phase or calibration slide; `counted` advances the baseline counter.
    Baseline { counted: bool },
    Manipulation,
}

enum TrialStage {
    Stimulus(StimulusPresentation),
    Isi {
        shown_for: Duration,
        wait: GazeContingentWait,
    },
}

struct RunningTrial {
    spec: TrialSpec,
    isi: Duration,
    stage: TrialStage,
    onset: Option<Duration>,
    early_responses: Vec<Response>,
    pending_pause: Duration,
}

enum ActiveStep {
    Instruction {
        slide: usize,
    },
    Fixation {
        label: &'static str,
        row: FixationRow,
        wait: GazeContingentWait,
    },
    Trial(Box<RunningTrial>),
    Ball {
        step: ManipulationStep,
        presentation: StimulusPresentation,
    },
}

struct Active {
    started: Duration,
    step: ActiveStep,
}

impl Active {
    fn add_pause(&mut self, d: Duration) {
        match &mut self.step {
            ActiveStep::Fixation { wait, .. } => wait.add_pause(d),
            ActiveStep::Trial(trial) => match &mut trial.stage {
                TrialStage::Isi { wait, .. } => wait.add_pause(d),
                TrialStage::Stimulus(_) => trial.pending_pause += d,
            },
            ActiveStep::Instruction { .. } | ActiveStep::Ball { .. } => {}
        }
    }
}

enum Advance {
    Frame { scene: Scene, cue: Option<Cue>, awaiting_continue: bool },
    Done(TrialRecord),
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    phase: usize,
    step: usize,
    entered: bool,
}

/// Runs the whole session one display refresh at a time.
///
/// The host calls [`tick`](Self::tick) once per refresh with the current gaze
/// sample and key presses and draws the returned scene. Phase and trial
/// lists are fixed at construction; ISIs are drawn as each trial starts.
pub struct ExperimentStateMachine<T: Timer, R: Rng> {
    config: ExperimentConfig,
    participant: Participant,
    timer: T,
    rng: R,
    plan: Vec<PlannedPhase>,
    cursor: Cursor,
    active: Option<Active>,
    status: RunStatus,
    started: bool,
    triggers: TriggerEncoder<T>,
    sink: Box<dyn RecordSink>,
    control: PauseAbortHandler,
    stimuli: StimulusTable,
    isi: IsiSampler,
    monitor: GazeMonitor,
    frame_period: Duration,
    block_counter: u32,
    oddball_trial_counter: u32,
    manipulation_trial_counter: u32,
    baseline_trial_counter: u32,
    practice_reaction_times: Vec<Duration>,
    rt_threshold: Option<Duration>,
}

impl<T: Timer, R: Rng> ExperimentStateMachine<T, R> {
    pub fn new(
        config: ExperimentConfig,
        participant: Participant,
        timer: T,
        mut rng: R,
    ) -> Result<Self, ExperimentError> {
        config.validate()?;
        let table = config.trigger_table()?;
        let tones = ToneAssignment::balanced(&config.tones, &mut rng);
        let plan = plan_phases(&config, &mut rng)?;
        info!(
            "participant {} ({}), task {}, {} phases, standard tone {} Hz, oddball tone {} Hz",
            participant.id,
            participant.group,
            config.task_name,
            plan.len(),
            tones.standard_hz,
            tones.oddball_hz,
        );
        Ok(Self {
            triggers: TriggerEncoder::new(
                table,
                Box::new(DummyTriggerPort),
                timer.clone(),
                config.pulse_width(),
            ),
            sink: Box::new(MemorySink::new()),
            control: PauseAbortHandler::new(config.background, config.fixation_cross_px * 0.5),
            stimuli: StimulusTable::new(&config, tones),
            isi: IsiSampler::new(config.isi_range_ms),
            monitor: GazeMonitor::new(config.gaze_cutoff_px()),
            frame_period: config.frame_period(),
            config,
            participant,
            timer,
            rng,
            plan,
            cursor: Cursor::default(),
            active: None,
            status: RunStatus::Running,
            started: false,
            block_counter: 0,
            oddball_trial_counter: 1,
            manipulation_trial_counter: 1,
            baseline_trial_counter: 1,
            practice_reaction_times: Vec::new(),
            rt_threshold: None,
        })
    }

    pub fn with_trigger_port(mut self, port: Box<dyn TriggerPort>) -> Self {
        self.triggers = TriggerEncoder::new(
            self.triggers.table().clone(),
            port,
            self.timer.clone(),
            self.config.pulse_width(),
        );
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Uses the measured refresh period instead of the configured one.
    pub fn with_frame_period(mut self, frame_period: Duration) -> Self {
        if !frame_period.is_zero() {
            self.frame_period = frame_period;
        }
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn participant(&self) -> Participant {
        self.participant
    }

    pub fn plan(&self) -> &[PlannedPhase] {
        &self.plan
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.plan.get(self.cursor.phase).map(|p| p.phase)
    }

    pub fn frame_period(&self) -> Duration {
        self.frame_period
    }

    pub fn tone_assignment(&self) -> ToneAssignment {
        self.stimuli.tones()
    }

    pub fn triggers_sent(&self) -> &[SentTrigger] {
        self.triggers.sent()
    }

    /// Fast/slow threshold, set once the practice phase is over.
    pub fn rt_threshold(&self) -> Option<Duration> {
        self.rt_threshold
    }

    pub fn block_counter(&self) -> u32 {
        self.block_counter
    }

    /// Advances the session by one display refresh.
    pub fn tick(&mut self, input: FrameInput) -> Result<Tick, ExperimentError> {
        if self.status != RunStatus::Running {
            return Ok(self.idle_tick());
        }
        let now = self.timer.now();
        if !self.started {
            self.started = true;
            info!("experiment started");
            self.triggers.send("experiment_start");
        }

        let mut keys: Vec<Key> = match self.control.poll(now, &input.keys, &mut self.triggers) {
            ControlSignal::Aborted => {
                self.status = RunStatus::Aborted;
                self.active = None;
                return Ok(self.idle_tick());
            }
            ControlSignal::Suspended => {
                return Ok(Tick {
                    scene: self
                        .control
                        .scene()
                        .unwrap_or_else(|| Scene::blank(self.config.background)),
                    cues: Vec::new(),
                    status: RunStatus::Running,
                    awaiting_continue: false,
                });
            }
            ControlSignal::Resumed(paused) => {
                if let Some(active) = &mut self.active {
                    active.add_pause(paused);
                }
                Vec::new()
            }
            ControlSignal::Continue => input.keys.iter().copied().filter(|k| *k == Key::Space).collect(),
        };

        loop {
            if self.active.is_none() {
                match self.next_step() {
                    Some(step) => self.start_step(step, now),
                    None => {
                        self.finish();
                        return Ok(self.idle_tick());
                    }
                }
            }
            match self.advance(now, input.gaze, &keys) {
                Advance::Frame {
                    scene,
                    cue,
                    awaiting_continue,
                } => {
                    return Ok(Tick {
                        scene,
                        cues: cue.into_iter().collect(),
                        status: RunStatus::Running,
                        awaiting_continue,
                    });
                }
                Advance::Done(record) => {
                    self.active = None;
                    self.sink.write(&record)?;
                    // a key press ends at most one step
                    keys.clear();
                }
            }
        }
    }

    fn idle_tick(&self) -> Tick {
        Tick {
            scene: Scene::blank(self.config.background),
            cues: Vec::new(),
            status: self.status,
            awaiting_continue: false,
        }
    }

    fn finish(&mut self) {
        info!("experiment finished");
        self.triggers.send("experiment_end");
        self.status = RunStatus::Finished;
    }

    fn next_step(&mut self) -> Option<PlannedStep> {
        loop {
            let phase = self.plan.get(self.cursor.phase)?.phase;
            if !self.cursor.entered {
                self.cursor.entered = true;
                self.enter_phase(phase);
            }
            if let Some(step) = self.plan[self.cursor.phase].steps.get(self.cursor.step) {
                self.cursor.step += 1;
                return Some(step.clone());
            }
            self.leave_phase(phase);
            self.cursor = Cursor {
                phase: self.cursor.phase + 1,
                ..Cursor::default()
            };
        }
    }

    fn enter_phase(&mut self, phase: Phase) {
        self.block_counter += 1;
        info!("phase {} started (block {})", phase, self.block_counter);
        if !phase.is_instruction() {
            self.triggers.send(&phase.to_string());
        }
    }

    fn leave_phase(&mut self, phase: Phase) {
        if !phase.is_practice() {
            return;
        }
        self.rt_threshold = median(&self.practice_reaction_times);
        match self.rt_threshold {
            Some(t) => info!(
                "practice median reaction time {:.3}s from {} responses",
                t.as_secs_f64(),
                self.practice_reaction_times.len()
            ),
            None => info!("no practice responses, fast/slow feedback disabled"),
        }
    }

    fn style(&self) -> FixationStyle {
        FixationStyle {
            cross_size: self.config.fixation_cross_px,
            frame_period: self.frame_period,
            no_data_warning: self.config.no_data_warning(),
            feedback_duration: self.config.feedback_duration(),
        }
    }

    fn fixation_wait(&self, target: Duration, background: Color, cross: Color) -> GazeContingentWait {
        GazeContingentWait::new(target, background, cross, self.style(), self.monitor)
    }

    fn start_step(&mut self, step: PlannedStep, now: Duration) {
        let background = self.config.background;
        let baseline = self.config.baseline_duration();
        let step = match step {
            PlannedStep::Instruction(slide) => {
                info!("showing instruction slide {}", slide);
                ActiveStep::Instruction { slide }
            }
            PlannedStep::Baseline => ActiveStep::Fixation {
                label: "baseline",
                row: FixationRow::Baseline { counted: true },
                wait: self.fixation_wait(baseline, background, Color::BLACK),
            },
            PlannedStep::Calibration(slide) => {
                self.triggers.send(slide.label());
                let (bg, cross) = match slide {
                    CalibrationSlide::Baseline => (background, Color::BLACK),
                    CalibrationSlide::WhiteSlide => (Color::WHITE, Color::BLACK),
                    CalibrationSlide::BlackSlide => (Color::BLACK, Color::GREY),
                };
                ActiveStep::Fixation {
                    label: slide.label(),
                    row: FixationRow::Baseline {
                        counted: slide == CalibrationSlide::Baseline,
                    },
                    wait: self.fixation_wait(baseline, bg, cross),
                }
            }
            PlannedStep::Manipulation(ManipulationStep::Baseline) => {
                self.triggers.send(ManipulationStep::Baseline.trigger_name());
                ActiveStep::Fixation {
                    label: ManipulationStep::Baseline.label(),
                    row: FixationRow::Manipulation,
                    wait: self.fixation_wait(baseline, background, Color::BLACK),
                }
            }
            PlannedStep::Manipulation(step) => {
                info!("manipulation {}", step.label());
                self.triggers.send(step.trigger_name());
                let duration = match step {
                    ManipulationStep::Squeeze => self.config.squeeze_duration(),
                    _ => self.config.relax_duration(),
                };
                ActiveStep::Ball {
                    step,
                    presentation: StimulusPresentation::new(
                        self.stimuli.manipulation(step),
                        None,
                        duration,
                        self.frame_period,
                    ),
                }
            }
            PlannedStep::Trial(spec) => {
                self.triggers.send("trial");
                let isi = self.isi.draw(&mut self.rng);
                info!(
                    "trial {} ({}), ISI {:.3}s",
                    self.oddball_trial_counter,
                    spec.label,
                    isi.as_secs_f64()
                );
                let stimulus_trigger = self
                    .config
                    .stimulus_trigger
                    .clone()
                    .unwrap_or_else(|| spec.trigger_name().to_string());
                self.triggers.send(&stimulus_trigger);
                let (scene, cue) = self.stimuli.trial(&spec);
                let presentation = StimulusPresentation::new(
                    scene,
                    cue,
                    self.config.stimulus_duration(),
                    self.frame_period,
                );
                ActiveStep::Trial(Box::new(RunningTrial {
                    spec,
                    isi,
                    stage: TrialStage::Stimulus(presentation),
                    onset: None,
                    early_responses: Vec::new(),
                    pending_pause: Duration::ZERO,
                }))
            }
        };
        self.active = Some(Active { started: now, step });
    }

    fn advance(&mut self, now: Duration, gaze: Option<GazePoint>, keys: &[Key]) -> Advance {
        let Some(mut active) = self.active.take() else {
            return Advance::Frame {
                scene: Scene::blank(self.config.background),
                cue: None,
                awaiting_continue: false,
            };
        };
        let result = match &mut active.step {
            ActiveStep::Instruction { slide } => {
                if keys.contains(&Key::Space) {
                    Advance::Done(TrialRecord::instruction(
                        &self.row_context(active.started),
                        *slide,
                        now.saturating_sub(active.started),
                    ))
                } else {
                    let text = self.config.instruction_text(*slide).unwrap_or_default();
                    Advance::Frame {
                        scene: Scene::centered(
                            self.config.background,
                            StimulusType::Text {
                                content: text.to_string(),
                                size: self.config.fixation_cross_px * 0.5,
                                color: Color::BLACK,
                            },
                        ),
                        cue: None,
                        awaiting_continue: true,
                    }
                }
            }
            ActiveStep::Fixation { label, row, wait } => match wait.step(now, gaze, keys) {
                WaitStep::Frame(scene) => Advance::Frame {
                    scene,
                    cue: None,
                    awaiting_continue: false,
                },
                WaitStep::Done(outcome) => {
                    Advance::Done(self.fixation_record(active.started, *label, *row, &outcome))
                }
            },
            ActiveStep::Ball { step, presentation } => match presentation.step(now) {
                PresentStep::Frame { scene, cue } => Advance::Frame {
                    scene,
                    cue,
                    awaiting_continue: false,
                },
                PresentStep::Done { actual } => {
                    info!("{} duration: {:.3}s", step.label(), actual.as_secs_f64());
                    let record = TrialRecord::manipulation(
                        &self.row_context(active.started),
                        self.manipulation_trial_counter,
                        *step,
                    )
                    .with_stimulus(actual, None);
                    self.manipulation_trial_counter += 1;
                    Advance::Done(record)
                }
            },
            ActiveStep::Trial(trial) => self.advance_trial(active.started, trial, now, gaze, keys),
        };
        if matches!(result, Advance::Frame { .. }) {
            self.active = Some(active);
        }
        result
    }

    fn advance_trial(
        &mut self,
        started: Duration,
        trial: &mut RunningTrial,
        now: Duration,
        gaze: Option<GazePoint>,
        keys: &[Key],
    ) -> Advance {
        loop {
            match &mut trial.stage {
                TrialStage::Stimulus(presentation) => match presentation.step(now) {
                    PresentStep::Frame { scene, cue } => {
                        let onset = *trial.onset.get_or_insert(now);
                        if self.config.collect_responses {
                            for _ in keys.iter().filter(|k| **k == Key::Space) {
                                trial.early_responses.push(Response {
                                    timestamp: now,
                                    reaction_time: Some(now.saturating_sub(onset)),
                                });
                            }
                        }
                        return Advance::Frame {
                            scene,
                            cue,
                            awaiting_continue: false,
                        };
                    }
                    PresentStep::Done { actual } => {
                        debug!("{} duration: {:.3}s", trial.spec.label, actual.as_secs_f64());
                        self.triggers.send("ISI");
                        let mut wait = self.fixation_wait(trial.isi, self.config.background, Color::BLACK);
                        if self.config.collect_responses {
                            wait = wait.collecting_responses(trial.onset, self.rt_threshold);
                            wait.carry_responses(std::mem::take(&mut trial.early_responses), now);
                        }
                        wait.add_pause(std::mem::take(&mut trial.pending_pause));
                        trial.stage = TrialStage::Isi {
                            shown_for: actual,
                            wait,
                        };
                    }
                },
                TrialStage::Isi { shown_for, wait } => {
                    return match wait.step(now, gaze, keys) {
                        WaitStep::Frame(scene) => Advance::Frame {
                            scene,
                            cue: None,
                            awaiting_continue: false,
                        },
                        WaitStep::Done(outcome) => {
                            let record = self.trial_record(started, &trial.spec, *shown_for, &outcome);
                            Advance::Done(record)
                        }
                    };
                }
            }
        }
    }

    fn row_context(&self, started: Duration) -> RowContext<'_> {
        RowContext {
            participant: self.participant,
            task: &self.config.task_name,
            phase: self.current_phase().unwrap_or(Phase::Baseline),
            block_counter: self.block_counter,
            now: started,
        }
    }

    fn fixation_record(
        &mut self,
        started: Duration,
        label: &str,
        row: FixationRow,
        outcome: &WaitOutcome,
    ) -> TrialRecord {
        let ctx = self.row_context(started);
        let record = match row {
            FixationRow::Baseline { .. } => {
                TrialRecord::fixation(&ctx, label, Some(self.baseline_trial_counter))
            }
            FixationRow::Manipulation => TrialRecord::manipulation(
                &ctx,
                self.manipulation_trial_counter,
                ManipulationStep::Baseline,
            ),
        }
        .with_wait(outcome);
        match row {
            FixationRow::Baseline { counted: true } => self.baseline_trial_counter += 1,
            FixationRow::Baseline { counted: false } => {}
            FixationRow::Manipulation => self.manipulation_trial_counter += 1,
        }
        record
    }

    fn trial_record(
        &mut self,
        started: Duration,
        spec: &TrialSpec,
        shown_for: Duration,
        outcome: &WaitOutcome,
    ) -> TrialRecord {
        let tone = match self.config.modality {
            Modality::Auditory => Some(self.stimuli.tones().frequency_for(spec.kind)),
            Modality::Visual => None,
        };
        let mut record = TrialRecord::oddball(&self.row_context(started), self.oddball_trial_counter, spec)
            .with_stimulus(shown_for, tone)
            .with_wait(outcome);
        if self.config.collect_responses {
            record = record.with_responses(outcome, self.rt_threshold);
        }
        if self.current_phase().is_some_and(|p| p.is_practice()) {
            if let Some(rt) = outcome.first_reaction_time() {
                self.practice_reaction_times.push(rt);
            }
        }
        self.oddball_trial_counter += 1;
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn plan_expands_blocks_and_keeps_fixed_sequences_in_order() {
        let mut config = ExperimentConfig::auditory();
        config.manipulation_repetitions = 2;
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_phases(&config, &mut rng).unwrap();
        assert_eq!(plan.len(), config.phases.len());

        let calibration = &plan[1];
        assert_eq!(calibration.phase, Phase::BaselineCalibration);
        assert_eq!(
            calibration.steps,
            CalibrationSlide::SEQUENCE.map(PlannedStep::Calibration).to_vec()
        );

        let block = &plan[2];
        assert_eq!(block.phase, Phase::OddballBlock);
        assert_eq!(block.steps.len(), 10);
        let oddballs = block
            .steps
            .iter()
            .filter(|s| matches!(s, PlannedStep::Trial(t) if t.kind.is_oddball()))
            .count();
        assert_eq!(oddballs, 2);

        let manipulation = plan.iter().find(|p| p.phase == Phase::ManipulationBlock).unwrap();
        let labels: Vec<_> = manipulation
            .steps
            .iter()
            .map(|s| match s {
                PlannedStep::Manipulation(m) => m.label(),
                _ => "?",
            })
            .collect();
        assert_eq!(
            labels,
            ["baseline", "squeeze", "baseline", "relax", "baseline", "squeeze", "baseline", "relax"]
        );
    }

    #[test]
    fn same_seed_gives_the_same_plan() {
        let config = ExperimentConfig::auditory();
        let a = plan_phases(&config, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = plan_phases(&config, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn median_of_even_and_odd_sets() {
        let ms = Duration::from_millis;
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[ms(300), ms(100), ms(200)]), Some(ms(200)));
        assert_eq!(median(&[ms(400), ms(100), ms(200), ms(300)]), Some(ms(250)));
    }
}
