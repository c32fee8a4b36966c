use oddball_core::{Key, Phase};
use oddball_experiment::{
    run_headless, CsvSink, ExperimentConfig, ExperimentStateMachine, FrameInput, Group,
    MemorySink, Participant, ParticipantProfile, RunStatus, SimulatedParticipant, TriggerPort,
};
use oddball_timing::{SimulatedTimer, Timer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PERIOD: Duration = Duration::from_millis(10);

type Machine = ExperimentStateMachine<SimulatedTimer, StdRng>;

#[derive(Clone, Default)]
struct RecordingPort(Arc<Mutex<Vec<u8>>>);

impl TriggerPort for RecordingPort {
    fn write(&mut self, value: u8) -> io::Result<()> {
        self.0.lock().unwrap().push(value);
        Ok(())
    }
}

fn participant() -> Participant {
    Participant {
        id: 17,
        group: Group::Td,
    }
}

fn quick_config() -> ExperimentConfig {
    let mut config = ExperimentConfig::auditory();
    config.phases = vec![Phase::Baseline, Phase::OddballBlock];
    config.trials_per_block = 10;
    config.baseline_duration_s = 0.2;
    config.isi_range_ms = (100, 150);
    config.frame_period_s = 0.01;
    config.pulse_width_ms = 0;
    config
}

fn machine(config: ExperimentConfig, seed: u64) -> (Machine, SimulatedTimer, MemorySink) {
    let timer = SimulatedTimer::new();
    let sink = MemorySink::new();
    let machine = ExperimentStateMachine::new(config, participant(), timer.clone(), StdRng::seed_from_u64(seed))
        .unwrap()
        .with_sink(Box::new(sink.clone()));
    (machine, timer, sink)
}

fn attentive(seed: u64) -> SimulatedParticipant<StdRng> {
    SimulatedParticipant::new(ParticipantProfile::attentive(), StdRng::seed_from_u64(seed), PERIOD)
}

/// Ticks `n` centred frames with the given keys on the first one.
fn ticks(machine: &mut Machine, timer: &SimulatedTimer, n: usize, keys: &[Key]) -> RunStatus {
    let mut status = machine.status();
    for i in 0..n {
        let mut input = FrameInput::centered();
        if i == 0 {
            input.keys = keys.to_vec();
        }
        status = machine.tick(input).unwrap().status;
        timer.advance(PERIOD);
    }
    status
}

#[test]
fn baseline_then_block_writes_one_row_per_trial() {
    let (mut machine, timer, sink) = machine(quick_config(), 1);
    let report = run_headless(&mut machine, &timer, &mut attentive(2), 100_000).unwrap();
    assert_eq!(report.status, RunStatus::Finished);
    assert_eq!(report.tones, 10);

    let rows = sink.rows();
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0].trial, "baseline");
    assert_eq!(rows[0].phase, "baseline");
    assert_eq!(rows[0].block_counter, 1);
    assert_eq!(rows[0].baseline_trial_counter, Some(1));
    assert_eq!(rows[0].actual_duration, Some(0.2));

    let counters: Vec<_> = rows[1..].iter().map(|r| r.oddball_trial_counter).collect();
    assert_eq!(counters, (1..=10).map(Some).collect::<Vec<_>>());
    assert!(rows[1..].iter().all(|r| r.phase == "oddball_block" && r.block_counter == 2));
    assert_eq!(rows[1..].iter().filter(|r| r.trial == "oddball").count(), 2);
    for row in &rows[1..] {
        let isi = row.target_duration.unwrap();
        assert!((0.1..=0.15).contains(&isi), "ISI {isi}");
        let drift = row.actual_duration.unwrap() - isi;
        assert!(drift.abs() <= 0.005 + 1e-9, "drift {drift}");
        assert_eq!(row.stimulus_duration, Some(0.1));
        assert_eq!(row.offset_duration, Some(0.0));
    }
}

#[test]
fn triggers_follow_the_session_structure() {
    let port = RecordingPort::default();
    let (machine, timer, _) = machine(quick_config(), 3);
    let mut machine = machine.with_trigger_port(Box::new(port.clone()));
    run_headless(&mut machine, &timer, &mut attentive(4), 100_000).unwrap();

    let names: Vec<&str> = machine.triggers_sent().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(&names[..3], ["experiment_start", "baseline", "oddball_block"]);
    assert_eq!(names.last(), Some(&"experiment_end"));
    let trials: Vec<_> = names[3..names.len() - 1].chunks(3).collect();
    assert_eq!(trials.len(), 10);
    for trial in trials {
        assert_eq!(trial[0], "trial");
        assert!(trial[1] == "standard" || trial[1] == "oddball");
        assert_eq!(trial[2], "ISI");
    }

    let table = machine.config().trigger_table().unwrap();
    let mut expected = Vec::new();
    for sent in machine.triggers_sent() {
        assert_eq!(Some(sent.code), table.code(&sent.name));
        expected.extend([sent.code, 0]);
    }
    assert_eq!(*port.0.lock().unwrap(), expected);
}

#[test]
fn pause_time_is_reported_and_not_counted() {
    let mut config = quick_config();
    config.phases = vec![Phase::Baseline];
    config.baseline_duration_s = 0.5;
    let (mut machine, timer, sink) = machine(config, 5);

    assert_eq!(ticks(&mut machine, &timer, 10, &[]), RunStatus::Running);
    let paused = machine.tick(FrameInput::centered().with_key(Key::Pause)).unwrap();
    assert!(paused.scene.contains_text("Pausiert"));
    timer.advance(PERIOD);
    ticks(&mut machine, &timer, 49, &[]);
    assert!(sink.rows().is_empty());
    let status = ticks(&mut machine, &timer, 41, &[Key::Space]);
    assert_eq!(status, RunStatus::Finished);

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pause_duration, Some(0.5));
    assert_eq!(rows[0].actual_duration, Some(1.0));

    let names: Vec<&str> = machine.triggers_sent().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        ["experiment_start", "baseline", "pause_initiated", "pause_ended", "experiment_end"]
    );
}

#[test]
fn confirmed_abort_stops_all_output() {
    let (mut machine, timer, sink) = machine(quick_config(), 6);
    // baseline (20 frames) plus part of the first trial
    ticks(&mut machine, &timer, 40, &[]);
    let rows_before = sink.rows().len();
    assert_eq!(rows_before, 1);

    let confirm = machine.tick(FrameInput::centered().with_key(Key::Abort)).unwrap();
    assert_eq!(confirm.status, RunStatus::Running);
    assert!(confirm.scene.contains_text("abbrechen"));
    timer.advance(PERIOD);
    let aborted = machine.tick(FrameInput::centered().with_key(Key::Confirm)).unwrap();
    assert_eq!(aborted.status, RunStatus::Aborted);

    assert_eq!(ticks(&mut machine, &timer, 500, &[Key::Space]), RunStatus::Aborted);
    assert_eq!(sink.rows().len(), rows_before);
    let names: Vec<&str> = machine.triggers_sent().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names.last(), Some(&"experiment_aborted"));
    assert!(!names.contains(&"experiment_end"));
}

#[test]
fn declined_abort_continues_the_session() {
    let (mut machine, timer, sink) = machine(quick_config(), 7);
    ticks(&mut machine, &timer, 5, &[]);
    ticks(&mut machine, &timer, 5, &[Key::Abort]);
    assert_eq!(ticks(&mut machine, &timer, 1, &[Key::Decline]), RunStatus::Running);
    let report = run_headless(&mut machine, &timer, &mut attentive(8), 100_000).unwrap();
    assert_eq!(report.status, RunStatus::Finished);
    let rows = sink.rows();
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0].pause_duration, Some(0.05));
}

#[test]
fn practice_median_becomes_the_feedback_threshold() {
    let mut config = ExperimentConfig::visual();
    config.phases = vec![Phase::Practice, Phase::Baseline];
    config.practice_trials = 6;
    config.stimulus_duration_s = 0.1;
    config.isi_range_ms = (500, 500);
    config.frame_period_s = 0.01;
    config.pulse_width_ms = 0;
    let (mut machine, timer, sink) = machine(config, 9);

    let mut profile = ParticipantProfile::attentive();
    profile.reaction_time_ms = (300, 300);
    let mut participant = SimulatedParticipant::new(profile, StdRng::seed_from_u64(10), PERIOD);
    let report = run_headless(&mut machine, &timer, &mut participant, 100_000).unwrap();
    assert_eq!(report.status, RunStatus::Finished);
    assert_eq!(report.tones, 0);

    let rows = sink.rows();
    assert_eq!(rows.len(), 7);
    for row in &rows[..6] {
        assert_eq!(row.phase, "practice_trials");
        assert_eq!(row.response_count, Some(1));
        assert_eq!(row.first_response_time, Some(0.3));
        assert_eq!(row.rt_threshold, None);
    }
    assert_eq!(machine.rt_threshold(), Some(Duration::from_millis(300)));

    let names: Vec<&str> = machine.triggers_sent().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names.iter().filter(|n| **n == "stimulus").count(), 6);
    assert!(!names.contains(&"standard"));
}

#[test]
fn rows_reach_the_csv_file_as_they_are_written() {
    let dir = std::env::temp_dir().join(format!("oddball-session-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("17_test.csv");

    let timer = SimulatedTimer::new();
    let mut machine = ExperimentStateMachine::new(quick_config(), participant(), timer.clone(), StdRng::seed_from_u64(11))
        .unwrap()
        .with_sink(Box::new(CsvSink::create(&path).unwrap()));
    ticks(&mut machine, &timer, 30, &[]);

    // the baseline row is on disk while the session is still running
    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "timestamp");
    let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 1);
    let trial_column = headers.iter().position(|h| h == "trial").unwrap();
    assert_eq!(&records[0][trial_column], "baseline");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn full_auditory_session_with_a_restless_participant() {
    let mut config = ExperimentConfig::auditory();
    config.pulse_width_ms = 0;
    let (mut machine, timer, sink) = machine(config, 12);
    let mut participant = SimulatedParticipant::new(
        ParticipantProfile::default(),
        StdRng::seed_from_u64(13),
        machine.frame_period(),
    );
    let report = run_headless(&mut machine, &timer, &mut participant, 2_000_000).unwrap();
    assert_eq!(report.status, RunStatus::Finished);
    assert_eq!(report.tones, 40);

    let rows = sink.rows();
    assert_eq!(rows.len(), 55);
    assert_eq!(rows.first().unwrap().trial, "instruction1");
    assert_eq!(rows.last().unwrap().trial, "instruction3");
    assert_eq!(rows.last().unwrap().block_counter, 14);

    let calibration: Vec<_> = rows
        .iter()
        .filter(|r| r.phase == "baseline_calibration")
        .map(|r| (r.trial.as_str(), r.baseline_trial_counter))
        .collect();
    assert_eq!(
        calibration,
        [("baseline", Some(1)), ("baseline_whiteslide", Some(2)), ("baseline_blackslide", Some(2))]
    );
    let baselines = rows.iter().filter(|r| r.phase == "baseline").count();
    assert_eq!(baselines, 5);
    assert_eq!(rows.iter().filter_map(|r| r.manipulation_trial_counter).max(), Some(4));
    assert_eq!(rows.iter().filter_map(|r| r.oddball_trial_counter).max(), Some(40));

    for row in rows.iter().filter(|r| r.target_duration.is_some()) {
        assert!(row.actual_duration.unwrap() + 1e-9 >= row.target_duration.unwrap() - 0.02);
        if row.restarts.unwrap() > 0 {
            assert!(row.actual_duration > row.target_duration, "{row:?}");
        }
    }

    let names: Vec<&str> = machine.triggers_sent().iter().map(|t| t.name.as_str()).collect();
    assert!(!names.contains(&"oddball_block_rev"));
    assert_eq!(names.iter().filter(|n| **n == "standard_rev").count(), 16);
    assert!(timer.now() > Duration::from_secs(100));
}
