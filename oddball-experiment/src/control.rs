use crate::trigger::TriggerEncoder;
use log::info;
use oddball_core::{Color, Key, Scene, StimulusType};
use oddball_timing::Timer;
use std::time::Duration;

/// Result of polling the handler once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Nothing pending; the running step advances normally.
    Continue,
    /// A pause or abort dialog is on screen; nothing else advances.
    Suspended,
    /// The dialog closed; the step should account this much pause time.
    Resumed(Duration),
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ControlState {
    Idle,
    Paused { since: Duration },
    ConfirmAbort { since: Duration },
    Aborted,
}

/// Watches the reserved keys: `p` pauses until Space, Escape asks to abort.
#[derive(Debug, Clone)]
pub struct PauseAbortHandler {
    state: ControlState,
    background: Color,
    text_size: f32,
}

impl PauseAbortHandler {
    pub fn new(background: Color, text_size: f32) -> Self {
        Self {
            state: ControlState::Idle,
            background,
            text_size,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.state, ControlState::Paused { .. } | ControlState::ConfirmAbort { .. })
    }

    pub fn poll<T: Timer>(&mut self, now: Duration, keys: &[Key], triggers: &mut TriggerEncoder<T>) -> ControlSignal {
        let mut resumed = None;
        for key in keys {
            self.state = match (self.state, key) {
                (ControlState::Idle, Key::Abort) => {
                    info!("abort requested, waiting for confirmation");
                    triggers.send("pause_initiated");
                    ControlState::ConfirmAbort { since: now }
                }
                (ControlState::Idle, Key::Pause) => {
                    info!("experiment paused");
                    triggers.send("pause_initiated");
                    ControlState::Paused { since: now }
                }
                (ControlState::ConfirmAbort { .. }, Key::Confirm) => {
                    info!("experiment aborted by operator");
                    triggers.send("experiment_aborted");
                    ControlState::Aborted
                }
                (ControlState::ConfirmAbort { since }, Key::Decline | Key::Abort)
                | (ControlState::Paused { since }, Key::Space | Key::Confirm) => {
                    let paused = now.saturating_sub(since);
                    info!("experiment resumed after {:.3}s", paused.as_secs_f64());
                    triggers.send("pause_ended");
                    resumed = Some(resumed.unwrap_or_default() + paused);
                    ControlState::Idle
                }
                (state, _) => state,
            };
            if self.state == ControlState::Aborted {
                return ControlSignal::Aborted;
            }
        }

        match (self.state, resumed) {
            (ControlState::Aborted, _) => ControlSignal::Aborted,
            (ControlState::Idle, Some(paused)) => ControlSignal::Resumed(paused),
            (ControlState::Idle, None) => ControlSignal::Continue,
            _ => ControlSignal::Suspended,
        }
    }

    /// Dialog drawn while suspended.
    pub fn scene(&self) -> Option<Scene> {
        let content = match self.state {
            ControlState::Paused { .. } => "Pausiert.\n\nWeiter mit der Leertaste.",
            ControlState::ConfirmAbort { .. } => "Experiment abbrechen?\n\nJa: Enter / y    Nein: n / Escape",
            _ => return None,
        };
        Some(Scene::centered(
            self.background,
            StimulusType::Text {
                content: content.into(),
                size: self.text_size,
                color: Color::BLACK,
            },
        ))
    }
}
