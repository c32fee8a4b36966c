use anyhow::{Context, Result};
use log::{debug, warn};
use oddball_experiment::Cue;
use rodio::source::SineWave;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

const TONE_VOLUME: f32 = 0.4;

/// Plays tone cues on the default output device.
pub struct ToneOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl ToneOutput {
    pub fn open() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default().context("opening audio output")?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    pub fn play(&self, cue: &Cue) {
        let Cue::Tone {
            frequency_hz,
            duration,
        } = *cue;
        let Ok(sink) = Sink::try_new(&self.handle) else {
            warn!("no audio sink for {} Hz tone", frequency_hz);
            return;
        };
        sink.set_volume(TONE_VOLUME);
        sink.append(SineWave::new(frequency_hz).take_duration(duration));
        sink.detach();
        debug!("tone {} Hz for {:?}", frequency_hz, duration);
    }
}
