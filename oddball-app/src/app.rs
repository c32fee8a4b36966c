use crate::audio::ToneOutput;
use crate::gaze::{GazeSource, MouseGaze};
use crate::session::SessionSetup;
use ab_glyph::FontVec;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use oddball_core::Key;
use oddball_experiment::{ExperimentStateMachine, FrameInput, RunStatus};
use oddball_render::SkiaRenderer;
use oddball_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Space => Key::Space,
        KeyCode::KeyP => Key::Pause,
        KeyCode::Escape => Key::Abort,
        KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::KeyY => Key::Confirm,
        KeyCode::KeyN => Key::Decline,
        _ => return None,
    })
}

/// Fullscreen window host: one experiment tick per vsync'd redraw.
pub struct App {
    setup: Option<SessionSetup>,
    font: Option<FontVec>,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    experiment: Option<ExperimentStateMachine<HighPrecisionTimer, StdRng>>,
    timer: HighPrecisionTimer,
    audio: Option<ToneOutput>,
    gaze: MouseGaze,
    pending_keys: Vec<Key>,
    status: RunStatus,
    failure: Option<anyhow::Error>,
}

impl App {
    pub fn new(setup: SessionSetup, font: Option<FontVec>) -> Self {
        Self {
            setup: Some(setup),
            font,
            window: None,
            pixels: None,
            renderer: None,
            experiment: None,
            timer: HighPrecisionTimer::new(),
            audio: None,
            gaze: MouseGaze::default(),
            pending_keys: Vec::new(),
            status: RunStatus::Running,
            failure: None,
        }
    }

    pub fn run(mut self) -> Result<RunStatus> {
        let event_loop = EventLoop::new()?;
        info!(
            "platform {} ({}); p pauses, Escape aborts",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        event_loop.run_app(&mut self)?;
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(self.status),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        let refresh_hz = monitor
            .refresh_rate_millihertz()
            .map(|mhz| mhz as f64 / 1000.0)
            .filter(|hz| *hz > 0.0);

        let window_attributes = Window::default_attributes()
            .with_title("Oddball")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        info!(
            "display {}x{} at scale {:.2}, refresh {}",
            size.width,
            size.height,
            window.scale_factor(),
            refresh_hz.map_or("unknown".to_string(), |hz| format!("{hz:.1} Hz")),
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.renderer = Some(SkiaRenderer::new(size.width, size.height, self.font.take())?);
        self.gaze = MouseGaze::new(size.width, size.height);

        let setup = self
            .setup
            .take()
            .context("session already started")?;
        let frame_period = refresh_hz.map(|hz| Duration::from_secs_f64(1.0 / hz));
        if frame_period.is_none() {
            warn!(
                "refresh rate unknown, using the configured {:.4} s frame period",
                setup.config.frame_period_s
            );
        }
        self.experiment = Some(setup.start(self.timer.clone(), frame_period)?);

        self.audio = match ToneOutput::open() {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!("{e:#}; tones will not play");
                None
            }
        };

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Runs one refresh: tick, start cues, draw and present.
    fn frame(&mut self) -> Result<RunStatus> {
        let (Some(experiment), Some(pixels), Some(renderer)) = (
            self.experiment.as_mut(),
            self.pixels.as_mut(),
            self.renderer.as_mut(),
        ) else {
            return Ok(RunStatus::Running);
        };

        let input = FrameInput {
            gaze: self.gaze.sample(),
            keys: std::mem::take(&mut self.pending_keys),
        };
        let tick = experiment.tick(input)?;
        if tick.status != RunStatus::Running {
            return Ok(tick.status);
        }

        if let Some(audio) = &self.audio {
            for cue in &tick.cues {
                audio.play(cue);
            }
        }

        let stats = renderer.render_frame(&tick.scene, pixels.frame_mut(), &mut self.timer)?;
        let before_present = self.timer.now();
        pixels.render()?;
        debug!(
            "draw {:.3} ms, copy {:.3} ms, present {:.3} ms, {} items",
            stats.draw.as_secs_f64() * 1e3,
            stats.copy.as_secs_f64() * 1e3,
            self.timer.elapsed(before_present).as_secs_f64() * 1e3,
            stats.items,
        );
        Ok(RunStatus::Running)
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        if let Some(pixels) = &mut self.pixels {
            pixels.resize_surface(new_size.width, new_size.height)?;
            pixels.resize_buffer(new_size.width, new_size.height)?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height)?;
        }
        self.gaze.resize(new_size.width, new_size.height);
        info!("display resized to {}x{}", new_size.width, new_size.height);
        Ok(())
    }

    fn finish(&mut self, event_loop: &ActiveEventLoop, outcome: Result<RunStatus>) {
        match outcome {
            Ok(RunStatus::Running) => return,
            Ok(status) => self.status = status,
            Err(e) => {
                error!("{e:#}");
                self.failure = Some(e);
            }
        }
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.finish(event_loop, Err(e.context("creating window")));
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                warn!("window closed before the experiment finished");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let outcome = self.frame();
                self.finish(event_loop, outcome);
                if self.status == RunStatus::Running && self.failure.is_none() {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code) {
                        self.pending_keys.push(key);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.gaze.moved(position.x, position.y),
            WindowEvent::CursorLeft { .. } => self.gaze.left(),
            WindowEvent::Resized(size) => {
                let outcome = self.handle_resize(size).map(|_| RunStatus::Running);
                self.finish(event_loop, outcome);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_layout() {
        assert_eq!(map_key(KeyCode::KeyP), Some(Key::Pause));
        assert_eq!(map_key(KeyCode::Escape), Some(Key::Abort));
        assert_eq!(map_key(KeyCode::Space), Some(Key::Space));
        assert_eq!(map_key(KeyCode::KeyY), Some(Key::Confirm));
        assert_eq!(map_key(KeyCode::Enter), Some(Key::Confirm));
        assert_eq!(map_key(KeyCode::KeyN), Some(Key::Decline));
        assert_eq!(map_key(KeyCode::KeyQ), None);
    }
}
