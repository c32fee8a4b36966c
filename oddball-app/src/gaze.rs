use oddball_core::GazePoint;

/// Where the participant is looking, sampled once per refresh.
pub trait GazeSource {
    /// `None` when the tracker has no data for this refresh.
    fn sample(&mut self) -> Option<GazePoint>;
}

/// Uses the mouse pointer as the eye tracker. A pointer outside the window
/// reads as missing data.
#[derive(Debug, Default)]
pub struct MouseGaze {
    size: (f64, f64),
    pointer: Option<(f64, f64)>,
}

impl MouseGaze {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width as f64, height as f64),
            pointer: None,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width as f64, height as f64);
    }

    /// Window position in physical pixels, origin top-left.
    pub fn moved(&mut self, x: f64, y: f64) {
        self.pointer = Some((x, y));
    }

    pub fn left(&mut self) {
        self.pointer = None;
    }
}

impl GazeSource for MouseGaze {
    fn sample(&mut self) -> Option<GazePoint> {
        let (x, y) = self.pointer?;
        Some(GazePoint::new(
            (x - self.size.0 / 2.0) as f32,
            (self.size.1 / 2.0 - y) as f32,
        ))
    }
}
