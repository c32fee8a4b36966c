use serde::{Deserialize, Serialize};

/// Gaze position in pixels relative to the screen centre, y pointing up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f32,
    pub y: f32,
}

impl GazePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_from_center(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeStatus {
    NoData,
    Offset,
    Centered,
}

/// Classifies one gaze sample per frame against a static offset cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeMonitor {
    cutoff_px: f32,
}

impl GazeMonitor {
    pub fn new(cutoff_px: f32) -> Self {
        Self { cutoff_px }
    }

    pub fn cutoff_px(&self) -> f32 {
        self.cutoff_px
    }

    pub fn classify(&self, sample: Option<GazePoint>) -> GazeStatus {
        match sample {
            None => GazeStatus::NoData,
            Some(p) if p.distance_from_center() >= self.cutoff_px => GazeStatus::Offset,
            Some(_) => GazeStatus::Centered,
        }
    }
}
