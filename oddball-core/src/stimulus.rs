use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const GREY: Color = Color([128, 128, 128, 255]);
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const RED: Color = Color([255, 0, 0, 255]);
    pub const PURPLE: Color = Color([128, 0, 128, 255]);
    pub const YELLOW: Color = Color([255, 200, 0, 255]);
    pub const BLUE: Color = Color([0, 0, 255, 255]);
    pub const GREEN: Color = Color([0, 160, 0, 255]);
    pub const DARK_GREY: Color = Color([90, 90, 90, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b, 255])
    }
}

/// Shapes the experiment draws. Sizes are in pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum StimulusType {
    FixationCross {
        size: f32,
        color: Color,
    },
    Ball {
        radius: f32,
        color: Color,
    },
    /// Four arrows pointing back at the centre plus a square outline around
    /// the fixation area, shown while gaze is off-centre.
    GazeRedirect {
        arrow_size: f32,
        /// Distance of each arrow tip from the centre, in arrow sizes.
        arrow_distance: f32,
        frame_size: f32,
        color: Color,
    },
    Text {
        content: String,
        size: f32,
        color: Color,
    },
}

/// Everything drawn during one display refresh. Positions are relative to the
/// screen centre with y pointing up.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: Color,
    pub items: Vec<(StimulusType, (f32, f32))>,
}

impl Scene {
    pub fn blank(background: Color) -> Self {
        Self {
            background,
            items: Vec::new(),
        }
    }

    pub fn with(mut self, stimulus: StimulusType, position: (f32, f32)) -> Self {
        self.items.push((stimulus, position));
        self
    }

    pub fn centered(background: Color, stimulus: StimulusType) -> Self {
        Self::blank(background).with(stimulus, (0.0, 0.0))
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.items.iter().any(|(s, _)| {
            matches!(s, StimulusType::Text { content, .. } if content.contains(needle))
        })
    }

    pub fn contains(&self, predicate: impl Fn(&StimulusType) -> bool) -> bool {
        self.items.iter().any(|(s, _)| predicate(s))
    }
}
