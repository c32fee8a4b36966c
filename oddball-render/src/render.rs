use crate::text::TextCache;
use ab_glyph::FontVec;
use anyhow::{bail, Result};
use bytemuck::{cast_slice, cast_slice_mut};
use log::warn;
use oddball_core::{Color, Scene, StimulusType};
use oddball_timing::{CalibrationStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::time::Duration;
use tiny_skia::{
    FillRule, LineCap, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

const CROSS_LINE_WIDTH: f32 = 2.0;
const REDIRECT_LINE_WIDTH: f32 = 3.0;

pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub items: usize,
}

fn paint(color: Color, anti_alias: bool) -> Paint<'static> {
    let [r, g, b, a] = color.0;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = anti_alias;
    paint
}

/// Draws [`Scene`]s into an offscreen canvas and copies it into the window's
/// RGBA frame buffer.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    canvas: Pixmap,
    text_cache: TextCache,
    warned_no_font: bool,
    component_timers: HashMap<&'static str, HighPrecisionTimer>,
}

impl SkiaRenderer {
    /// Without a font, text items are skipped.
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Result<Self> {
        let Some(canvas) = Pixmap::new(width.max(1), height.max(1)) else {
            bail!("cannot allocate a {}x{} canvas", width, height);
        };
        Ok(Self {
            width: canvas.width(),
            height: canvas.height(),
            center: (canvas.width() as f32 / 2.0, canvas.height() as f32 / 2.0),
            canvas,
            text_cache: TextCache::new(font),
            warned_no_font: false,
            component_timers: ["clear", "draw", "copy"]
                .iter()
                .map(|&k| (k, HighPrecisionTimer::new()))
                .collect(),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        let Some(canvas) = Pixmap::new(new_width.max(1), new_height.max(1)) else {
            bail!("cannot allocate a {}x{} canvas", new_width, new_height);
        };
        self.width = canvas.width();
        self.height = canvas.height();
        self.center = (self.width as f32 / 2.0, self.height as f32 / 2.0);
        self.canvas = canvas;
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    /// Timing statistics for one render stage ("clear", "draw" or "copy").
    pub fn component_stats(&self, stage: &str) -> Option<CalibrationStats> {
        self.component_timers.get(stage).map(|t| t.calibration_stats())
    }

    /// Scene coordinates are relative to the centre with y up.
    fn to_screen(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (self.center.0 + x, self.center.1 - y)
    }

    pub fn render_frame<T: Timer>(
        &mut self,
        scene: &Scene,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats> {
        if frame_buffer.len() != self.canvas.data().len() {
            bail!(
                "frame buffer holds {} bytes, canvas needs {}",
                frame_buffer.len(),
                self.canvas.data().len()
            );
        }

        let t_clear = {
            let t = timer.now();
            let [r, g, b, a] = scene.background.0;
            self.canvas.fill(tiny_skia::Color::from_rgba8(r, g, b, a));
            timer.elapsed(t)
        };

        let t_draw = {
            let t = timer.now();
            for (stimulus, pos) in &scene.items {
                self.draw(stimulus, *pos);
            }
            timer.elapsed(t)
        };

        let t_copy = {
            let t = timer.now();
            frame_buffer.copy_from_slice(self.canvas.data());
            timer.elapsed(t)
        };

        let total = t_clear + t_draw + t_copy;
        for (stage, d) in [("clear", t_clear), ("draw", t_draw), ("copy", t_copy)] {
            if let Some(stage_timer) = self.component_timers.get_mut(stage) {
                stage_timer.record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            draw: t_draw,
            copy: t_copy,
            total,
            items: scene.items.len(),
        })
    }

    fn draw(&mut self, stimulus: &StimulusType, pos: (f32, f32)) {
        let (cx, cy) = self.to_screen(pos);
        match stimulus {
            StimulusType::FixationCross { size, color } => {
                let paint = paint(*color, false);
                let half = size * 0.5;
                let w = CROSS_LINE_WIDTH;
                for rect in [
                    Rect::from_xywh(cx - half, cy - w * 0.5, *size, w),
                    Rect::from_xywh(cx - w * 0.5, cy - half, w, *size),
                ]
                .into_iter()
                .flatten()
                {
                    self.canvas.fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
            StimulusType::Ball { radius, color } => {
                if let Some(path) = PathBuilder::from_circle(cx, cy, *radius) {
                    self.canvas.fill_path(
                        &path,
                        &paint(*color, true),
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }
            StimulusType::GazeRedirect {
                arrow_size,
                arrow_distance,
                frame_size,
                color,
            } => self.draw_redirect((cx, cy), *arrow_size, *arrow_distance, *frame_size, *color),
            StimulusType::Text { content, size, color } => self.draw_text(content, *size, *color, (cx, cy)),
        }
    }

    /// Four arrows pointing at the centre from `distance` arrow sizes away,
    /// plus a square outline around the fixation area.
    fn draw_redirect(&mut self, (cx, cy): (f32, f32), size: f32, distance: f32, frame: f32, color: Color) {
        let outer = size * distance;
        let tip = outer - size;
        let wing = outer - size * 0.5;
        let half = size * 0.5;

        let mut pb = PathBuilder::new();
        // (dx, dy) is the unit direction from the centre towards the arrow
        for (dx, dy) in [(-1.0f32, 0.0f32), (1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
            // perpendicular for the wings
            let (px, py) = (dy, dx);
            let at = |along: f32, across: f32| (cx + dx * along + px * across, cy - (dy * along + py * across));
            let (sx, sy) = at(outer, 0.0);
            let (tx, ty) = at(tip, 0.0);
            pb.move_to(sx, sy);
            pb.line_to(tx, ty);
            for side in [-half, half] {
                let (wx, wy) = at(wing, side);
                pb.move_to(wx, wy);
                pb.line_to(tx, ty);
            }
        }
        if let Some(rect) = Rect::from_xywh(cx - frame * 0.5, cy - frame * 0.5, frame, frame) {
            pb.push_rect(rect);
        }

        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width: REDIRECT_LINE_WIDTH,
            line_cap: LineCap::Square,
            ..Stroke::default()
        };
        self.canvas
            .stroke_path(&path, &paint(color, true), &stroke, Transform::identity(), None);
    }

    fn draw_text(&mut self, content: &str, size: f32, color: Color, (cx, cy): (f32, f32)) {
        let Some(pm) = self.text_cache.get_or_render(content, size, color) else {
            if !self.text_cache.has_font() && !self.warned_no_font {
                warn!("no font loaded, text is not drawn");
                self.warned_no_font = true;
            }
            return;
        };
        let (w, h) = (pm.width(), pm.height());
        let (cw, ch) = (self.width as usize, self.height as usize);

        let x = (cx - w as f32 * 0.5) as i32;
        let y = (cy - h as f32 * 0.5) as i32;
        if x + w as i32 <= 0 || y + h as i32 <= 0 || x >= cw as i32 || y >= ch as i32 {
            return;
        }

        let dst_x = x.max(0) as usize;
        let dst_y = y.max(0) as usize;
        let src_x_offset = (-x).max(0) as usize;
        let src_y_offset = (-y).max(0) as usize;
        let copy_w = (w as usize - src_x_offset).min(cw - dst_x);
        let copy_h = (h as usize - src_y_offset).min(ch - dst_y);

        let src_u32: &[u32] = cast_slice(pm.data());
        let dst_u32: &mut [u32] = cast_slice_mut(self.canvas.data_mut());

        // premultiplied source over destination, one packed RGBA word at a time
        for row in 0..copy_h {
            let src_row_start = (src_y_offset + row) * w as usize + src_x_offset;
            let dst_row_start = (dst_y + row) * cw + dst_x;
            for i in 0..copy_w {
                let s = src_u32[src_row_start + i];
                let sa = (s >> 24) & 0xFF;
                if sa == 0 {
                    continue;
                }
                let d = dst_u32[dst_row_start + i];
                let inv = 255 - sa;
                let blend = |shift: u32| {
                    let sc = (s >> shift) & 0xFF;
                    let dc = (d >> shift) & 0xFF;
                    (sc + (dc * inv + 127) / 255).min(255)
                };
                dst_u32[dst_row_start + i] = (blend(24) << 24) | (blend(16) << 16) | (blend(8) << 8) | blend(0);
            }
        }
    }
}
