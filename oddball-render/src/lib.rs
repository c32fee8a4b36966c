mod render;
mod text;

pub use render::{FrameStats, SkiaRenderer};
pub use text::{load_font, render_text_pixmap, TextCache};
