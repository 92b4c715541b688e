use crate::error::{EngineError, EngineResult};
use crate::renderer::FrameBuffer;
use crate::script::Color;
use fontdue::Font;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use rand::Rng;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Construction parameters of a sprite. Doubles as its cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpriteSpec {
    /// Image path relative to the asset root.
    pub path: PathBuf,
    pub x: i32,
    pub y: i32,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Synthesize a left-padding bounce animation of this many steps.
    pub key_x: Option<u32>,
    pub key_x_reverse: bool,
    /// Advance one animation frame every two scene frames.
    pub half_speed: bool,
    /// Wrap around past the last frame instead of holding it.
    pub repeat: bool,
}

impl SpriteSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            x: 0,
            y: 0,
            width: None,
            height: None,
            key_x: None,
            key_x_reverse: true,
            half_speed: false,
            repeat: true,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn resized(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn key_x(mut self, steps: u32, reverse: bool) -> Self {
        self.key_x = Some(steps);
        self.key_x_reverse = reverse;
        self
    }

    pub fn half_speed(mut self) -> Self {
        self.half_speed = true;
        self
    }

    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Construction parameters of a text label. Doubles as its cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSpec {
    pub text: String,
    pub x: i32,
    pub y: i32,
    /// Font path relative to the asset root; block glyphs are drawn without one.
    pub font: Option<PathBuf>,
    pub font_size: u32,
    pub color: Color,
    /// Typewriter reveal: show only the first N characters at local frame N.
    pub reveal: bool,
}

impl LabelSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            x: 0,
            y: 0,
            font: None,
            font_size: 12,
            color: Color::WHITE,
            reveal: false,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn font(mut self, font: Option<PathBuf>, size: u32) -> Self {
        self.font = font;
        self.font_size = size;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn reveal(mut self, reveal: bool) -> Self {
        self.reveal = reveal;
        self
    }
}

/// Per-emission overrides. Cached elements are never mutated; every toggle
/// the timeline needs is passed here instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Jitter the paste position by ±1 px on each axis, resampled every frame.
    pub shake: bool,
    /// Overrides the sprite's own repeat flag.
    pub repeat: Option<bool>,
    /// Overrides the label's own reveal flag.
    pub reveal: Option<bool>,
}

/// An ordered list of decoded frames placed at a fixed position.
pub struct Sprite {
    spec: SpriteSpec,
    frames: Vec<RgbaImage>,
}

impl Sprite {
    /// Build a sprite from decoded source frames, applying resize and key-x expansion.
    pub fn from_frames(spec: SpriteSpec, decoded: &[RgbaImage]) -> EngineResult<Self> {
        if decoded.is_empty() {
            return Err(EngineError::decode(&spec.path, "image has no frames"));
        }

        let resized: Vec<RgbaImage> = decoded
            .iter()
            .map(|frame| resize(frame, spec.width, spec.height))
            .collect();

        let frames = match spec.key_x {
            Some(steps) if steps > 0 && resized.len() == 1 => {
                let base = &resized[0];
                let mut frames: Vec<RgbaImage> =
                    (0..steps).map(|pad| pad_left(base, pad)).collect();
                if spec.key_x_reverse {
                    frames.extend((0..steps.saturating_sub(1)).rev().map(|pad| pad_left(base, pad)));
                }
                frames
            }
            _ => resized,
        };

        Ok(Self { spec, frames })
    }

    pub fn spec(&self) -> &SpriteSpec {
        &self.spec
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Size of the first frame.
    pub fn width(&self) -> u32 {
        self.frames[0].width()
    }

    pub fn height(&self) -> u32 {
        self.frames[0].height()
    }

    /// Map a local frame index onto a stored frame.
    pub fn resolve_frame(&self, local_frame: usize, repeat: bool) -> usize {
        let count = self.frames.len();
        let mut index = local_frame;
        if self.spec.half_speed && repeat {
            index /= 2;
        }
        if index < count {
            index
        } else if repeat {
            index % count
        } else {
            count - 1
        }
    }

    /// Paste the frame for `local_frame` onto `canvas`.
    ///
    /// Without a canvas a new opaque white one sized to the first frame is
    /// allocated; this is how the background layer starts every frame.
    pub fn render(
        &self,
        canvas: Option<FrameBuffer>,
        local_frame: usize,
        options: &RenderOptions,
    ) -> FrameBuffer {
        let repeat = options.repeat.unwrap_or(self.spec.repeat);
        let image = &self.frames[self.resolve_frame(local_frame, repeat)];

        let mut canvas = canvas
            .unwrap_or_else(|| FrameBuffer::filled(self.width(), self.height(), [255, 255, 255, 255]));

        let (mut x, mut y) = (self.spec.x, self.spec.y);
        if options.shake {
            let mut rng = rand::thread_rng();
            x += rng.gen_range(-1..=1);
            y += rng.gen_range(-1..=1);
        }

        canvas.composite(image, x, y);
        canvas
    }
}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sprite")
            .field("path", &self.spec.path)
            .field("frames", &self.frames.len())
            .field("size", &(self.width(), self.height()))
            .finish()
    }
}

/// A draw-text instruction with optional typewriter reveal.
pub struct Label {
    spec: LabelSpec,
    font: Option<Arc<Font>>,
    graphemes: usize,
}

impl Label {
    pub fn new(spec: LabelSpec, font: Option<Arc<Font>>) -> Self {
        let graphemes = spec.text.graphemes(true).count();
        Self {
            spec,
            font,
            graphemes,
        }
    }

    pub fn spec(&self) -> &LabelSpec {
        &self.spec
    }

    pub fn text(&self) -> &str {
        &self.spec.text
    }

    /// Length of the text in user-perceived characters.
    pub fn char_count(&self) -> usize {
        self.graphemes
    }

    /// The part of the text visible at `local_frame`.
    pub fn visible_text(&self, local_frame: usize, reveal: bool) -> &str {
        let text = self.spec.text.as_str();
        if !reveal {
            return text;
        }
        match text.grapheme_indices(true).nth(local_frame) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    pub fn render(
        &self,
        mut canvas: FrameBuffer,
        local_frame: usize,
        options: &RenderOptions,
    ) -> FrameBuffer {
        let reveal = options.reveal.unwrap_or(self.spec.reveal);
        let text = self.visible_text(local_frame, reveal);
        if text.is_empty() {
            return canvas;
        }

        let color = self.spec.color.to_rgba();
        match &self.font {
            Some(font) => draw_glyphs(
                &mut canvas,
                font,
                self.spec.font_size as f32,
                (self.spec.x, self.spec.y),
                text,
                color,
            ),
            None => draw_blocks(
                &mut canvas,
                self.spec.font_size,
                (self.spec.x, self.spec.y),
                text,
                color,
            ),
        }
        canvas
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label")
            .field("text", &self.spec.text)
            .field("reveal", &self.spec.reveal)
            .field("font", &self.spec.font)
            .finish()
    }
}

/// Either kind of drawable.
#[derive(Debug, Clone)]
pub enum VisualElement {
    Sprite(Arc<Sprite>),
    Label(Arc<Label>),
}

impl VisualElement {
    pub fn is_label(&self) -> bool {
        matches!(self, VisualElement::Label(_))
    }

    /// Labels never originate a canvas; passing `None` to one is an error.
    pub fn render(
        &self,
        canvas: Option<FrameBuffer>,
        local_frame: usize,
        options: &RenderOptions,
    ) -> EngineResult<FrameBuffer> {
        match self {
            VisualElement::Sprite(sprite) => Ok(sprite.render(canvas, local_frame, options)),
            VisualElement::Label(label) => {
                let canvas = canvas.ok_or_else(|| {
                    EngineError::composition(format!(
                        "label '{}' cannot start a canvas",
                        label.text()
                    ))
                })?;
                Ok(label.render(canvas, local_frame, options))
            }
        }
    }
}

/// One element placed in a sub-scene together with its emission options.
#[derive(Debug, Clone)]
pub struct Layer {
    pub element: VisualElement,
    pub options: RenderOptions,
}

impl Layer {
    pub fn sprite(sprite: Arc<Sprite>) -> Self {
        Self {
            element: VisualElement::Sprite(sprite),
            options: RenderOptions::default(),
        }
    }

    pub fn label(label: Arc<Label>) -> Self {
        Self {
            element: VisualElement::Label(label),
            options: RenderOptions::default(),
        }
    }

    pub fn shaking(mut self, shake: bool) -> Self {
        self.options.shake = shake;
        self
    }

    pub fn with_repeat(mut self, repeat: Option<bool>) -> Self {
        self.options.repeat = repeat;
        self
    }

    pub fn revealing(mut self, reveal: bool) -> Self {
        self.options.reveal = Some(reveal);
        self
    }
}

fn resize(frame: &RgbaImage, width: Option<u32>, height: Option<u32>) -> RgbaImage {
    let (w0, h0) = frame.dimensions();
    match (width, height) {
        (Some(w), Some(h)) => imageops::resize(frame, w, h, FilterType::Nearest),
        (Some(w), None) => {
            let h = (h0 as f64 * (w as f64 / w0 as f64)) as u32;
            imageops::resize(frame, w, h.max(1), FilterType::Lanczos3)
        }
        (None, Some(h)) => {
            let w = (w0 as f64 * (h as f64 / h0 as f64)) as u32;
            imageops::resize(frame, w.max(1), h, FilterType::Lanczos3)
        }
        (None, None) => frame.clone(),
    }
}

/// Widen `frame` by `pad` transparent columns on the left.
fn pad_left(frame: &RgbaImage, pad: u32) -> RgbaImage {
    let mut out = RgbaImage::new(frame.width() + pad, frame.height());
    imageops::replace(&mut out, frame, pad as i64, 0);
    out
}

fn draw_glyphs(
    canvas: &mut FrameBuffer,
    font: &Font,
    size: f32,
    origin: (i32, i32),
    text: &str,
    color: [u8; 4],
) {
    let (ascent, line_height) = match font.horizontal_line_metrics(size) {
        Some(m) => (m.ascent, m.new_line_size),
        None => (size, size * 1.2),
    };

    for (row, line) in text.split('\n').enumerate() {
        let baseline = origin.1 as f32 + ascent + row as f32 * line_height;
        let mut pen_x = origin.0 as f32;

        for ch in line.chars() {
            let (metrics, bitmap) = font.rasterize(ch, size);
            let glyph_x = pen_x.round() as i32 + metrics.xmin;
            let glyph_y = baseline.round() as i32 - (metrics.height as i32 + metrics.ymin);

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let alpha = (coverage as u16 * color[3] as u16 / 255) as u8;
                    canvas.blend_at(
                        glyph_x + gx as i32,
                        glyph_y + gy as i32,
                        [color[0], color[1], color[2], alpha],
                    );
                }
            }
            pen_x += metrics.advance_width;
        }
    }
}

/// Fallback when no font is configured: one solid cell per visible character.
fn draw_blocks(canvas: &mut FrameBuffer, size: u32, origin: (i32, i32), text: &str, color: [u8; 4]) {
    let cell_w = (size / 2).max(2) as i32;
    let cell_h = size.max(2) as i32;
    let line_height = cell_h + 4;

    for (row, line) in text.split('\n').enumerate() {
        let top = origin.1 + row as i32 * line_height;
        for (col, grapheme) in line.graphemes(true).enumerate() {
            if grapheme.trim().is_empty() {
                continue;
            }
            let left = origin.0 + col as i32 * cell_w;
            for y in top..top + cell_h {
                for x in left..left + cell_w - 1 {
                    canvas.blend_at(x, y, color);
                }
            }
        }
    }
}
