//! Background Compositor
//!
//! Draws a name (and optional pronouns) over a static background image onto
//! a fixed-size raster surface. The background must be loaded first; until
//! then `compose` leaves the surface alone.
//!
//! Long names are not wrapped or truncated. They may run off the canvas.

use image::{Rgba, RgbaImage};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::theme::{parse_hex_color, BackgroundLayout, Theme, ThemeError};

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("No font loaded for text rendering")]
    FontMissing,

    #[error("Failed to load font {0}: {1}")]
    FontLoad(String, String),

    #[error("Failed to load background image {0}: {1}")]
    ImageLoad(String, String),

    #[error("Theme error: {0}")]
    Theme(#[from] ThemeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A single line of text, positioned by the top of its em box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size_px: f32,
    pub bold: bool,
    pub color: Rgba<u8>,
}

/// In-memory pixel buffer with a small 2D drawing interface.
pub trait RasterSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Reset every pixel to transparent.
    fn clear(&mut self);

    /// Draw `image` scaled to exactly cover the surface.
    fn draw_image_stretched(&mut self, image: &RgbaImage);

    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>);

    /// Left-aligned, top-baseline text.
    fn fill_text(&mut self, run: &TextRun) -> Result<(), CompositeError>;

    /// Advance width of `run` in pixels, when the surface can measure text.
    fn measure_text(&self, _run: &TextRun) -> Option<f32> {
        None
    }
}

/// Load state of the background image.
#[derive(Debug, Clone, Default)]
pub enum BackgroundImage {
    #[default]
    Unloaded,
    Loaded(RgbaImage),
}

impl BackgroundImage {
    pub fn new() -> Self {
        Self::Unloaded
    }

    /// One-shot "image ready" signal.
    pub fn mark_loaded(&mut self, image: RgbaImage) {
        *self = BackgroundImage::Loaded(image);
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BackgroundImage::Loaded(_))
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            BackgroundImage::Loaded(image) => Some(image),
            BackgroundImage::Unloaded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeOutcome {
    /// Background not ready; surface untouched.
    Skipped,
    BackgroundOnly,
    WithText { lines: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub size_px: f32,
    pub y: f32,
}

/// Split the overlay into at most two lines.
///
/// With pronouns: the full name, then the pronouns. Without: the first word of
/// the name, then the rest of it.
pub fn text_lines(name: &str, pronouns: &str, layout: &BackgroundLayout) -> Vec<TextLine> {
    let (first, second) = if pronouns.is_empty() {
        let mut words = name.split_whitespace();
        let first_name = words.next().unwrap_or("").to_string();
        let last_name = words.collect::<Vec<_>>().join(" ");
        (first_name, last_name)
    } else {
        (name.to_string(), pronouns.to_string())
    };

    let top = layout.text_y();
    let mut lines = vec![];
    if !first.is_empty() {
        lines.push(TextLine { text: first, size_px: layout.large_font_px, y: top });
    }
    if !second.is_empty() {
        lines.push(TextLine {
            text: second,
            size_px: layout.small_font_px,
            y: top + layout.large_font_px + layout.line_gap,
        });
    }
    lines
}

pub struct Compositor {
    layout: BackgroundLayout,
    accent: Rgba<u8>,
    text_color: Rgba<u8>,
}

impl Compositor {
    pub fn new(layout: BackgroundLayout, accent: Rgba<u8>, text_color: Rgba<u8>) -> Self {
        Self { layout, accent, text_color }
    }

    pub fn from_theme(theme: &Theme) -> Result<Self, CompositeError> {
        Ok(Self::new(
            theme.background.clone(),
            parse_hex_color(&theme.palette.accent)?,
            parse_hex_color(&theme.palette.overlay_text)?,
        ))
    }

    /// Re-render the whole surface from scratch.
    pub fn compose<S: RasterSurface + ?Sized>(
        &self,
        surface: &mut S,
        background: &BackgroundImage,
        name: &str,
        pronouns: &str,
    ) -> Result<ComposeOutcome, CompositeError> {
        let image = match background.image() {
            Some(image) => image,
            None => {
                debug!("background not loaded, skipping compose");
                return Ok(ComposeOutcome::Skipped);
            }
        };

        surface.clear();
        surface.draw_image_stretched(image);

        if name.is_empty() {
            return Ok(ComposeOutcome::BackgroundOnly);
        }

        surface.fill_rect(
            Rect {
                x: self.layout.bar_x as i32,
                y: self.layout.bar_y as i32,
                width: self.layout.bar_width,
                height: self.layout.bar_height,
            },
            self.accent,
        );

        let lines = text_lines(name, pronouns, &self.layout);
        for line in &lines {
            let run = TextRun {
                text: line.text.clone(),
                x: self.layout.text_x(),
                y: line.y,
                size_px: line.size_px,
                bold: true,
                color: self.text_color,
            };
            if let Some(width) = surface.measure_text(&run) {
                if run.x + width > surface.width() as f32 {
                    debug!("text {:?} overflows canvas by {:.0}px", run.text, run.x + width - surface.width() as f32);
                }
            }
            surface.fill_text(&run)?;
        }

        Ok(ComposeOutcome::WithText { lines: lines.len() })
    }
}
