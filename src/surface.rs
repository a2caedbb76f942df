//! Image-backed raster surface
//!
//! `ImageSurface` implements `RasterSurface` over an `RgbaImage`, with glyphs
//! rasterized by `rusttype`. The surface carries a single font face; load a
//! bold face to get bold overlay text.

use image::imageops::{self, FilterType};
use image::{Pixel, Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use std::fs;
use std::path::Path;

use crate::compositor::{BackgroundImage, CompositeError, RasterSurface, Rect, TextRun};

pub struct ImageSurface {
    pixels: RgbaImage,
    font: Option<Font<'static>>,
}

impl ImageSurface {
    /// Transparent surface of a fixed size, no font.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            font: None,
        }
    }

    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

impl RasterSurface for ImageSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn clear(&mut self) {
        for p in self.pixels.pixels_mut() {
            *p = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_image_stretched(&mut self, image: &RgbaImage) {
        let (w, h) = self.pixels.dimensions();
        if image.dimensions() == (w, h) {
            imageops::overlay(&mut self.pixels, image, 0, 0);
        } else {
            let scaled = imageops::resize(image, w, h, FilterType::Lanczos3);
            imageops::overlay(&mut self.pixels, &scaled, 0, 0);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        let x0 = rect.x.max(0) as u32;
        let y0 = rect.y.max(0) as u32;
        let x1 = (rect.x as i64 + rect.width as i64).clamp(0, self.pixels.width() as i64) as u32;
        let y1 = (rect.y as i64 + rect.height as i64).clamp(0, self.pixels.height() as i64) as u32;

        for y in y0..y1 {
            for x in x0..x1 {
                let p = self.pixels.get_pixel_mut(x, y);
                if color[3] == 255 {
                    *p = color;
                } else {
                    p.blend(&color);
                }
            }
        }
    }

    fn fill_text(&mut self, run: &TextRun) -> Result<(), CompositeError> {
        let font = self.font.as_ref().ok_or(CompositeError::FontMissing)?;
        let scale = Scale::uniform(run.size_px);
        let v_metrics = font.v_metrics(scale);
        let baseline = point(run.x, run.y + v_metrics.ascent);
        let (width, height) = self.pixels.dimensions();
        let pixels = &mut self.pixels;

        for glyph in font.layout(&run.text, scale, baseline) {
            let bb = match glyph.pixel_bounding_box() {
                Some(bb) => bb,
                None => continue,
            };
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                    return;
                }
                let alpha = (coverage * run.color[3] as f32).round() as u8;
                if alpha == 0 {
                    return;
                }
                let src = Rgba([run.color[0], run.color[1], run.color[2], alpha]);
                pixels.get_pixel_mut(px as u32, py as u32).blend(&src);
            });
        }
        Ok(())
    }

    fn measure_text(&self, run: &TextRun) -> Option<f32> {
        let font = self.font.as_ref()?;
        let scale = Scale::uniform(run.size_px);
        font.layout(&run.text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
    }
}

pub fn load_font(path: &Path) -> Result<Font<'static>, CompositeError> {
    let data = fs::read(path)
        .map_err(|e| CompositeError::FontLoad(path.display().to_string(), e.to_string()))?;
    Font::try_from_vec(data).ok_or_else(|| {
        CompositeError::FontLoad(path.display().to_string(), "not a TrueType/OpenType font".to_string())
    })
}

/// Decode a background image file and mark it ready.
pub fn load_background(path: &Path) -> Result<BackgroundImage, CompositeError> {
    let image = image::open(path)
        .map_err(|e| CompositeError::ImageLoad(path.display().to_string(), e.to_string()))?
        .to_rgba8();
    let mut background = BackgroundImage::new();
    background.mark_loaded(image);
    Ok(background)
}
