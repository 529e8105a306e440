//! SVG rasterization
//!
//! Renders composed card SVG to PNG via resvg. The output is always
//! opaque: the pixmap is filled with the background colour before the
//! SVG is drawn on top.

use crate::error::{PrintError, PrintResult};
use resvg::{tiny_skia, usvg};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// RGB fill colour
pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];

/// Vector to raster renderer
pub trait Rasterizer: Send + Sync {
    /// Render `svg` to PNG bytes at `dpi`, filling transparent areas with `background`
    fn render(&self, svg: &str, dpi: f32, background: Rgb) -> PrintResult<Vec<u8>>;
}

/// Pixel length of `mm` at `dpi`
pub fn mm_to_px(mm: f64, dpi: f32) -> u32 {
    (mm / 25.4 * dpi as f64).round().max(1.0) as u32
}

/// resvg-backed rasterizer
///
/// The font database is loaded once and shared between renders.
#[derive(Clone)]
pub struct ResvgRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl ResvgRasterizer {
    /// Rasterizer using system fonts only
    pub fn new() -> Self {
        Self::with_font_dir(None)
    }

    /// Rasterizer using system fonts plus every font under `font_dir`
    pub fn with_font_dir(font_dir: Option<&Path>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = font_dir {
            db.load_fonts_dir(dir);
        }
        debug!(faces = db.len(), "font database loaded");
        Self {
            fontdb: Arc::new(db),
        }
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResvgRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResvgRasterizer")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl Rasterizer for ResvgRasterizer {
    #[instrument(skip(self, svg), fields(svg_len = svg.len()))]
    fn render(&self, svg: &str, dpi: f32, background: Rgb) -> PrintResult<Vec<u8>> {
        let options = usvg::Options {
            dpi,
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };

        let tree =
            usvg::Tree::from_str(svg, &options).map_err(|e| PrintError::Raster(e.to_string()))?;

        // Physical units are resolved against `dpi`, so the tree size is in pixels
        let size = tree.size();
        let width = size.width().round().max(1.0) as u32;
        let height = size.height().round().max(1.0) as u32;

        let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            PrintError::Raster(format!("invalid pixmap size {}x{}", width, height))
        })?;
        pixmap.fill(tiny_skia::Color::from_rgba8(
            background[0],
            background[1],
            background[2],
            255,
        ));

        let transform = tiny_skia::Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| PrintError::Raster(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="85.6mm" height="53.98mm" viewBox="0 0 85.6 53.98">
  <rect x="40" y="20" width="10" height="10" fill="#000000"/>
</svg>"##;

    #[test]
    fn test_mm_to_px() {
        assert_eq!(mm_to_px(85.6, 300.0), 1011);
        assert_eq!(mm_to_px(53.98, 300.0), 638);
        assert_eq!(mm_to_px(25.4, 72.0), 72);
    }

    #[test]
    fn test_render_card_size_at_300_dpi() {
        let png = ResvgRasterizer::new().render(CARD_SVG, 300.0, WHITE).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.width(), 1011);
        assert_eq!(img.height(), 638);
    }

    #[test]
    fn test_transparent_areas_filled() {
        let png = ResvgRasterizer::new().render(CARD_SVG, 150.0, WHITE).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);

        // Centre of the black square: x = 45mm, y = 25mm
        let x = mm_to_px(45.0, 150.0);
        let y = mm_to_px(25.0, 150.0);
        assert_eq!(img.get_pixel(x, y).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_render_is_deterministic() {
        let rasterizer = ResvgRasterizer::new();
        let a = rasterizer.render(CARD_SVG, 300.0, WHITE).unwrap();
        let b = rasterizer.render(CARD_SVG, 300.0, WHITE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_svg() {
        let err = ResvgRasterizer::new()
            .render("<not-svg", 300.0, WHITE)
            .unwrap_err();
        assert!(matches!(err, PrintError::Raster(_)));
    }
}
