//! Card face rendering
//!
//! A face is composed as an ID-1 sized SVG (millimetre user units), then
//! rasterized. Front z-order: artwork, QR code, first name, last name,
//! card number, expiry date. The back is the artwork alone.

use crate::error::{PrintError, PrintResult};
use crate::layout::{ID1_HEIGHT_MM, ID1_WIDTH_MM};
use crate::qr::{QUIET_ZONE_MODULES, QrEncoder, QrSymbol};
use crate::raster::{Rasterizer, WHITE};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use shared::MembershipCard;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Reference print resolution
pub const DEFAULT_DPI: f32 = 300.0;

/// Position of one text field on the card (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextField {
    pub x: f64,
    pub y: f64,
    /// Rotation in degrees around `(x, y)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
}

impl TextField {
    pub const fn at(x: f64, y: f64) -> Self {
        Self { x, y, rotate: None }
    }
}

/// Presentation constants for the front face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontFaceLayout {
    pub qr_x: f64,
    pub qr_y: f64,
    /// Width of the QR symbol including its quiet zone (mm)
    pub qr_width: f64,
    pub first_name: TextField,
    pub last_name: TextField,
    pub card_number: TextField,
    pub expiry: TextField,
    pub font_family: String,
    /// Font size (mm)
    pub font_size: f64,
    pub fill: String,
    pub first_name_max_chars: usize,
    pub last_name_max_chars: usize,
}

impl Default for FrontFaceLayout {
    fn default() -> Self {
        Self {
            qr_x: 57.0,
            qr_y: 6.0,
            qr_width: 24.0,
            first_name: TextField::at(6.0, 36.0),
            last_name: TextField::at(6.0, 41.0),
            card_number: TextField::at(6.0, 47.5),
            expiry: TextField::at(57.0, 47.5),
            font_family: "DejaVu Sans, Arial, sans-serif".to_string(),
            font_size: 3.5,
            fill: "#000000".to_string(),
            first_name_max_chars: 20,
            last_name_max_chars: 20,
        }
    }
}

/// Static background artwork (an SVG document)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardArtwork {
    svg: String,
}

impl CardArtwork {
    pub fn from_svg(svg: impl Into<String>) -> Self {
        Self { svg: svg.into() }
    }

    pub fn from_file(path: impl AsRef<Path>) -> PrintResult<Self> {
        Ok(Self::from_svg(std::fs::read_to_string(path)?))
    }

    /// Plain white card
    pub fn blank() -> Self {
        Self::from_svg(format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}"><rect width="{w}" height="{h}" fill="#ffffff"/></svg>"##,
            w = ID1_WIDTH_MM,
            h = ID1_HEIGHT_MM
        ))
    }

    fn data_url(&self) -> String {
        format!("data:image/svg+xml;base64,{}", BASE64.encode(&self.svg))
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Renders single membership card faces to PNG
#[derive(Clone)]
pub struct CardRenderer {
    front: CardArtwork,
    back: CardArtwork,
    layout: FrontFaceLayout,
    check_url_host: String,
    dpi: f32,
    qr: Arc<dyn QrEncoder>,
    rasterizer: Arc<dyn Rasterizer>,
}

impl CardRenderer {
    pub fn new(
        front: CardArtwork,
        back: CardArtwork,
        check_url_host: impl Into<String>,
        qr: Arc<dyn QrEncoder>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        Self {
            front,
            back,
            layout: FrontFaceLayout::default(),
            check_url_host: check_url_host.into(),
            dpi: DEFAULT_DPI,
            qr,
            rasterizer,
        }
    }

    pub fn with_layout(mut self, layout: FrontFaceLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    pub fn check_url(&self, card: &MembershipCard) -> String {
        card.check_url(&self.check_url_host)
    }

    fn open_svg(&self, out: &mut String, artwork: &CardArtwork) {
        out.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}mm" height="{h}mm" viewBox="0 0 {w} {h}">"#,
            w = ID1_WIDTH_MM,
            h = ID1_HEIGHT_MM
        ));
        out.push_str(&format!(
            r#"<image x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none" xlink:href="{href}"/>"#,
            w = ID1_WIDTH_MM,
            h = ID1_HEIGHT_MM,
            href = artwork.data_url()
        ));
    }

    fn write_qr(&self, out: &mut String, symbol: &QrSymbol) {
        let size = symbol.symbol_size();
        let scale = self.layout.qr_width / size as f64;
        out.push_str(&format!(
            r##"<g transform="translate({} {}) scale({})"><rect width="{size}" height="{size}" fill="#ffffff"/><path fill="#000000" shape-rendering="crispEdges" d=""##,
            self.layout.qr_x, self.layout.qr_y, scale
        ));
        let path: String = symbol
            .dark_modules()
            .map(|(x, y)| {
                format!(
                    "M{} {}h1v1h-1z",
                    x + QUIET_ZONE_MODULES,
                    y + QUIET_ZONE_MODULES
                )
            })
            .collect();
        out.push_str(&path);
        out.push_str(r#""/></g>"#);
    }

    fn write_text(&self, out: &mut String, field: &TextField, text: &str) {
        out.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}" fill="{}""#,
            field.x,
            field.y,
            escape(self.layout.font_family.as_str()),
            self.layout.font_size,
            escape(self.layout.fill.as_str())
        ));
        if let Some(deg) = field.rotate {
            out.push_str(&format!(
                r#" transform="rotate({} {} {})""#,
                deg, field.x, field.y
            ));
        }
        out.push_str(&format!(">{}</text>", escape(text)));
    }

    /// Compose the front face SVG for `card`
    pub fn front_svg(&self, card: &MembershipCard) -> PrintResult<String> {
        let symbol = self.qr.encode(&self.check_url(card))?;

        let mut out = String::with_capacity(16 * 1024);
        self.open_svg(&mut out, &self.front);
        self.write_qr(&mut out, &symbol);

        let layout = &self.layout;
        self.write_text(
            &mut out,
            &layout.first_name,
            truncate_chars(&card.first_name, layout.first_name_max_chars),
        );
        self.write_text(
            &mut out,
            &layout.last_name,
            truncate_chars(&card.last_name, layout.last_name_max_chars),
        );
        self.write_text(&mut out, &layout.card_number, &card.display_number());
        self.write_text(&mut out, &layout.expiry, &card.display_expiry());

        out.push_str("</svg>");
        Ok(out)
    }

    /// Compose the back face SVG
    pub fn back_svg(&self) -> String {
        let mut out = String::new();
        self.open_svg(&mut out, &self.back);
        out.push_str("</svg>");
        out
    }

    /// Render the front face of `card` to PNG
    #[instrument(skip(self, card), fields(card_id = %card.card_id))]
    pub fn render_front(&self, card: &MembershipCard) -> PrintResult<Vec<u8>> {
        let svg = self.front_svg(card)?;
        let png = self.rasterizer.render(&svg, self.dpi, WHITE)?;
        debug!(bytes = png.len(), "front face rendered");
        Ok(png)
    }

    /// Render the back face to PNG
    pub fn render_back(&self) -> PrintResult<Vec<u8>> {
        self.rasterizer.render(&self.back_svg(), self.dpi, WHITE)
    }
}

impl std::fmt::Debug for CardRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardRenderer")
            .field("layout", &self.layout)
            .field("check_url_host", &self.check_url_host)
            .field("dpi", &self.dpi)
            .finish_non_exhaustive()
    }
}

/// Load artwork from disk, naming the path in IO errors
pub fn load_artwork(path: &Path) -> PrintResult<CardArtwork> {
    CardArtwork::from_file(path).map_err(|e| match e {
        PrintError::Io(io) => PrintError::Io(std::io::Error::new(
            io.kind(),
            format!("{}: {}", path.display(), io),
        )),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::QrCodeEncoder;
    use crate::raster::ResvgRasterizer;
    use chrono::NaiveDate;
    use shared::CardStatus;

    fn card(first_name: &str) -> MembershipCard {
        MembershipCard {
            card_id: "c0ffee00-0000-4000-8000-000000000001".to_string(),
            member_id: "m-1".to_string(),
            card_number: 42,
            expires_at: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
            first_name: first_name.to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.org".to_string(),
            status: CardStatus::New,
        }
    }

    fn renderer() -> CardRenderer {
        CardRenderer::new(
            CardArtwork::blank(),
            CardArtwork::blank(),
            "https://esds.dancecloud.xyz",
            Arc::new(QrCodeEncoder::default()),
            Arc::new(ResvgRasterizer::new()),
        )
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Bartholomew", 4), "Bart");
        assert_eq!(truncate_chars("Zoë", 20), "Zoë");
        assert_eq!(truncate_chars("Zoë Ann", 3), "Zoë");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_front_svg_fields() {
        let svg = renderer().front_svg(&card("Ada")).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="85.6mm""#));
        assert!(svg.contains(r#"height="53.98mm""#));
        assert!(svg.contains(">Ada</text>"));
        assert!(svg.contains(">Lovelace</text>"));
        assert!(svg.contains(">000042</text>"));
        assert!(svg.contains(">30/09/2026</text>"));
        assert!(svg.contains("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_front_svg_escapes_and_truncates_names() {
        let layout = FrontFaceLayout {
            first_name_max_chars: 5,
            ..Default::default()
        };
        let svg = renderer()
            .with_layout(layout)
            .front_svg(&card("<b>&Bobby"))
            .unwrap();
        assert!(svg.contains(">&lt;b&gt;&amp;B</text>"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn test_qr_scaled_to_configured_width() {
        let r = renderer();
        let symbol = QrCodeEncoder::default()
            .encode(&r.check_url(&card("Ada")))
            .unwrap();
        let scale = 24.0 / symbol.symbol_size() as f64;
        let svg = r.front_svg(&card("Ada")).unwrap();
        assert!(svg.contains(&format!("translate(57 6) scale({})", scale)));
    }

    #[test]
    fn test_qr_path_has_one_square_per_dark_module() {
        let r = renderer();
        let symbol = QrCodeEncoder::default()
            .encode(&r.check_url(&card("Ada")))
            .unwrap();
        let svg = r.front_svg(&card("Ada")).unwrap();
        assert_eq!(svg.matches("h1v1h-1z").count(), symbol.dark_modules().count());
        // Finder pattern corner sits just inside the quiet zone
        let corner = format!("M{q} {q}h1v1h-1z", q = QUIET_ZONE_MODULES);
        assert!(svg.contains(&corner));
    }

    #[test]
    fn test_rotation() {
        let layout = FrontFaceLayout {
            card_number: TextField {
                x: 10.0,
                y: 20.0,
                rotate: Some(-90.0),
            },
            ..Default::default()
        };
        let svg = renderer().with_layout(layout).front_svg(&card("Ada")).unwrap();
        assert!(svg.contains(r#"transform="rotate(-90 10 20)">000042</text>"#));
    }

    #[test]
    fn test_render_front_is_deterministic() {
        let r = renderer().with_dpi(100.0);
        let a = r.render_front(&card("Ada")).unwrap();
        let b = r.render_front(&card("Ada")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_faces_are_card_sized_and_opaque() {
        let r = renderer();
        for png in [r.render_front(&card("Ada")).unwrap(), r.render_back().unwrap()] {
            let img = image::load_from_memory(&png).unwrap().to_rgba8();
            assert_eq!((img.width(), img.height()), (1011, 638));
            assert!(img.pixels().all(|p| p.0[3] == 255));
        }
    }

    #[test]
    fn test_back_has_no_card_content() {
        let svg = renderer().back_svg();
        assert!(!svg.contains("<text"));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn test_missing_artwork_file() {
        let err = load_artwork(Path::new("/nonexistent/front.svg")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/front.svg"));
    }
}
