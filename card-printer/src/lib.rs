//! # card-printer
//!
//! Membership card printing library.
//!
//! ## Scope
//!
//! This crate handles HOW cards are printed:
//! - Card geometry (N-up grid fitting, duplex mirroring)
//! - QR code encoding
//! - Card face composition (SVG) and rasterization (PNG)
//! - Print-sheet composition and PDF assembly
//!
//! Where card records come from is the application's business, behind
//! the [`CardSource`] trait:
//! - DanceCloud registry client → esds-portal
//!
//! ## Example
//!
//! ```ignore
//! use card_printer::{
//!     CardArtwork, CardRenderer, PdfDocumentRenderer, PrintSheetComposer, PrintSheetRequest,
//!     QrCodeEncoder, ResvgRasterizer,
//! };
//! use std::sync::Arc;
//!
//! let renderer = CardRenderer::new(
//!     CardArtwork::from_file("assets/card_front.svg")?,
//!     CardArtwork::from_file("assets/card_back.svg")?,
//!     "https://esds.dancecloud.xyz",
//!     Arc::new(QrCodeEncoder::default()),
//!     Arc::new(ResvgRasterizer::new()),
//! );
//! let composer = PrintSheetComposer::new(Arc::new(renderer), Arc::new(PdfDocumentRenderer::new()));
//!
//! let pdf = composer
//!     .compose(&dancecloud, &PrintSheetRequest { card_ids, ..Default::default() })
//!     .await?;
//! ```

mod document;
mod error;
mod face;
mod layout;
mod qr;
mod raster;
mod sheet;
mod source;

// Re-exports
pub use document::{DocumentRenderer, PageSide, PdfDocumentRenderer, SheetDocument, SheetPage};
pub use error::{BoxError, PrintError, PrintLayoutError, PrintResult};
pub use face::{
    CardArtwork, CardRenderer, DEFAULT_DPI, FrontFaceLayout, TextField, load_artwork,
};
pub use layout::{
    CardGrid, ID1_HEIGHT_MM, ID1_WIDTH_MM, PageLayout, compute_grid, grid_width, mirror_page,
    mirrored_left_margin,
};
pub use qr::{QrCodeEncoder, QrEncoder, QrErrorCorrection, QrSymbol};
pub use raster::{Rasterizer, ResvgRasterizer, Rgb, WHITE, mm_to_px};
pub use sheet::{PrintSheetComposer, PrintSheetRequest, build_sheet};
pub use source::CardSource;
