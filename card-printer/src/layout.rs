//! Card geometry engine
//!
//! Pure functions: how many ID-1 cards fit on a page, and how a page of
//! card slots is reordered for the back side of a duplex print.
//!
//! All lengths are millimetres. Only the leading (top/left) margins are
//! modelled; cards may run up to the trailing page edge.

use crate::error::PrintLayoutError;
use serde::{Deserialize, Serialize};

/// ISO/IEC 7810 ID-1 card width (mm)
pub const ID1_WIDTH_MM: f64 = 85.6;
/// ISO/IEC 7810 ID-1 card height (mm)
pub const ID1_HEIGHT_MM: f64 = 53.98;
/// A4 page width (mm)
pub const A4_WIDTH_MM: f64 = 210.0;
/// A4 page height (mm)
pub const A4_HEIGHT_MM: f64 = 297.0;

/// Page layout for a print job (caller-supplied)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub card_width: f64,
    pub card_height: f64,
    pub margin_top: f64,
    pub margin_left: f64,
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_MM,
            page_height: A4_HEIGHT_MM,
            card_width: ID1_WIDTH_MM,
            card_height: ID1_HEIGHT_MM,
            margin_top: 5.0,
            margin_left: 5.0,
            horizontal_gap: 5.0,
            vertical_gap: 5.0,
        }
    }
}

/// Result of fitting cards onto a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardGrid {
    pub cards_per_row: usize,
    pub cards_per_col: usize,
}

impl CardGrid {
    pub fn cards_per_page(&self) -> usize {
        self.cards_per_row * self.cards_per_col
    }
}

/// Number of items of `size` separated by `gap` that fit in `usable`
///
/// Plain `floor`: a ratio a hair under an integer rounds down.
fn fit(usable: f64, size: f64, gap: f64) -> usize {
    let n = ((usable + gap) / (size + gap)).floor();
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        0
    }
}

/// Compute the card grid for a page layout
///
/// `cards_per_row = floor((page_width - margin_left + h_gap) / (card_width + h_gap))`,
/// and the same on the vertical axis. A grid with no cards is an error.
pub fn compute_grid(layout: &PageLayout) -> Result<CardGrid, PrintLayoutError> {
    let values = [
        layout.page_width,
        layout.page_height,
        layout.card_width,
        layout.card_height,
        layout.margin_top,
        layout.margin_left,
        layout.horizontal_gap,
        layout.vertical_gap,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(PrintLayoutError::new("Layout values must be finite numbers"));
    }
    if layout.card_width <= 0.0 || layout.card_height <= 0.0 {
        return Err(PrintLayoutError::new(format!(
            "Card size must be positive (got {}mm x {}mm)",
            layout.card_width, layout.card_height
        )));
    }
    if layout.card_width + layout.horizontal_gap <= 0.0
        || layout.card_height + layout.vertical_gap <= 0.0
    {
        return Err(PrintLayoutError::new(
            "Gaps must not cancel out the card size",
        ));
    }

    let grid = CardGrid {
        cards_per_row: fit(
            layout.page_width - layout.margin_left,
            layout.card_width,
            layout.horizontal_gap,
        ),
        cards_per_col: fit(
            layout.page_height - layout.margin_top,
            layout.card_height,
            layout.vertical_gap,
        ),
    };

    if grid.cards_per_page() == 0 {
        return Err(PrintLayoutError::new(format!(
            "No {}mm x {}mm card fits on a {}mm x {}mm page with margins {}mm (top) / {}mm (left) \
             and gaps {}mm / {}mm. Reduce the margins, gaps or card size.",
            layout.card_width,
            layout.card_height,
            layout.page_width,
            layout.page_height,
            layout.margin_top,
            layout.margin_left,
            layout.horizontal_gap,
            layout.vertical_gap
        )));
    }

    Ok(grid)
}

/// Width occupied by one row of cards including the gaps between them
pub fn grid_width(layout: &PageLayout, cards_per_row: usize) -> f64 {
    if cards_per_row == 0 {
        return 0.0;
    }
    cards_per_row as f64 * layout.card_width + (cards_per_row - 1) as f64 * layout.horizontal_gap
}

/// Left margin for the back page so its grid sits behind the front grid
/// once the sheet is flipped on its long edge.
///
/// Clamped at zero: an oversized grid starts at the page edge.
pub fn mirrored_left_margin(layout: &PageLayout, cards_per_row: usize) -> f64 {
    let margin = layout.page_width - (grid_width(layout, cards_per_row) + layout.margin_left);
    margin.max(0.0)
}

/// Reorder a page of card slots for the back side
///
/// Pads to `cards_per_page` with empty slots, reverses each row of
/// `cards_per_row` and flattens again. Empty slots keep their mirrored
/// position.
pub fn mirror_page<T: Clone>(
    page: &[Option<T>],
    cards_per_row: usize,
    cards_per_page: usize,
) -> Vec<Option<T>> {
    let mut padded: Vec<Option<T>> = page.to_vec();
    if padded.len() < cards_per_page {
        padded.resize(cards_per_page, None);
    }
    if cards_per_row == 0 {
        return padded;
    }

    padded
        .chunks(cards_per_row)
        .flat_map(|row| row.iter().rev().cloned())
        .collect()
}
