//! Print-sheet composition
//!
//! Builds the N-up duplex document for a batch of cards:
//!
//! 1. fit the grid (fails before anything is fetched or rendered)
//! 2. resolve ids through the [`CardSource`], keeping caller order
//! 3. render fronts, plus a single back image shared by every back page
//! 4. per page group: front page, then its mirrored back page
//! 5. hand the laid out [`SheetDocument`] to the [`DocumentRenderer`]
//!
//! Steps 3 to 5 run on the blocking pool.

use crate::document::{DocumentRenderer, PageSide, SheetDocument, SheetPage};
use crate::error::{PrintError, PrintResult};
use crate::face::CardRenderer;
use crate::layout::{CardGrid, PageLayout, compute_grid, mirror_page, mirrored_left_margin};
use crate::source::CardSource;
use serde::{Deserialize, Serialize};
use shared::{CardFilter, MembershipCard};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A print job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrintSheetRequest {
    #[serde(default)]
    pub layout: PageLayout,
    pub card_ids: Vec<String>,
}

/// Composes printable duplex sheets of membership cards
#[derive(Clone)]
pub struct PrintSheetComposer {
    renderer: Arc<CardRenderer>,
    documents: Arc<dyn DocumentRenderer>,
}

impl PrintSheetComposer {
    pub fn new(renderer: Arc<CardRenderer>, documents: Arc<dyn DocumentRenderer>) -> Self {
        Self {
            renderer,
            documents,
        }
    }

    /// Compose the sheet for `request`, returning the document bytes
    #[instrument(skip(self, source, request), fields(requested = request.card_ids.len()))]
    pub async fn compose<S>(&self, source: &S, request: &PrintSheetRequest) -> PrintResult<Vec<u8>>
    where
        S: CardSource + ?Sized,
    {
        let grid = compute_grid(&request.layout)?;
        debug!(
            cards_per_row = grid.cards_per_row,
            cards_per_col = grid.cards_per_col,
            "grid computed"
        );

        let cards = resolve_cards(source, &request.card_ids).await?;
        if cards.is_empty() {
            return Err(PrintError::NoCards);
        }
        info!(cards = cards.len(), "composing print sheet");

        let renderer = self.renderer.clone();
        let documents = self.documents.clone();
        let layout = request.layout;

        tokio::task::spawn_blocking(move || {
            let document = build_sheet(&renderer, &layout, grid, &cards)?;
            documents.render(&document)
        })
        .await
        .map_err(|e| PrintError::Task(e.to_string()))?
    }
}

/// Look up `ids` and return the cards in the same order
///
/// Ids the source does not know are skipped.
async fn resolve_cards<S>(source: &S, ids: &[String]) -> PrintResult<Vec<MembershipCard>>
where
    S: CardSource + ?Sized,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let found = source
        .list_cards(&CardFilter::ids(ids.iter().cloned()))
        .await
        .map_err(PrintError::Source)?;
    let by_id: HashMap<&str, &MembershipCard> =
        found.iter().map(|c| (c.card_id.as_str(), c)).collect();

    let mut cards = Vec::with_capacity(ids.len());
    for id in ids {
        match by_id.get(id.as_str()) {
            Some(card) => cards.push((*card).clone()),
            None => debug!(card_id = %id, "card not found upstream, skipping"),
        }
    }
    Ok(cards)
}

/// Render faces and lay out every page
pub fn build_sheet(
    renderer: &CardRenderer,
    layout: &PageLayout,
    grid: CardGrid,
    cards: &[MembershipCard],
) -> PrintResult<SheetDocument> {
    let per_page = grid.cards_per_page();

    let mut images = cards
        .iter()
        .map(|card| renderer.render_front(card))
        .collect::<PrintResult<Vec<_>>>()?;
    let back_image = images.len();
    images.push(renderer.render_back()?);

    let back_margin = mirrored_left_margin(layout, grid.cards_per_row);
    let indices: Vec<usize> = (0..cards.len()).collect();
    let mut pages = Vec::with_capacity(2 * cards.len().div_ceil(per_page.max(1)));

    for group in indices.chunks(per_page.max(1)) {
        let mut front: Vec<Option<usize>> = group.iter().copied().map(Some).collect();
        front.resize(per_page, None);

        let backs: Vec<Option<usize>> = front.iter().map(|s| s.map(|_| back_image)).collect();
        let back = mirror_page(&backs, grid.cards_per_row, per_page);

        pages.push(SheetPage {
            side: PageSide::Front,
            left_margin: layout.margin_left,
            slots: front,
        });
        pages.push(SheetPage {
            side: PageSide::Back,
            left_margin: back_margin,
            slots: back,
        });
    }

    Ok(SheetDocument {
        layout: *layout,
        cards_per_row: grid.cards_per_row,
        images,
        pages,
    })
}
