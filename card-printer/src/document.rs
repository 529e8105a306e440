//! Print-sheet document rendering
//!
//! A [`SheetDocument`] is the fully laid out job: page geometry, the
//! distinct card images, and for each physical page which image goes
//! in which grid slot. [`PdfDocumentRenderer`] turns it into a PDF with
//! lopdf, embedding each distinct image once.

use crate::error::{PrintError, PrintResult};
use crate::layout::PageLayout;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, instrument};

/// Points per millimetre
const PT_PER_MM: f64 = 72.0 / 25.4;

fn pt(mm: f64) -> Object {
    Object::Real(((mm * PT_PER_MM) as f32).into())
}

/// Which side of the sheet a page is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSide {
    Front,
    Back,
}

/// One physical page: the grid slots in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPage {
    pub side: PageSide,
    /// Left margin for this page (mm); back pages use the mirrored margin
    pub left_margin: f64,
    /// Index into [`SheetDocument::images`], or `None` for an empty slot
    pub slots: Vec<Option<usize>>,
}

/// Fully laid out print job
#[derive(Debug, Clone)]
pub struct SheetDocument {
    pub layout: PageLayout,
    pub cards_per_row: usize,
    /// Distinct PNG images referenced by the pages
    pub images: Vec<Vec<u8>>,
    pub pages: Vec<SheetPage>,
}

/// Serializes a laid-out sheet to a portable document
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, document: &SheetDocument) -> PrintResult<Vec<u8>>;
}

/// lopdf-backed PDF renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfDocumentRenderer;

impl PdfDocumentRenderer {
    pub fn new() -> Self {
        Self
    }

    fn embed_png(doc: &mut Document, png: &[u8]) -> PrintResult<ObjectId> {
        let rgb = image::load_from_memory(png)
            .map_err(|e| PrintError::Document(format!("invalid card image: {}", e)))?
            .to_rgb8();
        let (width, height) = rgb.dimensions();

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        );
        Ok(doc.add_object(stream))
    }

    fn page_operations(document: &SheetDocument, page: &SheetPage) -> Vec<Operation> {
        let layout = &document.layout;
        let per_row = document.cards_per_row.max(1);
        let mut ops = Vec::new();

        for (slot, image) in page.slots.iter().enumerate() {
            let Some(image) = image else { continue };
            let col = slot % per_row;
            let row = slot / per_row;

            let x = page.left_margin + col as f64 * (layout.card_width + layout.horizontal_gap);
            let top = layout.margin_top + row as f64 * (layout.card_height + layout.vertical_gap);
            // PDF origin is bottom-left
            let y = layout.page_height - top - layout.card_height;

            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "cm",
                vec![
                    pt(layout.card_width),
                    0.into(),
                    0.into(),
                    pt(layout.card_height),
                    pt(x),
                    pt(y),
                ],
            ));
            ops.push(Operation::new(
                "Do",
                vec![Object::Name(format!("Im{}", image).into_bytes())],
            ));
            ops.push(Operation::new("Q", vec![]));
        }
        ops
    }
}

impl DocumentRenderer for PdfDocumentRenderer {
    #[instrument(skip(self, document), fields(pages = document.pages.len(), images = document.images.len()))]
    fn render(&self, document: &SheetDocument) -> PrintResult<Vec<u8>> {
        if document.pages.is_empty() {
            return Err(PrintError::Document("document has no pages".to_string()));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image_ids = document
            .images
            .iter()
            .map(|png| Self::embed_png(&mut doc, png))
            .collect::<PrintResult<Vec<_>>>()?;

        let layout = &document.layout;
        let mut kids = Vec::with_capacity(document.pages.len());

        for page in &document.pages {
            let mut xobjects = Dictionary::new();
            for image in page.slots.iter().flatten() {
                let id = image_ids.get(*image).ok_or_else(|| {
                    PrintError::Document(format!("page references missing image {}", image))
                })?;
                xobjects.set(format!("Im{}", image), Object::Reference(*id));
            }

            let content = Content {
                operations: Self::page_operations(document, page),
            };
            let encoded = content
                .encode()
                .map_err(|e| PrintError::Document(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! { "XObject" => xobjects },
                "MediaBox" => vec![0.into(), 0.into(), pt(layout.page_width), pt(layout.page_height)],
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| PrintError::Document(e.to_string()))?;
        debug!(bytes = out.len(), "pdf assembled");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png(color: [u8; 3]) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(8, 5, Rgb(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn sheet(pages: Vec<SheetPage>) -> SheetDocument {
        SheetDocument {
            layout: PageLayout::default(),
            cards_per_row: 2,
            images: vec![png([255, 0, 0]), png([0, 0, 255])],
            pages,
        }
    }

    fn image_count(doc: &Document) -> usize {
        doc.objects
            .values()
            .filter(|o| match o {
                Object::Stream(s) => {
                    s.dict.get(b"Subtype").and_then(|v| v.as_name()).ok() == Some(b"Image".as_slice())
                }
                _ => false,
            })
            .count()
    }

    #[test]
    fn test_pages_and_shared_images() {
        let document = sheet(vec![
            SheetPage {
                side: PageSide::Front,
                left_margin: 5.0,
                slots: vec![Some(0), Some(0), Some(0), None],
            },
            SheetPage {
                side: PageSide::Back,
                left_margin: 28.8,
                slots: vec![Some(1), Some(1), None, Some(1)],
            },
        ]);

        let pdf = PdfDocumentRenderer::new().render(&document).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));

        let loaded = Document::load_mem(&pdf).unwrap();
        assert_eq!(loaded.get_pages().len(), 2);
        assert_eq!(image_count(&loaded), 2);
    }

    #[test]
    fn test_slot_placement() {
        let document = sheet(vec![]);
        let page = SheetPage {
            side: PageSide::Front,
            left_margin: 5.0,
            slots: vec![None, None, None, Some(1)],
        };
        let ops = PdfDocumentRenderer::page_operations(&document, &page);
        assert_eq!(ops.len(), 4);

        let cm = &ops[1];
        assert_eq!(cm.operator, "cm");
        // Second column, second row
        let x = (5.0 + 85.6 + 5.0) * PT_PER_MM;
        let y = (297.0 - (5.0 + 53.98 + 5.0) - 53.98) * PT_PER_MM;
        let got_x = cm.operands[4].as_float().unwrap() as f64;
        let got_y = cm.operands[5].as_float().unwrap() as f64;
        assert!((got_x - x).abs() < 0.01);
        assert!((got_y - y).abs() < 0.01);
    }

    #[test]
    fn test_missing_image_reference() {
        let document = sheet(vec![SheetPage {
            side: PageSide::Front,
            left_margin: 5.0,
            slots: vec![Some(7)],
        }]);
        let err = PdfDocumentRenderer::new().render(&document).unwrap_err();
        assert!(matches!(err, PrintError::Document(_)));
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(PdfDocumentRenderer::new().render(&sheet(vec![])).is_err());
    }
}
