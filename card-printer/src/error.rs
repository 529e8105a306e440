//! Error types for the card printer library

use thiserror::Error;

/// Boxed error from a collaborator (card source, upstream API)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Page layout cannot hold a single card
///
/// User-correctable: the caller should fix the margins, gaps or card size.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct PrintLayoutError {
    pub message: String,
}

impl PrintLayoutError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Card printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Invalid page layout
    #[error("Invalid print layout: {0}")]
    Layout(#[from] PrintLayoutError),

    /// Card data source failed
    #[error("Card source failed: {0}")]
    Source(BoxError),

    /// QR code could not be encoded
    #[error("QR encoding failed: {0}")]
    Qr(String),

    /// SVG could not be parsed or rasterized
    #[error("Rasterization failed: {0}")]
    Raster(String),

    /// PDF assembly failed
    #[error("Document rendering failed: {0}")]
    Document(String),

    /// IO error (artwork, fonts)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// None of the requested cards could be resolved
    #[error("No cards found for the requested ids")]
    NoCards,

    /// Blocking render task panicked or was cancelled
    #[error("Render task failed: {0}")]
    Task(String),
}

/// Result type for card printer operations
pub type PrintResult<T> = Result<T, PrintError>;
