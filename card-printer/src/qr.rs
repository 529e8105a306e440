//! QR code encoding
//!
//! The encoder only produces the module grid; the card renderer decides
//! how to draw it.

use crate::error::{PrintError, PrintResult};
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Mandatory blank border around the symbol, in modules
pub const QUIET_ZONE_MODULES: usize = 4;

/// QR error correction level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QrErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl FromStr for QrErrorCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            other => Err(format!("unknown QR error correction level: {}", other)),
        }
    }
}

impl From<QrErrorCorrection> for EcLevel {
    fn from(level: QrErrorCorrection) -> Self {
        match level {
            QrErrorCorrection::L => EcLevel::L,
            QrErrorCorrection::M => EcLevel::M,
            QrErrorCorrection::Q => EcLevel::Q,
            QrErrorCorrection::H => EcLevel::H,
        }
    }
}

/// Encoded QR symbol: a square grid of dark/light modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrSymbol {
    width: usize,
    modules: Vec<bool>,
}

impl QrSymbol {
    /// Number of modules per side, excluding the quiet zone
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of modules per side including the quiet zone on both sides
    pub fn symbol_size(&self) -> usize {
        self.width + 2 * QUIET_ZONE_MODULES
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.modules[y * self.width + x]
    }

    /// Dark modules as `(x, y)`, row by row
    pub fn dark_modules(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, dark)| **dark)
            .map(|(i, _)| (i % self.width, i / self.width))
    }
}

/// QR code generator
pub trait QrEncoder: Send + Sync {
    fn encode(&self, payload: &str) -> PrintResult<QrSymbol>;
}

/// Default encoder backed by the `qrcode` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodeEncoder {
    level: QrErrorCorrection,
}

impl QrCodeEncoder {
    pub fn new(level: QrErrorCorrection) -> Self {
        Self { level }
    }

    pub fn level(&self) -> QrErrorCorrection {
        self.level
    }
}

impl QrEncoder for QrCodeEncoder {
    fn encode(&self, payload: &str) -> PrintResult<QrSymbol> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), self.level.into())
            .map_err(|e| PrintError::Qr(e.to_string()))?;

        Ok(QrSymbol {
            width: code.width(),
            modules: code
                .to_colors()
                .into_iter()
                .map(|c| c == Color::Dark)
                .collect(),
        })
    }
}
