//! Unit conversion between millimetres, inches, device pixels and PDF points.
//!
//! Millimetres are the source of truth for physical label sizes. Pixel
//! values are always derived from millimetres at a given DPI and rounded
//! once, at the end (round-half-away-from-zero).

use serde::{Deserialize, Serialize};

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// PDF points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

pub fn inches_to_mm(inches: f64) -> f64 {
    inches * MM_PER_INCH
}

/// Unrounded inch → pixel conversion.
pub fn inches_to_pixels(inches: f64, dpi: f64) -> f64 {
    inches * dpi
}

/// `round(mm * dpi / 25.4)`, with no intermediate rounding.
pub fn mm_to_pixels(mm: f64, dpi: f64) -> i64 {
    (mm * dpi / MM_PER_INCH).round() as i64
}

pub fn pixels_to_mm(px: f64, dpi: f64) -> f64 {
    px * MM_PER_INCH / dpi
}

/// Pixels at `dpi` → PDF points (72 per inch).
pub fn pixels_to_points(px: f64, dpi: f64) -> f64 {
    px * POINTS_PER_INCH / dpi
}

pub fn points_to_mm(pt: f64) -> f64 {
    pt * MM_PER_INCH / POINTS_PER_INCH
}

/// Supported printer resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Dpi {
    /// 203 DPI (8 dots/mm), the common thermal printer resolution.
    #[default]
    Dpi203,
    /// 300 DPI (12 dots/mm).
    Dpi300,
}

impl Dpi {
    pub fn value(self) -> f64 {
        match self {
            Dpi::Dpi203 => 203.0,
            Dpi::Dpi300 => 300.0,
        }
    }

    /// Scale factor from pixels at this DPI to PDF points.
    pub fn px_to_pt(self) -> f64 {
        POINTS_PER_INCH / self.value()
    }
}

impl TryFrom<u32> for Dpi {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            203 => Ok(Dpi::Dpi203),
            300 => Ok(Dpi::Dpi300),
            other => Err(format!("unsupported DPI {other} (expected 203 or 300)")),
        }
    }
}

impl From<Dpi> for u32 {
    fn from(dpi: Dpi) -> Self {
        match dpi {
            Dpi::Dpi203 => 203,
            Dpi::Dpi300 => 300,
        }
    }
}

/// Physical label size. Only the millimetre fields are stored; every other
/// unit is recomputed from them on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelDimension {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl LabelDimension {
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }

    pub fn from_inches(width_in: f64, height_in: f64) -> Self {
        Self::new(inches_to_mm(width_in), inches_to_mm(height_in))
    }

    /// 4 × 6 in shipping label.
    pub fn shipping_4x6() -> Self {
        Self::from_inches(4.0, 6.0)
    }

    /// 4 × 3 in label.
    pub fn label_4x3() -> Self {
        Self::from_inches(4.0, 3.0)
    }

    /// 2 × 1 in product / barcode label.
    pub fn label_2x1() -> Self {
        Self::from_inches(2.0, 1.0)
    }

    /// 62 × 29 mm address label.
    pub fn address_62x29() -> Self {
        Self::new(62.0, 29.0)
    }

    /// 100 × 150 mm parcel label.
    pub fn parcel_100x150() -> Self {
        Self::new(100.0, 150.0)
    }

    /// Width in inches rounded to two decimals. Display only.
    pub fn width_inch(&self) -> f64 {
        round2(mm_to_inches(self.width_mm))
    }

    /// Height in inches rounded to two decimals. Display only.
    pub fn height_inch(&self) -> f64 {
        round2(mm_to_inches(self.height_mm))
    }

    pub fn width_px(&self, dpi: Dpi) -> i64 {
        mm_to_pixels(self.width_mm, dpi.value())
    }

    pub fn height_px(&self, dpi: Dpi) -> i64 {
        mm_to_pixels(self.height_mm, dpi.value())
    }

    /// Page size in points, going through device pixels at `dpi` so the page
    /// covers exactly the dots the printer will address.
    pub fn size_pt(&self, dpi: Dpi) -> (f64, f64) {
        (
            pixels_to_points(self.width_px(dpi) as f64, dpi.value()),
            pixels_to_points(self.height_px(dpi) as f64, dpi.value()),
        )
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
