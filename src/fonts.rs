//! Font selection and text measurement for the PDF builtin fonts.
//!
//! Glyph shaping is left to the PDF viewer; we only need advance widths to
//! anchor aligned text, so widths use per-family average character factors.

use printpdf::BuiltinFont;

/// The three builtin PDF families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Map a design font family name onto the closest builtin family.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("courier") || lower.contains("mono") || lower.contains("consol") {
            FontFamily::Courier
        } else if lower.contains("times") || lower.contains("georgia") || lower == "serif" {
            FontFamily::Times
        } else {
            FontFamily::Helvetica
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family_name: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: FontFamily::from_name(family_name),
            bold,
            italic,
        }
    }

    pub fn builtin(&self) -> BuiltinFont {
        match (self.family, self.bold, self.italic) {
            (FontFamily::Helvetica, false, false) => BuiltinFont::Helvetica,
            (FontFamily::Helvetica, true, false) => BuiltinFont::HelveticaBold,
            (FontFamily::Helvetica, false, true) => BuiltinFont::HelveticaOblique,
            (FontFamily::Helvetica, true, true) => BuiltinFont::HelveticaBoldOblique,
            (FontFamily::Times, false, false) => BuiltinFont::TimesRoman,
            (FontFamily::Times, true, false) => BuiltinFont::TimesBold,
            (FontFamily::Times, false, true) => BuiltinFont::TimesItalic,
            (FontFamily::Times, true, true) => BuiltinFont::TimesBoldItalic,
            (FontFamily::Courier, false, false) => BuiltinFont::Courier,
            (FontFamily::Courier, true, false) => BuiltinFont::CourierBold,
            (FontFamily::Courier, false, true) => BuiltinFont::CourierOblique,
            (FontFamily::Courier, true, true) => BuiltinFont::CourierBoldOblique,
        }
    }

    /// Average advance as a fraction of the font size.
    fn average_advance(&self) -> f64 {
        match (self.family, self.bold) {
            // Courier is monospaced at 600/1000 em.
            (FontFamily::Courier, _) => 0.6,
            (FontFamily::Helvetica, false) => 0.5,
            (FontFamily::Helvetica, true) => 0.55,
            (FontFamily::Times, false) => 0.45,
            (FontFamily::Times, true) => 0.5,
        }
    }

    /// Approximate width of `text` at `font_size` (same unit as the size).
    pub fn measure(&self, text: &str, font_size: f64) -> f64 {
        if self.family == FontFamily::Courier {
            return text.chars().count() as f64 * font_size * 0.6;
        }
        let avg = self.average_advance();
        text.chars()
            .map(|c| match c {
                ' ' => 0.28,
                'i' | 'j' | 'l' | '.' | ',' | '\'' | '|' | '!' | ':' | ';' => 0.25,
                'm' | 'w' | 'M' | 'W' | '@' => avg * 1.6,
                c if c.is_ascii_uppercase() || c.is_ascii_digit() => avg * 1.25,
                _ => avg,
            })
            .sum::<f64>()
            * font_size
    }
}

/// Distance from the top of a line box to the baseline, as a fraction of the
/// font size (builtin faces have an ascender of roughly 0.75 em).
pub const ASCENDER_RATIO: f64 = 0.75;

/// Split text into lines on literal `\n` only. A trailing `\r` is dropped so
/// CRLF input behaves like LF.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect()
}

/// Encode text as WinAnsi (Windows-1252) bytes for the builtin fonts.
/// Characters with no single-byte code become `?`.
pub fn win_ansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => b' ',
            c if (c as u32) < 0x80 || (0xA0..0x100).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}
