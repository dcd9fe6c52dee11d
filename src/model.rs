//! Design model – the immutable input of a generation job.
//!
//! A [`Design`] is a label size plus an ordered list of positioned
//! [`Element`]s whose coordinates are pixels at the design's reference DPI.
//! Batch jobs add one [`BatchRecord`] per output page and an optional
//! [`ColumnMapping`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LabelError;
use crate::units::{Dpi, LabelDimension};

/// RGBA colour (0.0 – 1.0). Serialised as a `#rrggbb` / `#rgb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else if hex.len() == 3 {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else {
            None
        }
    }

    pub fn to_hex(&self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid hex colour {value:?}"))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

// ---------------------------------------------------------------------------
// Element payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProperties {
    #[serde(default)]
    pub content: String,
    #[serde(default = "TextProperties::default_family")]
    pub font_family: String,
    /// Font size in design pixels.
    #[serde(default = "TextProperties::default_size")]
    pub font_size: f64,
    /// Line height as a multiple of the font size.
    #[serde(default = "TextProperties::default_line_height")]
    pub line_height: f64,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl TextProperties {
    fn default_family() -> String {
        "Helvetica".to_string()
    }

    fn default_size() -> f64 {
        24.0
    }

    fn default_line_height() -> f64 {
        1.2
    }

    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            font_family: Self::default_family(),
            font_size: Self::default_size(),
            line_height: Self::default_line_height(),
            color: Color::BLACK,
            align: TextAlign::Left,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Stretch to the element box.
    #[default]
    Fill,
    /// Scale uniformly to fit inside the box, centred.
    Contain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProperties {
    /// `data:` URI, `http(s)://` URL, or an opaque storage reference.
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub fit: ImageFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbology {
    #[serde(rename = "CODE128")]
    Code128,
    #[serde(rename = "CODE39")]
    Code39,
    #[serde(rename = "EAN13")]
    Ean13,
    #[serde(rename = "EAN8")]
    Ean8,
    #[serde(rename = "UPCA", alias = "UPC-A", alias = "UPC")]
    UpcA,
    #[serde(rename = "UPCE", alias = "UPC-E")]
    UpcE,
    #[serde(rename = "QRCODE", alias = "QR")]
    QrCode,
    #[serde(rename = "AZTEC")]
    Aztec,
}

impl Symbology {
    /// Two-dimensional symbologies are drawn as square module grids.
    pub fn is_matrix(self) -> bool {
        matches!(self, Symbology::QrCode | Symbology::Aztec)
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Symbology::Code128 => "CODE128",
            Symbology::Code39 => "CODE39",
            Symbology::Ean13 => "EAN13",
            Symbology::Ean8 => "EAN8",
            Symbology::UpcA => "UPCA",
            Symbology::UpcE => "UPCE",
            Symbology::QrCode => "QRCODE",
            Symbology::Aztec => "AZTEC",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeProperties {
    pub symbology: Symbology,
    #[serde(default)]
    pub value: String,
    /// Print the human readable value under 1D symbologies.
    #[serde(default = "BarcodeProperties::default_show_text")]
    pub show_text: bool,
    #[serde(default)]
    pub color: Color,
    /// Human readable text size in design pixels.
    #[serde(default = "BarcodeProperties::default_font_size")]
    pub font_size: f64,
}

impl BarcodeProperties {
    fn default_show_text() -> bool {
        true
    }

    fn default_font_size() -> f64 {
        20.0
    }

    pub fn new(symbology: Symbology, value: impl Into<String>) -> Self {
        Self {
            symbology,
            value: value.into(),
            show_text: Self::default_show_text(),
            color: Color::BLACK,
            font_size: Self::default_font_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeProperties {
    pub kind: ShapeKind,
    #[serde(default)]
    pub fill: Color,
    #[serde(default)]
    pub fill_opacity: f64,
    #[serde(default)]
    pub stroke: Color,
    /// Stroke width in design pixels.
    #[serde(default = "ShapeProperties::default_stroke_width")]
    pub stroke_width: f64,
}

impl ShapeProperties {
    fn default_stroke_width() -> f64 {
        1.0
    }

    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            fill: Color::BLACK,
            fill_opacity: 0.0,
            stroke: Color::BLACK,
            stroke_width: Self::default_stroke_width(),
        }
    }
}

/// The variant-specific half of an [`Element`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "lowercase")]
pub enum ElementKind {
    Text(TextProperties),
    Image(ImageProperties),
    Barcode(BarcodeProperties),
    Shape(ShapeProperties),
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Text(_) => "text",
            ElementKind::Image(_) => "image",
            ElementKind::Barcode(_) => "barcode",
            ElementKind::Shape(_) => "shape",
        }
    }
}

/// One positioned visual primitive. Geometry is in design pixels, origin at
/// the top-left of the label, y growing downwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise degrees about the element's centre.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "Element::default_visible")]
    pub visible: bool,
    #[serde(default = "Element::default_opacity")]
    pub opacity: f64,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    fn default_visible() -> bool {
        true
    }

    fn default_opacity() -> f64 {
        1.0
    }

    pub fn new(id: impl Into<String>, x: f64, y: f64, width: f64, height: f64, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            rotation: 0.0,
            z_index: 0,
            visible: true,
            opacity: 1.0,
            kind,
        }
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_z_index(mut self, z: i32) -> Self {
        self.z_index = z;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Rotation folded into `[0, 360)`.
    pub fn normalized_rotation(&self) -> f64 {
        self.rotation.rem_euclid(360.0)
    }
}

/// A label design: size, coordinate DPI and elements in authoring order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub label: LabelDimension,
    /// DPI the element coordinates were authored at.
    #[serde(default)]
    pub reference_dpi: Dpi,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Design {
    pub fn new(label: LabelDimension, reference_dpi: Dpi) -> Self {
        Self {
            label,
            reference_dpi,
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Parse and validate a design from JSON.
    pub fn from_json(json: &str) -> Result<Self, LabelError> {
        let design: Design =
            serde_json::from_str(json).map_err(|e| LabelError::InvalidDesign(e.to_string()))?;
        design.validate()?;
        Ok(design)
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Structural checks the type system cannot express.
    pub fn validate(&self) -> Result<(), LabelError> {
        let LabelDimension {
            width_mm,
            height_mm,
        } = self.label;
        if !(width_mm.is_finite() && height_mm.is_finite() && width_mm > 0.0 && height_mm > 0.0) {
            return Err(LabelError::InvalidDesign(format!(
                "label size must be positive, got {width_mm} × {height_mm} mm"
            )));
        }

        let mut seen = HashSet::new();
        for el in &self.elements {
            if !seen.insert(el.id.as_str()) {
                return Err(LabelError::InvalidDesign(format!(
                    "duplicate element id {:?}",
                    el.id
                )));
            }
            let geometry = [el.x, el.y, el.width, el.height, el.rotation, el.opacity];
            if geometry.iter().any(|v| !v.is_finite()) {
                return Err(LabelError::InvalidDesign(format!(
                    "element {:?} has non-finite geometry",
                    el.id
                )));
            }
            if el.width < 0.0 || el.height < 0.0 {
                return Err(LabelError::InvalidDesign(format!(
                    "element {:?} has negative size",
                    el.id
                )));
            }
            if !(0.0..=1.0).contains(&el.opacity) {
                return Err(LabelError::InvalidDesign(format!(
                    "element {:?} opacity {} outside 0..=1",
                    el.id, el.opacity
                )));
            }
            let font_metrics = match &el.kind {
                ElementKind::Text(t) => vec![("font_size", t.font_size), ("line_height", t.line_height)],
                ElementKind::Barcode(b) if b.show_text => vec![("font_size", b.font_size)],
                _ => Vec::new(),
            };
            for (name, value) in font_metrics {
                if !(value.is_finite() && value > 0.0) {
                    return Err(LabelError::InvalidDesign(format!(
                        "element {:?} {name} must be positive, got {value}",
                        el.id
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Batch input
// ---------------------------------------------------------------------------

/// One row of caller data: column name → scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchRecord(pub BTreeMap<String, Value>);

impl BatchRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Stringified value of `column`; `None` when missing or null.
    pub fn get(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Parse a JSON array of flat objects.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, LabelError> {
        serde_json::from_str(json).map_err(|e| LabelError::InvalidDesign(format!("records: {e}")))
    }
}

/// Record column name → template field name.
///
/// Entries are kept sorted by column name. If two columns map to the same
/// field, the one with the lowest name that has a value in the record is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(pub BTreeMap<String, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.0.insert(column.into(), field.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, f)| (c.as_str(), f.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, LabelError> {
        serde_json::from_str(json)
            .map_err(|e| LabelError::InvalidDesign(format!("column mapping: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex("#ff8800").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(c.to_hex(), "#ff8800");
    }

    #[test]
    fn element_json_shape() {
        let json = r##"{
            "id": "t1", "type": "text", "x": 10, "y": 20, "width": 100, "height": 30,
            "properties": {"content": "Hi", "color": "#336699", "align": "center"}
        }"##;
        let el: Element = serde_json::from_str(json).unwrap();
        assert_eq!(el.id, "t1");
        assert!(el.visible);
        assert_eq!(el.opacity, 1.0);
        match &el.kind {
            ElementKind::Text(t) => {
                assert_eq!(t.content, "Hi");
                assert_eq!(t.align, TextAlign::Center);
                assert_eq!(t.font_family, "Helvetica");
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn unknown_element_type_is_invalid_design() {
        let json = r#"{
            "label": {"width_mm": 50, "height_mm": 25},
            "reference_dpi": 203,
            "elements": [{"id": "a", "type": "hologram", "x": 0, "y": 0, "width": 1, "height": 1, "properties": {}}]
        }"#;
        assert!(matches!(Design::from_json(json), Err(LabelError::InvalidDesign(_))));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let shape = || ElementKind::Shape(ShapeProperties::new(ShapeKind::Rectangle));
        let design = Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
            .with_element(Element::new("a", 0.0, 0.0, 10.0, 10.0, shape()))
            .with_element(Element::new("a", 5.0, 5.0, 10.0, 10.0, shape()));
        assert!(matches!(design.validate(), Err(LabelError::InvalidDesign(_))));
    }

    #[test]
    fn non_positive_label_rejected() {
        let design = Design::new(LabelDimension::new(0.0, 10.0), Dpi::Dpi203);
        assert!(design.validate().is_err());
    }

    #[test]
    fn non_positive_font_metrics_rejected() {
        let with_text = |size: f64, line_height: f64| {
            let mut props = TextProperties::new("x");
            props.font_size = size;
            props.line_height = line_height;
            Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
                .with_element(Element::new("t", 0.0, 0.0, 100.0, 40.0, ElementKind::Text(props)))
        };
        assert!(with_text(24.0, 1.2).validate().is_ok());
        assert!(matches!(with_text(-5.0, 1.2).validate(), Err(LabelError::InvalidDesign(_))));
        assert!(matches!(with_text(24.0, 0.0).validate(), Err(LabelError::InvalidDesign(_))));

        let json = r#"{"label": {"width_mm": 50, "height_mm": 25}, "elements": [
            {"id": "t", "type": "text", "x": 0, "y": 0, "width": 10, "height": 10,
             "properties": {"content": "x", "font_size": -5, "line_height": 0}}]}"#;
        assert!(matches!(Design::from_json(json), Err(LabelError::InvalidDesign(_))));
    }

    #[test]
    fn barcode_text_size_checked_only_when_shown() {
        let mut props = BarcodeProperties::new(Symbology::Code128, "A1");
        props.font_size = 0.0;
        let design = |props: BarcodeProperties| {
            Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
                .with_element(Element::new("b", 0.0, 0.0, 200.0, 80.0, ElementKind::Barcode(props)))
        };
        assert!(design(props.clone()).validate().is_err());
        props.show_text = false;
        assert!(design(props).validate().is_ok());
    }

    #[test]
    fn symbology_aliases() {
        let s: Symbology = serde_json::from_str("\"UPC-A\"").unwrap();
        assert_eq!(s, Symbology::UpcA);
        let s: Symbology = serde_json::from_str("\"QR\"").unwrap();
        assert_eq!(s, Symbology::QrCode);
        assert_eq!(serde_json::to_string(&Symbology::Ean13).unwrap(), "\"EAN13\"");
    }

    #[test]
    fn record_values_stringify() {
        let rec = BatchRecord::new()
            .with("name", "Widget")
            .with("qty", 3)
            .with("price", 9.5)
            .with("gone", Value::Null);
        assert_eq!(rec.get("name").as_deref(), Some("Widget"));
        assert_eq!(rec.get("qty").as_deref(), Some("3"));
        assert_eq!(rec.get("price").as_deref(), Some("9.5"));
        assert_eq!(rec.get("gone"), None);
        assert_eq!(rec.get("missing"), None);
    }

    #[test]
    fn rotation_normalized() {
        let el = Element::new(
            "r",
            0.0,
            0.0,
            1.0,
            1.0,
            ElementKind::Shape(ShapeProperties::new(ShapeKind::Line)),
        )
        .with_rotation(-90.0);
        assert_eq!(el.normalized_rotation(), 270.0);
    }
}
