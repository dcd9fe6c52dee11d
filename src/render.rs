//! Element renderer – turns one [`Element`] into PDF operations on a
//! [`PageCanvas`].
//!
//! Every element is drawn inside its own graphics-state save/restore pair,
//! with opacity and rotation (clockwise, about the element's centre) applied
//! there. A problem with one element is reported as a [`RenderOutcome`] and
//! never stops the page.

use printpdf::*;
use serde::{Deserialize, Serialize};

use crate::barcode::{self, BarcodeError, BarcodeMatrix};
use crate::encoder::{DocumentEncoder, ImageResource, PageCanvas};
use crate::fonts::{split_lines, win_ansi_bytes, FontKey, ASCENDER_RATIO};
use crate::image_source::{classify, parse_data_uri, ImageFetcher, ImageRef};
use crate::model::{
    BarcodeProperties, Color as Rgba, Element, ElementKind, ImageFit, ImageProperties, ShapeKind,
    ShapeProperties, TextAlign, TextProperties,
};

/// Segments used to approximate a circle.
const ELLIPSE_SEGMENTS: usize = 72;

/// Why an element produced no (or only substitute) output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Invisible,
    FetchFailed,
    EmptyValue,
    InvalidValue,
    UnsupportedReference,
    DecodeFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RenderOutcome {
    Rendered,
    Skipped(SkipReason),
    /// The element could not be drawn as authored; a plain-text stand-in
    /// was drawn in its box instead.
    Fallback(SkipReason),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered)
    }
}

/// What to do with a barcode whose value the symbology cannot encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFallback {
    /// Print the raw value as text in the barcode's box.
    #[default]
    PlainText,
    /// Draw nothing.
    Skip,
}

/// Per-job collaborators the renderer needs.
pub struct RenderContext<'a> {
    pub fetcher: &'a dyn ImageFetcher,
    pub barcode_fallback: BarcodeFallback,
}

/// Element box in PDF points, origin bottom-left.
#[derive(Debug, Clone, Copy)]
struct Frame {
    x: f32,
    bottom: f32,
    w: f32,
    h: f32,
}

impl Frame {
    fn new(element: &Element, px_to_pt: f64, page_height: f32) -> Self {
        let s = px_to_pt;
        let h = (element.height * s) as f32;
        let top = page_height - (element.y * s) as f32;
        Self {
            x: (element.x * s) as f32,
            bottom: top - h,
            w: (element.width * s) as f32,
            h,
        }
    }

    fn top(&self) -> f32 {
        self.bottom + self.h
    }

    fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.bottom + self.h / 2.0)
    }
}

/// Drawing produced by one variant, before it is wrapped in a graphics state.
struct Drawing {
    ops: Vec<Op>,
    fill_alpha: f64,
    stroke_alpha: f64,
}

impl Drawing {
    fn opaque(ops: Vec<Op>, opacity: f64) -> Self {
        Self {
            ops,
            fill_alpha: opacity,
            stroke_alpha: opacity,
        }
    }
}

/// Render one element onto `canvas`.
///
/// `px_to_pt` converts the element's pixel geometry into points at the
/// output DPI.
pub fn render_element(
    canvas: &mut PageCanvas,
    encoder: &mut DocumentEncoder,
    element: &Element,
    px_to_pt: f64,
    ctx: &RenderContext<'_>,
) -> RenderOutcome {
    if !element.visible {
        return RenderOutcome::Skipped(SkipReason::Invisible);
    }

    let frame = Frame::new(element, px_to_pt, canvas.height_pt());
    let opacity = element.opacity;

    let (drawing, outcome) = match &element.kind {
        ElementKind::Text(props) => (
            Drawing::opaque(text_ops(frame, props, px_to_pt), opacity),
            RenderOutcome::Rendered,
        ),
        ElementKind::Image(props) => match image_ops(encoder, frame, props, ctx) {
            Ok(ops) => (Drawing::opaque(ops, opacity), RenderOutcome::Rendered),
            Err(reason) => return RenderOutcome::Skipped(reason),
        },
        ElementKind::Barcode(props) => match barcode_ops(frame, props, px_to_pt) {
            Ok(ops) => (Drawing::opaque(ops, opacity), RenderOutcome::Rendered),
            Err(BarcodeError::Empty) => return RenderOutcome::Skipped(SkipReason::EmptyValue),
            Err(BarcodeError::Invalid(msg)) => {
                log::warn!("Barcode '{}' ({}) not encodable: {msg}", element.id, props.symbology);
                match ctx.barcode_fallback {
                    BarcodeFallback::Skip => {
                        return RenderOutcome::Skipped(SkipReason::InvalidValue)
                    }
                    BarcodeFallback::PlainText => (
                        Drawing::opaque(barcode_fallback_ops(frame, props, px_to_pt), opacity),
                        RenderOutcome::Fallback(SkipReason::InvalidValue),
                    ),
                }
            }
        },
        ElementKind::Shape(props) => (
            Drawing {
                ops: shape_ops(frame, props, px_to_pt),
                fill_alpha: if props.fill_opacity > 0.0 {
                    opacity * props.fill_opacity.clamp(0.0, 1.0)
                } else {
                    opacity
                },
                stroke_alpha: opacity,
            },
            RenderOutcome::Rendered,
        ),
    };

    if drawing.ops.is_empty() {
        return outcome;
    }

    canvas.push(Op::SaveGraphicsState);
    if let Some(gs) = encoder.opacity_state(drawing.fill_alpha, drawing.stroke_alpha) {
        canvas.push(Op::LoadGraphicsState { gs });
    }
    if let Some(matrix) = rotation_matrix(frame, element.normalized_rotation()) {
        canvas.push(Op::SetTransformationMatrix { matrix });
    }
    for op in drawing.ops {
        canvas.push(op);
    }
    canvas.push(Op::RestoreGraphicsState);

    outcome
}

/// Clockwise rotation by `degrees` about the frame centre, or `None` for no
/// rotation. PDF user space has y pointing up, so clockwise is a negative
/// mathematical angle.
fn rotation_matrix(frame: Frame, degrees: f64) -> Option<CurTransMat> {
    if degrees == 0.0 {
        return None;
    }
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin() as f32, theta.cos() as f32);
    let (cx, cy) = frame.center();
    // translate(c) · rotate(-θ) · translate(-c)
    let (a, b, c, d) = (cos, -sin, sin, cos);
    let e = cx - a * cx - c * cy;
    let f = cy - b * cx - d * cy;
    Some(CurTransMat::Raw([a, b, c, d, e, f]))
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn pdf_color(c: &Rgba) -> Color {
    Color::Rgb(Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn rect_ring(x: f32, y: f32, w: f32, h: f32) -> PolygonRing {
    PolygonRing {
        points: vec![
            point(x, y),
            point(x + w, y),
            point(x + w, y + h),
            point(x, y + h),
        ],
    }
}

fn ellipse_ring(frame: Frame) -> PolygonRing {
    let (cx, cy) = frame.center();
    let (rx, ry) = (frame.w / 2.0, frame.h / 2.0);
    let points = (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let t = i as f32 / ELLIPSE_SEGMENTS as f32 * std::f32::consts::TAU;
            point(cx + rx * t.cos(), cy + ry * t.sin())
        })
        .collect();
    PolygonRing { points }
}

fn polygon(rings: Vec<PolygonRing>, mode: PaintMode) -> Op {
    Op::DrawPolygon {
        polygon: Polygon {
            rings,
            mode,
            winding_order: WindingOrder::NonZero,
        },
    }
}

fn line_op(x1: f32, y1: f32, x2: f32, y2: f32) -> Op {
    Op::DrawLine {
        line: Line {
            points: vec![point(x1, y1), point(x2, y2)],
            is_closed: false,
        },
    }
}

/// One run of builtin-font text with its baseline origin at `(x, y)`.
fn push_text(ops: &mut Vec<Op>, x: f32, y: f32, font: BuiltinFont, size: f32, color: &Rgba, text: &str) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::SetFillColor {
        col: pdf_color(color),
    });
    // printpdf takes builtin-font text as a `String` and writes its UTF-8
    // bytes unchanged, so bytes 0x80-0xFF cannot go through `TextItem`.
    // The empty run registers the font; the glyphs go out as a hex `Tj`.
    ops.push(Op::WriteTextBuiltinFont {
        items: Vec::new(),
        font,
    });
    ops.push(Op::Unknown {
        key: "Tj".to_string(),
        value: vec![DictItem::String {
            data: win_ansi_bytes(text),
            literal: false,
        }],
    });
    ops.push(Op::EndTextSection);
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

fn text_ops(frame: Frame, props: &TextProperties, px_to_pt: f64) -> Vec<Op> {
    let mut ops = Vec::new();
    if props.content.is_empty() {
        return ops;
    }

    let key = FontKey::new(&props.font_family, props.bold, props.italic);
    let font = key.builtin();
    let size = props.font_size * px_to_pt;
    let line_height = size * props.line_height;
    let lines = split_lines(&props.content);
    let last = lines.len() - 1;

    ops.push(Op::SetLineHeight {
        lh: Pt(line_height as f32),
    });

    for (i, line) in lines.iter().enumerate() {
        let y_offset = i as f64 * line_height;
        // Line-granular clipping: the first line always draws.
        if i > 0 && y_offset + line_height > frame.h as f64 + 0.01 {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let baseline = frame.top() - (y_offset + size * ASCENDER_RATIO) as f32;
        let line_width = key.measure(line, size) as f32;

        let words: Vec<&str> = line.split(' ').filter(|w| !w.is_empty()).collect();
        if props.align == TextAlign::Justify && i != last && words.len() > 1 {
            let widths: Vec<f32> = words.iter().map(|w| key.measure(w, size) as f32).collect();
            let total: f32 = widths.iter().sum();
            let min_gap = key.measure(" ", size) as f32;
            let gap = ((frame.w - total) / (words.len() - 1) as f32).max(min_gap);
            let mut x = frame.x;
            for (word, width) in words.iter().zip(&widths) {
                push_text(&mut ops, x, baseline, font, size as f32, &props.color, word);
                x += width + gap;
            }
        } else {
            let x_offset = match props.align {
                TextAlign::Left | TextAlign::Justify => 0.0,
                TextAlign::Center => (frame.w - line_width) / 2.0,
                TextAlign::Right => frame.w - line_width,
            };
            push_text(&mut ops, frame.x + x_offset, baseline, font, size as f32, &props.color, line);
        }

        if props.underline {
            let underline_y = baseline - (size * 0.1) as f32;
            let (start, width) = match props.align {
                TextAlign::Justify if i != last && words.len() > 1 => (frame.x, frame.w),
                TextAlign::Center => (frame.x + (frame.w - line_width) / 2.0, line_width),
                TextAlign::Right => (frame.x + frame.w - line_width, line_width),
                _ => (frame.x, line_width),
            };
            ops.push(Op::SetOutlineThickness {
                pt: Pt((size * 0.05).max(0.5) as f32),
            });
            ops.push(Op::SetOutlineColor {
                col: pdf_color(&props.color),
            });
            ops.push(line_op(start, underline_y, start + width, underline_y));
        }
    }
    ops
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

fn resolve_image(
    encoder: &mut DocumentEncoder,
    src: &str,
    ctx: &RenderContext<'_>,
) -> Result<ImageResource, SkipReason> {
    if let Some(cached) = encoder.cached_image(src) {
        return cached;
    }

    let bytes = match classify(src) {
        ImageRef::Empty => Err(SkipReason::EmptyValue),
        ImageRef::Unsupported(reference) => {
            log::warn!("Skipping image: unsupported reference {reference:?}");
            Err(SkipReason::UnsupportedReference)
        }
        ImageRef::DataUri(uri) => parse_data_uri(uri).map_err(|e| {
            log::warn!("Skipping image: {e}");
            SkipReason::DecodeFailed
        }),
        ImageRef::Remote(url) => ctx.fetcher.fetch(url).map_err(|e| {
            log::warn!("Skipping image {url}: {e}");
            SkipReason::FetchFailed
        }),
    };

    let outcome = bytes.and_then(|bytes| {
        encoder.register_image(&bytes).map_err(|e| {
            log::warn!("Skipping image: {e}");
            SkipReason::DecodeFailed
        })
    });
    encoder.remember_image(src, outcome.clone());
    outcome
}

fn image_ops(
    encoder: &mut DocumentEncoder,
    frame: Frame,
    props: &ImageProperties,
    ctx: &RenderContext<'_>,
) -> Result<Vec<Op>, SkipReason> {
    let res = resolve_image(encoder, &props.src, ctx)?;
    if res.px_width == 0 || res.px_height == 0 {
        return Err(SkipReason::DecodeFailed);
    }

    let (w, h) = (res.px_width as f32, res.px_height as f32);
    let (draw_w, draw_h) = match props.fit {
        ImageFit::Fill => (frame.w, frame.h),
        ImageFit::Contain => {
            let scale = (frame.w / w).min(frame.h / h);
            (w * scale, h * scale)
        }
    };
    let left = frame.x + (frame.w - draw_w) / 2.0;
    let bottom = frame.bottom + (frame.h - draw_h) / 2.0;

    // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px_dim.
    Ok(vec![Op::UseXobject {
        id: res.xobj_id.clone(),
        transform: XObjectTransform {
            translate_x: Some(Pt(left)),
            translate_y: Some(Pt(bottom)),
            dpi: Some(72.0),
            scale_x: Some(draw_w / w),
            scale_y: Some(draw_h / h),
            rotate: None,
        },
    }])
}

// ---------------------------------------------------------------------------
// Barcode
// ---------------------------------------------------------------------------

fn barcode_ops(frame: Frame, props: &BarcodeProperties, px_to_pt: f64) -> Result<Vec<Op>, BarcodeError> {
    let encoded = barcode::encode(props.symbology, &props.value)?;
    let mut ops = vec![Op::SetFillColor {
        col: pdf_color(&props.color),
    }];

    match &encoded.matrix {
        BarcodeMatrix::Linear(modules) => {
            let font_size = (props.font_size * px_to_pt) as f32;
            let text_band = if props.show_text { font_size * 1.2 } else { 0.0 };
            // Too small for a text band: bars take the whole box.
            let (text_band, show_text) = if text_band >= frame.h {
                (0.0, false)
            } else {
                (text_band, props.show_text)
            };
            let bar_h = frame.h - text_band;
            let module_w = frame.w / modules.len().max(1) as f32;

            let rings: Vec<PolygonRing> = encoded
                .matrix
                .bar_runs()
                .into_iter()
                .map(|(start, len)| {
                    rect_ring(
                        frame.x + start as f32 * module_w,
                        frame.bottom + text_band,
                        len as f32 * module_w,
                        bar_h,
                    )
                })
                .collect();
            if !rings.is_empty() {
                ops.push(polygon(rings, PaintMode::Fill));
            }

            if show_text {
                let key = FontKey::new("Helvetica", false, false);
                let text_w = key.measure(&encoded.human_readable, font_size as f64) as f32;
                let x = frame.x + (frame.w - text_w) / 2.0;
                let y = frame.bottom + (text_band - font_size) / 2.0 + font_size * 0.25;
                push_text(&mut ops, x, y, key.builtin(), font_size, &props.color, &encoded.human_readable);
            }
        }
        BarcodeMatrix::Grid { width, height, .. } => {
            let (cols, rows) = (*width, *height);
            let module = (frame.w / cols.max(1) as f32).min(frame.h / rows.max(1) as f32);
            let left = frame.x + (frame.w - module * cols as f32) / 2.0;
            let top = frame.top() - (frame.h - module * rows as f32) / 2.0;

            let mut rings = Vec::new();
            for y in 0..rows {
                let mut x = 0;
                while x < cols {
                    if !encoded.matrix.is_dark(x, y) {
                        x += 1;
                        continue;
                    }
                    let start = x;
                    while x < cols && encoded.matrix.is_dark(x, y) {
                        x += 1;
                    }
                    rings.push(rect_ring(
                        left + start as f32 * module,
                        top - (y + 1) as f32 * module,
                        (x - start) as f32 * module,
                        module,
                    ));
                }
            }
            if !rings.is_empty() {
                ops.push(polygon(rings, PaintMode::Fill));
            }
        }
    }
    Ok(ops)
}

/// Raw value as text, top-left of the barcode box.
fn barcode_fallback_ops(frame: Frame, props: &BarcodeProperties, px_to_pt: f64) -> Vec<Op> {
    let mut text = TextProperties::new(props.value.clone());
    text.font_size = props.font_size;
    text.color = props.color;
    text_ops(frame, &text, px_to_pt)
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

fn shape_ops(frame: Frame, props: &ShapeProperties, px_to_pt: f64) -> Vec<Op> {
    let mut ops = Vec::new();
    let stroke_width = (props.stroke_width * px_to_pt) as f32;

    match props.kind {
        ShapeKind::Rectangle | ShapeKind::Circle => {
            let ring = || match props.kind {
                ShapeKind::Circle => ellipse_ring(frame),
                _ => rect_ring(frame.x, frame.bottom, frame.w, frame.h),
            };
            if props.fill_opacity > 0.0 {
                ops.push(Op::SetFillColor {
                    col: pdf_color(&props.fill),
                });
                ops.push(polygon(vec![ring()], PaintMode::Fill));
            }
            if props.stroke_width > 0.0 {
                ops.push(Op::SetOutlineColor {
                    col: pdf_color(&props.stroke),
                });
                ops.push(Op::SetOutlineThickness {
                    pt: Pt(stroke_width),
                });
                ops.push(polygon(vec![ring()], PaintMode::Stroke));
            }
        }
        ShapeKind::Line => {
            if props.stroke_width > 0.0 {
                let (_, cy) = frame.center();
                ops.push(Op::SetOutlineColor {
                    col: pdf_color(&props.stroke),
                });
                ops.push(Op::SetOutlineThickness {
                    pt: Pt(stroke_width),
                });
                ops.push(line_op(frame.x, cy, frame.x + frame.w, cy));
            }
        }
    }
    ops
}
