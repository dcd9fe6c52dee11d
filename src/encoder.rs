//! Document encoder – an append-only page stream backed by `printpdf`.
//!
//! Pages are opened with [`DocumentEncoder::begin_page`], drawn into as a
//! [`PageCanvas`] and appended with [`DocumentEncoder::finish_page`]. Shared
//! resources (image XObjects, opacity graphics states) are registered once
//! per document and referenced from any page.
//!
//! `printpdf` serialises the whole document in `save`, so finished pages are
//! kept as operation lists until [`DocumentEncoder::finalize`].

use std::collections::HashMap;
use std::io::Write;

use printpdf::*;

use crate::error::LabelError;
use crate::render::SkipReason;
use crate::units::points_to_mm;

/// A registered image XObject together with the pixel dimensions of the
/// source image.
#[derive(Debug, Clone)]
pub struct ImageResource {
    pub xobj_id: XObjectId,
    pub px_width: u32,
    pub px_height: u32,
}

/// One page being drawn. Coordinates handed to it are PDF points with the
/// origin at the bottom-left.
#[derive(Debug)]
pub struct PageCanvas {
    width_pt: f32,
    height_pt: f32,
    ops: Vec<Op>,
}

impl PageCanvas {
    pub fn width_pt(&self) -> f32 {
        self.width_pt
    }

    pub fn height_pt(&self) -> f32 {
        self.height_pt
    }

    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }
}

pub struct DocumentEncoder {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    images: HashMap<String, Result<ImageResource, SkipReason>>,
    graphics_states: HashMap<(u16, u16), ExtendedGraphicsStateId>,
}

impl DocumentEncoder {
    pub fn open(title: &str) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            images: HashMap::new(),
            graphics_states: HashMap::new(),
        }
    }

    pub fn begin_page(&self, width_pt: f32, height_pt: f32) -> PageCanvas {
        PageCanvas {
            width_pt,
            height_pt,
            ops: Vec::new(),
        }
    }

    pub fn finish_page(&mut self, canvas: PageCanvas) {
        let w = Mm(points_to_mm(canvas.width_pt as f64) as f32);
        let h = Mm(points_to_mm(canvas.height_pt as f64) as f32);
        self.pages.push(PdfPage::new(w, h, canvas.ops));
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Previously resolved image for `src`, including a memoised failure.
    pub fn cached_image(&self, src: &str) -> Option<Result<ImageResource, SkipReason>> {
        self.images.get(src).cloned()
    }

    /// Remember the outcome of resolving `src` so later pages reuse it.
    pub fn remember_image(&mut self, src: &str, outcome: Result<ImageResource, SkipReason>) {
        self.images.insert(src.to_string(), outcome);
    }

    /// Decode image bytes and register them as a reusable XObject.
    pub fn register_image(&mut self, bytes: &[u8]) -> Result<ImageResource, String> {
        // Decode with the `image` crate to obtain pixel dimensions.
        let dyn_img =
            ::image::load_from_memory(bytes).map_err(|e| format!("decode error: {e}"))?;
        let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

        let mut warnings = Vec::new();
        let raw = RawImage::decode_from_bytes(bytes, &mut warnings)
            .map_err(|e| format!("PDF encode error: {e}"))?;
        let xobj_id = self.doc.add_image(&raw);

        Ok(ImageResource {
            xobj_id,
            px_width,
            px_height,
        })
    }

    /// Graphics state carrying the given fill/stroke alpha, or `None` when
    /// both are fully opaque. States are shared across pages.
    pub fn opacity_state(&mut self, fill_alpha: f64, stroke_alpha: f64) -> Option<ExtendedGraphicsStateId> {
        let q = |a: f64| (a.clamp(0.0, 1.0) * 1000.0).round() as u16;
        let key = (q(fill_alpha), q(stroke_alpha));
        if key == (1000, 1000) {
            return None;
        }
        if let Some(id) = self.graphics_states.get(&key) {
            return Some(id.clone());
        }
        // printpdf 0.8 writes `current_fill_alpha` as /CA (stroking) and
        // `current_stroke_alpha` as /ca (non-stroking), so the setters are
        // crossed here to land each alpha on the intended PDF key.
        let gs = ExtendedGraphicsState::default()
            .with_current_fill_alpha(key.1 as f32 / 1000.0)
            .with_current_stroke_alpha(key.0 as f32 / 1000.0);
        let id = self.doc.add_graphics_state(gs);
        self.graphics_states.insert(key, id.clone());
        Some(id)
    }

    /// Serialise every appended page into PDF bytes.
    pub fn finalize(mut self) -> Result<Vec<u8>, LabelError> {
        if self.pages.is_empty() {
            return Err(LabelError::EncoderFailure(
                "document has no pages".to_string(),
            ));
        }
        let pages = std::mem::take(&mut self.pages);
        self.doc.with_pages(pages);

        // Text runs are emitted as raw `Tj` operators, which printpdf drops
        // from the content stream unless `secure` is off.
        let options = PdfSaveOptions {
            secure: false,
            ..PdfSaveOptions::default()
        };
        let mut warnings = Vec::new();
        let bytes = self.doc.save(&options, &mut warnings);
        if !bytes.starts_with(b"%PDF-") {
            return Err(LabelError::EncoderFailure(
                "serialised document is missing the PDF header".to_string(),
            ));
        }
        Ok(bytes)
    }

    /// Finalise and write the document to `out`. Nothing is written unless
    /// serialisation succeeded.
    pub fn finalize_into<W: Write>(self, out: &mut W) -> Result<usize, LabelError> {
        let bytes = self.finalize()?;
        out.write_all(&bytes)
            .and_then(|_| out.flush())
            .map_err(|e| LabelError::EncoderFailure(format!("write failed: {e}")))?;
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_an_encoder_failure() {
        let enc = DocumentEncoder::open("empty");
        assert!(matches!(enc.finalize(), Err(LabelError::EncoderFailure(_))));
    }

    #[test]
    fn blank_pages_serialise() {
        let mut enc = DocumentEncoder::open("blank");
        for _ in 0..3 {
            let page = enc.begin_page(288.0, 432.0);
            enc.finish_page(page);
        }
        assert_eq!(enc.page_count(), 3);
        let bytes = enc.finalize().unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn opaque_state_is_not_registered() {
        let mut enc = DocumentEncoder::open("gs");
        assert!(enc.opacity_state(1.0, 1.0).is_none());
        let a = enc.opacity_state(0.5, 1.0).unwrap();
        let b = enc.opacity_state(0.5, 1.0).unwrap();
        assert_eq!(a, b);
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn saved_with_state(fill_alpha: f64, stroke_alpha: f64) -> Vec<u8> {
        let mut enc = DocumentEncoder::open("alpha");
        let gs = enc.opacity_state(fill_alpha, stroke_alpha).unwrap();
        let mut page = enc.begin_page(100.0, 100.0);
        page.push(Op::SaveGraphicsState);
        page.push(Op::LoadGraphicsState { gs });
        page.push(Op::RestoreGraphicsState);
        enc.finish_page(page);
        enc.finalize().unwrap()
    }

    #[test]
    fn fill_alpha_is_written_as_non_stroking_alpha() {
        let bytes = saved_with_state(0.25, 1.0);
        assert!(contains(&bytes, b"/ca 0.25"), "fill alpha must be /ca");
        assert!(!contains(&bytes, b"/CA 0.25"), "fill alpha leaked onto the stroke");
    }

    #[test]
    fn stroke_alpha_is_written_as_stroking_alpha() {
        let bytes = saved_with_state(1.0, 0.75);
        assert!(contains(&bytes, b"/CA 0.75"));
        assert!(!contains(&bytes, b"/ca 0.75"));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_errors_become_encoder_failures() {
        let mut enc = DocumentEncoder::open("io");
        let page = enc.begin_page(100.0, 100.0);
        enc.finish_page(page);
        let err = enc.finalize_into(&mut FailingWriter).unwrap_err();
        assert!(matches!(err, LabelError::EncoderFailure(_)));
    }

    #[test]
    fn invalid_image_bytes_fail_registration() {
        let mut enc = DocumentEncoder::open("img");
        assert!(enc.register_image(b"not an image").is_err());
    }
}
