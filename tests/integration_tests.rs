//! Integration tests for the label-forge pipeline.
//!
//! These tests validate:
//! - Single labels and batches produce valid PDFs with one page per record
//! - Per-element failures stay isolated to their element
//! - Page geometry follows the mm → px → pt conversion
//! - Page content is deterministic for identical input

use std::sync::atomic::{AtomicUsize, Ordering};

use sha2::{Digest, Sha256};

use label_forge::compose::paint_order;
use label_forge::encoder::DocumentEncoder;
use label_forge::image_source::{ImageFetcher, NoFetch};
use label_forge::model::{ImageFit, ImageProperties, TextProperties};
use label_forge::render::{render_element, RenderContext};
use label_forge::templates;
use label_forge::units::{mm_to_pixels, pixels_to_mm};
use label_forge::{
    generate_batch_with, generate_label_with, BarcodeFallback, BatchRecord, CancelToken,
    ColumnMapping, Design, Dpi, Element, ElementKind, LabelDimension, LabelError, RenderConfig,
    RenderOutcome, SkipReason,
};

// =====================================================================
// Helper
// =====================================================================

fn default_config() -> RenderConfig {
    RenderConfig::default()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn design(json: &str) -> Design {
    Design::from_json(json).unwrap()
}

fn numbered_records(n: usize) -> Vec<BatchRecord> {
    (0..n)
        .map(|i| BatchRecord::new().with("product_name", format!("Item {i}")).with("price", i as f64 * 1.5))
        .collect()
}

fn batch(design: &Design, records: &[BatchRecord], fetcher: &dyn ImageFetcher) -> label_forge::GeneratedDocument {
    generate_batch_with(design, records, &ColumnMapping::new(), &default_config(), fetcher, &CancelToken::new())
        .unwrap()
}

/// Fetcher that counts calls and always fails, like an unreachable host.
#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

impl ImageFetcher for CountingFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(format!("connection refused: {url}"))
    }
}

/// Fetcher that serves the same tiny PNG for every URL.
struct StaticFetcher;

impl ImageFetcher for StaticFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, String> {
        let uri = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";
        label_forge::image_source::parse_data_uri(&format!("data:image/png;base64,{uri}"))
    }
}

fn remote_image(id: &str, url: &str) -> Element {
    Element::new(
        id,
        0.0,
        0.0,
        200.0,
        100.0,
        ElementKind::Image(ImageProperties {
            src: url.to_string(),
            fit: ImageFit::Fill,
        }),
    )
}

// =====================================================================
// Dimension conversion
// =====================================================================

#[test]
fn four_by_six_at_203_dpi() {
    assert_eq!(mm_to_pixels(101.6, 203.0), 812);
    assert_eq!(mm_to_pixels(152.4, 203.0), 1218);
    let label = LabelDimension::shipping_4x6();
    assert_eq!(label.width_px(Dpi::Dpi203), 812);
    assert_eq!(label.height_px(Dpi::Dpi300), 1800);
}

#[test]
fn pixel_round_trip_is_within_one_dot() {
    for dpi in [203.0, 300.0] {
        let mut mm = 0.5;
        while mm < 400.0 {
            let back = pixels_to_mm(mm_to_pixels(mm, dpi) as f64, dpi);
            assert!((back - mm).abs() <= 25.4 / dpi, "{mm} mm at {dpi} dpi came back as {back}");
            mm += 3.7;
        }
    }
}

// =====================================================================
// Single-label generation
// =====================================================================

#[test]
fn generate_label_from_minimal_template() {
    let doc = generate_label_with(&design(templates::minimal_template()), &default_config(), &NoFetch).unwrap();
    assert_valid_pdf(&doc.bytes);
    assert_eq!(doc.page_count, 1);
}

#[test]
fn all_templates_render_successfully() {
    let templates: Vec<(&str, &str)> = vec![
        ("shipping", templates::shipping_label_template()),
        ("product", templates::product_label_template()),
        ("asset", templates::asset_tag_template()),
        ("all_elements", templates::all_elements_template()),
        ("minimal", templates::minimal_template()),
    ];

    for (name, json) in templates {
        let result = generate_label_with(&design(json), &default_config(), &NoFetch);
        assert!(result.is_ok(), "Template '{}' failed: {:?}", name, result.err());
        let doc = result.unwrap();
        assert_valid_pdf(&doc.bytes);
    }
}

#[test]
fn all_elements_outcomes() {
    let doc = generate_label_with(&design(templates::all_elements_template()), &default_config(), &NoFetch).unwrap();
    for id in ["title", "body", "logo", "code39", "ean8", "upce", "aztec", "badge", "dot"] {
        assert_eq!(doc.outcome(0, id), Some(RenderOutcome::Rendered), "element {id}");
    }
    assert_eq!(doc.outcome(0, "draft"), Some(RenderOutcome::Skipped(SkipReason::Invisible)));
    assert_eq!(doc.skipped_count(), 1);
}

#[test]
fn output_dpi_overrides_reference_dpi() {
    let design = design(templates::minimal_template());
    let config = RenderConfig {
        dpi: Some(Dpi::Dpi300),
        ..default_config()
    };
    let doc = generate_label_with(&design, &config, &NoFetch).unwrap();
    assert_valid_pdf(&doc.bytes);
}

// =====================================================================
// Batch generation
// =====================================================================

#[test]
fn batch_page_count_equals_record_count() {
    let design = design(templates::product_label_template());
    for n in [1, 3, 1000] {
        let doc = batch(&design, &numbered_records(n), &NoFetch);
        assert_valid_pdf(&doc.bytes);
        assert_eq!(doc.page_count, n);
        assert_eq!(doc.pages.len(), n);
        for (i, page) in doc.pages.iter().enumerate() {
            assert_eq!(page.record_index, Some(i), "pages must follow record order");
        }
    }
}

#[test]
fn product_batch_with_column_mapping() {
    let design = design(templates::product_label_template());
    let records = BatchRecord::list_from_json(templates::product_records()).unwrap();
    let mapping = ColumnMapping::from_json(templates::product_column_mapping()).unwrap();
    let doc = generate_batch_with(&design, &records, &mapping, &default_config(), &NoFetch, &CancelToken::new())
        .unwrap();
    assert_eq!(doc.page_count, records.len());
    assert_eq!(doc.skipped_count(), 0);
}

#[test]
fn unreachable_image_is_isolated() {
    let design = Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
        .with_element(remote_image("logo", "http://127.0.0.1:9/logo.png"));
    let fetcher = CountingFetcher::default();
    let doc = batch(&design, &numbered_records(4), &fetcher);

    assert_valid_pdf(&doc.bytes);
    assert_eq!(doc.page_count, 4);
    for page in 0..4 {
        assert_eq!(doc.outcome(page, "logo"), Some(RenderOutcome::Skipped(SkipReason::FetchFailed)));
    }
    // The failure is remembered for the rest of the document.
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn real_http_timeout_degrades_to_skip() {
    let design = Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
        .with_element(remote_image("logo", "http://127.0.0.1:9/logo.png"));
    let config = RenderConfig {
        fetch_timeout: std::time::Duration::from_millis(500),
        ..default_config()
    };
    let doc = label_forge::generate_batch(&design, &numbered_records(2), &ColumnMapping::new(), &config).unwrap();
    assert_eq!(doc.page_count, 2);
    assert_eq!(doc.outcome(1, "logo"), Some(RenderOutcome::Skipped(SkipReason::FetchFailed)));
}

#[test]
fn fetched_image_is_registered_once() {
    let design = Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
        .with_element(remote_image("logo", "https://cdn.example.com/logo.png"));
    let doc = batch(&design, &numbered_records(3), &StaticFetcher);
    assert_eq!(doc.outcome(2, "logo"), Some(RenderOutcome::Rendered));
}

#[test]
fn storage_path_is_unsupported_reference() {
    let design = Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
        .with_element(remote_image("logo", "designs/7f3a/logo.png"));
    let doc = batch(&design, &numbered_records(1), &NoFetch);
    assert_eq!(doc.outcome(0, "logo"), Some(RenderOutcome::Skipped(SkipReason::UnsupportedReference)));
}

#[test]
fn barcode_fallback_policies() {
    let design = Design::from_json(
        r#"{"label": {"width_mm": 50.8, "height_mm": 25.4}, "elements": [
            {"id": "ean", "type": "barcode", "x": 10, "y": 10, "width": 300, "height": 120,
             "properties": {"symbology": "EAN13", "value": "4006381333932"}}]}"#,
    )
    .unwrap();

    let doc = batch(&design, &numbered_records(1), &NoFetch);
    assert_eq!(doc.outcome(0, "ean"), Some(RenderOutcome::Fallback(SkipReason::InvalidValue)));

    let strict = RenderConfig {
        barcode_fallback: BarcodeFallback::Skip,
        ..default_config()
    };
    let doc = generate_batch_with(&design, &numbered_records(1), &ColumnMapping::new(), &strict, &NoFetch, &CancelToken::new())
        .unwrap();
    assert_eq!(doc.outcome(0, "ean"), Some(RenderOutcome::Skipped(SkipReason::InvalidValue)));
    assert_valid_pdf(&doc.bytes);
}

#[test]
fn batch_cap_fails_before_composing() {
    let fetcher = CountingFetcher::default();
    let design = Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
        .with_element(remote_image("logo", "https://cdn.example.com/logo.png"));
    let config = RenderConfig {
        max_records: Some(10),
        ..default_config()
    };
    let result = generate_batch_with(&design, &numbered_records(11), &ColumnMapping::new(), &config, &fetcher, &CancelToken::new());
    assert!(matches!(result, Err(LabelError::BatchTooLarge { records: 11, max: 10 })));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0, "no page may be composed");
}

#[test]
fn empty_batch_is_an_error() {
    let design = design(templates::minimal_template());
    let result = generate_batch_with(&design, &[], &ColumnMapping::new(), &default_config(), &NoFetch, &CancelToken::new());
    assert!(matches!(result, Err(LabelError::EmptyBatch)));
}

/// Cancels the job the first time an image is fetched, i.e. while the
/// first record is being composed.
struct CancelOnFetch(CancelToken);

impl ImageFetcher for CancelOnFetch {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, String> {
        self.0.cancel();
        Err("cancelled".to_string())
    }
}

#[test]
fn cancellation_between_records() {
    let cancel = CancelToken::new();
    let design = Design::new(LabelDimension::label_2x1(), Dpi::Dpi203)
        .with_element(remote_image("logo", "https://cdn.example.com/logo.png"));
    let fetcher = CancelOnFetch(cancel.clone());
    let result = generate_batch_with(&design, &numbered_records(5), &ColumnMapping::new(), &default_config(), &fetcher, &cancel);
    // The page in flight completes; the next record observes the flag.
    assert!(matches!(result, Err(LabelError::Cancelled { completed: 1 })));
}

#[test]
fn concurrent_jobs_are_independent() {
    let design = design(templates::shipping_label_template());
    let records = BatchRecord::list_from_json(templates::shipping_records()).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| batch(&design, &records, &NoFetch)))
            .collect();
        for handle in handles {
            let doc = handle.join().unwrap();
            assert_valid_pdf(&doc.bytes);
            assert_eq!(doc.page_count, records.len());
        }
    });
}

// =====================================================================
// Report
// =====================================================================

#[test]
fn report_json_lists_every_element() {
    let design = design(templates::shipping_label_template());
    let records = BatchRecord::list_from_json(templates::shipping_records()).unwrap();
    let doc = batch(&design, &records, &NoFetch);
    let report: serde_json::Value = serde_json::from_str(&doc.to_json()).unwrap();

    assert_eq!(report["page_count"], 3);
    let elements = report["pages"][0]["elements"].as_array().unwrap();
    assert_eq!(elements.len(), design.elements.len());
    assert!(elements.iter().all(|e| e["outcome"]["status"] == "rendered"));
}

// =====================================================================
// Golden-sample stability test
// =====================================================================

fn page_digest(design: &Design, record: Option<&BatchRecord>) -> String {
    let design = match record {
        Some(r) => label_forge::substitute::substitute_design(design, r, &ColumnMapping::new()),
        None => design.clone(),
    };
    let dpi = design.reference_dpi;
    let ctx = RenderContext {
        fetcher: &NoFetch,
        barcode_fallback: BarcodeFallback::PlainText,
    };
    let mut encoder = DocumentEncoder::open("digest");
    let (w, h) = design.label.size_pt(dpi);
    let mut canvas = encoder.begin_page(w as f32, h as f32);
    for element in paint_order(&design.elements) {
        render_element(&mut canvas, &mut encoder, element, dpi.px_to_pt(), &ctx);
    }
    let digest = Sha256::digest(format!("{:?}", canvas.ops()).as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[test]
fn page_content_is_deterministic() {
    // printpdf embeds timestamps and random resource ids in the file, so
    // compare the content of pages that reference no shared resources.
    let design = design(templates::shipping_label_template());
    let records = BatchRecord::list_from_json(templates::shipping_records()).unwrap();
    for record in &records {
        assert_eq!(page_digest(&design, Some(record)), page_digest(&design, Some(record)));
    }
}

#[test]
fn different_records_give_different_pages() {
    let design = design(templates::product_label_template());
    let a = BatchRecord::new().with("product_name", "Widget");
    let b = BatchRecord::new().with("product_name", "Gadget");
    assert_ne!(page_digest(&design, Some(&a)), page_digest(&design, Some(&b)));
    assert_eq!(page_digest(&design, Some(&a)), page_digest(&design, Some(&a.clone())));
}

#[test]
fn zero_rotation_is_identical_to_unrotated() {
    let base = Design::new(LabelDimension::label_4x3(), Dpi::Dpi203).with_element(Element::new(
        "t",
        40.0,
        40.0,
        300.0,
        80.0,
        ElementKind::Text(TextProperties::new("Rotate me")),
    ));
    let mut rotated = base.clone();
    rotated.elements[0].rotation = 0.0;
    assert_eq!(page_digest(&base, None), page_digest(&rotated, None));

    rotated.elements[0].rotation = 90.0;
    assert_ne!(page_digest(&base, None), page_digest(&rotated, None));
}
