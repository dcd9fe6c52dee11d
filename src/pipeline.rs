//! Pipeline – ties together substitution, composition and encoding into a
//! single function call, for one design or a batch of records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compose::{compose, ElementReport};
use crate::encoder::DocumentEncoder;
use crate::error::LabelError;
use crate::image_source::{HttpFetcher, ImageFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IMAGE_BYTES};
use crate::model::{BatchRecord, ColumnMapping, Design};
use crate::render::{BarcodeFallback, RenderContext, RenderOutcome};
use crate::units::Dpi;

/// Configuration for a generation job.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Document title embedded in the PDF metadata (default: "label-forge output").
    pub title: String,
    /// Output DPI. `None` uses the design's reference DPI.
    pub dpi: Option<Dpi>,
    /// Upper bound on batch size. Exceeding it fails before any page is composed.
    pub max_records: Option<usize>,
    /// Per-image fetch timeout (default: 5 s).
    pub fetch_timeout: Duration,
    /// Largest accepted remote image body (default: 10 MiB).
    pub max_image_bytes: u64,
    pub barcode_fallback: BarcodeFallback,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: "label-forge output".to_string(),
            dpi: None,
            max_records: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            barcode_fallback: BarcodeFallback::PlainText,
        }
    }
}

impl RenderConfig {
    /// DPI used for `design`.
    pub fn output_dpi(&self, design: &Design) -> Dpi {
        self.dpi.unwrap_or(design.reference_dpi)
    }

    /// The default HTTP fetcher for this configuration.
    pub fn fetcher(&self) -> HttpFetcher {
        HttpFetcher::new(self.fetch_timeout, self.max_image_bytes)
    }
}

/// Cooperative cancellation flag, checked between records.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Diagnostics for one output page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub page_index: usize,
    /// Index into the input records, `None` in single-design mode.
    pub record_index: Option<usize>,
    pub elements: Vec<ElementReport>,
}

impl PageReport {
    pub fn skipped(&self) -> impl Iterator<Item = &ElementReport> {
        self.elements.iter().filter(|e| !e.outcome.is_rendered())
    }
}

/// A finished document plus its per-page diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub pages: Vec<PageReport>,
}

impl GeneratedDocument {
    /// Number of elements that were skipped or replaced by a fallback.
    pub fn skipped_count(&self) -> usize {
        self.pages.iter().map(|p| p.skipped().count()).sum()
    }

    /// Outcome of element `element_id` on page `page_index`.
    pub fn outcome(&self, page_index: usize, element_id: &str) -> Option<RenderOutcome> {
        self.pages
            .get(page_index)?
            .elements
            .iter()
            .find(|e| e.element_id == element_id)
            .map(|e| e.outcome)
    }

    /// The diagnostic report (without the PDF bytes) as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Single-design mode: one page, text used verbatim.
pub fn generate_label(design: &Design, config: &RenderConfig) -> Result<GeneratedDocument, LabelError> {
    let fetcher = config.fetcher();
    generate_label_with(design, config, &fetcher)
}

/// [`generate_label`] with a caller-supplied image fetcher.
pub fn generate_label_with(
    design: &Design,
    config: &RenderConfig,
    fetcher: &dyn ImageFetcher,
) -> Result<GeneratedDocument, LabelError> {
    design.validate()?;
    let dpi = config.output_dpi(design);
    let ctx = RenderContext {
        fetcher,
        barcode_fallback: config.barcode_fallback,
    };

    let mut encoder = DocumentEncoder::open(&config.title);
    let elements = compose(&mut encoder, design, dpi, None, &ctx);
    let bytes = encoder.finalize()?;

    log::info!("Generated label: {} bytes at {} dpi", bytes.len(), dpi.value());
    Ok(GeneratedDocument {
        bytes,
        page_count: 1,
        pages: vec![PageReport {
            page_index: 0,
            record_index: None,
            elements,
        }],
    })
}

/// Batch mode: one page per record, in record order.
pub fn generate_batch(
    design: &Design,
    records: &[BatchRecord],
    mapping: &ColumnMapping,
    config: &RenderConfig,
) -> Result<GeneratedDocument, LabelError> {
    let fetcher = config.fetcher();
    generate_batch_with(design, records, mapping, config, &fetcher, &CancelToken::new())
}

/// [`generate_batch`] with a caller-supplied image fetcher and cancellation
/// token.
///
/// Fails with `EmptyBatch` for zero records and with `BatchTooLarge` before
/// composing anything when `config.max_records` is exceeded. Cancellation is
/// checked before each record and returns `Cancelled` without bytes.
pub fn generate_batch_with(
    design: &Design,
    records: &[BatchRecord],
    mapping: &ColumnMapping,
    config: &RenderConfig,
    fetcher: &dyn ImageFetcher,
    cancel: &CancelToken,
) -> Result<GeneratedDocument, LabelError> {
    if records.is_empty() {
        return Err(LabelError::EmptyBatch);
    }
    if let Some(max) = config.max_records {
        if records.len() > max {
            return Err(LabelError::BatchTooLarge {
                records: records.len(),
                max,
            });
        }
    }
    design.validate()?;

    let dpi = config.output_dpi(design);
    let ctx = RenderContext {
        fetcher,
        barcode_fallback: config.barcode_fallback,
    };

    let mut encoder = DocumentEncoder::open(&config.title);
    let mut pages = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        if cancel.is_cancelled() {
            log::info!("Batch cancelled after {index} of {} records", records.len());
            return Err(LabelError::Cancelled { completed: index });
        }
        let elements = compose(&mut encoder, design, dpi, Some((record, mapping)), &ctx);
        log::debug!("Composed record {index} ({} elements)", elements.len());
        pages.push(PageReport {
            page_index: index,
            record_index: Some(index),
            elements,
        });
    }

    let page_count = encoder.page_count();
    let bytes = encoder.finalize()?;
    let document = GeneratedDocument {
        bytes,
        page_count,
        pages,
    };

    log::info!(
        "Generated batch: {} pages, {} bytes, {} skipped elements",
        document.page_count,
        document.bytes.len(),
        document.skipped_count()
    );
    Ok(document)
}
