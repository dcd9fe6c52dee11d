//! # label-forge – Label rendering and batch PDF generation
//!
//! This crate turns label designs (positioned text, image, barcode and shape
//! elements on a physical label size) into PDF documents, one page per label.
//! The pipeline stages are:
//!
//! 1. **Substitute** – fill `{{field}}` tokens from a batch record ([`substitute`])
//! 2. **Compose** – order elements and open a page per record ([`compose`])
//! 3. **Render** – draw each element, isolating per-element failures ([`render`])
//! 4. **Encode** – serialise pages into PDF bytes via printpdf ([`encoder`])
//!
//! [`pipeline`] drives single-label and batch jobs end to end. A
//! C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod barcode;
pub mod compose;
pub mod encoder;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod image_source;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod substitute;
pub mod templates;
pub mod units;

// Re-exports for convenience
pub use error::LabelError;
pub use model::{BatchRecord, ColumnMapping, Design, Element, ElementKind};
pub use pipeline::{
    generate_batch, generate_batch_with, generate_label, generate_label_with, CancelToken,
    GeneratedDocument, RenderConfig,
};
pub use render::{BarcodeFallback, RenderOutcome, SkipReason};
pub use units::{Dpi, LabelDimension};
