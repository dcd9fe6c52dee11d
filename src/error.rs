//! Error types for job-level failures.
//!
//! Per-element problems are not errors: they surface as
//! [`RenderOutcome`](crate::render::RenderOutcome) values in the report.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabelError {
    /// The design (or its batch input) is structurally malformed.
    #[error("Invalid design: {0}")]
    InvalidDesign(String),

    /// A batch job was started with no records.
    #[error("Batch contains no records")]
    EmptyBatch,

    /// The caller-supplied record cap was exceeded. Raised before any page
    /// is composed.
    #[error("Batch of {records} records exceeds the limit of {max}")]
    BatchTooLarge { records: usize, max: usize },

    /// The output document could not be opened, finalised or written.
    #[error("Document encoder failure: {0}")]
    EncoderFailure(String),

    /// The job was cancelled between records.
    #[error("Generation cancelled after {completed} page(s)")]
    Cancelled { completed: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
