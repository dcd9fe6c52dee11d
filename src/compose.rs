//! Page composer – one design (plus an optional record) becomes one page.

use serde::{Deserialize, Serialize};

use crate::encoder::DocumentEncoder;
use crate::model::{BatchRecord, ColumnMapping, Design, Element};
use crate::render::{render_element, RenderContext, RenderOutcome};
use crate::substitute::substitute_design;
use crate::units::Dpi;

/// Diagnostic entry for one element on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementReport {
    pub element_id: String,
    pub kind: String,
    pub outcome: RenderOutcome,
}

/// Elements in paint order: ascending `z_index`, ties kept in input order.
pub fn paint_order(elements: &[Element]) -> Vec<&Element> {
    let mut ordered: Vec<&Element> = elements.iter().collect();
    // `sort_by_key` is stable.
    ordered.sort_by_key(|e| e.z_index);
    ordered
}

/// Compose one page into `encoder` and return the per-element outcomes.
///
/// Text is substituted against `record` when one is given. Element
/// failures are recorded in the returned list; composing never fails.
pub fn compose(
    encoder: &mut DocumentEncoder,
    design: &Design,
    dpi: Dpi,
    record: Option<(&BatchRecord, &ColumnMapping)>,
    ctx: &RenderContext<'_>,
) -> Vec<ElementReport> {
    let substituted;
    let design = match record {
        Some((record, mapping)) => {
            substituted = substitute_design(design, record, mapping);
            &substituted
        }
        None => design,
    };

    let (width_pt, height_pt) = design.label.size_pt(dpi);
    let mut canvas = encoder.begin_page(width_pt as f32, height_pt as f32);
    let px_to_pt = dpi.px_to_pt();

    let reports = paint_order(&design.elements)
        .into_iter()
        .map(|element| {
            let outcome = render_element(&mut canvas, encoder, element, px_to_pt, ctx);
            if !outcome.is_rendered() {
                log::debug!("Element '{}' ({}): {:?}", element.id, element.kind.name(), outcome);
            }
            ElementReport {
                element_id: element.id.clone(),
                kind: element.kind.name().to_string(),
                outcome,
            }
        })
        .collect();

    encoder.finish_page(canvas);
    reports
}
