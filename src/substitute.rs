//! `{{name}}` placeholder substitution for batch records.
//!
//! A token is the exact text between `{{` and `}}`: no whitespace trimming,
//! no nesting, no escapes. A token resolves through the column mapping
//! first (`{{field}}` where some column maps to `field`), then as a raw
//! column name. Unresolved tokens are copied through verbatim.
//!
//! Substitution is a single left-to-right pass, so values that themselves
//! contain `{{...}}` are never expanded again.

use std::collections::HashMap;

use crate::model::{BatchRecord, ColumnMapping, Design, ElementKind};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Replace every resolvable `{{name}}` token in `text`.
pub fn substitute(text: &str, record: &BatchRecord, mapping: &ColumnMapping) -> String {
    if !text.contains(OPEN) {
        return text.to_string();
    }

    // field -> column; when several populated columns claim one field, the
    // lowest column name wins (mappings iterate in column-name order).
    let mut by_field: HashMap<&str, &str> = HashMap::new();
    for (column, field) in mapping.iter() {
        if record.get(column).is_some() {
            by_field.entry(field).or_insert(column);
        }
    }

    let resolve = |name: &str| -> Option<String> {
        by_field
            .get(name)
            .and_then(|column| record.get(column))
            .or_else(|| record.get(name))
    };

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let resolved = candidate[OPEN.len()..].find(CLOSE).and_then(|end| {
            let name = &candidate[OPEN.len()..OPEN.len() + end];
            resolve(name).map(|value| (value, OPEN.len() + end + CLOSE.len()))
        });
        match resolved {
            Some((value, consumed)) => {
                out.push_str(&value);
                rest = &candidate[consumed..];
            }
            None => {
                // Not a match here; retry one character later so `{{{a}}}`
                // still finds `{{a}}`.
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Copy of `design` with every text element's content substituted.
/// Other element kinds are passed through unchanged.
pub fn substitute_design(design: &Design, record: &BatchRecord, mapping: &ColumnMapping) -> Design {
    let mut out = design.clone();
    for element in &mut out.elements {
        if let ElementKind::Text(props) = &mut element.kind {
            props.content = substitute(&props.content, record, mapping);
        }
    }
    out
}

/// Names of tokens in `text` that no column or mapped field resolves.
pub fn unresolved_tokens(text: &str, record: &BatchRecord, mapping: &ColumnMapping) -> Vec<String> {
    let mut missing = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        match after.find(CLOSE) {
            Some(end) => {
                let name = &after[..end];
                let token = format!("{OPEN}{name}{CLOSE}");
                if substitute(&token, record, mapping) == token {
                    missing.push(name.to_string());
                }
                rest = &after[end + CLOSE.len()..];
            }
            None => break,
        }
    }
    missing
}
