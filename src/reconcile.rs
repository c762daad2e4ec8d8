use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::color_matrix::ColorMatrix;
use crate::model::BomRecord;
use crate::text::extract_cc_number;

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit run pattern"));
static TRAILING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*$").expect("trailing digits pattern"));

/// Repair color headers truncated by narrow PDF columns: a header with no
/// complete CC number whose trailing digit run is a strict prefix of a
/// canonical CC number is replaced by the canonical list's full header text,
/// everywhere it appears. Headers that already carry a complete CC number
/// are left alone, since text-derived canonical entries can themselves carry
/// cell-merge artifacts. Idempotent; never changes record count or identity
/// keys. Returns the number of headers replaced.
pub fn reconcile_headers(
    header_order: &mut Vec<String>,
    matrix: &ColorMatrix,
    records: &mut [BomRecord],
) -> usize {
    if matrix.is_empty() || header_order.is_empty() {
        return 0;
    }

    let canonical_by_cc: Vec<(String, &String)> = matrix
        .headers()
        .iter()
        .filter_map(|header| extract_cc_number(header).map(|cc| (cc, header)))
        .collect();
    if canonical_by_cc.is_empty() {
        return 0;
    }

    let mut replacements: Vec<(String, String)> = Vec::new();
    for header in header_order.iter() {
        if has_complete_cc_number(header) {
            continue;
        }
        let Some(partial) = trailing_digit_run(header) else {
            continue;
        };
        if let Some((_, full)) = canonical_by_cc
            .iter()
            .find(|(cc, _)| cc.starts_with(&partial) && partial.len() < cc.len())
        {
            replacements.push((header.clone(), (*full).clone()));
        }
    }
    if replacements.is_empty() {
        return 0;
    }

    for (old, new) in &replacements {
        debug!(old = %old, new = %new, "reconciling truncated color header");
        let existing = header_order.iter().position(|header| header == new);
        if let Some(position) = header_order.iter().position(|header| header == old) {
            match existing {
                // Collision with an already-present header: keep the first
                // occurrence so the order stays duplicate-free.
                Some(_) => {
                    header_order.remove(position);
                }
                None => header_order[position] = new.clone(),
            }
        }
    }

    for record in records.iter_mut() {
        for (old, new) in &replacements {
            if let Some(value) = record.colors.shift_remove(old) {
                let keep_existing = record
                    .colors
                    .get(new)
                    .is_some_and(|existing| !existing.is_empty());
                if !keep_existing {
                    record.colors.insert(new.clone(), value);
                }
            }
            if let Some(bytes) = record.color_images.shift_remove(old) {
                record.color_images.entry(new.clone()).or_insert(bytes);
            }
        }
    }

    replacements.len()
}

/// A complete CC number is a maximal digit run of >=9 digits.
fn has_complete_cc_number(header: &str) -> bool {
    DIGIT_RUN.find_iter(header).any(|run| run.as_str().len() >= 9)
}

fn trailing_digit_run(header: &str) -> Option<String> {
    let flattened = header.replace('\n', " ");
    TRAILING_DIGITS
        .captures(&flattened)
        .map(|captures| captures[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BomRecord;

    fn matrix() -> ColorMatrix {
        ColorMatrix::new(vec![
            "Seasalt Blue\n234567891011".to_string(),
            "Crimson Red\n000987654321".to_string(),
        ])
    }

    #[test]
    fn truncated_header_is_replaced_everywhere() {
        // 8 visible digits, a cut of the 12-digit canonical code.
        let mut order = vec!["Seasalt B 23456789".to_string()];
        let mut record = BomRecord::default();
        record.colors.insert("Seasalt B 23456789".to_string(), "X".to_string());

        let replaced = reconcile_headers(&mut order, &matrix(), std::slice::from_mut(&mut record));
        assert_eq!(replaced, 1);
        assert_eq!(order, vec!["Seasalt Blue\n234567891011".to_string()]);
        assert_eq!(
            record.colors.get("Seasalt Blue\n234567891011"),
            Some(&"X".to_string())
        );
        assert!(record.colors.get("Seasalt B 23456789").is_none());
    }

    #[test]
    fn complete_cc_numbers_are_never_replaced() {
        let mut order = vec!["Odd Name\n234567891011".to_string()];
        let replaced = reconcile_headers(&mut order, &matrix(), &mut []);
        assert_eq!(replaced, 0);
        assert_eq!(order, vec!["Odd Name\n234567891011".to_string()]);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let mut order = vec!["Seasalt B 23456789".to_string(), "Other 55".to_string()];
        let mut records = vec![BomRecord::default()];
        records[0]
            .colors
            .insert("Seasalt B 23456789".to_string(), "X".to_string());

        reconcile_headers(&mut order, &matrix(), &mut records);
        let order_after_one = order.clone();
        let colors_after_one = records[0].colors.clone();

        let replaced_again = reconcile_headers(&mut order, &matrix(), &mut records);
        assert_eq!(replaced_again, 0);
        assert_eq!(order, order_after_one);
        assert_eq!(records[0].colors, colors_after_one);
    }

    #[test]
    fn collision_keeps_first_occurrence_and_merges_values() {
        let mut order = vec![
            "Seasalt Blue\n234567891011".to_string(),
            "Seasalt B 23456789".to_string(),
        ];
        let mut record = BomRecord::default();
        record
            .colors
            .insert("Seasalt Blue\n234567891011".to_string(), String::new());
        record.colors.insert("Seasalt B 23456789".to_string(), "X".to_string());

        reconcile_headers(&mut order, &matrix(), std::slice::from_mut(&mut record));
        assert_eq!(order, vec!["Seasalt Blue\n234567891011".to_string()]);
        // Truncated entry's non-empty value wins over the empty existing one.
        assert_eq!(
            record.colors.get("Seasalt Blue\n234567891011"),
            Some(&"X".to_string())
        );
        assert_eq!(record.colors.len(), 1);
    }

    #[test]
    fn headers_without_trailing_digits_are_untouched() {
        let mut order = vec!["Just A Name".to_string()];
        assert_eq!(reconcile_headers(&mut order, &matrix(), &mut []), 0);
        assert_eq!(order, vec!["Just A Name".to_string()]);
    }
}
