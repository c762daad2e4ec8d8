use std::sync::LazyLock;

use regex::Regex;

use crate::color_matrix::ColorMatrix;
use crate::text::{clean_text, extract_cc_number, format_color_header, normalize_label};

/// Structural (non-color) column labels in their alnum-normalized form.
const STRUCTURAL_LABELS: &[&str] = &[
    "product",
    "materialname",
    "supplierarticlenumber",
    "usage",
    "qualitydetails",
    "supplierallocate",
    "supplier",
    "comment",
    "image",
    "primaryrd",
    "commonsize",
    "commonqty",
    "gaugeends",
    "stitch",
    "onlyforproductcolors",
    "commoncolor",
];

const NOISE_VALUE_KEYWORDS: &[&str] = &[
    "displaying",
    "units:",
    "grade",
    "pom",
    "measurement",
    "tol fraction",
    "grading on this critical",
    "from center back",
    "high point shoulder",
];

static PURE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6,}$").expect("pure code pattern"));

/// Columns inside the color span that are never colors: the shared
/// quantity/color columns and a lone "Only for Product Colors" marker
/// (one that carries no embedded CC number).
pub(crate) fn is_excluded_color_column(raw_header: &str) -> bool {
    matches!(
        normalize_label(raw_header).as_str(),
        "commonqty" | "commoncolor" | "onlyforproductcolors"
    )
}

/// Clean a raw color-column header into a usable key, or reject it.
/// Pure numeric cells and structural column labels are never color headers.
/// With `allow_loose`, formatting is enough (graphic resolution re-checks
/// against the global order); otherwise the header must resolve against the
/// canonical list when one exists, or carry a CC number when none does.
pub(crate) fn sanitize_color_header(
    header_text: &str,
    allow_loose: bool,
    matrix: &ColorMatrix,
) -> Option<String> {
    let formatted = format_color_header(header_text);
    if formatted.is_empty() {
        return None;
    }
    if PURE_CODE.is_match(&clean_text(&formatted)) {
        return None;
    }
    if STRUCTURAL_LABELS.contains(&normalize_label(&formatted).as_str()) {
        return None;
    }

    if allow_loose {
        return Some(formatted);
    }
    if !matrix.is_empty() {
        return matrix.match_header(&formatted).map(str::to_string);
    }
    extract_cc_number(&formatted).map(|_| formatted)
}

/// Resolve a graphic-row color header to an entry already present in the
/// global header order; graphic rows never mint new headers. Precedence:
/// sanitized text, canonical-list match of that text (CC number first),
/// value-based canonical match, then position within the existing order.
pub(crate) fn resolve_graphic_header(
    header_text: &str,
    value_text: &str,
    color_position: usize,
    matrix: &ColorMatrix,
    header_order: &[String],
) -> Option<String> {
    let raw = sanitize_color_header(header_text, true, matrix);

    if let Some(raw) = &raw {
        if header_order.contains(raw) {
            return Some(raw.clone());
        }
        if let Some(mapped) = matrix.match_header(raw) {
            if header_order.iter().any(|header| header == mapped) {
                return Some(mapped.to_string());
            }
        }
    }

    if !value_text.is_empty() {
        if let Some(mapped) = matrix.match_value(value_text) {
            if header_order.iter().any(|header| header == mapped) {
                return Some(mapped.to_string());
            }
        }
    }

    header_order.get(color_position).cloned()
}

/// Cell values that are page furniture rather than color data.
pub(crate) fn looks_like_noise_color_value(value: &str) -> bool {
    let value = clean_text(value);
    if value.is_empty() || value.chars().count() > 60 {
        return true;
    }
    let lower = value.to_lowercase();
    NOISE_VALUE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> ColorMatrix {
        ColorMatrix::new(vec![
            "Seasalt Blue\n000123456789".to_string(),
            "Crimson Red\n000987654321".to_string(),
        ])
    }

    #[test]
    fn sanitize_rejects_structural_labels_and_pure_codes() {
        let empty = ColorMatrix::default();
        assert_eq!(sanitize_color_header("Supplier/Allocate", false, &empty), None);
        assert_eq!(sanitize_color_header("000123456", false, &empty), None);
        assert_eq!(sanitize_color_header("", false, &empty), None);
    }

    #[test]
    fn sanitize_without_matrix_requires_cc_number() {
        let empty = ColorMatrix::default();
        assert_eq!(
            sanitize_color_header("Seasalt Blue 000123456789", false, &empty),
            Some("Seasalt Blue\n000123456789".to_string())
        );
        assert_eq!(sanitize_color_header("Seasalt Blue", false, &empty), None);
    }

    #[test]
    fn sanitize_with_matrix_maps_to_canonical_entry() {
        assert_eq!(
            sanitize_color_header("Seasalt Blue 000123456789", false, &matrix()),
            Some("Seasalt Blue\n000123456789".to_string())
        );
        assert_eq!(sanitize_color_header("Moss Green 000111111111", false, &matrix()), None);
    }

    #[test]
    fn graphic_resolution_never_leaves_the_existing_order() {
        let order = vec!["Seasalt Blue\n000123456789".to_string()];

        // Sanitized text already present.
        assert_eq!(
            resolve_graphic_header("Seasalt Blue 000123456789", "", 0, &matrix(), &order),
            Some("Seasalt Blue\n000123456789".to_string())
        );
        // Canonical match present in the order.
        assert_eq!(
            resolve_graphic_header("seasalt blue", "", 5, &matrix(), &order),
            Some("Seasalt Blue\n000123456789".to_string())
        );
        // Canonical match that is NOT in the order must not be minted;
        // position 0 falls back to the only existing header.
        assert_eq!(
            resolve_graphic_header("Crimson Red 000987654321", "", 0, &matrix(), &order),
            Some("Seasalt Blue\n000123456789".to_string())
        );
        // Out-of-range position with no other match: dropped.
        assert_eq!(
            resolve_graphic_header("Crimson Red 000987654321", "", 7, &matrix(), &order),
            None
        );
    }

    #[test]
    fn graphic_resolution_uses_value_match_before_position() {
        let order = vec![
            "Crimson Red\n000987654321".to_string(),
            "Seasalt Blue\n000123456789".to_string(),
        ];
        assert_eq!(
            resolve_graphic_header("Unknown Header", "Seasalt Blue 102", 0, &matrix(), &order),
            Some("Seasalt Blue\n000123456789".to_string())
        );
    }

    #[test]
    fn noise_value_detection() {
        assert!(looks_like_noise_color_value(""));
        assert!(looks_like_noise_color_value("Displaying 10 results"));
        assert!(looks_like_noise_color_value(&"x".repeat(70)));
        assert!(!looks_like_noise_color_value("Navy 123"));
    }
}
