use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::{MasterFields, PageContent};
use crate::text::clean_text;

/// Keywords that mean a legacy-style-numbers capture bled into neighboring
/// organizational/status fields and must be cleared.
const LEGACY_STYLE_REJECTS: &[&str] = &[
    "Material",
    "Supplier",
    "Approved",
    "Status",
    "Allocate",
    "Booking",
    "Track",
    "Good",
    "Better",
    "Best",
    "Priority",
    "Carryover",
    "Season",
    "Brand",
    "Division",
    "INTERNATIONAL",
    "HOLDINGS",
    "LTD",
    "CORP",
    "Master",
    "Primary",
    "RD",
    "Comment",
];

const HANG_FOLD_REJECTS: &[&str] = &[
    "Brand/Division",
    "BOM Comments",
    "Department",
    "Collection",
    "Season Planning",
    "Revision",
    "Modified",
    "Booking Track",
];

const HANG_FOLD_QUALIFIERS: &[&str] = &["Hang", "Fold", "Flat", "Roll"];

static LONG_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{8,})").expect("long numeric pattern"));
static STYLE_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{6,})").expect("style numeric pattern"));
static TOPS_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Tops-?\s*(\w+)").expect("tops qualifier pattern"));
static TECH_PACK_DESIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Tech Pack[^\n]*?(D\d{5,6})").expect("tech pack pattern"));
static DESIGN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(D\d{5,6})\b").expect("design id pattern"));

/// Extract document-level scalar fields via label-anchored windows with
/// per-field validation. Labels sit in continuous page text with no column
/// boundaries, so each capture is bounded by the earliest of the field's stop
/// labels and then validated; a failed validation clears that field only.
pub fn extract_master_fields(pages: &[PageContent]) -> MasterFields {
    let first_page_text = pages.first().map(|page| page.text.as_str()).unwrap_or("");
    let target_text = pages
        .iter()
        .map(|page| page.text.as_str())
        .find(|text| text.contains("Design Number") && text.contains("BOM Number"))
        .map(str::to_string)
        .unwrap_or_else(|| {
            pages
                .iter()
                .map(|page| page.text.as_str())
                .collect::<Vec<&str>>()
                .join("\n")
        });

    let mut fields = MasterFields {
        design_number: labeled_window(
            &target_text,
            "Design Number",
            &["Design Concept", "Description", "Category", "BOM Number", "Tech Pack"],
        ),
        description: labeled_window(
            &target_text,
            "Description",
            &["Category", "BOM Number", "Design BOM", "Design Type", "Tech Pack"],
        ),
        bom_number: validate_bom_number(&labeled_window(
            &target_text,
            "BOM Number",
            &[
                "Sub-",
                "SubCategory",
                "Sub-Category",
                "Design BOM",
                "Tech Pack BOM",
                "Category",
                "Legacy",
                "Status",
            ],
        )),
        legacy_style_numbers: validate_legacy_style_numbers(&labeled_window(
            &target_text,
            "Legacy Style Numbers",
            &[
                "Carryover",
                "Hang/Fold",
                "Season Planning",
                "Brand/Division",
                "Booking",
                "Good/Better",
                "Supplier",
                "Hard Tag",
                "RFID",
            ],
        )),
        hang_fold_instructions: validate_hang_fold(&labeled_window(
            &target_text,
            "Hang/Fold Instructions",
            &[
                "Booking Track",
                "Season Planning",
                "Brand/Division",
                "Department",
                "Collection",
                "BOM Comments",
                "Revision",
                "Good/Better",
            ],
        )),
    };

    if fields.design_number.is_empty() {
        fields.design_number = design_number_fallback(first_page_text, &target_text);
        if !fields.design_number.is_empty() {
            debug!(design_number = %fields.design_number, "design number found via fallback search");
        }
    }

    fields
}

/// Label-anchored capture: non-greedy window from the label up to the
/// earliest stop label, rejected when it spans past missing stop labels
/// (>= 200 chars); falls back to one or two raw lines after the label,
/// truncated at the first stop word.
fn labeled_window(text: &str, label: &str, stop_labels: &[&str]) -> String {
    if let Some(captured) = bounded_capture(text, label, stop_labels) {
        return captured;
    }

    let loose_pattern = format!(r"{}\s+([^\n]+(?:\n[^\n]+)?)", regex::escape(label));
    let Some(loose) = Regex::new(&loose_pattern).ok() else {
        return String::new();
    };
    let Some(captures) = loose.captures(text) else {
        return String::new();
    };

    let mut result = clean_text(&captures[1]);
    for stop in stop_labels {
        if let Some(position) = result.find(stop) {
            result = result[..position].trim().to_string();
        }
    }
    result
}

fn bounded_capture(text: &str, label: &str, stop_labels: &[&str]) -> Option<String> {
    let stops = stop_labels
        .iter()
        .map(|stop| regex::escape(stop))
        .collect::<Vec<String>>()
        .join("|");
    let pattern = format!(r"(?s){}\s+(.*?)\s+(?:{})", regex::escape(label), stops);
    let bounded = Regex::new(&pattern).ok()?;

    let captured = clean_text(&bounded.captures(text)?[1]);
    if captured.chars().count() < 200 {
        Some(captured)
    } else {
        None
    }
}

/// A BOM number must reduce to a pure >=8-digit token, else it is cleared.
pub(crate) fn validate_bom_number(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    LONG_NUMERIC
        .captures(value)
        .map(|captures| captures[1].to_string())
        .unwrap_or_default()
}

/// Legacy style numbers: cleared when the capture contains organizational or
/// status keywords, else reduced to the embedded >=6-digit token.
pub(crate) fn validate_legacy_style_numbers(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if LEGACY_STYLE_REJECTS.iter().any(|keyword| value.contains(keyword)) {
        return String::new();
    }
    STYLE_NUMERIC
        .captures(value)
        .map(|captures| captures[1].to_string())
        .unwrap_or_default()
}

/// Hang/fold instructions normalize to "Tops- <Qualifier>" for a recognized
/// qualifier (bare "Tops-" otherwise); cleared on field-boundary keywords or
/// captures longer than 50 characters.
pub(crate) fn validate_hang_fold(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if HANG_FOLD_REJECTS.iter().any(|keyword| value.contains(keyword)) {
        return String::new();
    }
    if value.chars().count() > 50 {
        return String::new();
    }

    if value.contains("Tops-") || value.contains("Tops -") {
        return match TOPS_QUALIFIER.captures(value) {
            Some(captures) => {
                let qualifier = &captures[1];
                if HANG_FOLD_QUALIFIERS.iter().any(|known| *known == qualifier) {
                    format!("Tops- {qualifier}")
                } else {
                    "Tops-".to_string()
                }
            }
            None => "Tops-".to_string(),
        };
    }

    value.to_string()
}

/// Dedicated design-number fallback: near the "Tech Pack" anchor on the first
/// page, then anywhere in the first 500 characters of the first page, then in
/// the whole target text.
fn design_number_fallback(first_page_text: &str, target_text: &str) -> String {
    let scope = if first_page_text.is_empty() {
        target_text
    } else {
        first_page_text
    };

    if let Some(captures) = TECH_PACK_DESIGN.captures(scope) {
        return captures[1].to_string();
    }

    let head: String = scope.chars().take(500).collect();
    if let Some(captures) = DESIGN_ID.captures(&head) {
        return captures[1].to_string();
    }

    DESIGN_ID
        .captures(target_text)
        .map(|captures| captures[1].to_string())
        .unwrap_or_default()
}
