use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::model::{PageContent, Table};
use crate::text::{
    clean_text, clean_text_keep_newlines, extract_cc_number, format_color_header, normalize_label,
};

/// Column labels, status words, and product identifiers that disqualify a
/// candidate header read out of the color-matrix section.
const SKIP_KEYWORDS: &[&str] = &[
    "CC Name",
    "Component",
    "Type",
    "Status",
    "Created",
    "Modified",
    "BOM CC Number",
    "Product Sustainability",
    "HERALD",
    "Concept",
    "Adopted",
    "BOMColorMatrix",
    "Displaying",
];

/// Lines that terminate the color-matrix section in the text strategy.
const SECTION_STOPS: &[&str] = &["Documents", "Measurement", "POM Name", "Displaying"];

static TRAILING_SHORT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d{2,4}$").expect("trailing code pattern"));
static MERIDIEM_GLUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:AM|PM)[A-Z]").expect("meridiem glue pattern"));
static DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d/,:\s]+(?:AM|PM)\s*").expect("date prefix pattern"));
static DOUBLED_INITIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*MA\s+([A-Z])").expect("doubled initial pattern"));
static REPEATED_A_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*A{2,}\s+").expect("repeated A pattern"));

/// Canonical color list extracted from the BOMColorMatrix section. Used for
/// reconciliation and validation only; order is document order.
#[derive(Debug, Clone, Default)]
pub struct ColorMatrix {
    headers: Vec<String>,
}

impl ColorMatrix {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn by_position(&self, position: usize) -> Option<&str> {
        self.headers.get(position).map(String::as_str)
    }

    /// Resolve a raw header text to a canonical entry: by CC number first,
    /// then by normalized containment in either direction.
    pub fn match_header(&self, header_text: &str) -> Option<&str> {
        if header_text.is_empty() || self.headers.is_empty() {
            return None;
        }

        if let Some(cc_number) = extract_cc_number(header_text) {
            for header in &self.headers {
                if extract_cc_number(header).as_deref() == Some(cc_number.as_str()) {
                    return Some(header);
                }
            }
        }

        let label = normalize_label(header_text);
        if label.is_empty() {
            return None;
        }
        for header in &self.headers {
            let canonical = normalize_label(header);
            if canonical.contains(&label) || label.contains(&canonical) {
                return Some(header);
            }
        }

        None
    }

    /// Resolve a color *value* (e.g. "Seasalt Blue 102") to a canonical entry
    /// by stripping its trailing 2-4 digit code and matching the name.
    pub fn match_value(&self, value: &str) -> Option<&str> {
        let value = clean_text(value);
        if value.is_empty() || self.headers.is_empty() {
            return None;
        }

        let base = TRAILING_SHORT_CODE.replace(&value, "");
        let base_label = normalize_label(base.trim());
        if !base_label.is_empty() {
            for header in &self.headers {
                if normalize_label(header).contains(&base_label) {
                    return Some(header);
                }
            }
        }

        // Known variant: "Tango ..." values belong to the Seasalt Blue column.
        if value.to_lowercase().contains("tango") {
            for header in &self.headers {
                let label = normalize_label(header);
                if (label.contains("seasalt") && label.contains("blue"))
                    || label.contains("seasaltwblue")
                {
                    return Some(header);
                }
            }
        }

        None
    }
}

/// Scan the document for the color-matrix section and extract the canonical
/// color list. The pipe-delimited text strategy takes priority; table-based
/// extraction with artifact correction is the fallback. An empty result is
/// non-fatal: the caller skips reconciliation.
pub fn extract_color_matrix(pages: &[PageContent]) -> ColorMatrix {
    for page in pages {
        if !page.text.contains("BOMColorMatrix") && !page.text.contains("CC Name") {
            continue;
        }

        let headers = headers_from_text(&page.text);
        if !headers.is_empty() {
            info!(count = headers.len(), strategy = "text", "extracted color matrix");
            return ColorMatrix::new(headers);
        }

        let mut headers = Vec::new();
        for table in &page.tables {
            headers_from_table(table, &mut headers);
        }
        if !headers.is_empty() {
            info!(count = headers.len(), strategy = "table", "extracted color matrix");
            return ColorMatrix::new(headers);
        }
    }

    debug!("no color matrix section found");
    ColorMatrix::default()
}

fn headers_from_text(text: &str) -> Vec<String> {
    if !text.contains('|') || !text.contains("CC Name") {
        return Vec::new();
    }

    let mut headers = Vec::new();
    let mut in_section = false;
    for line in text.lines() {
        let line = line.trim();
        if line.contains("BOMColorMatrix") || line.contains("CC Name") {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if SECTION_STOPS.iter().any(|stop| line.contains(stop)) {
            break;
        }
        if line.is_empty() || !line.contains('|') {
            continue;
        }

        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        if parts.len() < 3 {
            continue;
        }
        let name = clean_text_keep_newlines(parts[0]);
        let code = clean_text(parts[2]);
        push_candidate(&mut headers, &name, &code, 5);
    }

    headers
}

fn headers_from_table(table: &Table, headers: &mut Vec<String>) {
    if table.rows.len() < 3 {
        return;
    }

    // Header row holding the CC Name column, searched within the first 3 rows.
    let mut name_index = None;
    let mut code_index = None;
    let mut header_row = None;
    for (row_index, row) in table.rows.iter().take(3).enumerate() {
        let row_text = row
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<&str>>()
            .join(" ");
        if !row_text.contains("CC Name") {
            continue;
        }
        for (cell_index, cell) in row.iter().enumerate() {
            let cell_text = clean_text(cell.as_deref().unwrap_or(""));
            if cell_text.contains("CC Name") {
                name_index = Some(cell_index);
            } else if cell_text.contains("BOM CC Number") {
                code_index = Some(cell_index);
            }
        }
        header_row = Some(row_index);
        break;
    }

    let (Some(name_index), Some(header_row)) = (name_index, header_row) else {
        return;
    };

    for row in &table.rows[header_row + 1..] {
        let raw_name = clean_text(
            row.get(name_index)
                .and_then(|cell| cell.as_deref())
                .unwrap_or(""),
        );
        if raw_name.is_empty() {
            continue;
        }
        let code = code_index
            .and_then(|index| row.get(index))
            .and_then(|cell| cell.as_deref())
            .map(clean_text)
            .unwrap_or_default();

        let name = strip_cell_merge_artifacts(&raw_name);
        push_candidate(headers, &name, &code, 3);
    }
}

fn push_candidate(headers: &mut Vec<String>, name: &str, code: &str, min_length: usize) {
    let combined = if code.is_empty() {
        name.to_string()
    } else {
        format!("{name}\n{code}")
    };
    let candidate = format_color_header(&combined);
    if candidate.chars().count() > min_length
        && !SKIP_KEYWORDS.iter().any(|keyword| candidate.contains(keyword))
    {
        headers.push(candidate);
    }
}

/// Correct known cell-merge glitches in the extracted CC Name cell: a
/// timestamp from the neighboring column glued on ("1/8/2026, 6:21 AMA
/// STONES THROW"), and a doubled leading letter ("MA STONES THROW",
/// "AA STONES THROW").
fn strip_cell_merge_artifacts(raw: &str) -> String {
    let mut name = raw.to_string();

    if let Some(found) = MERIDIEM_GLUE.find(&name) {
        name = name[found.start() + 2..].to_string();
    }
    if let Some(found) = DATE_PREFIX.find(&name) {
        name = name[found.end()..].to_string();
    }
    name = DOUBLED_INITIAL.replace(&name, "A $1").into_owned();
    name = REPEATED_A_PREFIX.replace(&name, "A ").into_owned();

    name.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_text(text: &str) -> PageContent {
        PageContent {
            text: text.to_string(),
            tables: Vec::new(),
        }
    }

    #[test]
    fn text_strategy_parses_pipe_delimited_rows() {
        let text = "BOMColorMatrix\n\
                    CC Name | Status | BOM CC Number\n\
                    Seasalt Blue | Adopted | 000123456789\n\
                    Crimson Red | Adopted | 000987654321\n\
                    Displaying 2 results";
        let matrix = extract_color_matrix(&[page_with_text(text)]);
        assert_eq!(
            matrix.headers(),
            &[
                "Seasalt Blue\n000123456789".to_string(),
                "Crimson Red\n000987654321".to_string(),
            ]
        );
    }

    #[test]
    fn text_strategy_stops_at_section_end() {
        let text = "CC Name | x | y\n\
                    Seasalt Blue | Adopted | 000123456789\n\
                    Measurement Chart\n\
                    Fake Color | Adopted | 000111111111";
        let matrix = extract_color_matrix(&[page_with_text(text)]);
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn table_strategy_corrects_merge_artifacts() {
        let table = Table {
            rows: vec![
                vec![
                    Some("Modified".to_string()),
                    Some("CC Name".to_string()),
                    Some("BOM CC Number".to_string()),
                ],
                vec![
                    Some("1/8/2026, 6:21 AM".to_string()),
                    Some("1/8/2026, 6:21 AMA STONES THROW".to_string()),
                    Some("000123456789".to_string()),
                ],
                vec![
                    Some("1/9/2026, 7:02 AM".to_string()),
                    Some("MA STONES THROW".to_string()),
                    Some("000987654321".to_string()),
                ],
            ],
        };
        let page = PageContent {
            text: "CC Name".to_string(),
            tables: vec![table],
        };
        let matrix = extract_color_matrix(&[page]);
        assert_eq!(
            matrix.headers(),
            &[
                "A STONES THROW\n000123456789".to_string(),
                "A STONES THROW\n000987654321".to_string(),
            ]
        );
    }

    #[test]
    fn skip_keywords_reject_column_labels() {
        let text = "BOMColorMatrix\n\
                    CC Name | Status | BOM CC Number\n\
                    Product Sustainability | x | 000123456789\n\
                    Seasalt Blue | Adopted | 000123456789";
        let matrix = extract_color_matrix(&[page_with_text(text)]);
        assert_eq!(matrix.len(), 1);
        assert!(matrix.headers()[0].starts_with("Seasalt Blue"));
    }

    #[test]
    fn match_header_prefers_cc_number() {
        let matrix = ColorMatrix::new(vec![
            "Seasalt Blue\n000123456789".to_string(),
            "Crimson Red\n000987654321".to_string(),
        ]);
        assert_eq!(
            matrix.match_header("Totally Different 000987654321"),
            Some("Crimson Red\n000987654321")
        );
        assert_eq!(
            matrix.match_header("seasalt blue"),
            Some("Seasalt Blue\n000123456789")
        );
        assert_eq!(matrix.match_header("Unknown Color"), None);
    }

    #[test]
    fn match_value_strips_trailing_code_and_handles_variant() {
        let matrix = ColorMatrix::new(vec!["Seasalt Blue\n000123456789".to_string()]);
        assert_eq!(
            matrix.match_value("Seasalt Blue 102"),
            Some("Seasalt Blue\n000123456789")
        );
        assert_eq!(
            matrix.match_value("Tango 55"),
            Some("Seasalt Blue\n000123456789")
        );
        assert_eq!(matrix.match_value("Moss Green 12"), None);
    }

    #[test]
    fn missing_section_yields_empty_matrix() {
        let matrix = extract_color_matrix(&[page_with_text("nothing relevant here")]);
        assert!(matrix.is_empty());
    }
}
