use std::sync::LazyLock;

use regex::Regex;

use super::BlockState;
use crate::model::Table;
use crate::text::{clean_text, clean_text_keep_newlines, extract_cc_number, normalize_label};

static PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5,}$").expect("product id pattern"));
static OFPC_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)only\s+for\s+product\s+colors?\s*\n*").expect("marker pattern")
});

/// Column-index assignments established by a full-header table and reused by
/// header-continuation tables on later pages.
#[derive(Debug, Clone)]
pub(crate) struct ColumnLayout {
    pub product: usize,
    pub material: usize,
    pub supplier_article: usize,
    pub usage: usize,
    pub quality: usize,
    pub supplier: usize,
    pub color_start: usize,
    pub color_end: usize,
}

#[derive(Debug)]
pub(crate) enum TableKind {
    /// Horizontal split: extra color columns for the current block's rows.
    ColorContinuation,
    /// Establishes a new column layout and replaces the current block.
    FullHeader(ColumnLayout),
    /// Vertical split: more data rows under the last full header's layout.
    HeaderContinuation,
    Ignored,
}

/// Classify one table, in document order. `header` is the cleaned first row;
/// a full-header match may rewrite one header cell (merged marker column).
pub(crate) fn classify_table(
    table: &Table,
    header: &mut Vec<String>,
    header_norm: &[String],
    block: &BlockState,
    layout: Option<&ColumnLayout>,
) -> TableKind {
    if is_color_continuation(header, header_norm, table, block) {
        return TableKind::ColorContinuation;
    }

    if is_full_header(header_norm) {
        if let Some(layout) = detect_column_layout(header, header_norm) {
            return TableKind::FullHeader(layout);
        }
        return TableKind::Ignored;
    }

    if layout.is_some() && PRODUCT_ID.is_match(&clean_text(table.cell(0, 0))) {
        return TableKind::HeaderContinuation;
    }

    TableKind::Ignored
}

fn is_full_header(header_norm: &[String]) -> bool {
    const REQUIRED: &[&str] = &[
        "product",
        "materialname",
        "supplierarticlenumber",
        "usage",
        "qualitydetails",
    ];
    let has = |label: &str| header_norm.iter().any(|cell| cell == label);
    REQUIRED.iter().all(|label| has(label)) && (has("supplierallocate") || has("supplier"))
}

/// A color continuation must target an existing block, carry no identity
/// columns, contain at least one CC number in its header, and stay within
/// two rows of the producing table's data-row count (the continuation may
/// gain a Comment/footer row or two, never more).
fn is_color_continuation(
    header: &[String],
    header_norm: &[String],
    table: &Table,
    block: &BlockState,
) -> bool {
    if block.is_empty() {
        return false;
    }
    if table.rows.len() < 2 {
        return false;
    }
    if header_norm.iter().any(|cell| cell == "product" || cell == "materialname") {
        return false;
    }

    let meaningful: Vec<&String> = header
        .iter()
        .filter(|cell| !clean_text_keep_newlines(cell).is_empty())
        .collect();
    if meaningful.is_empty() {
        return false;
    }
    if meaningful.len() == 1 && normalize_label(meaningful[0]) == "comment" {
        return false;
    }
    if !meaningful.iter().any(|cell| extract_cc_number(cell).is_some()) {
        return false;
    }

    let data_rows = table.rows.len() - 1;
    if block.raw_data_count > 0 {
        data_rows <= block.raw_data_count + 2
    } else {
        data_rows >= 1
    }
}

/// Establish column indices from a matched full header, including the color
/// span. The span starts after the "Only for Product Colors" marker column
/// when present; when the backend merged that marker into the first color
/// cell (detectable by an embedded CC number), the span starts at the merged
/// cell and the marker text is stripped from it.
fn detect_column_layout(header: &mut Vec<String>, header_norm: &[String]) -> Option<ColumnLayout> {
    let position = |label: &str| header_norm.iter().position(|cell| cell == label);

    let product = position("product")?;
    let material = position("materialname")?;
    let supplier_article = position("supplierarticlenumber")?;
    let usage = position("usage")?;
    let quality = position("qualitydetails")?;
    let supplier = position("supplierallocate").or_else(|| position("supplier"))?;

    let marker = header_norm
        .iter()
        .position(|cell| cell.contains("onlyforproductcolors"));

    let mut color_start = match marker {
        Some(index) => {
            let raw = header.get(index).cloned().unwrap_or_default();
            if extract_cc_number(&raw).is_some() {
                let stripped = OFPC_MARKER.replace_all(&raw, "").trim().to_string();
                if !stripped.is_empty() {
                    header[index] = stripped;
                }
                index
            } else {
                index + 1
            }
        }
        None => supplier + 1,
    };
    while color_start < header.len()
        && normalize_label(&header[color_start]) == "onlyforproductcolors"
    {
        color_start += 1;
    }

    let color_end = position("comment").unwrap_or(header.len());

    Some(ColumnLayout {
        product,
        material,
        supplier_article,
        usage,
        quality,
        supplier,
        color_start,
        color_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(header: &[String]) -> Vec<String> {
        header.iter().map(|cell| normalize_label(cell)).collect()
    }

    fn header_cells(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn table_with_rows(row_count: usize, columns: usize) -> Table {
        let rows = (0..row_count)
            .map(|row| {
                (0..columns)
                    .map(|column| Some(format!("r{row}c{column}")))
                    .collect()
            })
            .collect();
        Table { rows }
    }

    #[test]
    fn full_header_requires_all_identity_columns() {
        let full = header_cells(&[
            "Product",
            "Material Name",
            "Supplier Article Number",
            "Usage",
            "Quality Details",
            "Supplier/Allocate",
            "Seasalt Blue 000123456789",
        ]);
        assert!(is_full_header(&norm(&full)));

        let missing = header_cells(&[
            "Product",
            "Material Name",
            "Usage",
            "Quality Details",
            "Supplier",
        ]);
        assert!(!is_full_header(&norm(&missing)));
    }

    #[test]
    fn layout_places_color_span_after_supplier() {
        let mut header = header_cells(&[
            "Product",
            "Material Name",
            "Supplier Article Number",
            "Usage",
            "Quality Details",
            "Supplier/Allocate",
            "Seasalt Blue 000123456789",
            "Comment",
        ]);
        let header_norm = norm(&header);
        let layout = detect_column_layout(&mut header, &header_norm).unwrap();
        assert_eq!(layout.supplier, 5);
        assert_eq!(layout.color_start, 6);
        assert_eq!(layout.color_end, 7);
    }

    #[test]
    fn lone_marker_column_shifts_color_start() {
        let mut header = header_cells(&[
            "Product",
            "Material Name",
            "Supplier Article Number",
            "Usage",
            "Quality Details",
            "Supplier/Allocate",
            "Only for Product Colors",
            "Seasalt Blue 000123456789",
        ]);
        let header_norm = norm(&header);
        let layout = detect_column_layout(&mut header, &header_norm).unwrap();
        assert_eq!(layout.color_start, 7);
    }

    #[test]
    fn merged_marker_cell_becomes_first_color_column() {
        let mut header = header_cells(&[
            "Product",
            "Material Name",
            "Supplier Article Number",
            "Usage",
            "Quality Details",
            "Supplier/Allocate",
            "Only for Product Colors\nSeasalt Blue 000123456789",
        ]);
        let header_norm = norm(&header);
        let layout = detect_column_layout(&mut header, &header_norm).unwrap();
        assert_eq!(layout.color_start, 6);
        assert_eq!(header[6], "Seasalt Blue 000123456789");
    }

    #[test]
    fn color_continuation_row_count_boundary() {
        let block = BlockState {
            record_indices: vec![0, 1, 2],
            row_map: std::collections::HashMap::new(),
            raw_data_count: 3,
        };
        let header = header_cells(&["Seasalt Blue 000123456789"]);
        let header_norm = norm(&header);

        // data rows = raw_data_count + 2: accepted.
        assert!(is_color_continuation(&header, &header_norm, &table_with_rows(6, 1), &block));
        // one more row: rejected.
        assert!(!is_color_continuation(&header, &header_norm, &table_with_rows(7, 1), &block));
    }

    #[test]
    fn color_continuation_requires_block_and_cc_number() {
        let empty_block = BlockState::default();
        let header = header_cells(&["Seasalt Blue 000123456789"]);
        let header_norm = norm(&header);
        assert!(!is_color_continuation(
            &header,
            &header_norm,
            &table_with_rows(3, 1),
            &empty_block
        ));

        let block = BlockState {
            record_indices: vec![0],
            row_map: std::collections::HashMap::new(),
            raw_data_count: 2,
        };
        let no_cc = header_cells(&["Some Column"]);
        assert!(!is_color_continuation(&no_cc, &norm(&no_cc), &table_with_rows(3, 1), &block));

        let comment_only = header_cells(&["Comment"]);
        assert!(!is_color_continuation(
            &comment_only,
            &norm(&comment_only),
            &table_with_rows(3, 1),
            &block
        ));
    }
}
