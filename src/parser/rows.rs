use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use super::classify::ColumnLayout;
use super::resolve::{is_excluded_color_column, resolve_graphic_header, sanitize_color_header};
use crate::color_matrix::ColorMatrix;
use crate::images::{ImageAssociator, find_graphic_color_image};
use crate::model::{BomRecord, GRAPHIC_PRODUCT_PLACEHOLDER, Table, section_from_cell_text};
use crate::text::{clean_text, format_color_header};

static PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5,}$").expect("product id pattern"));

const NOISE_ROW_KEYWORDS: &[&str] = &[
    "displaying",
    "results",
    "page ",
    "centric",
    "production(",
    "units:",
    "grade rule",
    "measurement chart",
];

/// Records produced by one full-header or header-continuation table, with the
/// raw-row-index map (0-based over the table's data rows, skipped rows
/// included in the count but absent from the map).
pub(crate) struct ParsedBlock {
    pub records: Vec<BomRecord>,
    pub row_map: HashMap<usize, usize>,
    pub raw_data_count: usize,
}

/// Footer/noise rows are excluded from the raw-row mapping entirely.
pub(crate) fn is_footer_or_noise_row(cells: &[String]) -> bool {
    let joined = cells
        .iter()
        .map(|cell| clean_text(cell))
        .collect::<Vec<String>>()
        .join(" ")
        .to_lowercase();
    if joined.trim().is_empty() {
        return true;
    }
    NOISE_ROW_KEYWORDS.iter().any(|keyword| joined.contains(keyword))
}

/// Walk the data rows of a table whose column layout is known, producing one
/// record per qualifying row. Section-header rows update the current section;
/// noise rows are skipped; both consume a raw index without a mapping.
#[allow(clippy::too_many_arguments)]
pub(crate) fn parse_data_rows(
    table: &Table,
    header: &[String],
    layout: &ColumnLayout,
    data_start: usize,
    section: &mut String,
    matrix: &ColorMatrix,
    header_order: &mut Vec<String>,
    images: &dyn ImageAssociator,
) -> ParsedBlock {
    let mut records = Vec::new();
    let mut row_map = HashMap::new();
    let widest_required = layout.supplier.max(layout.quality).max(layout.material);

    for (row_index, row) in table.rows.iter().enumerate().skip(data_start) {
        let raw_index = row_index - data_start;
        if row.is_empty() || row.len() <= widest_required {
            continue;
        }

        let cell = |column: usize| {
            clean_text(row.get(column).and_then(|value| value.as_deref()).unwrap_or(""))
        };

        let mut product = cell(layout.product);
        let material = cell(layout.material);

        let mut row_cells = vec![product.clone(), material.clone()];
        row_cells.extend(row.iter().map(|value| clean_text(value.as_deref().unwrap_or(""))));
        if is_footer_or_noise_row(&row_cells) {
            continue;
        }

        if let Some(new_section) = section_from_cell_text(&product) {
            *section = new_section.to_string();
            continue;
        }

        if !PRODUCT_ID.is_match(&product) {
            if section.eq_ignore_ascii_case("graphic") {
                if product.is_empty() {
                    product = GRAPHIC_PRODUCT_PLACEHOLDER.to_string();
                }
            } else {
                continue;
            }
        }
        if product.is_empty() && material.is_empty() {
            continue;
        }

        let is_graphic_row = section.eq_ignore_ascii_case("graphic");
        let mut colors: IndexMap<String, String> = IndexMap::new();
        let mut color_images = IndexMap::new();

        let color_end = layout.color_end.min(row.len());
        let mut color_position = 0usize;
        for column in layout.color_start..color_end {
            let raw_header = header.get(column).map(String::as_str).unwrap_or("");
            if is_excluded_color_column(raw_header) {
                color_position += 1;
                continue;
            }

            let value = cell(column);
            let formatted_header = format_color_header(raw_header);
            let mut resolved = if is_graphic_row {
                resolve_graphic_header(&formatted_header, &value, color_position, matrix, header_order)
            } else {
                sanitize_color_header(&formatted_header, false, matrix)
            };

            // Unusable header text: recover via the canonical list, first by
            // the value, then by the column's position in the color span.
            if resolved.is_none() && !is_graphic_row && !matrix.is_empty() {
                if !value.is_empty() {
                    resolved = matrix.match_value(&value).map(str::to_string);
                }
                if resolved.is_none() {
                    resolved = matrix.by_position(color_position).map(str::to_string);
                }
            }
            color_position += 1;

            let Some(header_key) = resolved else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            if !is_graphic_row && !header_order.contains(&header_key) {
                header_order.push(header_key.clone());
            }
            if is_graphic_row {
                if let Some(bytes) = find_graphic_color_image(
                    images,
                    &product,
                    &material,
                    &[&header_key, &formatted_header],
                ) {
                    color_images.insert(header_key.clone(), bytes);
                }
            }
            colors.insert(header_key, value);
        }

        let image = images.row_image(section, &product, &material);
        row_map.insert(raw_index, records.len());
        records.push(BomRecord {
            category: section.clone(),
            product,
            material_name: material,
            supplier_article_number: cell(layout.supplier_article),
            usage: cell(layout.usage),
            quality_details: cell(layout.quality),
            supplier: cell(layout.supplier),
            colors,
            image,
            color_images,
        });
    }

    ParsedBlock {
        raw_data_count: table.rows.len().saturating_sub(data_start),
        records,
        row_map,
    }
}
