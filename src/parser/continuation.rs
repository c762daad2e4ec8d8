use std::sync::LazyLock;

use regex::Regex;

use super::BlockState;
use super::resolve::{
    is_excluded_color_column, looks_like_noise_color_value, resolve_graphic_header,
    sanitize_color_header,
};
use crate::color_matrix::ColorMatrix;
use crate::images::{ImageAssociator, find_graphic_color_image};
use crate::model::{BomRecord, Table};
use crate::text::{clean_text, clean_text_keep_newlines, extract_cc_number, format_color_header};

static HEADER_CHUNK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z0-9][A-Za-z0-9\s\-/]*?\b\d{9,}\b)").expect("header chunk pattern")
});
static VALUE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,3}\s+\d{2,4})\b").expect("value token pattern")
});

/// Labels that disqualify a text line from being a continuation header line.
const TEXT_HEADER_REJECTS: &[&str] =
    &["Product", "Material", "Supplier", "Quality", "Centric", "Production"];

/// Write a color-continuation table's values into the block's records via the
/// raw-row-index map. Rows absent from the map were section headers or noise
/// in the producing table and are skipped here by construction.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_color_continuation(
    table: &Table,
    header: &[String],
    header_norm: &[String],
    block: &BlockState,
    records: &mut [BomRecord],
    header_order: &mut Vec<String>,
    matrix: &ColorMatrix,
    images: &dyn ImageAssociator,
) -> bool {
    let comment_index = header_norm.iter().position(|cell| cell == "comment");
    let color_columns: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(index, cell)| {
            Some(*index) != comment_index
                && !clean_text_keep_newlines(cell).is_empty()
                && !is_excluded_color_column(cell)
        })
        .map(|(index, _)| index)
        .collect();
    if color_columns.is_empty() {
        return false;
    }

    let mut applied = false;
    for (row_index, row) in table.rows.iter().enumerate().skip(1) {
        let raw_index = row_index - 1;
        let Some(&record_index) = block.row_map.get(&raw_index) else {
            continue;
        };
        let Some(record) = records.get_mut(record_index) else {
            continue;
        };
        if row.is_empty() {
            continue;
        }

        for &column in &color_columns {
            let value =
                clean_text(row.get(column).and_then(|cell| cell.as_deref()).unwrap_or(""));
            if value.is_empty() || looks_like_noise_color_value(&value) {
                continue;
            }

            let raw_header = header.get(column).map(String::as_str).unwrap_or("");
            let formatted = format_color_header(raw_header);
            let resolved = if record.is_graphic() {
                resolve_graphic_header(&formatted, &value, column, matrix, header_order)
            } else {
                sanitize_color_header(&formatted, false, matrix)
            };
            let Some(header_key) = resolved else {
                continue;
            };

            if !record.is_graphic() && !header_order.contains(&header_key) {
                header_order.push(header_key.clone());
            }
            if record.is_graphic() {
                if let Some(bytes) = find_graphic_color_image(
                    images,
                    &record.product,
                    &record.material_name,
                    &[&header_key, &formatted],
                ) {
                    record.color_images.insert(header_key.clone(), bytes);
                }
            }
            record.colors.insert(header_key, value);
            applied = true;
        }
    }

    applied
}

/// Text-based fallback when no table captured a continuation on a page that
/// should have one: find a header line carrying a CC number and a dash
/// delimiter, then assign "Capitalized Words + short number" tokens from the
/// following lines to the block's records in order. Without a header line,
/// tokens resolve individually against the canonical list.
pub(crate) fn apply_text_continuation(
    page_text: &str,
    block: &BlockState,
    records: &mut [BomRecord],
    header_order: &mut Vec<String>,
    matrix: &ColorMatrix,
) -> bool {
    if block.is_empty() || page_text.is_empty() {
        return false;
    }

    let lines: Vec<&str> = page_text.lines().collect();
    let start = lines.iter().position(|line| {
        if line.contains("Comment") && line.contains(" - ") {
            return true;
        }
        extract_cc_number(line).is_some()
            && line.contains(" - ")
            && !TEXT_HEADER_REJECTS.iter().any(|reject| line.contains(reject))
    });
    let Some(start) = start else {
        return false;
    };

    let header_line = clean_text_keep_newlines(lines[start]);
    let header_chunks: Vec<String> = HEADER_CHUNK
        .captures_iter(&header_line)
        .filter_map(|captures| sanitize_color_header(&captures[1], false, matrix))
        .collect();
    for chunk in &header_chunks {
        if !header_order.contains(chunk) {
            header_order.push(chunk.clone());
        }
    }

    let mut data_lines = Vec::new();
    for line in &lines[start + 1..] {
        let cleaned = clean_text(line);
        if cleaned.is_empty() {
            continue;
        }
        let lower = cleaned.to_lowercase();
        if lower.starts_with("displaying") || lower.contains("measurement") {
            break;
        }
        data_lines.push(cleaned);
    }
    if data_lines.is_empty() {
        return false;
    }

    let mut applied = false;
    let mut block_position = 0usize;
    for line in &data_lines {
        let Some(&record_index) = block.record_indices.get(block_position) else {
            break;
        };
        let tokens: Vec<String> = VALUE_TOKEN
            .captures_iter(line)
            .map(|captures| captures[1].to_string())
            .collect();
        if tokens.is_empty() {
            continue;
        }
        let Some(record) = records.get_mut(record_index) else {
            break;
        };

        if header_chunks.is_empty() {
            for token in &tokens {
                let value = clean_text(token);
                if value.is_empty() || looks_like_noise_color_value(&value) {
                    continue;
                }
                let Some(header_key) = matrix.match_value(&value).map(str::to_string) else {
                    continue;
                };
                if !header_order.contains(&header_key) {
                    header_order.push(header_key.clone());
                }
                if record.colors.get(&header_key) != Some(&value) {
                    record.colors.insert(header_key, value);
                    applied = true;
                }
            }
        } else {
            for (column, token) in tokens.iter().take(header_chunks.len()).enumerate() {
                let value = clean_text(token);
                if value.is_empty() || looks_like_noise_color_value(&value) {
                    continue;
                }
                let header_key = header_chunks[column].clone();
                if record.colors.get(&header_key) != Some(&value) {
                    record.colors.insert(header_key, value);
                    applied = true;
                }
            }
        }
        block_position += 1;
    }

    applied
}
