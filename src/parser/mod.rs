use std::collections::HashMap;

use tracing::debug;

use crate::color_matrix::ColorMatrix;
use crate::images::ImageAssociator;
use crate::model::{BomRecord, ExtractionReport, PageContent};
use crate::text::{clean_text_keep_newlines, normalize_label};

mod classify;
mod continuation;
mod resolve;
mod rows;

use classify::{ColumnLayout, TableKind, classify_table};
use continuation::{apply_color_continuation, apply_text_continuation};
use rows::parse_data_rows;

/// Snapshot of the rows produced by the most recent full-header table (plus
/// any header continuations appended to it). `row_map` translates a raw data
/// row index in the producing table to an index into the records vec; it is
/// replaced atomically whenever a new table produces rows, and continuation
/// handlers only read it.
#[derive(Debug, Clone, Default)]
pub(crate) struct BlockState {
    pub record_indices: Vec<usize>,
    pub row_map: HashMap<usize, usize>,
    pub raw_data_count: usize,
}

impl BlockState {
    pub(crate) fn is_empty(&self) -> bool {
        self.record_indices.is_empty()
    }
}

/// Scan pages in document order, classifying each table and carrying block
/// state across page boundaries. Returns the raw (ungrouped) records and the
/// global color header order.
pub(crate) fn extract_bom_rows(
    pages: &[PageContent],
    matrix: &ColorMatrix,
    images: &dyn ImageAssociator,
    report: &mut ExtractionReport,
) -> (Vec<BomRecord>, Vec<String>) {
    let mut records: Vec<BomRecord> = Vec::new();
    let mut header_order: Vec<String> = Vec::new();
    let mut section = String::new();
    let mut layout: Option<ColumnLayout> = None;
    let mut block = BlockState::default();

    for (page_index, page) in pages.iter().enumerate() {
        let mut page_rows = 0usize;
        let mut continuation_applied = false;

        for table in &page.tables {
            if table.rows.is_empty() || table.rows[0].is_empty() {
                continue;
            }
            let mut header: Vec<String> = table.rows[0]
                .iter()
                .map(|cell| clean_text_keep_newlines(cell.as_deref().unwrap_or("")))
                .collect();
            let header_norm: Vec<String> =
                header.iter().map(|cell| normalize_label(cell)).collect();

            match classify_table(table, &mut header, &header_norm, &block, layout.as_ref()) {
                TableKind::ColorContinuation => {
                    report.color_continuation_tables += 1;
                    if apply_color_continuation(
                        table,
                        &header,
                        &header_norm,
                        &block,
                        &mut records,
                        &mut header_order,
                        matrix,
                        images,
                    ) {
                        continuation_applied = true;
                    }
                }
                TableKind::FullHeader(new_layout) => {
                    report.full_header_tables += 1;
                    let parsed = parse_data_rows(
                        table,
                        &header,
                        &new_layout,
                        1,
                        &mut section,
                        matrix,
                        &mut header_order,
                        images,
                    );
                    layout = Some(new_layout);
                    if !parsed.records.is_empty() {
                        let base = records.len();
                        block = BlockState {
                            record_indices: (base..base + parsed.records.len()).collect(),
                            row_map: parsed
                                .row_map
                                .into_iter()
                                .map(|(raw, local)| (raw, base + local))
                                .collect(),
                            raw_data_count: parsed.raw_data_count,
                        };
                        page_rows += parsed.records.len();
                        records.extend(parsed.records);
                    }
                }
                TableKind::HeaderContinuation => {
                    report.header_continuation_tables += 1;
                    let Some(active_layout) = layout.as_ref() else {
                        continue;
                    };
                    let parsed = parse_data_rows(
                        table,
                        &header,
                        active_layout,
                        0,
                        &mut section,
                        matrix,
                        &mut header_order,
                        images,
                    );
                    if !parsed.records.is_empty() {
                        let base = records.len();
                        block.record_indices.extend(base..base + parsed.records.len());
                        block.row_map = parsed
                            .row_map
                            .into_iter()
                            .map(|(raw, local)| (raw, base + local))
                            .collect();
                        block.raw_data_count = parsed.raw_data_count;
                        page_rows += parsed.records.len();
                        records.extend(parsed.records);
                    }
                }
                TableKind::Ignored => {
                    report.ignored_tables += 1;
                }
            }
        }

        if !block.is_empty()
            && !continuation_applied
            && apply_text_continuation(&page.text, &block, &mut records, &mut header_order, matrix)
        {
            report.text_fallback_pages += 1;
            debug!(page = page_index + 1, "applied text-based color continuation");
        }

        report.rows_per_page.push(page_rows);
    }

    // No header found anywhere: seed the order wholesale from the canonical list.
    if header_order.is_empty() && !matrix.is_empty() {
        header_order = matrix.headers().to_vec();
    }

    (records, header_order)
}
