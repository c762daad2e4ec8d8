use std::path::Path;
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::text::clean_text;
use crate::util::write_json_pretty;

/// Raster thumbnail bytes supplied by the image-association collaborator.
/// Shared so grouping and caching never copy image payloads.
pub type ImageBytes = Arc<Vec<u8>>;

/// Product identifier recorded for Graphic-section rows that have none.
pub const GRAPHIC_PRODUCT_PLACEHOLDER: &str = "GRAPHIC";

/// One extracted BOM line item. `colors` maps the formatted color header text
/// to the cell value; key order is first-seen order for display.
#[derive(Debug, Clone, Default)]
pub struct BomRecord {
    pub category: String,
    pub product: String,
    pub material_name: String,
    pub supplier_article_number: String,
    pub usage: String,
    pub quality_details: String,
    pub supplier: String,
    pub colors: IndexMap<String, String>,
    pub image: Option<ImageBytes>,
    /// Color-cell thumbnails, Graphic category only.
    pub color_images: IndexMap<String, ImageBytes>,
}

impl BomRecord {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            category: self.category.clone(),
            product: self.product.clone(),
            material_name: self.material_name.clone(),
            supplier_article_number: self.supplier_article_number.clone(),
            usage: self.usage.clone(),
            quality_details: self.quality_details.clone(),
            supplier: self.supplier.clone(),
        }
    }

    pub fn is_graphic(&self) -> bool {
        self.category.eq_ignore_ascii_case("graphic")
    }
}

/// Grouping key: records sharing all seven fields merge into one output row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub category: String,
    pub product: String,
    pub material_name: String,
    pub supplier_article_number: String,
    pub usage: String,
    pub quality_details: String,
    pub supplier: String,
}

/// Per-page input from the PDF extraction backend: the page's plain text and
/// its detected tables, in page order.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub text: String,
    pub tables: Vec<Table>,
}

/// Raw cell grid as reported by the backend; `None` cells are empty.
/// Row 0 is the candidate header row.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
            .unwrap_or("")
    }
}

/// Document-level scalar fields. Empty string means extraction failed
/// validation for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MasterFields {
    pub design_number: String,
    pub description: String,
    pub bom_number: String,
    pub legacy_style_numbers: String,
    pub hang_fold_instructions: String,
}

impl MasterFields {
    /// Named-field view matching the output contract to the spreadsheet writer.
    pub fn as_map(&self) -> IndexMap<&'static str, &str> {
        IndexMap::from([
            ("design_number", self.design_number.as_str()),
            ("description", self.description.as_str()),
            ("bom_number", self.bom_number.as_str()),
            ("legacy_style_numbers", self.legacy_style_numbers.as_str()),
            ("hang_fold_instructions", self.hang_fold_instructions.as_str()),
        ])
    }
}

/// Everything handed to the spreadsheet-writing collaborator.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub records: Vec<BomRecord>,
    /// Global color header order: unique, first-seen order.
    pub color_headers: Vec<String>,
    pub master: MasterFields,
    pub report: ExtractionReport,
}

/// Degradation and tally counters for one document parse.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub generated_at: String,
    pub page_count: usize,
    pub rows_per_page: Vec<usize>,
    pub full_header_tables: usize,
    pub header_continuation_tables: usize,
    pub color_continuation_tables: usize,
    pub ignored_tables: usize,
    pub text_fallback_pages: usize,
    pub reconciled_headers: usize,
    pub grouped_record_count: usize,
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, self)
    }
}

static SECTION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)^fabric\s*\(\d+\)$", "Fabric"),
        (r"(?i)^trim\s*\(\d+\)$", "Trim"),
        (r"(?i)^graphic\s*\(\d+\)$", "Graphic"),
        (r"(?i)^packaging\s+and\s+labels\s*\(\d+\)$", "Packaging and Labels"),
        (r"(?i)^wash\s*\(\d+\)$", "Wash"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).expect("section pattern"), name))
    .collect()
});

/// Detect a section-header row cell like "Fabric (5)" or "Trim (12)".
/// Anchored: a cell merely containing the word is not a section header.
pub fn section_from_cell_text(text: &str) -> Option<&'static str> {
    let cleaned = clean_text(text);
    SECTION_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&cleaned))
        .map(|(_, name)| *name)
}
