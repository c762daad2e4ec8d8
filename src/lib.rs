//! Extraction of bill-of-materials tables from multi-page PLM tech-pack
//! PDFs: table classification across page splits, color header repair
//! against the document's canonical color list, and merging of wrapped
//! rows into logical BOM records.

use tracing::{info, warn};

pub mod color_matrix;
mod group;
pub mod images;
pub mod master;
pub mod model;
mod parser;
mod reconcile;
pub mod text;
mod util;

pub use color_matrix::{ColorMatrix, extract_color_matrix};
pub use group::group_records;
pub use images::{
    DocumentCache, ImageAssociator, ImageIndex, NoImages, document_identity,
};
pub use master::extract_master_fields;
pub use model::{
    BomRecord, ExtractionOutput, ExtractionReport, IdentityKey, ImageBytes, MasterFields,
    PageContent, Table,
};
pub use reconcile::reconcile_headers;

/// Run the full pipeline over a document's pages: canonical color list,
/// master fields, BOM row extraction, header reconciliation, grouping.
/// An empty document degrades to empty output with a warning in the report.
pub fn extract(pages: &[PageContent], images: &dyn ImageAssociator) -> ExtractionOutput {
    let mut report = ExtractionReport {
        generated_at: util::now_utc_string(),
        page_count: pages.len(),
        ..ExtractionReport::default()
    };

    let matrix = extract_color_matrix(pages);
    let master = extract_master_fields(pages);

    let (mut records, mut color_headers) =
        parser::extract_bom_rows(pages, &matrix, images, &mut report);
    report.reconciled_headers = reconcile_headers(&mut color_headers, &matrix, &mut records);

    if records.is_empty() {
        warn!("no BOM table located in document");
        report
            .warnings
            .push("no BOM table located in document".to_string());
    }

    let records = group_records(records);
    report.grouped_record_count = records.len();

    info!(
        pages = pages.len(),
        records = records.len(),
        colors = color_headers.len(),
        reconciled = report.reconciled_headers,
        "document extraction complete"
    );

    ExtractionOutput {
        records,
        color_headers,
        master,
        report,
    }
}
