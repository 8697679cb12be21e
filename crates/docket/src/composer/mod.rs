//! Deterministic export of record sequences.
//!
//! The composer turns records into one of three artifacts: a JSON snapshot
//! that keeps nested data intact, a flattened one-row-per-record table, and
//! a paginated document of positioned draw operations. All operations are
//! pure functions of their input; rendering to bytes is a separate step.

pub mod layout;
pub mod metrics;
pub mod pdf;
pub mod table;

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::error::ExportError;
use crate::record::ExportRecord;

pub use layout::{wrap_text, Color, Document, DrawOp, EmbeddedImage, Page};
pub use metrics::{text_width, Font};
pub use table::Table;

#[derive(Debug, Clone)]
pub struct DocumentComposer {
    layout: LayoutConfig,
    sheet_name: String,
}

impl Default for DocumentComposer {
    fn default() -> Self {
        Self::new(LayoutConfig::default(), "Records")
    }
}

impl DocumentComposer {
    pub fn new(layout: LayoutConfig, sheet_name: impl Into<String>) -> Self {
        Self {
            layout,
            sheet_name: sheet_name.into(),
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Pretty-printed JSON of the whole sequence, nested fields included.
    pub fn to_snapshot<R: Serialize>(&self, records: &[R]) -> Result<Vec<u8>, ExportError> {
        let _span = tracing::info_span!("composer.snapshot", records = records.len()).entered();
        serde_json::to_vec_pretty(records).map_err(ExportError::Snapshot)
    }

    /// Flattened table with one row per record.
    pub fn table<R: ExportRecord>(&self, records: &[R]) -> Table {
        let rows: Vec<_> = records.iter().map(ExportRecord::table_row).collect();
        Table::from_rows(&rows)
    }

    /// The flattened table encoded as an XLSX workbook.
    pub fn to_table<R: ExportRecord>(&self, records: &[R]) -> Result<Vec<u8>, ExportError> {
        let _span = tracing::info_span!("composer.table", records = records.len()).entered();
        let table = self.table(records);
        tracing::debug!(
            columns = table.columns.len(),
            rows = table.rows.len(),
            "Flattened records"
        );
        table.to_xlsx(&self.sheet_name)
    }

    pub fn to_csv<R: ExportRecord>(&self, records: &[R]) -> String {
        self.table(records).to_csv()
    }

    pub fn to_paginated_document<R: ExportRecord>(&self, records: &[R]) -> Document {
        let _span = tracing::info_span!("composer.paginate", records = records.len()).entered();
        let document = layout::paginate(records, &self.layout);
        tracing::debug!(pages = document.pages.len(), "Paginated records");
        document
    }

    /// Lays out and renders the records as PDF bytes.
    pub fn to_pdf<R: ExportRecord>(&self, records: &[R]) -> Result<Vec<u8>, ExportError> {
        let document = self.to_paginated_document(records);
        pdf::render(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BusinessRecord, ProjectRecord};
    use serde_json::{json, Value};

    #[test]
    fn test_snapshot_round_trips() {
        let records = vec![
            json!({"name": "A", "nested": {"posts": [{"text": "hi"}]}}),
            json!({"name": "B", "tags": ["x"]}),
        ];
        let bytes = DocumentComposer::default().to_snapshot(&records).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_table_export_is_idempotent() {
        let records: Vec<BusinessRecord> = serde_json::from_value(json!([
            {"id": "1", "name": "A", "competitors": [{"name": "B"}]},
            {"id": "2", "name": "C", "social_media_summary": {
                "s": {"p": {"X": [{"full_text": "t"}], "YouTube": []}}
            }}
        ]))
        .unwrap();
        let composer = DocumentComposer::default();

        assert_eq!(composer.table(&records), composer.table(&records));
        assert_eq!(composer.to_csv(&records), composer.to_csv(&records));
    }

    #[test]
    fn test_empty_products_render_as_missing() {
        let records = vec![json!({"name": "A", "products": [], "services": []})];
        let table = DocumentComposer::default().table(&records);

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.cell(0, "products"), Some("N/A"));
        assert_eq!(table.cell(0, "services"), Some("N/A"));
    }

    #[test]
    fn test_empty_sequence_has_no_pages() {
        let composer = DocumentComposer::default();
        let document = composer.to_paginated_document::<ProjectRecord>(&[]);
        assert!(document.pages.is_empty());
    }

    #[test]
    fn test_pdf_for_projects() {
        let records = vec![ProjectRecord {
            notion_id: "p1".to_string(),
            project_name: "Launch".to_string(),
            ..Default::default()
        }];
        let bytes = DocumentComposer::default().to_pdf(&records).unwrap();
        let reloaded = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 1);
    }
}
