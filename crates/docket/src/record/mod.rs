//! Business records fetched from the backend and their export projections.
//!
//! Every record family knows how to present itself as a titled list of
//! document sections and as one flattened spreadsheet row. The composer only
//! talks to [`ExportRecord`], so adding a record family never touches the
//! layout or table code.

pub mod adhoc;
pub mod business;
pub mod lenient;
pub mod project;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use business::{
    BusinessRecord, Competitor, SocialMediaSummary, SocialPost, WebsiteSnapshot,
};
pub use project::ProjectRecord;

/// Cell value used wherever a field is absent or empty.
pub const MISSING: &str = "N/A";

/// A titled block of text in a paginated document.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub body: String,
    /// Optional PNG/JPEG bytes drawn between the separator and the body.
    pub image: Option<Vec<u8>>,
}

impl Section {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }
}

/// One nested entity flattened into a synthetic column group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowGroup {
    /// Rendered into the `group_<n>` column.
    pub label: Option<String>,
    /// Rendered into `item_<n>_<m>` columns, `m` starting at 1.
    pub items: Vec<String>,
}

/// A record projected onto spreadsheet cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    /// Scalar columns in display order. `None` renders as [`MISSING`].
    pub cells: Vec<(String, Option<String>)>,
    pub groups: Vec<RowGroup>,
}

impl TableRow {
    pub fn cell(&mut self, column: &str, value: Option<String>) -> &mut Self {
        self.cells.push((column.to_string(), value));
        self
    }

    pub fn group(&mut self, group: RowGroup) -> &mut Self {
        self.groups.push(group);
        self
    }
}

/// Common export surface of every record family.
pub trait ExportRecord: Serialize {
    /// Immutable identifier used to key approval jobs.
    fn record_id(&self) -> String;

    /// Heading drawn at the top of the record's first page.
    fn title(&self) -> String;

    fn sections(&self) -> Vec<Section>;

    fn table_row(&self) -> TableRow;

    /// Folder/group the backend files an approved artifact under.
    fn group_key(&self) -> Option<String> {
        None
    }
}

/// Decodes a fetched JSON array record by record, dropping entries that are
/// not records at all instead of failing the batch.
pub fn decode_records<R: DeserializeOwned>(values: Vec<Value>) -> Vec<R> {
    let total = values.len();
    let records: Vec<R> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect();

    if records.len() != total {
        tracing::warn!(
            decoded = records.len(),
            total,
            "Some fetched records could not be decoded"
        );
    }

    records
}

/// Returns the trimmed value, or `None` when it is empty.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn or_missing(value: &str) -> String {
    non_empty(value).unwrap_or_else(|| MISSING.to_string())
}

pub(crate) fn opt_or_missing(value: Option<&str>) -> String {
    value.map_or_else(|| MISSING.to_string(), or_missing)
}

/// Joins list items, or `None` when the list is empty.
pub(crate) fn join_non_empty(items: &[String], separator: &str) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(separator))
    }
}
