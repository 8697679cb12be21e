//! Projects awaiting approval.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::lenient::or_empty;
use super::{non_empty, or_missing, ExportRecord, Section, TableRow};

/// A project record as listed by the backend's project endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default, deserialize_with = "or_empty")]
    pub notion_id: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub project_name: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub business_name: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub team_department: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub assigned_person: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub priority: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub due_date: String,
    /// Set by the backend once an approval job succeeded.
    #[serde(default, deserialize_with = "or_empty")]
    pub approved: bool,
}

impl ProjectRecord {
    fn detail_lines(&self) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "Project Name: {}", or_missing(&self.project_name));
        let _ = writeln!(body, "Business Name: {}", or_missing(&self.business_name));
        let _ = writeln!(body, "Status: {}", or_missing(&self.status));
        let _ = writeln!(
            body,
            "Team/Department: {}",
            or_missing(&self.team_department)
        );
        let _ = writeln!(
            body,
            "Assigned Person: {}",
            or_missing(&self.assigned_person)
        );
        let _ = writeln!(body, "Priority: {}", or_missing(&self.priority));
        let _ = write!(body, "Due Date: {}", or_missing(&self.due_date));
        if let Some(link) = self.link.as_deref().and_then(non_empty) {
            let _ = write!(body, "\nLink: {}", link);
        }
        body
    }
}

impl ExportRecord for ProjectRecord {
    fn record_id(&self) -> String {
        self.notion_id.clone()
    }

    fn title(&self) -> String {
        format!("Project Report: {}", or_missing(&self.project_name))
    }

    fn sections(&self) -> Vec<Section> {
        let approval = if self.approved {
            "Approved"
        } else {
            "Awaiting approval"
        };
        vec![
            Section::new("Project Details", self.detail_lines()),
            Section::new("Approval", approval),
        ]
    }

    fn table_row(&self) -> TableRow {
        let mut row = TableRow::default();
        row.cell("notion_id", non_empty(&self.notion_id))
            .cell("project_name", non_empty(&self.project_name))
            .cell("business_name", non_empty(&self.business_name))
            .cell("status", non_empty(&self.status))
            .cell("team_department", non_empty(&self.team_department))
            .cell("assigned_person", non_empty(&self.assigned_person))
            .cell("priority", non_empty(&self.priority))
            .cell("due_date", non_empty(&self.due_date))
            .cell("link", self.link.as_deref().and_then(non_empty))
            .cell(
                "approved",
                Some(if self.approved { "Yes" } else { "No" }.to_string()),
            );
        row
    }

    fn group_key(&self) -> Option<String> {
        non_empty(&self.team_department)
    }
}
