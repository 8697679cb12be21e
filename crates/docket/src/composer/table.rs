//! Flattened one-row-per-record tables and their spreadsheet encodings.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::ExportError;
use crate::record::{TableRow, MISSING};
use crate::sanitize::sanitize_xml;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIP_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Column names plus fully populated rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds the column layout from every row, then fills each cell.
    ///
    /// Base columns keep first-appearance order. Group `n` contributes
    /// `group_n` followed by `item_n_1..=item_n_k`, where `k` is the most
    /// items any row has in that group.
    pub fn from_rows(rows: &[TableRow]) -> Self {
        let mut base: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut items_per_group: Vec<usize> = Vec::new();

        for row in rows {
            for (name, _) in &row.cells {
                if seen.insert(name.as_str()) {
                    base.push(name.clone());
                }
            }
            for (index, group) in row.groups.iter().enumerate() {
                if items_per_group.len() <= index {
                    items_per_group.push(0);
                }
                items_per_group[index] = items_per_group[index].max(group.items.len());
            }
        }

        let mut columns = base.clone();
        for (index, item_count) in items_per_group.iter().enumerate() {
            let n = index + 1;
            columns.push(format!("group_{}", n));
            columns.extend((1..=*item_count).map(|m| format!("item_{}_{}", n, m)));
        }

        let cells = rows
            .iter()
            .map(|row| {
                let mut values: Vec<String> = base
                    .iter()
                    .map(|column| {
                        row.cells
                            .iter()
                            .find(|(name, _)| name == column)
                            .and_then(|(_, value)| value.clone())
                            .unwrap_or_else(|| MISSING.to_string())
                    })
                    .collect();

                for (index, item_count) in items_per_group.iter().enumerate() {
                    let group = row.groups.get(index);
                    values.push(
                        group
                            .and_then(|g| g.label.clone())
                            .unwrap_or_else(|| MISSING.to_string()),
                    );
                    for m in 0..*item_count {
                        values.push(
                            group
                                .and_then(|g| g.items.get(m).cloned())
                                .unwrap_or_else(|| MISSING.to_string()),
                        );
                    }
                }

                values
            })
            .collect();

        Self {
            columns,
            rows: cells,
        }
    }

    /// Cell under `column` in row `row`.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    /// Comma-separated rendering with a header line.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for line in std::iter::once(&self.columns).chain(self.rows.iter()) {
            let fields: Vec<String> = line.iter().map(|v| csv_field(v)).collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    /// Single-sheet XLSX workbook with a header row and inline strings.
    pub fn to_xlsx(&self, sheet_name: &str) -> Result<Vec<u8>, ExportError> {
        let sheet = sheet_xml(self)?;
        let workbook = workbook_xml(&sanitize_sheet_name(sheet_name))?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let parts: [(&str, &[u8]); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("xl/workbook.xml", workbook.as_slice()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            ("xl/worksheets/sheet1.xml", sheet.as_slice()),
        ];

        for (name, bytes) in parts {
            zip.start_file(name, options)
                .map_err(|e| ExportError::Spreadsheet(format!("{}: {}", name, e)))?;
            zip.write_all(bytes)
                .map_err(|e| ExportError::Spreadsheet(format!("{}: {}", name, e)))?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| ExportError::Spreadsheet(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Spreadsheet column letters: 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Sheet names are limited to 31 characters and may not contain `[]:*?/\`.
fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .filter(|c| !c.is_control())
        .take(31)
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), ExportError> {
    writer
        .write_event(event)
        .map_err(|e| ExportError::Spreadsheet(e.to_string()))
}

fn inline_cell<W: Write>(
    writer: &mut Writer<W>,
    reference: &str,
    value: &str,
) -> Result<(), ExportError> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", reference));
    cell.push_attribute(("t", "inlineStr"));
    emit(writer, Event::Start(cell))?;
    emit(writer, Event::Start(BytesStart::new("is")))?;

    let mut text = BytesStart::new("t");
    text.push_attribute(("xml:space", "preserve"));
    emit(writer, Event::Start(text))?;
    let clean = sanitize_xml(value);
    emit(writer, Event::Text(BytesText::new(&clean)))?;
    emit(writer, Event::End(BytesEnd::new("t")))?;

    emit(writer, Event::End(BytesEnd::new("is")))?;
    emit(writer, Event::End(BytesEnd::new("c")))
}

fn sheet_xml(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;

    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", SPREADSHEET_NS));
    emit(&mut writer, Event::Start(worksheet))?;
    emit(&mut writer, Event::Start(BytesStart::new("sheetData")))?;

    for (row_index, line) in std::iter::once(&table.columns)
        .chain(table.rows.iter())
        .enumerate()
    {
        let row_number = (row_index + 1).to_string();
        let mut row = BytesStart::new("row");
        row.push_attribute(("r", row_number.as_str()));
        emit(&mut writer, Event::Start(row))?;

        for (column_index, value) in line.iter().enumerate() {
            let reference = format!("{}{}", column_letter(column_index), row_number);
            inline_cell(&mut writer, &reference, value)?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("row")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("sheetData")))?;
    emit(&mut writer, Event::End(BytesEnd::new("worksheet")))?;

    Ok(writer.into_inner().into_inner())
}

fn workbook_xml(sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;

    let mut workbook = BytesStart::new("workbook");
    workbook.push_attribute(("xmlns", SPREADSHEET_NS));
    workbook.push_attribute(("xmlns:r", RELATIONSHIP_NS));
    emit(&mut writer, Event::Start(workbook))?;
    emit(&mut writer, Event::Start(BytesStart::new("sheets")))?;

    let mut sheet = BytesStart::new("sheet");
    sheet.push_attribute(("name", sheet_name));
    sheet.push_attribute(("sheetId", "1"));
    sheet.push_attribute(("r:id", "rId1"));
    emit(&mut writer, Event::Empty(sheet))?;

    emit(&mut writer, Event::End(BytesEnd::new("sheets")))?;
    emit(&mut writer, Event::End(BytesEnd::new("workbook")))?;

    Ok(writer.into_inner().into_inner())
}

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"</Types>"#,
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const WORKBOOK_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"</Relationships>"#,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RowGroup;
    use std::io::Read;

    fn row(cells: &[(&str, Option<&str>)], groups: Vec<RowGroup>) -> TableRow {
        TableRow {
            cells: cells
                .iter()
                .map(|(n, v)| (n.to_string(), v.map(str::to_string)))
                .collect(),
            groups,
        }
    }

    fn group(label: &str, items: &[&str]) -> RowGroup {
        RowGroup {
            label: Some(label.to_string()),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn read_part(xlsx: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(xlsx)).unwrap();
        let mut xml = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_group_columns_follow_base_columns() {
        let rows = vec![
            row(
                &[("name", Some("A"))],
                vec![group("g1", &["x", "y"]), group("g2", &[])],
            ),
            row(&[("name", Some("B")), ("extra", Some("e"))], vec![group("h1", &["z"])]),
        ];
        let table = Table::from_rows(&rows);

        assert_eq!(
            table.columns,
            vec!["name", "extra", "group_1", "item_1_1", "item_1_2", "group_2"]
        );
        assert_eq!(table.rows[0], vec!["A", "N/A", "g1", "x", "y", "g2"]);
        assert_eq!(table.rows[1], vec!["B", "e", "h1", "z", "N/A", "N/A"]);
    }

    #[test]
    fn test_every_cell_populated() {
        let rows = vec![row(&[("a", None), ("b", Some("1"))], vec![])];
        let table = Table::from_rows(&rows);
        assert_eq!(table.cell(0, "a"), Some("N/A"));
        assert_eq!(table.cell(0, "b"), Some("1"));
        assert_eq!(table.cell(0, "missing"), None);
    }

    #[test]
    fn test_empty_rows_yield_empty_table() {
        let table = Table::from_rows(&[]);
        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
        assert_eq!(table.to_csv(), "\n");
    }

    #[test]
    fn test_csv_quotes_special_fields() {
        let table = Table {
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec!["x, y".into(), "say \"hi\"".into()]],
        };
        assert_eq!(table.to_csv(), "a,b\n\"x, y\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_sheet_name_sanitized() {
        assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]"), "Q1Q2 draft");
        assert_eq!(sanitize_sheet_name("???"), "Sheet1");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn test_xlsx_contains_header_and_cells() {
        let rows = vec![row(&[("name", Some("Fish & <Chips>")), ("products", None)], vec![])];
        let xlsx = Table::from_rows(&rows).to_xlsx("Records").unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(xlsx.as_slice())).unwrap();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/worksheets/sheet1.xml",
        ] {
            assert!(archive.by_name(part).is_ok(), "missing part {}", part);
        }

        let workbook = read_part(&xlsx, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Records""#));

        let sheet = read_part(&xlsx, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="A1" t="inlineStr">"#));
        assert!(sheet.contains(">name</t>"));
        assert!(sheet.contains(">products</t>"));
        assert!(sheet.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(sheet.contains(r#"<c r="B2" t="inlineStr"><is><t xml:space="preserve">N/A</t>"#));
    }
}
