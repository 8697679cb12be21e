//! End-to-end exports of typed and ad-hoc records.

mod common;

use std::io::Read;

use serde_json::{json, Value};

use docket::config::{load_config_from_str, LayoutConfig};
use docket::record::decode_records;
use docket::{BusinessRecord, DocumentComposer, ExportRecord};

use common::{text_post, BusinessBuilder, ProjectBuilder};

fn businesses() -> Vec<BusinessRecord> {
    vec![
        BusinessBuilder::new("b1", "Acme")
            .product("Anvils")
            .competitor("Globex", &["Widgets", "Gadgets"])
            .website_urls(&["https://acme.test/about"])
            .post(
                "https://acme.test",
                "https://x.com/acme",
                "X",
                text_post("Launch day", "https://x.com/acme/1"),
            )
            .post(
                "https://acme.test",
                "https://x.com/acme",
                "X",
                text_post("Thanks all", "https://x.com/acme/2"),
            )
            .post(
                "https://acme.test",
                "https://linkedin.com/company/acme",
                "LinkedIn",
                text_post("Hiring", "https://linkedin.com/posts/1"),
            )
            .build(),
        BusinessBuilder::new("b2", "Initech").build(),
    ]
}

#[test]
fn test_business_table_flattens_feeds_into_groups() {
    let table = DocumentComposer::default().table(&businesses());

    let groups: Vec<&str> = table
        .columns
        .iter()
        .filter(|c| c.starts_with("group_") || c.starts_with("item_"))
        .map(String::as_str)
        .collect();
    assert_eq!(
        groups,
        vec!["group_1", "item_1_1", "group_2", "item_2_1", "item_2_2"]
    );
    assert_eq!(table.columns[0], "id");

    assert!(table.cell(0, "group_2").unwrap().contains("Platform Name: X"));
    assert!(table.cell(0, "item_2_2").unwrap().contains("Thanks all"));
    assert!(table.cell(0, "competitors").unwrap().contains("Products: Widgets, Gadgets"));

    for column in ["product", "location", "group_1", "item_2_2", "competitors"] {
        assert_eq!(table.cell(1, column), Some("N/A"), "column {}", column);
    }
    assert!(table.rows.iter().all(|row| row.len() == table.columns.len()));
}

#[test]
fn test_business_pdf_has_one_title_per_record() {
    let composer = DocumentComposer::default();
    let records = businesses();

    let document = composer.to_paginated_document(&records);
    let titles: Vec<(usize, &str)> = document
        .text_runs()
        .filter(|(_, text)| text.starts_with("Competitor: "))
        .collect();
    assert_eq!(titles.len(), 2);
    assert_eq!(titles[0], (0, "Competitor: Acme"));
    assert!(titles[1].0 > titles[0].0);

    let bytes = composer.to_pdf(&records).unwrap();
    let reloaded = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(reloaded.get_pages().len(), document.pages.len());
}

#[test]
fn test_ad_hoc_records_from_json_file_contents() {
    let values: Vec<Value> = decode_records(vec![
        json!({"name": "A", "products": [], "services": []}),
        json!({"name": "B", "products": ["x", "y"], "extra": {"k": "v"}}),
        json!("not a record"),
    ]);
    // A bare string still decodes as a `Value`; drop non-objects the way a
    // caller would before exporting.
    let records: Vec<Value> = values.into_iter().filter(Value::is_object).collect();
    assert_eq!(records.len(), 2);

    let table = DocumentComposer::default().table(&records);
    assert_eq!(table.cell(0, "products"), Some("N/A"));
    assert_eq!(table.cell(0, "services"), Some("N/A"));
    assert_eq!(table.cell(1, "products"), Some("x, y"));
    assert_eq!(table.cell(1, "services"), Some("N/A"));
    assert_eq!(records[1].title(), "Record: B");
}

#[test]
fn test_configured_sheet_name_and_layout_are_used() {
    let config = load_config_from_str(
        r#"{
            "version": "1.0",
            "layout": { "margin": 40, "body_size": 10 },
            "export": { "sheet_name": "Projects" }
        }"#,
    )
    .unwrap();
    let composer = DocumentComposer::new(config.layout.clone(), &config.export.sheet_name);
    let records = vec![
        ProjectBuilder::new("p1").name("Fish & Chips").build(),
        ProjectBuilder::new("p2").link("https://notion.test/p2").approved(true).build(),
    ];

    let bytes = composer.to_table(&records).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut workbook = String::new();
    archive
        .by_name("xl/workbook.xml")
        .unwrap()
        .read_to_string(&mut workbook)
        .unwrap();
    assert!(workbook.contains(r#"name="Projects""#));

    let mut sheet = String::new();
    archive
        .by_name("xl/worksheets/sheet1.xml")
        .unwrap()
        .read_to_string(&mut sheet)
        .unwrap();
    assert!(sheet.contains("Fish &amp; Chips"));

    let document = composer.to_paginated_document(&records);
    let default_margin = LayoutConfig::default().margin;
    assert_ne!(composer.layout().margin, default_margin);
    let first_title = document.pages[0].ops.iter().find_map(|op| match op {
        docket::composer::DrawOp::Text { x, text, .. } if text.starts_with("Project Report") => {
            Some(*x)
        }
        _ => None,
    });
    assert_eq!(first_title, Some(40.0));
}

#[test]
fn test_exports_are_deterministic() {
    let composer = DocumentComposer::default();
    let records = businesses();
    assert_eq!(composer.to_snapshot(&records).unwrap(), composer.to_snapshot(&records).unwrap());
    assert_eq!(composer.to_csv(&records), composer.to_csv(&records));
    assert_eq!(
        composer.to_paginated_document(&records),
        composer.to_paginated_document(&records)
    );
}
