use lopdf::{dictionary, Document as PdfDocument, Object, Stream};

use crate::composer::layout::{Color, Document, DrawOp};
use crate::composer::metrics::Font;
use crate::error::ExportError;

/// Serializes a laid-out document. Every page shares one resource dictionary
/// holding both fonts and every embedded image.
pub fn render(document: &Document) -> Result<Vec<u8>, ExportError> {
    let _span = tracing::debug_span!("composer.pdf", pages = document.pages.len()).entered();

    let mut doc = PdfDocument::with_version("1.5");

    let pages_id = doc.new_object_id();
    let resources_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for font in [Font::Regular, Font::Bold] {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }

    let mut images = lopdf::Dictionary::new();
    for (index, image) in document.images.iter().enumerate() {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.pixel_width),
                "Height" => i64::from(image.pixel_height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.rgb.clone(),
        );
        let image_id = doc.add_object(Object::Stream(stream));
        images.set(image_name(index), image_id);
    }

    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "Font" => fonts,
            "XObject" => images,
        }),
    );

    let media_box = vec![
        0.into(),
        0.into(),
        Object::Real(document.width as f32),
        Object::Real(document.height as f32),
    ];

    let mut page_ids = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content: String = page.ops.iter().map(content_for).collect();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    Ok(buffer)
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn color(color: &Color) -> String {
    format!("{:.3} {:.3} {:.3}", color.r, color.g, color.b)
}

fn content_for(op: &DrawOp) -> String {
    match op {
        DrawOp::Text {
            x,
            y,
            text,
            font,
            size,
            color: fill,
        } => format!(
            "BT\n/{} {:.2} Tf\n{} rg\n{:.2} {:.2} Td\n({}) Tj\nET\n",
            font.resource_name(),
            size,
            color(fill),
            x,
            y,
            escape_pdf_string(text)
        ),
        DrawOp::Line {
            from,
            to,
            thickness,
            color: stroke,
        } => format!(
            "{} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\n",
            color(stroke),
            thickness,
            from.0,
            from.1,
            to.0,
            to.1
        ),
        DrawOp::Image {
            x,
            y,
            width,
            height,
            image,
        } => format!(
            "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ\n",
            width,
            height,
            x,
            y,
            image_name(*image)
        ),
    }
}

fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::layout::{EmbeddedImage, Page, PRIMARY, RULE};

    fn sample() -> Document {
        Document {
            width: 595.28,
            height: 841.89,
            pages: vec![
                Page {
                    ops: vec![
                        DrawOp::Text {
                            x: 60.0,
                            y: 781.89,
                            text: "Competitor: (Acme)".to_string(),
                            font: Font::Bold,
                            size: 20.0,
                            color: PRIMARY,
                        },
                        DrawOp::Line {
                            from: (60.0, 700.0),
                            to: (535.28, 700.0),
                            thickness: 1.0,
                            color: RULE,
                        },
                    ],
                },
                Page {
                    ops: vec![DrawOp::Image {
                        x: 60.0,
                        y: 500.0,
                        width: 20.0,
                        height: 10.0,
                        image: 0,
                    }],
                },
            ],
            images: vec![EmbeddedImage {
                pixel_width: 2,
                pixel_height: 1,
                rgb: vec![255, 0, 0, 0, 0, 255],
            }],
        }
    }

    #[test]
    fn test_rendered_pdf_reloads_with_all_pages() {
        let bytes = render(&sample()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let reloaded = PdfDocument::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }

    #[test]
    fn test_text_is_extractable() {
        let bytes = render(&sample()).unwrap();
        let reloaded = PdfDocument::load_mem(&bytes).unwrap();
        let text = reloaded.extract_text(&[1]).unwrap();
        assert!(text.contains("Competitor: (Acme)"));
    }

    #[test]
    fn test_zero_page_document_still_renders() {
        let document = Document {
            width: 595.28,
            height: 841.89,
            pages: vec![],
            images: vec![],
        };
        let bytes = render(&document).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_content_operators() {
        let ops = &sample().pages[0].ops;
        let text = content_for(&ops[0]);
        assert!(text.contains("/F2 20.00 Tf"));
        assert!(text.contains("(Competitor: \\(Acme\\)) Tj"));
        assert!(text.contains("0.100 0.400 0.700 rg"));

        let line = content_for(&ops[1]);
        assert!(line.contains("60.00 700.00 m"));
        assert!(line.contains("535.28 700.00 l"));

        let image = content_for(&sample().pages[1].ops[0]);
        assert!(image.contains("20.00 0 0 10.00 60.00 500.00 cm"));
        assert!(image.contains("/Im1 Do"));
    }
}
