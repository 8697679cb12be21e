//! Pure pagination of record sections into positioned draw operations.
//!
//! Coordinates follow PDF conventions: origin at the bottom-left corner,
//! `y` grows upwards, and text is positioned by its baseline.

use std::io::Cursor;

use crate::composer::metrics::{text_width, Font};
use crate::config::LayoutConfig;
use crate::record::{ExportRecord, Section};
use crate::sanitize::sanitize_text;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

pub const PRIMARY: Color = Color::rgb(0.1, 0.4, 0.7);
pub const SECONDARY: Color = Color::rgb(0.3, 0.3, 0.3);
pub const RULE: Color = Color::rgb(0.8, 0.8, 0.8);

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f64,
        y: f64,
        text: String,
        font: Font,
        size: f64,
        color: Color,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        thickness: f64,
        color: Color,
    },
    /// Draws `Document::images[image]` with its lower-left corner at `(x, y)`.
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

/// Decoded RGB8 pixels ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub rgb: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub width: f64,
    pub height: f64,
    pub pages: Vec<Page>,
    pub images: Vec<EmbeddedImage>,
}

impl Document {
    /// All text runs in page order, paired with their page index.
    pub fn text_runs(&self) -> impl Iterator<Item = (usize, &str)> {
        self.pages.iter().enumerate().flat_map(|(index, page)| {
            page.ops.iter().filter_map(move |op| match op {
                DrawOp::Text { text, .. } => Some((index, text.as_str())),
                _ => None,
            })
        })
    }
}

/// Greedy word wrap.
///
/// Explicit newlines are kept as line breaks; an empty input line yields an
/// empty output line. A word wider than `max_width` is placed alone on its
/// own line rather than split.
pub fn wrap_text(text: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            let candidate_width = text_width(&current, font, size)
                + text_width(" ", font, size)
                + text_width(word, font, size);
            if candidate_width <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }

    lines
}

/// Vertical cursor over a growing list of pages.
struct PageWriter<'a> {
    layout: &'a LayoutConfig,
    pages: Vec<Page>,
    images: Vec<EmbeddedImage>,
    y: f64,
}

impl<'a> PageWriter<'a> {
    fn new(layout: &'a LayoutConfig) -> Self {
        Self {
            layout,
            pages: Vec::new(),
            images: Vec::new(),
            y: layout.top(),
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.layout.top();
    }

    fn push(&mut self, op: DrawOp) {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn remaining(&self) -> f64 {
        self.y - self.layout.bottom()
    }

    fn text(&mut self, text: &str, font: Font, size: f64, color: Color) {
        self.push(DrawOp::Text {
            x: self.layout.margin,
            y: self.y,
            text: text.to_string(),
            font,
            size,
            color,
        });
    }

    fn record(&mut self, record: &impl ExportRecord) {
        let layout = self.layout;
        self.new_page();

        let title = sanitize_text(&record.title()).replace('\n', " ");
        self.text(&title, Font::Bold, layout.title_size, PRIMARY);
        self.y -= layout.title_size * 2.0;

        for section in record.sections() {
            self.section(&section);
        }
    }

    fn section(&mut self, section: &Section) {
        let layout = self.layout;

        if self.remaining() < layout.section_min_space() {
            self.new_page();
        }

        let heading = sanitize_text(&section.title).replace('\n', " ");
        self.text(&heading, Font::Bold, layout.heading_size, PRIMARY);
        self.y -= layout.heading_size + layout.heading_gap;

        self.push(DrawOp::Line {
            from: (layout.margin, self.y),
            to: (layout.page_width - layout.margin, self.y),
            thickness: 1.0,
            color: RULE,
        });
        self.y -= layout.separator_gap;

        if let Some(bytes) = &section.image {
            self.image(bytes, &section.title);
        }

        let body = sanitize_text(&section.body);
        let lines = wrap_text(
            &body,
            Font::Regular,
            layout.body_size,
            layout.content_width(),
        );
        for line in lines {
            if self.y < layout.bottom() {
                self.new_page();
            }
            if !line.is_empty() {
                self.text(&line, Font::Regular, layout.body_size, SECONDARY);
            }
            self.y -= layout.line_height();
        }

        self.y -= layout.trailing_gap();
    }

    fn image(&mut self, bytes: &[u8], section_title: &str) {
        let layout = self.layout;

        let decoded = match decode_image(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(
                    section = section_title,
                    error = %e,
                    "Skipping undecodable section image"
                );
                return;
            }
        };

        let native_width = f64::from(decoded.pixel_width);
        let native_height = f64::from(decoded.pixel_height);
        if native_width <= 0.0 || native_height <= 0.0 {
            return;
        }

        let mut width = native_width
            .min(layout.content_width())
            .min(layout.image_max_width);
        let mut height = native_height * width / native_width;

        // Never taller than a fresh page can hold.
        let usable_height = layout.top() - layout.bottom();
        if height > usable_height {
            height = usable_height;
            width = native_width * height / native_height;
        }

        if self.y - height < layout.bottom() {
            self.new_page();
        }

        let index = self.images.len();
        self.images.push(decoded);
        self.push(DrawOp::Image {
            x: layout.margin,
            y: self.y - height,
            width,
            height,
            image: index,
        });
        self.y -= height + layout.separator_gap;
    }

    fn finish(self) -> Document {
        Document {
            width: self.layout.page_width,
            height: self.layout.page_height,
            pages: self.pages,
            images: self.images,
        }
    }
}

fn decode_image(bytes: &[u8]) -> Result<EmbeddedImage, image::ImageError> {
    let (pixel_width, pixel_height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    let rgb = image::load_from_memory(bytes)?.to_rgb8().into_raw();

    Ok(EmbeddedImage {
        pixel_width,
        pixel_height,
        rgb,
    })
}

/// Lays out every record starting on a fresh page. No records, no pages.
pub fn paginate<R: ExportRecord>(records: &[R], layout: &LayoutConfig) -> Document {
    let mut writer = PageWriter::new(layout);
    for record in records {
        writer.record(record);
    }
    writer.finish()
}
