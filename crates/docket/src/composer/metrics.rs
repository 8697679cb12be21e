//! Advance widths for the two standard fonts the renderer embeds.
//!
//! Values are the Adobe AFM widths (1/1000 em) for character codes 32..=126.

/// Base font used for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Resource name the renderer registers this font under.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Times-Roman",
            Font::Bold => "Times-Bold",
        }
    }
}

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    // 0-9
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    // : ; < = > ? @
    278, 278, 564, 564, 564, 444, 921,
    // A-Z
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    // [ \ ] ^ _ `
    333, 278, 333, 469, 500, 333,
    // a-z
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    // { | } ~
    480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 930,
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
    722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
    333, 278, 333, 581, 500, 333,
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
    556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
    394, 220, 394, 520,
];

/// Width used for characters outside the table. Sanitized text never hits it.
const FALLBACK_WIDTH: u16 = 500;

pub fn char_width(font: Font, c: char) -> u16 {
    let table = match font {
        Font::Regular => &TIMES_ROMAN,
        Font::Bold => &TIMES_BOLD,
    };
    let code = c as u32;
    if (32..=126).contains(&code) {
        table[(code - 32) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Width of `text` in points at `size`.
pub fn text_width(text: &str, font: Font, size: f64) -> f64 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(font, c))).sum();
    f64::from(units) * size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_glyph_widths() {
        assert_eq!(char_width(Font::Regular, ' '), 250);
        assert_eq!(char_width(Font::Regular, 'W'), 944);
        assert_eq!(char_width(Font::Regular, 'z'), 444);
        assert_eq!(char_width(Font::Regular, '~'), 541);
        assert_eq!(char_width(Font::Bold, 'W'), 1000);
        assert_eq!(char_width(Font::Bold, 'm'), 833);
        assert_eq!(char_width(Font::Bold, '~'), 520);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        // "Hi" = 722 + 278
        assert!((text_width("Hi", Font::Regular, 10.0) - 10.0).abs() < 1e-9);
        assert!((text_width("Hi", Font::Regular, 20.0) - 20.0).abs() < 1e-9);
        assert_eq!(text_width("", Font::Bold, 12.0), 0.0);
    }

    #[test]
    fn test_bold_is_wider() {
        let text = "Competitor Analysis";
        assert!(text_width(text, Font::Bold, 12.0) > text_width(text, Font::Regular, 12.0));
    }
}
