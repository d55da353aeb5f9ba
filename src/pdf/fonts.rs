//! Built-in Helvetica metrics and WinAnsi text encoding
//!
//! The report draws with the standard Helvetica and Helvetica-Bold fonts and
//! needs two primitives: measuring a string at a font size (for centering and
//! right-alignment) and encoding text as WinAnsi bytes so accented Portuguese
//! renders correctly in plain PDF string literals.

use lopdf::{Dictionary, Object};

/// The two faces the report uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

/// Helvetica glyph widths for WinAnsi codes 32-255, in 1/1000 em
///
/// Values from the Adobe AFM for the base-14 Helvetica face. Codes without a
/// glyph carry 0.
const HELVETICA_WIDTHS: [i64; 224] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0, // 112-127
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, // 128-143
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667, // 144-159
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 160-175
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 176-191
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 192-207
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 208-223
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 224-239
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 240-255
];

/// Helvetica-Bold glyph widths for WinAnsi codes 32-255, in 1/1000 em
const HELVETICA_BOLD_WIDTHS: [i64; 224] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 0, // 112-127
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, // 128-143
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667, // 144-159
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 160-175
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 176-191
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 192-207
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 208-223
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, // 224-239
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556, // 240-255
];

fn widths(face: Face) -> &'static [i64; 224] {
    match face {
        Face::Regular => &HELVETICA_WIDTHS,
        Face::Bold => &HELVETICA_BOLD_WIDTHS,
    }
}

/// Map a character to its WinAnsi code, if it has one
///
/// ASCII and Latin-1 map straight through; the 0x80-0x9F window holds the
/// WinAnsi specials (euro, curly quotes, dashes, ellipsis and friends).
pub fn win_ansi_code(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{a0}'..='\u{ff}' => Some(c as u32 as u8),
        '\u{20ac}' => Some(0x80), // €
        '\u{201a}' => Some(0x82),
        '\u{192}' => Some(0x83),
        '\u{201e}' => Some(0x84),
        '\u{2026}' => Some(0x85), // …
        '\u{2020}' => Some(0x86),
        '\u{2021}' => Some(0x87),
        '\u{2c6}' => Some(0x88),
        '\u{2030}' => Some(0x89),
        '\u{160}' => Some(0x8a),
        '\u{2039}' => Some(0x8b),
        '\u{152}' => Some(0x8c),
        '\u{17d}' => Some(0x8e),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201c}' => Some(0x93),
        '\u{201d}' => Some(0x94),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96), // –
        '\u{2014}' => Some(0x97), // —
        '\u{2dc}' => Some(0x98),
        '\u{2122}' => Some(0x99),
        '\u{161}' => Some(0x9a),
        '\u{203a}' => Some(0x9b),
        '\u{153}' => Some(0x9c),
        '\u{17e}' => Some(0x9e),
        '\u{178}' => Some(0x9f),
        _ => None,
    }
}

/// Encode text as WinAnsi bytes; characters outside the encoding become '?'
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_code(c).unwrap_or(b'?'))
        .collect()
}

/// Measure a string at a font size using the per-glyph width tables
///
/// Unencodable characters measure as '?', matching what `encode_win_ansi`
/// will actually draw.
pub fn text_width(text: &str, face: Face, font_size: f64) -> f64 {
    let table = widths(face);
    let units: i64 = text
        .chars()
        .map(|c| {
            let code = win_ansi_code(c).unwrap_or(b'?');
            if code < 32 {
                0
            } else {
                table[(code - 32) as usize]
            }
        })
        .sum();
    units as f64 * font_size / 1000.0
}

/// Font dictionary for one of the built-in Helvetica faces
///
/// Base-14 fonts need no embedded program; declaring WinAnsiEncoding is what
/// lets single-byte string literals carry the accented range.
pub fn font_dictionary(face: Face) -> Dictionary {
    let base = match face {
        Face::Regular => "Helvetica",
        Face::Bold => "Helvetica-Bold",
    };
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_maps_through() {
        assert_eq!(encode_win_ansi("JOSE DA SILVA"), b"JOSE DA SILVA".to_vec());
    }

    #[test]
    fn test_accented_portuguese_encodes() {
        let bytes = encode_win_ansi("Relatório");
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[6], 0xf3); // ó

        let nao = encode_win_ansi("Não");
        assert_eq!(nao, vec![b'N', 0xe3, b'o']);
    }

    #[test]
    fn test_unencodable_becomes_question_mark() {
        assert_eq!(encode_win_ansi("漢"), vec![b'?']);
    }

    #[test]
    fn test_width_scales_with_font_size() {
        let at_ten = text_width("182,54", Face::Regular, 10.0);
        let at_twenty = text_width("182,54", Face::Regular, 20.0);
        assert!((at_twenty - 2.0 * at_ten).abs() < 1e-9);
    }

    #[test]
    fn test_digits_share_a_width() {
        // All Helvetica digits are 556 units wide, so equal-length numeric
        // strings measure the same. Right-aligned columns rely on this.
        let a = text_width("111111", Face::Regular, 10.0);
        let b = text_width("999999", Face::Regular, 10.0);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_bold_wider_than_regular() {
        let regular = text_width("Relatório de Boletos", Face::Regular, 16.0);
        let bold = text_width("Relatório de Boletos", Face::Bold, 16.0);
        assert!(bold > regular);
    }
}
