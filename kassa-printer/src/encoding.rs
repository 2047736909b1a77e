//! PC858 encoding utilities for Western-European thermal printers
//!
//! Receipt printers in the Benelux run code page 858 (CP850 with the Euro
//! sign at 0xD5). Every character maps to exactly one byte, so the column
//! width of a string is its encoded length.
//!
//! This module provides utilities for:
//! - Converting UTF-8 text to PC858 bytes
//! - Calculating column widths
//! - Two-column (price line) padding

/// Euro glyph in code page 858
pub const EURO: u8 = 0xD5;

/// Replacement byte for characters the code page cannot represent
const UNMAPPED: u8 = b'?';

/// Get the printed column width of a string
///
/// PC858 is a single-byte code page, so this equals the encoded length.
pub fn pc858_width(s: &str) -> usize {
    s.chars().count()
}

/// Convert UTF-8 text to PC858 bytes
///
/// ASCII is preserved exactly. `€` becomes [`EURO`], accented Latin letters
/// map to their CP850 positions and anything else is printed as `?`.
pub fn encode_pc858(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        out.push(pc858_byte(c));
    }
    out
}

/// Number of spaces between the left and right column of a price line
///
/// Never less than one, even when the columns overflow the width.
pub fn line_padding(left: &str, right: &str, width: usize) -> usize {
    width
        .saturating_sub(pc858_width(left) + pc858_width(right))
        .max(1)
}

/// Render `left`, padding, then `right` so that `right` ends at `width`
pub fn price_line(left: &str, right: &str, width: usize) -> String {
    let spaces = line_padding(left, right, width);
    format!("{}{}{}", left, " ".repeat(spaces), right)
}

fn pc858_byte(c: char) -> u8 {
    if c.is_ascii() {
        return c as u8;
    }
    match c {
        '€' => EURO,
        'Ç' => 0x80,
        'ü' => 0x81,
        'é' => 0x82,
        'â' => 0x83,
        'ä' => 0x84,
        'à' => 0x85,
        'å' => 0x86,
        'ç' => 0x87,
        'ê' => 0x88,
        'ë' => 0x89,
        'è' => 0x8A,
        'ï' => 0x8B,
        'î' => 0x8C,
        'ì' => 0x8D,
        'Ä' => 0x8E,
        'Å' => 0x8F,
        'É' => 0x90,
        'æ' => 0x91,
        'Æ' => 0x92,
        'ô' => 0x93,
        'ö' => 0x94,
        'ò' => 0x95,
        'û' => 0x96,
        'ù' => 0x97,
        'ÿ' => 0x98,
        'Ö' => 0x99,
        'Ü' => 0x9A,
        'ø' => 0x9B,
        '£' => 0x9C,
        'Ø' => 0x9D,
        '×' => 0x9E,
        'á' => 0xA0,
        'í' => 0xA1,
        'ó' => 0xA2,
        'ú' => 0xA3,
        'ñ' => 0xA4,
        'Ñ' => 0xA5,
        'ª' => 0xA6,
        'º' => 0xA7,
        '¿' => 0xA8,
        '®' => 0xA9,
        '½' => 0xAB,
        '¼' => 0xAC,
        '¡' => 0xAD,
        '«' => 0xAE,
        '»' => 0xAF,
        'Á' => 0xB5,
        'Â' => 0xB6,
        'À' => 0xB7,
        '©' => 0xB8,
        'ã' => 0xC6,
        'Ã' => 0xC7,
        'Ê' => 0xD2,
        'Ë' => 0xD3,
        'È' => 0xD4,
        'Í' => 0xD6,
        'Î' => 0xD7,
        'Ï' => 0xD8,
        'Ì' => 0xDE,
        'Ó' => 0xE0,
        'ß' => 0xE1,
        'Ô' => 0xE2,
        'Ò' => 0xE3,
        'õ' => 0xE4,
        'Õ' => 0xE5,
        'µ' => 0xE6,
        'Ú' => 0xE9,
        'Û' => 0xEA,
        'Ù' => 0xEB,
        '±' => 0xF1,
        '§' => 0xF5,
        '÷' => 0xF6,
        '°' => 0xF8,
        '·' => 0xFA,
        '²' => 0xFD,
        '\u{a0}' => 0xFF,
        _ => UNMAPPED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pc858_width() {
        assert_eq!(pc858_width("hello"), 5);
        assert_eq!(pc858_width("€6.00"), 5);
        assert_eq!(pc858_width("café"), 4);
    }

    #[test]
    fn test_encode_pc858() {
        assert_eq!(encode_pc858("abc"), b"abc".to_vec());
        assert_eq!(encode_pc858("€1"), vec![EURO, b'1']);
        assert_eq!(encode_pc858("Crème brûlée"), {
            let mut v = b"Cr".to_vec();
            v.push(0x8A);
            v.extend_from_slice(b"me br");
            v.push(0x96);
            v.push(b'l');
            v.push(0x82);
            v.push(b'e');
            v
        });
        assert_eq!(encode_pc858("日"), vec![b'?']);
    }

    #[test]
    fn test_line_padding() {
        assert_eq!(line_padding("TOTAAL", "€6.50", 42), 42 - 6 - 5);
        assert_eq!(line_padding("", "", 10), 10);
        // Overflow clamps to a single space
        let long = "x".repeat(40);
        assert_eq!(line_padding(&long, "€123.45", 42), 1);
        assert_eq!(line_padding(&long, "ab", 42), 1);
    }

    #[test]
    fn test_price_line() {
        let line = price_line("2x Friet", "€6.00", 20);
        assert_eq!(pc858_width(&line), 20);
        assert!(line.starts_with("2x Friet "));
        assert!(line.ends_with(" €6.00"));
    }

    #[test]
    fn test_padding_is_exact_for_any_fitting_pair() {
        let width = 32;
        for l in 0..16 {
            for r in 0..16 {
                let left = "a".repeat(l);
                let right = "b".repeat(r);
                if l + r < width {
                    assert_eq!(line_padding(&left, &right, width), width - l - r);
                }
            }
        }
    }
}
