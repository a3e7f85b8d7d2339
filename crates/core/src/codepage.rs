//! Windows-1252, the default code page of Windows-locale spreadsheet exports
//! and the byte layout of the PDF `WinAnsiEncoding`.
//!
//! Identical to Latin-1 except for 0x80..=0x9F, which hold typographic
//! characters instead of C1 controls.

/// Characters for bytes 0x80..=0x9F. The five undefined positions keep
/// their C1 control so they still count as suspicious input.
const HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

pub fn decode_byte(byte: u8) -> char {
    match byte {
        0x80..=0x9F => HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| decode_byte(b)).collect()
}

/// Byte for `c`, or `None` when the code page cannot represent it.
/// C1 controls are never encoded.
pub fn encode_char(c: char) -> Option<u8> {
    match c {
        '\0'..='\u{7F}' | '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(c)).ok(),
        _ => HIGH
            .iter()
            .position(|&h| h == c && !h.is_control())
            .and_then(|i| u8::try_from(0x80 + i).ok()),
    }
}
