/// Text encodings for embedded volume labels and identifiers
///
/// Each format declares the charset its on-disk strings use; callers may
/// override it per extraction. Charsets with a WHATWG definition go through
/// `encoding_rs`; PETSCII has none and uses a fixed table.
use encoding_rs::{MACINTOSH, SHIFT_JIS, UTF_16BE};

/// Byte-to-text decoder selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// 7-bit ASCII; bytes outside the printable range become U+FFFD
    Ascii,
    /// ISO-8859-1, a direct byte-to-code-point mapping
    Latin1,
    /// Mac OS Roman
    MacRoman,
    /// Commodore PETSCII (unshifted)
    Petscii,
    /// Shift-JIS
    ShiftJis,
    /// UTF-16 big-endian
    Utf16Be,
}

impl TextEncoding {
    /// Look up an encoding by charset name
    ///
    /// This is the seam for callers that carry their own charset
    /// configuration; unknown names return `None` and the format's declared
    /// default applies.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ascii" | "us-ascii" => Some(TextEncoding::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" => Some(TextEncoding::Latin1),
            "macintosh" | "mac-roman" | "macroman" => Some(TextEncoding::MacRoman),
            "petscii" => Some(TextEncoding::Petscii),
            "shift-jis" | "shift_jis" | "sjis" => Some(TextEncoding::ShiftJis),
            "utf-16be" | "utf16be" => Some(TextEncoding::Utf16Be),
            _ => None,
        }
    }

    /// Decode a byte run into text
    ///
    /// Undecodable sequences become U+FFFD; decoding never fails. Padding
    /// and termination are the caller's concern (see `decode::c_string`).
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Ascii => bytes
                .iter()
                .map(|&b| {
                    if (0x20..0x7F).contains(&b) {
                        b as char
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            TextEncoding::MacRoman => MACINTOSH.decode(bytes).0.into_owned(),
            TextEncoding::Petscii => bytes.iter().map(|&b| petscii_char(b)).collect(),
            TextEncoding::ShiftJis => SHIFT_JIS.decode(bytes).0.into_owned(),
            TextEncoding::Utf16Be => UTF_16BE.decode(bytes).0.into_owned(),
        }
    }
}

/// Decode one unshifted PETSCII code point
///
/// 0x20-0x5F match ASCII, 0xC1-0xDA mirror the letters, 0xA0 is the shifted
/// space used as label padding. Control and graphics codes have no text
/// equivalent.
fn petscii_char(b: u8) -> char {
    match b {
        0x20..=0x5F => b as char,
        0xA0 => ' ',
        0xC1..=0xDA => (b - 0x80) as char,
        _ => char::REPLACEMENT_CHARACTER,
    }
}
