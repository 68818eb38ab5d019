//! Text encodings for validated input and subprocess pipes
//!
//! Labels are looked up through `encoding_rs` (WHATWG label set) with two
//! exceptions handled here. The ASCII family stays strict, because WHATWG maps
//! `ascii` and `us-ascii` to windows-1252 and a 7-bit check would silently
//! become an 8-bit one. The DOS console code pages 437 and 850 are not WHATWG
//! encodings at all and go through `oem_cp`.

mod resolver;

pub use resolver::{
    resolve_pipe_encoding, EncodingEnvironment, EncodingResolver, SystemEncodingEnvironment,
    IO_ENCODING_ENV, LEGACY_CONSOLE_ENCODINGS, UTF8_MODE_ENV,
};

use encoding_rs::Encoding;
use oem_cp::code_table::{
    DECODING_TABLE_CP437, DECODING_TABLE_CP850, ENCODING_TABLE_CP437, ENCODING_TABLE_CP850,
};

const ASCII_LABELS: &[&str] = &[
    "ascii",
    "us-ascii",
    "ansi_x3.4-1968",
    "ansi_x3.4-1986",
    "iso646-us",
    "646",
    "us",
];

/// DOS (OEM) console code pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OemCodePage {
    Cp437,
    Cp850,
}

impl OemCodePage {
    fn for_label(label: &str) -> Option<Self> {
        match label {
            "cp437" | "ibm437" | "437" | "cp-437" => Some(Self::Cp437),
            "cp850" | "ibm850" | "850" | "cp-850" => Some(Self::Cp850),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cp437 => "cp437",
            Self::Cp850 => "cp850",
        }
    }

    fn encodes(&self, c: char) -> bool {
        if c.is_ascii() {
            return true;
        }
        match self {
            Self::Cp437 => ENCODING_TABLE_CP437.get(&c).is_some(),
            Self::Cp850 => ENCODING_TABLE_CP850.get(&c).is_some(),
        }
    }

    // Both pages map all 256 byte values, so decoding never fails.
    fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Cp437 => oem_cp::decode_string_complete_table(bytes, &DECODING_TABLE_CP437),
            Self::Cp850 => oem_cp::decode_string_complete_table(bytes, &DECODING_TABLE_CP850),
        }
    }
}

/// A resolved text encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict 7-bit ASCII
    Ascii,
    /// DOS console code page
    Oem(OemCodePage),
    /// Any encoding known to `encoding_rs`
    Standard(&'static Encoding),
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl TextEncoding {
    pub fn utf8() -> Self {
        Self::Standard(encoding_rs::UTF_8)
    }

    /// Look up an encoding by label (case-insensitive, `_` accepted for `-`)
    ///
    /// ```
    /// use execguard::encoding::TextEncoding;
    ///
    /// assert_eq!(TextEncoding::for_label("utf8").unwrap().name(), "UTF-8");
    /// assert_eq!(TextEncoding::for_label("US-ASCII").unwrap().name(), "US-ASCII");
    /// assert_eq!(TextEncoding::for_label("IBM850").unwrap().name(), "cp850");
    /// assert!(TextEncoding::for_label("klingon").is_none());
    /// ```
    pub fn for_label(label: &str) -> Option<Self> {
        let trimmed = label.trim().to_ascii_lowercase();
        if trimmed.is_empty() {
            return None;
        }
        if ASCII_LABELS.contains(&trimmed.as_str()) {
            return Some(Self::Ascii);
        }
        if let Some(page) = OemCodePage::for_label(&trimmed.replace('_', "-")) {
            return Some(Self::Oem(page));
        }
        Encoding::for_label(trimmed.as_bytes())
            .or_else(|| Encoding::for_label(trimmed.replace('_', "-").as_bytes()))
            .or_else(|| Encoding::for_label(legacy_alias(&trimmed)?.as_bytes()))
            // WHATWG's "replacement" decodes everything to U+FFFD and cannot encode.
            .filter(|encoding| *encoding != encoding_rs::REPLACEMENT)
            .map(Self::Standard)
    }

    /// Canonical name of the encoding
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ascii => "US-ASCII",
            Self::Oem(page) => page.name(),
            Self::Standard(encoding) => encoding.name(),
        }
    }

    pub fn is_utf8(&self) -> bool {
        matches!(self, Self::Standard(e) if *e == encoding_rs::UTF_8)
    }

    /// Characters of `text` that this encoding cannot represent (strict check)
    pub fn unencodable_chars(&self, text: &str) -> Vec<char> {
        let mut rejected: Vec<char> = Vec::new();
        match self {
            Self::Ascii => {
                for c in text.chars().filter(|c| !c.is_ascii()) {
                    if !rejected.contains(&c) {
                        rejected.push(c);
                    }
                }
            }
            Self::Oem(page) => {
                for c in text.chars() {
                    if !page.encodes(c) && !rejected.contains(&c) {
                        rejected.push(c);
                    }
                }
            }
            Self::Standard(encoding) => {
                // Unicode encodings represent every scalar value a &str can hold.
                if encoding.output_encoding() == encoding_rs::UTF_8 {
                    return rejected;
                }
                let mut buf = [0u8; 4];
                for c in text.chars() {
                    if c.is_ascii() || rejected.contains(&c) {
                        continue;
                    }
                    let (_, _, had_unmappable) = encoding.encode(c.encode_utf8(&mut buf));
                    if had_unmappable {
                        rejected.push(c);
                    }
                }
            }
        }
        rejected
    }

    /// Decode bytes, replacing malformed sequences with U+FFFD
    pub fn decode_lossy(&self, bytes: &[u8]) -> String {
        match self {
            Self::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
            Self::Oem(page) => page.decode(bytes),
            Self::Standard(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Code page spellings that are not WHATWG labels
fn legacy_alias(label: &str) -> Option<&'static str> {
    match label {
        "cp1252" => Some("windows-1252"),
        "cp1250" => Some("windows-1250"),
        "cp1251" => Some("windows-1251"),
        "cp866" => Some("ibm866"),
        "latin1" | "latin-1" | "iso8859-1" => Some("iso-8859-1"),
        "cp65001" => Some("utf-8"),
        _ => None,
    }
}
