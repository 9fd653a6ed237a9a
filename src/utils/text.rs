//! Byte-order-mark aware decoding for input documents.
//!
//! Exported dealer datasets show up both as plain UTF-8 and as UTF-16 with a
//! BOM. Documents are decoded to a `String` and written back in the encoding
//! they arrived in.

use crate::utils::error::{EtlError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(UTF8_BOM) {
            TextEncoding::Utf8Bom
        } else if bytes.starts_with(UTF16_LE_BOM) {
            TextEncoding::Utf16Le
        } else if bytes.starts_with(UTF16_BE_BOM) {
            TextEncoding::Utf16Be
        } else {
            TextEncoding::Utf8
        }
    }
}

/// Decode `bytes` according to their BOM. Text without a BOM must be UTF-8.
pub fn decode(bytes: &[u8]) -> Result<(String, TextEncoding)> {
    let encoding = TextEncoding::detect(bytes);
    let text = match encoding {
        TextEncoding::Utf8 => utf8(bytes)?,
        TextEncoding::Utf8Bom => utf8(&bytes[UTF8_BOM.len()..])?,
        TextEncoding::Utf16Le => utf16(&bytes[2..], u16::from_le_bytes)?,
        TextEncoding::Utf16Be => utf16(&bytes[2..], u16::from_be_bytes)?,
    };
    Ok((text, encoding))
}

pub fn encode(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Utf8Bom => [UTF8_BOM, text.as_bytes()].concat(),
        TextEncoding::Utf16Le => {
            let mut out = UTF16_LE_BOM.to_vec();
            out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            out
        }
        TextEncoding::Utf16Be => {
            let mut out = UTF16_BE_BOM.to_vec();
            out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
            out
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| EtlError::FormatError {
        format: "UTF-8".to_string(),
        message: format!("invalid byte sequence at offset {}", e.utf8_error().valid_up_to()),
    })
}

fn utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(EtlError::FormatError {
            format: "UTF-16".to_string(),
            message: "odd number of bytes".to_string(),
        });
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(|e| EtlError::FormatError {
        format: "UTF-16".to_string(),
        message: e.to_string(),
    })
}
