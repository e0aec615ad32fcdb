// Scancodegen Table Ingestion
// Parses "<bytes>\t<label>" rows of a scancode table

use std::fmt;

use smallvec::SmallVec;

use crate::error::{CompileError, CompileResult};

/// Ordered scancode bytes emitted for one key transition
///
/// Real scancode sets never exceed eight bytes (Pause in set 2), so the
/// sequence stays inline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanSequence(SmallVec<[u8; 8]>);

impl ScanSequence {
    pub fn new(bytes: &[u8]) -> Self {
        Self(SmallVec::from_slice(bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScanSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// One row of the input table
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    /// 1-based line number in the source text
    pub line: usize,
    pub sequence: ScanSequence,
    /// Label text after the tab, still carrying its pressed/released marker
    pub label: String,
}

/// Parse a single hexadecimal byte token (`E0`, `0xE0`)
pub fn parse_byte(token: &str) -> Option<u8> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Parse the whole table text
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_table(text: &str) -> CompileResult<Vec<RawEntry>> {
    let mut entries = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw_line.trim_end_matches(['\r', '\n']);
        if content.trim().is_empty() || content.trim_start().starts_with('#') {
            continue;
        }

        let (codes, label) =
            content
                .split_once('\t')
                .ok_or_else(|| CompileError::MissingSeparator {
                    line,
                    text: content.to_string(),
                })?;

        if codes.trim().is_empty() {
            return Err(CompileError::EmptySequence { line });
        }

        // Every comma-separated token must be a byte; `E0,,48` and `1C,` are malformed
        let mut bytes: SmallVec<[u8; 8]> = SmallVec::new();
        for token in codes.split(',').map(str::trim) {
            let byte = parse_byte(token).ok_or_else(|| CompileError::InvalidByte {
                line,
                token: token.to_string(),
            })?;
            bytes.push(byte);
        }

        entries.push(RawEntry {
            line,
            sequence: ScanSequence(bytes),
            label: label.trim().to_string(),
        });
    }

    if entries.is_empty() {
        return Err(CompileError::EmptyTable);
    }

    log::debug!("parsed {} table entries", entries.len());
    Ok(entries)
}
