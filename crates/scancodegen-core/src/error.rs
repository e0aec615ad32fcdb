// Scancodegen Errors
// Failure taxonomy for table ingestion, trie construction and automaton synthesis

use crate::label::LabelError;
use crate::layout::LayoutError;
use crate::table::ScanSequence;

/// Errors that abort a compilation run
///
/// Every variant names the table line or byte sequence that caused it, so the
/// message alone is enough to fix the input table.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("scancode table is empty")]
    EmptyTable,

    #[error("line {line}: missing tab separator in {text:?}")]
    MissingSeparator { line: usize, text: String },

    #[error("line {line}: no scancode bytes before the tab separator")]
    EmptySequence { line: usize },

    #[error("line {line}: invalid scancode byte {token:?}")]
    InvalidByte { line: usize, token: String },

    #[error("line {line}: {source}")]
    Label {
        line: usize,
        #[source]
        source: LabelError,
    },

    #[error(
        "line {line}: key name {key} collides with {first:?} (line {first_line}), \
         produced again by unrelated label {second:?}"
    )]
    KeyCollision {
        key: String,
        first: String,
        first_line: usize,
        second: String,
        line: usize,
    },

    #[error("line {line}: sequence {sequence} already maps to {existing}, cannot map it to {key}")]
    DuplicateSequence {
        line: usize,
        sequence: String,
        existing: String,
        key: String,
    },

    #[error("line {line}: sequence {sequence} is ambiguous, it is a prefix of (or prefixed by) another sequence")]
    PrefixConflict { line: usize, sequence: String },

    #[error(
        "level {level}: sequences {first} and {second} both reach byte 0x{byte:02X} \
         through byte 0x{guard:02X} but mean different things"
    )]
    GuardConflict {
        level: usize,
        guard: u8,
        byte: u8,
        first: ScanSequence,
        second: ScanSequence,
    },

    #[error("key {0} is not part of the key registry")]
    UnregisteredKey(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

pub type CompileResult<T> = Result<T, CompileError>;
