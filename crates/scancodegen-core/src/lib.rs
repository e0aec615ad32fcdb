// Scancodegen Core Library
// Scancode table compiler: canonical keys, sequence trie, level automaton, emitters

pub mod automaton;
pub mod chars;
pub mod compiler;
pub mod decoder;
pub mod emit;
pub mod error;
pub mod label;
pub mod layout;
pub mod modifier;
pub mod registry;
pub mod table;
pub mod trie;

pub use automaton::{Arm, Automaton, AutomatonCompiler, Dispatch, LevelHandler};
pub use chars::{CharTable, CharTableBuilder};
pub use compiler::{compile, Compilation, Compiler};
pub use decoder::{KeyQueue, ScancodeDecoder, DEFAULT_QUEUE_CAPACITY};
pub use emit::{render, Backend, CppBackend, EmitOptions, RustBackend, Target};
pub use error::{CompileError, CompileResult};
pub use label::{canonicalize, CanonicalKey, KeyCategory, LabelError, ParsedLabel, Transition};
pub use layout::{Layout, LayoutError};
pub use modifier::{ModifierGroup, ModifierSet, ModifierState};
pub use registry::{KeyEvent, KeyRegistry};
pub use table::{parse_table, RawEntry, ScanSequence};
pub use trie::{build_trie, SequenceTrie, TrieNode};
