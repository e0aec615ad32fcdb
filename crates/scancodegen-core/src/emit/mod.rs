// Scancodegen Emitters
// Render a compilation as decoder source for a target language

pub mod cpp;
pub mod rust;
pub mod writer;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::compiler::Compilation;
use crate::decoder::DEFAULT_QUEUE_CAPACITY;
use crate::modifier::{ModifierGroup, ModifierSet};

pub use cpp::CppBackend;
pub use rust::RustBackend;
pub use writer::SourceWriter;

/// Output language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Target {
    /// Self-contained Rust module
    #[default]
    Rust,
    /// Header for the C++ kernel, built on `ds/staticqueue.h`
    #[strum(to_string = "cpp", serialize = "c++")]
    Cpp,
}

/// Settings shared by every backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Capacity of the generated key queue
    pub queue_capacity: usize,
    /// Input file name recorded in the generated header comment
    pub source_name: Option<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            source_name: None,
        }
    }
}

/// Turns a [`Compilation`] into source text
pub trait Backend {
    fn emit(&self, compilation: &Compilation, options: &EmitOptions) -> String;
}

/// Render with the backend for `target`
pub fn render(compilation: &Compilation, target: Target, options: &EmitOptions) -> String {
    let backend: &dyn Backend = match target {
        Target::Rust => &RustBackend,
        Target::Cpp => &CppBackend,
    };
    log::debug!("emitting {target} source");
    backend.emit(compilation, options)
}

/// Lower-case method-name fragment for a modifier group (`Control` -> `control`)
pub(crate) fn snake_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Layout groups plus Shift and Capslock, which character resolution needs
pub(crate) fn query_groups(modifiers: &ModifierSet) -> Vec<ModifierGroup> {
    let mut groups = modifiers.groups();
    for required in ["Shift", "Capslock"] {
        if !groups.iter().any(|g| g.name == required) {
            groups.push(ModifierGroup {
                name: required.to_string(),
                members: Vec::new(),
            });
        }
    }
    groups
}

fn generated_banner(options: &EmitOptions) -> String {
    match &options.source_name {
        Some(name) => format!("@generated by scancodegen from {name}. Do not edit."),
        None => "@generated by scancodegen. Do not edit.".to_string(),
    }
}
