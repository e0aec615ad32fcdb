// Scancodegen Compiler
// Table text -> canonical keys -> trie -> automaton + character tables

use crate::automaton::{Automaton, AutomatonCompiler};
use crate::chars::{CharTable, CharTableBuilder};
use crate::error::CompileResult;
use crate::layout::Layout;
use crate::modifier::ModifierSet;
use crate::registry::{canonicalize_entries, KeyRegistry};
use crate::table::parse_table;
use crate::trie::{build_trie, SequenceTrie};

/// Everything a backend needs to emit the decoder source
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub registry: KeyRegistry,
    pub trie: SequenceTrie,
    pub automaton: Automaton,
    pub chars: CharTable,
    pub modifiers: ModifierSet,
}

/// Compiler bound to one layout
///
/// Holds no mutable state; the same compiler can process any number of tables.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    layout: &'a Layout,
}

impl<'a> Compiler<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Compile a scancode table
    pub fn compile(&self, source: &str) -> CompileResult<Compilation> {
        self.layout.validate()?;

        let entries = parse_table(source)?;
        let (canonical, registry) = canonicalize_entries(&entries, self.layout)?;
        let trie = build_trie(&canonical)?;

        let modifiers = ModifierSet::from_layout(self.layout);
        let automaton = AutomatonCompiler::new(&registry, &modifiers).compile(&trie)?;
        let chars = CharTableBuilder::new(self.layout).build(&registry);

        log::debug!(
            "compiled {} rows into {} keys and {} levels",
            entries.len(),
            registry.len(),
            automaton.levels().len()
        );

        Ok(Compilation {
            registry,
            trie,
            automaton,
            chars,
            modifiers,
        })
    }
}

/// Compile a scancode table with the given layout
pub fn compile(source: &str, layout: &Layout) -> CompileResult<Compilation> {
    Compiler::new(layout).compile(source)
}
