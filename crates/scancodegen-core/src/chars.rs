// Scancodegen Character Tables
// Plain and shifted ASCII values per canonical key, plus capslock/shift resolution

use crate::label::{CanonicalKey, KeyCategory};
use crate::layout::Layout;
use crate::registry::KeyRegistry;

/// Two parallel tables indexed by canonical key index
///
/// `base[i]` is `None` when the key has no ASCII value; `shifted[i]` is
/// `None` when shift leaves the base character unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharTable {
    base: Vec<Option<char>>,
    shifted: Vec<Option<char>>,
}

impl CharTable {
    pub fn base(&self, key: usize) -> Option<char> {
        self.base.get(key).copied().flatten()
    }

    pub fn shifted(&self, key: usize) -> Option<char> {
        self.shifted.get(key).copied().flatten()
    }

    pub fn base_table(&self) -> &[Option<char>] {
        &self.base
    }

    pub fn shifted_table(&self) -> &[Option<char>] {
        &self.shifted
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Resolve the character for a dequeued key
    ///
    /// Capslock upper-cases a lowercase letter only while shift is up. Shift,
    /// independently, replaces the character with the shift table entry when
    /// there is one. Capslock and shift together therefore still give an
    /// uppercase letter, through the shift table.
    pub fn resolve(&self, key: usize, shift: bool, capslock: bool) -> Option<char> {
        let mut res = self.base(key)?;
        if capslock && !shift && res.is_ascii_lowercase() {
            res = res.to_ascii_uppercase();
        }
        if shift {
            if let Some(shifted) = self.shifted(key) {
                res = shifted;
            }
        }
        Some(res)
    }
}

/// Derives [`CharTable`]s from a key registry and layout
pub struct CharTableBuilder<'a> {
    layout: &'a Layout,
}

impl<'a> CharTableBuilder<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    pub fn build(&self, registry: &KeyRegistry) -> CharTable {
        let (base, shifted) = registry
            .iter()
            .map(|key| (self.base_value(key), self.shifted_value(key)))
            .unzip();
        CharTable { base, shifted }
    }

    /// Plain character: letters lower case, digits as-is, literal named keys,
    /// symbols mapped back to their punctuation
    pub fn base_value(&self, key: &CanonicalKey) -> Option<char> {
        let last = key.last_part();
        match key.category() {
            KeyCategory::Alpha => last.chars().next().map(|c| c.to_ascii_lowercase()),
            KeyCategory::Numeric => last.chars().next(),
            _ if self.layout.literal(last).is_some() => self.layout.literal(last),
            KeyCategory::Symbol => self.layout.symbol_for_name(last),
            KeyCategory::Named => None,
        }
    }

    /// Shifted character: letters upper case, then the shift table
    pub fn shifted_value(&self, key: &CanonicalKey) -> Option<char> {
        let last = key.last_part();
        match key.category() {
            KeyCategory::Alpha => last.chars().next().map(|c| c.to_ascii_uppercase()),
            _ => self.layout.shifted(last),
        }
    }
}
