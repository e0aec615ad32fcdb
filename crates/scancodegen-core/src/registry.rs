// Scancodegen Key Registry
// Sorted, dense enumeration of every canonical key in a table

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::error::{CompileError, CompileResult};
use crate::label::{canonicalize, CanonicalKey, ParsedLabel, Transition};
use crate::layout::Layout;
use crate::table::{RawEntry, ScanSequence};

/// A key transition produced by a table row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Canonical key name
    pub key: String,
    pub transition: Transition,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, transition: Transition) -> Self {
        Self {
            key: key.into(),
            transition,
        }
    }
}

/// A table row after canonicalization
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEntry {
    pub line: usize,
    pub sequence: ScanSequence,
    pub event: KeyEvent,
}

/// Canonical keys sorted by name; the position is the runtime key index
/// and the index into both character tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyRegistry {
    keys: IndexMap<String, CanonicalKey>,
}

impl KeyRegistry {
    /// Index of a key in the enumeration
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.keys.get_index_of(name)
    }

    pub fn get(&self, index: usize) -> Option<&CanonicalKey> {
        self.keys.get_index(index).map(|(_, key)| key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains_key(name)
    }

    /// Keys in index order
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalKey> {
        self.keys.values()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Where a canonical key name was first produced
struct Origin {
    key: CanonicalKey,
    tokens: Vec<String>,
    label: String,
    line: usize,
}

/// Collects canonical keys and rejects name collisions between unrelated labels
#[derive(Default)]
pub struct RegistryBuilder {
    seen: BTreeMap<String, Origin>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a canonicalized label
    ///
    /// The same name may come back only from the same label tokens, i.e. the
    /// pressed/released pair of one key. Tokens compare without regard to
    /// case, since capitalization folds it away anyway.
    pub fn insert(&mut self, parsed: &ParsedLabel, label: &str, line: usize) -> CompileResult<()> {
        match self.seen.get(parsed.key.name()) {
            Some(origin)
                if origin.key == parsed.key && same_tokens(&origin.tokens, &parsed.tokens) =>
            {
                Ok(())
            }
            Some(origin) => Err(CompileError::KeyCollision {
                key: parsed.key.name().to_string(),
                first: origin.label.clone(),
                first_line: origin.line,
                second: label.to_string(),
                line,
            }),
            None => {
                self.seen.insert(
                    parsed.key.name().to_string(),
                    Origin {
                        key: parsed.key.clone(),
                        tokens: parsed.tokens.clone(),
                        label: label.to_string(),
                        line,
                    },
                );
                Ok(())
            }
        }
    }

    /// Freeze into a registry; BTreeMap order makes the indices sorted and dense
    pub fn finish(self) -> KeyRegistry {
        KeyRegistry {
            keys: self
                .seen
                .into_iter()
                .map(|(name, origin)| (name, origin.key))
                .collect(),
        }
    }
}

fn same_tokens(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_lowercase() == y.to_lowercase())
}

/// Canonicalize every row and build the key registry
pub fn canonicalize_entries(
    entries: &[RawEntry],
    layout: &Layout,
) -> CompileResult<(Vec<CanonicalEntry>, KeyRegistry)> {
    let mut builder = RegistryBuilder::new();
    let mut canonical = Vec::with_capacity(entries.len());

    for entry in entries {
        let parsed = canonicalize(&entry.label, layout).map_err(|source| CompileError::Label {
            line: entry.line,
            source,
        })?;
        builder.insert(&parsed, &entry.label, entry.line)?;
        canonical.push(CanonicalEntry {
            line: entry.line,
            sequence: entry.sequence.clone(),
            event: KeyEvent::new(parsed.key.name(), parsed.transition),
        });
    }

    let registry = builder.finish();
    log::debug!("registered {} canonical keys", registry.len());
    Ok((canonical, registry))
}
