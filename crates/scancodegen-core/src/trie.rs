// Scancodegen Sequence Trie
// Groups scancode sequences by shared leading bytes

use indexmap::IndexMap;

use crate::error::{CompileError, CompileResult};
use crate::registry::{CanonicalEntry, KeyEvent};

/// A trie position: either a finished key event or more bytes to come
#[derive(Debug, Clone, PartialEq)]
pub enum TrieNode {
    Leaf(KeyEvent),
    Branch(Branch),
}

/// Children keyed by the next byte, in table order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    children: IndexMap<u8, TrieNode>,
}

/// Why an insertion was refused
#[derive(Debug, Clone, PartialEq)]
pub enum InsertError {
    /// A leaf and a branch would share one position
    Prefix,
    /// The exact sequence already ends in a different key
    Duplicate(KeyEvent),
}

impl Branch {
    pub fn children(&self) -> impl Iterator<Item = (u8, &TrieNode)> {
        self.children.iter().map(|(&byte, node)| (byte, node))
    }

    pub fn get(&self, byte: u8) -> Option<&TrieNode> {
        self.children.get(&byte)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Insert a sequence, returning the event it replaced if the sequence was
    /// already present for the same key
    pub fn insert(&mut self, sequence: &[u8], event: KeyEvent) -> Result<Option<KeyEvent>, InsertError> {
        let Some((&last, prefix)) = sequence.split_last() else {
            return Err(InsertError::Prefix);
        };

        let mut branch = self;
        for &byte in prefix {
            branch = match branch
                .children
                .entry(byte)
                .or_insert_with(|| TrieNode::Branch(Branch::default()))
            {
                TrieNode::Branch(next) => next,
                TrieNode::Leaf(_) => return Err(InsertError::Prefix),
            };
        }

        match branch.children.get_mut(&last) {
            None => {
                branch.children.insert(last, TrieNode::Leaf(event));
                Ok(None)
            }
            Some(TrieNode::Branch(_)) => Err(InsertError::Prefix),
            Some(TrieNode::Leaf(existing)) if existing.key == event.key => {
                Ok(Some(std::mem::replace(existing, event)))
            }
            Some(TrieNode::Leaf(existing)) => Err(InsertError::Duplicate(existing.clone())),
        }
    }

    /// Fold another branch into this one
    ///
    /// On failure returns the byte path, relative to this branch, of the first
    /// position where the two subtrees disagree: a leaf against a branch, or
    /// two different leaves.
    pub fn merge(&mut self, other: &Branch) -> Result<(), Vec<u8>> {
        for (&byte, node) in &other.children {
            let Some(existing) = self.children.get_mut(&byte) else {
                self.children.insert(byte, node.clone());
                continue;
            };
            match (existing, node) {
                (TrieNode::Branch(mine), TrieNode::Branch(theirs)) => {
                    mine.merge(theirs).map_err(|mut path| {
                        path.insert(0, byte);
                        path
                    })?
                }
                (TrieNode::Leaf(mine), TrieNode::Leaf(theirs)) if mine == theirs => {}
                _ => return Err(vec![byte]),
            }
        }
        Ok(())
    }

    /// Number of bytes in the longest sequence below this branch
    pub fn depth(&self) -> usize {
        self.children
            .values()
            .map(|node| match node {
                TrieNode::Leaf(_) => 1,
                TrieNode::Branch(branch) => 1 + branch.depth(),
            })
            .max()
            .unwrap_or(0)
    }
}

/// Byte-sequence trie over a whole table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceTrie {
    root: Branch,
}

impl SequenceTrie {
    pub fn root(&self) -> &Branch {
        &self.root
    }

    /// Follow a byte sequence from the root
    pub fn lookup(&self, sequence: &[u8]) -> Option<&TrieNode> {
        let (&first, rest) = sequence.split_first()?;
        let mut node = self.root.get(first)?;
        for &byte in rest {
            node = match node {
                TrieNode::Branch(branch) => branch.get(byte)?,
                TrieNode::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// The first complete table sequence that starts with `prefix`
    ///
    /// Follows the earliest child below a branch until it reaches a leaf.
    pub fn first_sequence(&self, prefix: &[u8]) -> Option<Vec<u8>> {
        let mut sequence = prefix.to_vec();
        let mut node = self.lookup(prefix)?;
        while let TrieNode::Branch(branch) = node {
            let (byte, child) = branch.children().next()?;
            sequence.push(byte);
            node = child;
        }
        Some(sequence)
    }
}

/// Build the trie from canonicalized rows
///
/// A sequence that is a proper prefix of another is rejected. A sequence that
/// appears twice keeps the later row when both rows name the same key.
pub fn build_trie(entries: &[CanonicalEntry]) -> CompileResult<SequenceTrie> {
    let mut trie = SequenceTrie::default();

    for entry in entries {
        match trie.root.insert(entry.sequence.bytes(), entry.event.clone()) {
            Ok(None) => {}
            Ok(Some(previous)) => log::warn!(
                "line {}: sequence {} listed again, {} {} replaces {} {}",
                entry.line,
                entry.sequence,
                entry.event.key,
                entry.event.transition,
                previous.key,
                previous.transition
            ),
            Err(InsertError::Prefix) => {
                return Err(CompileError::PrefixConflict {
                    line: entry.line,
                    sequence: entry.sequence.to_string(),
                })
            }
            Err(InsertError::Duplicate(existing)) => {
                return Err(CompileError::DuplicateSequence {
                    line: entry.line,
                    sequence: entry.sequence.to_string(),
                    existing: existing.key,
                    key: entry.event.key.clone(),
                })
            }
        }
    }

    log::debug!(
        "built trie: {} root bytes, longest sequence {} bytes",
        trie.root.len(),
        trie.root.depth()
    );
    Ok(trie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Transition;
    use crate::table::ScanSequence;

    fn entry(line: usize, bytes: &[u8], key: &str, transition: Transition) -> CanonicalEntry {
        CanonicalEntry {
            line,
            sequence: ScanSequence::new(bytes),
            event: KeyEvent::new(key, transition),
        }
    }

    #[test]
    fn test_single_and_multi_byte_coexist_at_root() {
        let trie = build_trie(&[
            entry(1, &[0x1C], "Alpha_A", Transition::Pressed),
            entry(2, &[0xE0, 0x75], "Cursor_Up", Transition::Pressed),
            entry(3, &[0xE0, 0xF0, 0x75], "Cursor_Up", Transition::Released),
        ])
        .unwrap();

        assert_eq!(trie.root().len(), 2);
        assert_eq!(
            trie.lookup(&[0x1C]),
            Some(&TrieNode::Leaf(KeyEvent::new("Alpha_A", Transition::Pressed)))
        );
        assert!(matches!(trie.lookup(&[0xE0]), Some(TrieNode::Branch(b)) if b.len() == 2));
        assert_eq!(
            trie.lookup(&[0xE0, 0xF0, 0x75]),
            Some(&TrieNode::Leaf(KeyEvent::new("Cursor_Up", Transition::Released)))
        );
        assert_eq!(trie.lookup(&[0xE0, 0x11]), None);
        assert_eq!(trie.root().depth(), 3);
    }

    #[test]
    fn test_children_keep_table_order() {
        let trie = build_trie(&[
            entry(1, &[0x29], "Space", Transition::Pressed),
            entry(2, &[0x1C], "Alpha_A", Transition::Pressed),
            entry(3, &[0x16], "Num_1", Transition::Pressed),
        ])
        .unwrap();
        let order: Vec<u8> = trie.root().children().map(|(b, _)| b).collect();
        assert_eq!(order, [0x29, 0x1C, 0x16]);
    }

    #[test]
    fn test_prefix_rejected_leaf_first() {
        let result = build_trie(&[
            entry(1, &[0xE0], "Escape", Transition::Pressed),
            entry(2, &[0xE0, 0x75], "Cursor_Up", Transition::Pressed),
        ]);
        assert!(matches!(
            result,
            Err(CompileError::PrefixConflict { line: 2, ref sequence }) if sequence == "E0,75"
        ));
    }

    #[test]
    fn test_prefix_rejected_branch_first() {
        let result = build_trie(&[
            entry(1, &[0xE0, 0x75], "Cursor_Up", Transition::Pressed),
            entry(2, &[0xE0], "Escape", Transition::Pressed),
        ]);
        assert!(matches!(result, Err(CompileError::PrefixConflict { line: 2, .. })));
    }

    #[test]
    fn test_duplicate_same_key_last_wins() {
        let trie = build_trie(&[
            entry(1, &[0x1E], "Alpha_A", Transition::Pressed),
            entry(2, &[0x1E], "Alpha_A", Transition::Released),
        ])
        .unwrap();
        assert_eq!(
            trie.lookup(&[0x1E]),
            Some(&TrieNode::Leaf(KeyEvent::new("Alpha_A", Transition::Released)))
        );
    }

    #[test]
    fn test_duplicate_different_key_rejected() {
        let result = build_trie(&[
            entry(1, &[0x1E], "Alpha_A", Transition::Pressed),
            entry(2, &[0x1E], "Alpha_B", Transition::Pressed),
        ]);
        assert!(matches!(
            result,
            Err(CompileError::DuplicateSequence { line: 2, ref existing, .. }) if existing == "Alpha_A"
        ));
    }

    #[test]
    fn test_merge_compatible_and_conflicting() {
        let mut left = Branch::default();
        left.insert(&[0x12], KeyEvent::new("Print_Screen", Transition::Released))
            .unwrap();
        let mut right = Branch::default();
        right
            .insert(&[0x14, 0xF0, 0x77], KeyEvent::new("Pause", Transition::Pressed))
            .unwrap();

        left.merge(&right).unwrap();
        assert_eq!(left.len(), 2);

        let mut clash = Branch::default();
        clash.insert(&[0x12, 0x01], KeyEvent::new("F9", Transition::Pressed))
            .unwrap();
        assert_eq!(left.merge(&clash), Err(vec![0x12]));
    }

    #[test]
    fn test_merge_reports_path_to_deep_conflict() {
        let mut left = Branch::default();
        left.insert(&[0x34, 0x56], KeyEvent::new("F1", Transition::Pressed))
            .unwrap();
        let mut right = Branch::default();
        right
            .insert(&[0x34, 0x56], KeyEvent::new("F2", Transition::Pressed))
            .unwrap();
        assert_eq!(left.merge(&right), Err(vec![0x34, 0x56]));
    }

    #[test]
    fn test_first_sequence_descends_to_a_leaf() {
        let trie = build_trie(&[
            entry(1, &[0xE0, 0x12, 0xE0, 0x7C], "Print_Screen", Transition::Pressed),
            entry(2, &[0xE0, 0x75], "Cursor_Up", Transition::Pressed),
        ])
        .unwrap();
        assert_eq!(
            trie.first_sequence(&[0xE0]),
            Some(vec![0xE0, 0x12, 0xE0, 0x7C])
        );
        assert_eq!(trie.first_sequence(&[0xE0, 0x75]), Some(vec![0xE0, 0x75]));
        assert_eq!(trie.first_sequence(&[0x99]), None);
    }
}
