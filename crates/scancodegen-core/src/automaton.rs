// Scancodegen Automaton Compiler
// Compiles each trie depth into a level handler guarded by the byte that led there

use indexmap::IndexMap;

use crate::error::{CompileError, CompileResult};
use crate::label::Transition;
use crate::modifier::ModifierSet;
use crate::registry::{KeyEvent, KeyRegistry};
use crate::table::ScanSequence;
use crate::trie::{Branch, SequenceTrie, TrieNode};

/// What a level handler does with one byte value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arm {
    /// Queue `key` as a completed key-down, mark the modifier bit as held,
    /// return to level 0 and report `true`
    Press { key: usize, modifier: Option<u32> },
    /// Clear the modifier bit (if any), return to level 0 and report `false`
    Release { key: usize, modifier: Option<u32> },
    /// Remember the byte for the next level's guard, move one level deeper
    /// and report `false`
    Advance,
}

/// A byte dispatch, optionally guarded by the byte that led to this level
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// `None` only at level 0
    pub guard: Option<u8>,
    pub arms: IndexMap<u8, Arm>,
}

impl Dispatch {
    pub fn arm(&self, byte: u8) -> Option<&Arm> {
        self.arms.get(&byte)
    }
}

/// Decision procedure for one trie depth
#[derive(Debug, Clone, PartialEq)]
pub struct LevelHandler {
    pub level: usize,
    pub dispatches: Vec<Dispatch>,
}

impl LevelHandler {
    /// The dispatch to use given the byte recorded by the previous level
    pub fn dispatch_for(&self, last_level_code: u8) -> Option<&Dispatch> {
        self.dispatches
            .iter()
            .find(|d| d.guard.is_none() || d.guard == Some(last_level_code))
    }
}

/// The compiled decoding automaton: one handler per level, `0..=max_level`
#[derive(Debug, Clone, PartialEq)]
pub struct Automaton {
    levels: Vec<LevelHandler>,
}

impl Automaton {
    pub fn levels(&self) -> &[LevelHandler] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Option<&LevelHandler> {
        self.levels.get(level)
    }

    /// Deepest level any sequence reaches
    pub fn max_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }
}

/// Compiles a sequence trie into an [`Automaton`]
pub struct AutomatonCompiler<'a> {
    registry: &'a KeyRegistry,
    modifiers: &'a ModifierSet,
}

impl<'a> AutomatonCompiler<'a> {
    pub fn new(registry: &'a KeyRegistry, modifiers: &'a ModifierSet) -> Self {
        Self {
            registry,
            modifiers,
        }
    }

    /// Breadth-first walk of the trie, one level per depth
    ///
    /// Branches at the same depth entered through the same byte share one
    /// guarded dispatch; their subtrees are merged, and a merge that would
    /// make a byte mean two different things is an error.
    pub fn compile(&self, trie: &SequenceTrie) -> CompileResult<Automaton> {
        let mut levels = Vec::new();
        let mut frontier = vec![Pending {
            guard: None,
            prefixes: vec![Vec::new()],
            branch: trie.root().clone(),
        }];

        while !frontier.is_empty() {
            let level = levels.len();
            let groups = Self::group_by_guard(trie, level, frontier)?;

            let mut next = Vec::new();
            let mut dispatches = Vec::with_capacity(groups.len());
            for group in groups.into_values() {
                let mut arms = IndexMap::with_capacity(group.branch.len());
                for (byte, node) in group.branch.children() {
                    let arm = match node {
                        TrieNode::Leaf(event) => self.leaf_arm(event)?,
                        TrieNode::Branch(child) => {
                            next.push(Pending {
                                guard: Some(byte),
                                prefixes: group.extend(trie, byte),
                                branch: child.clone(),
                            });
                            Arm::Advance
                        }
                    };
                    arms.insert(byte, arm);
                }
                dispatches.push(Dispatch {
                    guard: group.guard,
                    arms,
                });
            }

            log::trace!("level {level}: {} guarded dispatches", dispatches.len());
            levels.push(LevelHandler { level, dispatches });
            frontier = next;
        }

        let automaton = Automaton { levels };
        log::debug!("compiled automaton with max level {}", automaton.max_level());
        Ok(automaton)
    }

    fn group_by_guard(
        trie: &SequenceTrie,
        level: usize,
        frontier: Vec<Pending>,
    ) -> CompileResult<IndexMap<Option<u8>, Pending>> {
        let mut groups: IndexMap<Option<u8>, Pending> = IndexMap::new();
        for pending in frontier {
            let Some(existing) = groups.get_mut(&pending.guard) else {
                groups.insert(pending.guard, pending);
                continue;
            };

            if let Err(path) = existing.branch.merge(&pending.branch) {
                return Err(conflict(trie, level, existing, &pending, &path));
            }
            existing.prefixes.extend(pending.prefixes);
            log::debug!(
                "level {level}: merged sequences entered through byte 0x{:02X}",
                pending.guard.unwrap_or_default()
            );
        }
        Ok(groups)
    }

    fn leaf_arm(&self, event: &KeyEvent) -> CompileResult<Arm> {
        let key = self
            .registry
            .index_of(&event.key)
            .ok_or_else(|| CompileError::UnregisteredKey(event.key.clone()))?;
        let modifier = self.modifiers.bit(&event.key);
        Ok(match event.transition {
            Transition::Pressed => Arm::Press { key, modifier },
            Transition::Released => Arm::Release { key, modifier },
        })
    }
}

/// Subtree waiting to be compiled at the next level
#[derive(Debug)]
struct Pending {
    guard: Option<u8>,
    /// Bytes from the root to `branch`, one entry per merged origin
    prefixes: Vec<Vec<u8>>,
    branch: Branch,
}

impl Pending {
    /// Prefixes of the child entered through `byte`
    fn extend(&self, trie: &SequenceTrie, byte: u8) -> Vec<Vec<u8>> {
        self.prefixes
            .iter()
            .map(|prefix| {
                let mut child = prefix.clone();
                child.push(byte);
                child
            })
            .filter(|child| matches!(trie.lookup(child), Some(TrieNode::Branch(_))))
            .collect()
    }

    /// A full table sequence from one of this subtree's origins running
    /// through `path`
    fn sequence_through(&self, trie: &SequenceTrie, path: &[u8]) -> ScanSequence {
        self.prefixes
            .iter()
            .find_map(|prefix| {
                let mut bytes = prefix.clone();
                bytes.extend_from_slice(path);
                trie.first_sequence(&bytes)
            })
            .map(|bytes| ScanSequence::new(&bytes))
            .unwrap_or_else(|| ScanSequence::new(path))
    }
}

/// Locate a merge failure at its own depth, with the byte that guards it
fn conflict(
    trie: &SequenceTrie,
    level: usize,
    existing: &Pending,
    incoming: &Pending,
    path: &[u8],
) -> CompileError {
    let (byte, above) = match path.split_last() {
        Some((&byte, above)) => (byte, above),
        None => (0, path),
    };
    let guard = above
        .last()
        .copied()
        .or(incoming.guard)
        .unwrap_or_default();

    CompileError::GuardConflict {
        level: level + above.len(),
        guard,
        byte,
        first: existing.sequence_through(trie, path),
        second: incoming.sequence_through(trie, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::registry::canonicalize_entries;
    use crate::table::parse_table;
    use crate::trie::build_trie;

    fn compile(text: &str) -> CompileResult<(Automaton, KeyRegistry)> {
        let layout = Layout::us();
        let (entries, registry) = canonicalize_entries(&parse_table(text)?, &layout)?;
        let trie = build_trie(&entries)?;
        let modifiers = ModifierSet::from_layout(&layout);
        let automaton = AutomatonCompiler::new(&registry, &modifiers).compile(&trie)?;
        Ok((automaton, registry))
    }

    #[test]
    fn test_single_level_table() {
        let (automaton, registry) = compile("1C\tA pressed\nF0\tA released\n16\t1 pressed\n").unwrap();
        assert_eq!(automaton.max_level(), 0);

        let level0 = automaton.level(0).unwrap();
        assert_eq!(level0.dispatches.len(), 1);
        let dispatch = &level0.dispatches[0];
        assert_eq!(dispatch.guard, None);
        assert_eq!(
            dispatch.arm(0x1C),
            Some(&Arm::Press {
                key: registry.index_of("Alpha_A").unwrap(),
                modifier: None
            })
        );
        assert_eq!(dispatch.arm(0x99), None);
    }

    #[test]
    fn test_branch_advances_and_guards_next_level() {
        let (automaton, registry) =
            compile("E0,75\tcursor up pressed\nE0,72\tcursor down pressed\nE1,75\tF1 pressed\n")
                .unwrap();
        assert_eq!(automaton.max_level(), 1);

        let level0 = &automaton.level(0).unwrap().dispatches[0];
        assert_eq!(level0.arm(0xE0), Some(&Arm::Advance));
        assert_eq!(level0.arm(0xE1), Some(&Arm::Advance));

        // 75 means different keys depending on the byte that led here
        let level1 = automaton.level(1).unwrap();
        assert_eq!(level1.dispatches.len(), 2);
        let after_e0 = level1.dispatch_for(0xE0).unwrap();
        let after_e1 = level1.dispatch_for(0xE1).unwrap();
        assert_eq!(
            after_e0.arm(0x75),
            Some(&Arm::Press { key: registry.index_of("Cursor_Up").unwrap(), modifier: None })
        );
        assert_eq!(
            after_e1.arm(0x75),
            Some(&Arm::Press { key: registry.index_of("F1").unwrap(), modifier: None })
        );
        assert!(level1.dispatch_for(0x12).is_none());
    }

    #[test]
    fn test_modifier_arms_carry_bits() {
        let (automaton, registry) =
            compile("12\tLeft Shift pressed\nF0,12\tLeft Shift released\n").unwrap();
        let shift = registry.index_of("Left_Shift").unwrap();

        let level0 = &automaton.level(0).unwrap().dispatches[0];
        assert_eq!(level0.arm(0x12), Some(&Arm::Press { key: shift, modifier: Some(6) }));
        let level1 = automaton.level(1).unwrap().dispatch_for(0xF0).unwrap();
        assert_eq!(level1.arm(0x12), Some(&Arm::Release { key: shift, modifier: Some(6) }));
    }

    #[test]
    fn test_depth_is_not_bounded() {
        let (automaton, _) = compile(
            "E1,14,77,E1,F0,14,F0,77\tPause pressed\nE0,12,E0,7C\tPrint Screen pressed\n",
        )
        .unwrap();
        assert_eq!(automaton.max_level(), 7);
    }

    #[test]
    fn test_same_guard_at_same_level_is_merged() {
        // Both sequences reach level 5 through F0
        let (automaton, registry) = compile(
            "E0,F0,7C,E0,F0,12\tPrint Screen released\nE1,14,77,E1,F0,14,F0,77\tPause pressed\n",
        )
        .unwrap();

        let level5 = automaton.level(5).unwrap();
        assert_eq!(level5.dispatches.len(), 1);
        let dispatch = level5.dispatch_for(0xF0).unwrap();
        assert_eq!(
            dispatch.arm(0x12),
            Some(&Arm::Release { key: registry.index_of("Print_Screen").unwrap(), modifier: None })
        );
        assert_eq!(dispatch.arm(0x14), Some(&Arm::Advance));
    }

    #[test]
    fn test_conflicting_merge_is_rejected() {
        let result = compile("E0,12,34\tF1 pressed\nE1,12,34\tF2 pressed\n");
        assert!(matches!(
            result,
            Err(CompileError::GuardConflict { level: 2, guard: 0x12, byte: 0x34, .. })
        ));
    }

    #[test]
    fn test_deep_conflict_names_its_own_level_and_both_sequences() {
        let Err(err) = compile("E0,12,34,56\tF1 pressed\nE1,12,34,56\tF2 pressed\n") else {
            panic!("conflicting table compiled");
        };
        let CompileError::GuardConflict {
            level,
            guard,
            byte,
            ref first,
            ref second,
        } = err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!((level, guard, byte), (3, 0x34, 0x56));
        assert_eq!(first.to_string(), "E0,12,34,56");
        assert_eq!(second.to_string(), "E1,12,34,56");
        assert!(err.to_string().contains("E0,12,34,56 and E1,12,34,56"));
    }

    #[test]
    fn test_leaf_against_branch_conflict_names_a_full_sequence() {
        let Err(CompileError::GuardConflict { level, first, second, .. }) =
            compile("E0,12,34\tF1 pressed\nE1,12,34,56\tF2 pressed\n")
        else {
            panic!("expected a guard conflict");
        };
        assert_eq!(level, 2);
        assert_eq!(first, ScanSequence::new(&[0xE0, 0x12, 0x34]));
        assert_eq!(second, ScanSequence::new(&[0xE1, 0x12, 0x34, 0x56]));
    }
}
