// Scancodegen Modifier System
// Bit assignment for modifier keys and the runtime modifier bitmask

use crate::layout::Layout;

/// The fixed, ordered list of modifier keys of a layout
///
/// Each modifier owns bit `position + 1`; bit 0 is reserved so that
/// non-modifier keys can map to index 0 without touching real state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierSet {
    names: Vec<String>,
}

/// Modifiers queried together, e.g. `Control` = Left_Control | Right_Control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierGroup {
    /// Query name (`Control`, `Capslock`)
    pub name: String,
    /// Member modifier key names in list order
    pub members: Vec<String>,
}

impl ModifierSet {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn from_layout(layout: &Layout) -> Self {
        Self::new(layout.modifiers().to_vec())
    }

    /// Bit index of a modifier key, `None` for ordinary keys
    pub fn bit(&self, key: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|name| name == key)
            .map(|i| i as u32 + 1)
    }

    pub fn is_modifier(&self, key: &str) -> bool {
        self.bit(key).is_some()
    }

    /// Modifier key names in bit order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Query groups: Left/Right pairs collapse into one group, everything
    /// else is queried on its own
    pub fn groups(&self) -> Vec<ModifierGroup> {
        let mut groups: Vec<ModifierGroup> = Vec::new();
        for name in &self.names {
            let group_name = name
                .strip_prefix("Left_")
                .or_else(|| name.strip_prefix("Right_"))
                .unwrap_or(name);

            match groups.iter_mut().find(|g| g.name == group_name) {
                Some(group) => group.members.push(name.clone()),
                None => groups.push(ModifierGroup {
                    name: group_name.to_string(),
                    members: vec![name.clone()],
                }),
            }
        }
        groups
    }

    /// Find a query group by name
    pub fn group(&self, name: &str) -> Option<ModifierGroup> {
        self.groups().into_iter().find(|g| g.name == name)
    }
}

/// Held-modifier bitmask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    bits: u64,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a modifier as held; bit 0 is ignored
    pub fn press(&mut self, bit: u32) {
        if bit == 0 || bit >= u64::BITS {
            return;
        }
        self.bits |= 1u64 << bit;
    }

    pub fn release(&mut self, bit: u32) {
        if bit == 0 || bit >= u64::BITS {
            return;
        }
        self.bits &= !(1u64 << bit);
    }

    pub fn is_pressed(&self, bit: u32) -> bool {
        bit != 0 && bit < u64::BITS && self.bits & (1u64 << bit) != 0
    }

    /// Raw bitmask
    pub fn bits(&self) -> u64 {
        self.bits
    }
}
