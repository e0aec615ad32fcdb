// Scancodegen Runtime Decoder
// In-process interpreter for a compiled automaton, one byte per call

use std::collections::VecDeque;

use crate::automaton::Arm;
use crate::compiler::Compilation;
use crate::label::CanonicalKey;
use crate::modifier::ModifierState;

/// Default capacity of the completed-key queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Bounded FIFO of completed key-downs
///
/// When full, the incoming key is dropped and counted; keys already queued
/// are never overwritten.
#[derive(Debug, Clone)]
pub struct KeyQueue {
    keys: VecDeque<usize>,
    capacity: usize,
    dropped: usize,
}

impl KeyQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append a key; returns `false` if the queue was full and it was dropped
    pub fn put(&mut self, key: usize) -> bool {
        if self.keys.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.keys.push_back(key);
        true
    }

    pub fn get(&mut self) -> Option<usize> {
        self.keys.pop_front()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys discarded because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Feeds scancode bytes through a [`Compilation`]'s automaton
///
/// Mirrors the generated handler: current level, the byte that led to it,
/// the modifier bitmask and the key queue. Not reentrant; callers that feed
/// bytes from more than one context must serialize access.
#[derive(Debug, Clone)]
pub struct ScancodeDecoder<'a> {
    compilation: &'a Compilation,
    level: usize,
    last_level_code: u8,
    modifiers: ModifierState,
    queue: KeyQueue,
}

impl<'a> ScancodeDecoder<'a> {
    pub fn new(compilation: &'a Compilation) -> Self {
        Self::with_capacity(compilation, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(compilation: &'a Compilation, capacity: usize) -> Self {
        Self {
            compilation,
            level: 0,
            last_level_code: 0,
            modifiers: ModifierState::new(),
            queue: KeyQueue::with_capacity(capacity),
        }
    }

    /// Feed one scancode byte
    ///
    /// Returns `true` only when a key-down was completed and queued. `false`
    /// covers three different cases that callers must not treat alike: the
    /// sequence is still in progress, a release or modifier update was
    /// processed, or an unknown byte reset the automaton to level 0.
    pub fn feed(&mut self, byte: u8) -> bool {
        let arm = self
            .compilation
            .automaton
            .level(self.level)
            .and_then(|handler| handler.dispatch_for(self.last_level_code))
            .and_then(|dispatch| dispatch.arm(byte))
            .copied();

        match arm {
            Some(Arm::Press { key, modifier }) => {
                if !self.queue.put(key) {
                    log::warn!("key queue full, dropping key {key}");
                }
                if let Some(bit) = modifier {
                    self.modifiers.press(bit);
                }
                self.level = 0;
                true
            }
            Some(Arm::Release { modifier, .. }) => {
                if let Some(bit) = modifier {
                    self.modifiers.release(bit);
                }
                self.level = 0;
                false
            }
            Some(Arm::Advance) => {
                self.last_level_code = byte;
                self.level += 1;
                false
            }
            None => {
                self.level = 0;
                false
            }
        }
    }

    /// Feed several bytes, returning how many completed a key-down
    pub fn feed_all(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&byte| self.feed(byte)).count()
    }

    /// Current automaton level (0 when idle)
    pub fn level(&self) -> usize {
        self.level
    }

    /// Dequeue the next completed key index
    pub fn next_key(&mut self) -> Option<usize> {
        self.queue.get()
    }

    /// Dequeue the next completed key as its canonical key
    pub fn next_canonical(&mut self) -> Option<&'a CanonicalKey> {
        let compilation = self.compilation;
        self.queue.get().and_then(|key| compilation.registry.get(key))
    }

    /// Dequeue the next key and resolve it to a character
    ///
    /// `None` when the queue is empty or the dequeued key has no ASCII value.
    pub fn next_char(&mut self) -> Option<char> {
        let key = self.queue.get()?;
        self.compilation
            .chars
            .resolve(key, self.is_shift_pressed(), self.is_capslock_pressed())
    }

    pub fn queue(&self) -> &KeyQueue {
        &self.queue
    }

    pub fn modifier_state(&self) -> ModifierState {
        self.modifiers
    }

    /// Whether a single modifier key is held
    pub fn is_modifier_pressed(&self, key: &str) -> bool {
        self.compilation
            .modifiers
            .bit(key)
            .is_some_and(|bit| self.modifiers.is_pressed(bit))
    }

    /// Whether any member of a modifier group is held (`Control` is
    /// Left_Control or Right_Control)
    pub fn is_group_pressed(&self, group: &str) -> bool {
        self.compilation
            .modifiers
            .group(group)
            .is_some_and(|g| g.members.iter().any(|m| self.is_modifier_pressed(m)))
    }

    pub fn is_control_pressed(&self) -> bool {
        self.is_group_pressed("Control")
    }

    pub fn is_alt_pressed(&self) -> bool {
        self.is_group_pressed("Alt")
    }

    pub fn is_shift_pressed(&self) -> bool {
        self.is_group_pressed("Shift")
    }

    pub fn is_capslock_pressed(&self) -> bool {
        self.is_group_pressed("Capslock")
    }

    pub fn is_numberlock_pressed(&self) -> bool {
        self.is_group_pressed("Numberlock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::layout::Layout;

    const TABLE: &str = "\
1C\tA pressed
F0,1C\tA released
E0,48\tUp pressed
E0,50\tDown pressed
12\tLeft Shift pressed
F0,12\tLeft Shift released
59\tRight Shift pressed
F0,59\tRight Shift released
14\tLeft Control pressed
F0,14\tLeft Control released
E0,14\tRight Control pressed
E0,F0,14\tRight Control released
58\tCapslock pressed
F0,58\tCapslock released
";

    fn compiled() -> Compilation {
        compile(TABLE, &Layout::us()).unwrap()
    }

    #[test]
    fn test_queue_drops_newest_when_full() {
        let mut queue = KeyQueue::with_capacity(2);
        assert!(queue.put(1));
        assert!(queue.put(2));
        assert!(!queue.put(3));
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.get(), Some(1));
        assert_eq!(queue.get(), Some(2));
        assert_eq!(queue.get(), None);
    }

    #[test]
    fn test_multi_byte_sequence_completes() {
        let compilation = compiled();
        let mut decoder = ScancodeDecoder::new(&compilation);

        assert!(!decoder.feed(0xE0));
        assert_eq!(decoder.level(), 1);
        assert!(decoder.feed(0x48));
        assert_eq!(decoder.level(), 0);
        assert_eq!(decoder.next_canonical().unwrap().name(), "Up");
    }

    #[test]
    fn test_unknown_byte_resets() {
        let compilation = compiled();
        let mut decoder = ScancodeDecoder::new(&compilation);

        assert!(!decoder.feed(0xE0));
        assert!(!decoder.feed(0x99));
        assert_eq!(decoder.level(), 0);
        assert!(decoder.queue().is_empty());

        // The next sequence starts cleanly
        assert!(decoder.feed(0x1C));
        assert_eq!(decoder.next_char(), Some('a'));
    }

    #[test]
    fn test_release_is_not_a_completed_event() {
        let compilation = compiled();
        let mut decoder = ScancodeDecoder::new(&compilation);

        assert_eq!(decoder.feed_all(&[0x1C, 0xF0, 0x1C]), 1);
        assert_eq!(decoder.queue().len(), 1);
        assert_eq!(decoder.level(), 0);
    }

    #[test]
    fn test_control_pair_is_ored() {
        let compilation = compiled();
        let mut decoder = ScancodeDecoder::new(&compilation);

        decoder.feed_all(&[0xE0, 0x14]);
        assert!(decoder.is_modifier_pressed("Right_Control"));
        assert!(!decoder.is_modifier_pressed("Left_Control"));
        assert!(decoder.is_control_pressed());

        decoder.feed_all(&[0xE0, 0xF0, 0x14]);
        assert!(!decoder.is_control_pressed());

        decoder.feed(0x14);
        assert!(decoder.is_control_pressed());
        assert_eq!(decoder.modifier_state().bits() & 1, 0);
    }

    #[test]
    fn test_capslock_and_shift() {
        let compilation = compiled();
        let mut decoder = ScancodeDecoder::new(&compilation);

        decoder.feed(0x58);
        decoder.feed(0x1C);
        assert!(decoder.is_capslock_pressed());
        // Capslock press itself is queued first
        assert_eq!(decoder.next_char(), None);
        assert_eq!(decoder.next_char(), Some('A'));

        decoder.feed(0x59);
        decoder.feed(0x1C);
        decoder.next_key();
        assert_eq!(decoder.next_char(), Some('A'));

        decoder.feed_all(&[0xF0, 0x58, 0xF0, 0x59]);
        decoder.feed(0x1C);
        assert_eq!(decoder.next_char(), Some('a'));
        assert!(!decoder.is_shift_pressed());
        assert!(!decoder.is_alt_pressed());
        assert!(!decoder.is_numberlock_pressed());
    }

    #[test]
    fn test_full_queue_still_reports_completion() {
        let compilation = compiled();
        let mut decoder = ScancodeDecoder::with_capacity(&compilation, 1);

        assert!(decoder.feed(0x1C));
        assert!(decoder.feed(0x1C));
        assert_eq!(decoder.queue().len(), 1);
        assert_eq!(decoder.queue().dropped(), 1);
    }
}
