// Scancodegen Rust Backend
// Emits a self-contained Rust decoder module

use super::{generated_banner, query_groups, snake_name, Backend, EmitOptions, SourceWriter};
use crate::automaton::{Arm, Dispatch, LevelHandler};
use crate::compiler::Compilation;

/// Emits a `no_std`-friendly Rust module: no allocation, fixed-size queue
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl Backend for RustBackend {
    fn emit(&self, compilation: &Compilation, options: &EmitOptions) -> String {
        let mut w = SourceWriter::spaces();
        let emitter = RustEmitter { compilation };

        w.line(format!("// {}", generated_banner(options)));
        w.blank();
        emitter.key_enum(&mut w);
        w.blank();
        w.line(format!("pub const KEY_COUNT: usize = {};", compilation.registry.len()));
        w.line(format!("pub const QUEUE_CAPACITY: usize = {};", options.queue_capacity.max(1)));
        w.blank();
        emitter.level_enum(&mut w);
        w.blank();
        emitter.char_tables(&mut w);
        w.blank();
        emitter.handler(&mut w);

        w.finish()
    }
}

struct RustEmitter<'a> {
    compilation: &'a Compilation,
}

impl RustEmitter<'_> {
    fn key_name(&self, index: usize) -> &str {
        self.compilation
            .registry
            .get(index)
            .map(|key| key.name())
            .unwrap_or_default()
    }

    fn key_enum(&self, w: &mut SourceWriter) {
        let repr = if self.compilation.registry.len() <= 256 { "u8" } else { "u16" };
        w.line("/// Canonical keys; the discriminant indexes the character tables");
        w.line("#[allow(non_camel_case_types, dead_code)]");
        w.line("#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
        w.line(format!("#[repr({repr})]"));
        w.open("pub enum Key {");
        for (i, key) in self.compilation.registry.iter().enumerate() {
            w.line(format!("{} = {i},", key.name()));
        }
        w.close("}");
    }

    fn level_enum(&self, w: &mut SourceWriter) {
        w.line("#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
        w.open("enum KeyLevel {");
        for level in 0..=self.compilation.automaton.max_level() {
            w.line(format!("Level{level},"));
        }
        w.close("}");
    }

    fn char_tables(&self, w: &mut SourceWriter) {
        let chars = &self.compilation.chars;
        w.line("/// Plain ASCII value per key, 0 when the key has none");
        char_array(w, "KEY_MAPPING", chars.base_table());
        w.blank();
        w.line("/// Value while shift is held, 0 to keep the plain value");
        char_array(w, "SHIFT_TABLE", chars.shifted_table());
    }

    fn handler(&self, w: &mut SourceWriter) {
        let first_key = self.key_name(0);

        w.line("/// Scancode decoder state, fed one byte at a time");
        w.line("///");
        w.line("/// Not reentrant: callers feeding bytes from more than one context");
        w.line("/// (interrupt handler and polling thread) must serialize access.");
        w.line("#[allow(dead_code)]");
        w.open("pub struct ScancodeHandler {");
        w.line("keys: [Key; QUEUE_CAPACITY],");
        w.line("head: usize,");
        w.line("len: usize,");
        w.line("modifier_states: u64,");
        w.line("last_level_code: u8,");
        w.line("state: KeyLevel,");
        w.close("}");
        w.blank();

        w.open("impl Default for ScancodeHandler {");
        w.open("fn default() -> Self {");
        w.line("Self::new()");
        w.close("}");
        w.close("}");
        w.blank();

        w.line("#[allow(dead_code)]");
        w.open("impl ScancodeHandler {");
        w.open("pub const fn new() -> Self {");
        w.open("Self {");
        w.line(format!("keys: [Key::{first_key}; QUEUE_CAPACITY],"));
        w.line("head: 0,");
        w.line("len: 0,");
        w.line("modifier_states: 0,");
        w.line("last_level_code: 0,");
        w.line("state: KeyLevel::Level0,");
        w.close("}");
        w.close("}");
        w.blank();

        self.queue_methods(w);
        self.modifier_methods(w);

        for handler in self.compilation.automaton.levels() {
            self.level_handler(w, handler);
            w.blank();
        }

        self.dispatch(w);
        w.blank();
        self.next_ascii(w);
        w.close("}");
    }

    fn queue_methods(&self, w: &mut SourceWriter) {
        w.line("/// Queue a completed key; when the queue is full the new key is dropped");
        w.open("fn put(&mut self, key: Key) {");
        w.open("if self.len == QUEUE_CAPACITY {");
        w.line("return;");
        w.close("}");
        w.line("self.keys[(self.head + self.len) % QUEUE_CAPACITY] = key;");
        w.line("self.len += 1;");
        w.close("}");
        w.blank();

        w.open("pub fn next_key(&mut self) -> Option<Key> {");
        w.open("if self.len == 0 {");
        w.line("return None;");
        w.close("}");
        w.line("let key = self.keys[self.head];");
        w.line("self.head = (self.head + 1) % QUEUE_CAPACITY;");
        w.line("self.len -= 1;");
        w.line("Some(key)");
        w.close("}");
        w.blank();

        w.open("pub fn pending(&self) -> usize {");
        w.line("self.len");
        w.close("}");
        w.blank();
    }

    fn modifier_methods(&self, w: &mut SourceWriter) {
        let registry = &self.compilation.registry;
        let modifiers = &self.compilation.modifiers;

        w.line("#[allow(unreachable_patterns)]");
        w.open("fn modifier_index(key: Key) -> u32 {");
        w.open("match key {");
        for name in modifiers.names() {
            if let (true, Some(bit)) = (registry.contains(name), modifiers.bit(name)) {
                w.line(format!("Key::{name} => {bit},"));
            }
        }
        w.line("_ => 0,");
        w.close("}");
        w.close("}");
        w.blank();

        w.open("fn modifier_pressed(&mut self, key: Key) {");
        w.line("let idx = Self::modifier_index(key);");
        w.open("if idx == 0 {");
        w.line("return;");
        w.close("}");
        w.line("self.modifier_states |= 1u64 << idx;");
        w.close("}");
        w.blank();

        w.open("fn modifier_released(&mut self, key: Key) {");
        w.line("let idx = Self::modifier_index(key);");
        w.open("if idx == 0 {");
        w.line("return;");
        w.close("}");
        w.line("self.modifier_states &= !(1u64 << idx);");
        w.close("}");
        w.blank();

        w.open("pub fn is_modifier_pressed(&self, key: Key) -> bool {");
        w.line("let idx = Self::modifier_index(key);");
        w.line("idx != 0 && self.modifier_states & (1u64 << idx) != 0");
        w.close("}");
        w.blank();

        for group in query_groups(modifiers) {
            let present: Vec<String> = group
                .members
                .iter()
                .filter(|m| registry.contains(m))
                .map(|m| format!("self.is_modifier_pressed(Key::{m})"))
                .collect();
            w.open(format!("pub fn is_{}_pressed(&self) -> bool {{", snake_name(&group.name)));
            if present.is_empty() {
                w.line("false");
            } else {
                w.line(present.join(" || "));
            }
            w.close("}");
            w.blank();
        }
    }

    fn level_handler(&self, w: &mut SourceWriter, handler: &LevelHandler) {
        w.open(format!(
            "fn handle_key_level{}(&mut self, byte: u8) -> bool {{",
            handler.level
        ));

        if handler.level == 0 {
            for dispatch in &handler.dispatches {
                self.byte_match(w, handler.level, dispatch);
            }
        } else {
            for (i, dispatch) in handler.dispatches.iter().enumerate() {
                let guard = dispatch.guard.unwrap_or_default();
                if i == 0 {
                    w.open(format!("if self.last_level_code == 0x{guard:02X} {{"));
                } else {
                    w.reopen(format!("}} else if self.last_level_code == 0x{guard:02X} {{"));
                }
                self.byte_match(w, handler.level, dispatch);
            }
            w.reopen("} else {");
            w.line("self.state = KeyLevel::Level0;");
            w.line("false");
            w.close("}");
        }

        w.close("}");
    }

    fn byte_match(&self, w: &mut SourceWriter, level: usize, dispatch: &Dispatch) {
        w.open("match byte {");
        for (&byte, arm) in &dispatch.arms {
            match *arm {
                Arm::Press { key, modifier } => {
                    let name = self.key_name(key);
                    w.open(format!("0x{byte:02X} => {{"));
                    if level > 0 {
                        w.line("self.state = KeyLevel::Level0;");
                    }
                    w.line(format!("self.put(Key::{name});"));
                    if modifier.is_some() {
                        w.line(format!("self.modifier_pressed(Key::{name});"));
                    }
                    w.line("true");
                    w.close("}");
                }
                Arm::Release {
                    key,
                    modifier: Some(_),
                } => {
                    let name = self.key_name(key);
                    w.open(format!("0x{byte:02X} => {{"));
                    if level > 0 {
                        w.line("self.state = KeyLevel::Level0;");
                    }
                    w.line(format!("self.modifier_released(Key::{name});"));
                    w.line("false");
                    w.close("}");
                }
                // Plain releases fall through to the reset arm
                Arm::Release { modifier: None, .. } => {}
                Arm::Advance => {
                    w.open(format!("0x{byte:02X} => {{"));
                    w.line(format!("self.last_level_code = 0x{byte:02X};"));
                    w.line(format!("self.state = KeyLevel::Level{};", level + 1));
                    w.line("false");
                    w.close("}");
                }
            }
        }
        w.open("_ => {");
        w.line("self.state = KeyLevel::Level0;");
        w.line("false");
        w.close("}");
        w.close("}");
    }

    fn dispatch(&self, w: &mut SourceWriter) {
        w.line("/// Feed one scancode byte.");
        w.line("///");
        w.line("/// Returns `true` only when a key press was completed and queued.");
        w.line("/// `false` means the sequence is still in progress, a release or");
        w.line("/// modifier change was processed, or an unknown byte reset the decoder;");
        w.line("/// the return value deliberately does not tell these apart.");
        w.open("pub fn handle_key(&mut self, byte: u8) -> bool {");
        w.open("match self.state {");
        for level in 0..=self.compilation.automaton.max_level() {
            w.line(format!(
                "KeyLevel::Level{level} => self.handle_key_level{level}(byte),"
            ));
        }
        w.close("}");
        w.close("}");
    }

    fn next_ascii(&self, w: &mut SourceWriter) {
        w.line("/// Dequeue the next key and resolve it to ASCII");
        w.line("///");
        w.line("/// `None` when the queue is empty or the key has no ASCII value.");
        w.open("pub fn next_ascii(&mut self) -> Option<u8> {");
        w.line("let key = self.next_key()? as usize;");
        w.line("let mut res = KEY_MAPPING[key];");
        w.open("if self.is_capslock_pressed() && !self.is_shift_pressed() && res.is_ascii_lowercase() {");
        w.line("res = res.to_ascii_uppercase();");
        w.close("}");
        w.open("if res != 0 && self.is_shift_pressed() && SHIFT_TABLE[key] != 0 {");
        w.line("res = SHIFT_TABLE[key];");
        w.close("}");
        w.open("if res == 0 {");
        w.line("None");
        w.reopen("} else {");
        w.line("Some(res)");
        w.close("}");
        w.close("}");
    }
}

fn char_array(w: &mut SourceWriter, name: &str, values: &[Option<char>]) {
    w.open(format!("const {name}: [u8; KEY_COUNT] = ["));
    for value in values {
        w.line(format!("{},", rust_byte(*value)));
    }
    w.close("];");
}

/// Byte literal for a table entry, `0` for "no value"
fn rust_byte(value: Option<char>) -> String {
    match value {
        Some(c) if c.is_ascii() && c != '\0' => format!("b'{}'", (c as u8).escape_ascii()),
        _ => "0".to_string(),
    }
}
