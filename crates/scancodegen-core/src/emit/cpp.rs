// Scancodegen C++ Backend
// Emits a kernel header around StaticQueue from ds/staticqueue.h

use super::{generated_banner, query_groups, snake_name, Backend, EmitOptions, SourceWriter};
use crate::automaton::{Arm, LevelHandler};
use crate::compiler::Compilation;

/// Header-only `ScancodeHandler` struct for the C++ kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct CppBackend;

impl Backend for CppBackend {
    fn emit(&self, compilation: &Compilation, options: &EmitOptions) -> String {
        let mut w = SourceWriter::tabs();
        let registry = &compilation.registry;
        let modifiers = &compilation.modifiers;
        let max_level = compilation.automaton.max_level();

        w.line(format!("// {}", generated_banner(options)));
        w.line("#pragma once");
        w.blank();
        w.line("#include <ds/staticqueue.h>");
        w.blank();

        let key_type = if registry.len() <= 256 { "u8" } else { "u16" };
        w.open(format!("enum Key : {key_type} {{"));
        for (i, key) in registry.iter().enumerate() {
            w.line(format!("{} = {i},", key.name()));
        }
        w.close("};");
        w.blank();

        w.line("// Not reentrant: serialize calls from IRQ and polling contexts.");
        w.open("struct ScancodeHandler {");
        w.open("enum KeyLevel {");
        for level in 0..=max_level {
            w.line(format!("KeyLevel{level},"));
        }
        w.close("};");
        w.blank();
        w.line(format!("StaticQueue<Key, {}> keys;", options.queue_capacity.max(1)));
        w.line("u64 modifierStates;");
        w.line("u8 lastLevelCode;");
        w.line("KeyLevel state;");
        w.blank();
        w.line("ScancodeHandler() : keys(), modifierStates(0), lastLevelCode(0), state(KeyLevel0) {}");
        w.blank();

        w.open("int getModifierIndex(Key modifier) {");
        w.open("switch(modifier) {");
        for name in modifiers.names() {
            if let (true, Some(bit)) = (registry.contains(name), modifiers.bit(name)) {
                w.line(format!("case Key::{name}: return {bit};"));
            }
        }
        w.line("default: return 0;");
        w.close("}");
        w.close("}");
        w.blank();

        w.open("void modifierPressed(Key modifier) {");
        w.line("int idx = getModifierIndex(modifier);");
        w.line("if(idx == 0) return;");
        w.line("modifierStates |= ((u64)1 << idx);");
        w.close("}");
        w.blank();

        w.open("void modifierReleased(Key modifier) {");
        w.line("int idx = getModifierIndex(modifier);");
        w.line("if(idx == 0) return;");
        w.line("modifierStates &= ~((u64)1 << idx);");
        w.close("}");
        w.blank();

        w.open("bool isModifierPressed(Key modifier) {");
        w.line("int idx = getModifierIndex(modifier);");
        w.line("return idx != 0 && (modifierStates & ((u64)1 << idx)) != 0;");
        w.close("}");
        w.blank();

        for group in query_groups(modifiers) {
            let checks: Vec<String> = group
                .members
                .iter()
                .filter(|m| registry.contains(m))
                .map(|m| format!("isModifierPressed(Key::{m})"))
                .collect();
            w.open(format!("bool is{}Pressed() {{", camel_name(&group.name)));
            if checks.is_empty() {
                w.line("return false;");
            } else {
                w.line(format!("return {};", checks.join(" || ")));
            }
            w.close("}");
            w.blank();
        }

        for handler in compilation.automaton.levels() {
            level_handler(&mut w, compilation, handler);
            w.blank();
        }

        w.line("// Returns true only when a key press was completed and queued.");
        w.open("bool handleKey(u8 byte) {");
        w.open("switch(state) {");
        for level in 0..=max_level {
            w.line(format!("case KeyLevel{level}: return handleKeyLevel{level}(byte);"));
        }
        w.close("}");
        w.line("return false;");
        w.close("}");
        w.blank();

        next_ascii(&mut w, compilation);
        w.close("};");

        w.finish()
    }
}

/// `Numberlock` -> `Numberlock`, `num lock` -> `NumLock`
fn camel_name(name: &str) -> String {
    snake_name(name)
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn level_handler(w: &mut SourceWriter, compilation: &Compilation, handler: &LevelHandler) {
    let key_name = |index: usize| {
        compilation
            .registry
            .get(index)
            .map(|key| key.name())
            .unwrap_or_default()
    };

    w.open(format!("bool handleKeyLevel{}(u8 byte) {{", handler.level));
    for (i, dispatch) in handler.dispatches.iter().enumerate() {
        if let Some(guard) = dispatch.guard {
            let keyword = if i == 0 { "if" } else { "else if" };
            w.open(format!("{keyword}(lastLevelCode == 0x{guard:02X}) {{"));
        }

        w.open("switch(byte) {");
        for (&byte, arm) in &dispatch.arms {
            match *arm {
                Arm::Press { key, modifier } => {
                    let name = key_name(key);
                    w.open(format!("case 0x{byte:02X}: {{"));
                    w.line("state = KeyLevel0;");
                    w.line(format!("keys.put(Key::{name});"));
                    if modifier.is_some() {
                        w.line(format!("modifierPressed(Key::{name});"));
                    }
                    w.line("return true;");
                    w.close("}");
                }
                Arm::Release {
                    key,
                    modifier: Some(_),
                } => {
                    let name = key_name(key);
                    w.open(format!("case 0x{byte:02X}: {{"));
                    w.line("state = KeyLevel0;");
                    w.line(format!("modifierReleased(Key::{name});"));
                    w.line("return false;");
                    w.close("}");
                }
                Arm::Release { modifier: None, .. } => {}
                Arm::Advance => {
                    w.open(format!("case 0x{byte:02X}: {{"));
                    w.line(format!("lastLevelCode = 0x{byte:02X};"));
                    w.line(format!("state = KeyLevel{};", handler.level + 1));
                    w.line("return false;");
                    w.close("}");
                }
            }
        }
        w.open("default: {");
        w.line("state = KeyLevel0;");
        w.line("return false;");
        w.close("}");
        w.close("}");

        if dispatch.guard.is_some() {
            w.close("}");
        }
    }
    w.line("state = KeyLevel0;");
    w.line("return false;");
    w.close("}");
}

fn next_ascii(w: &mut SourceWriter, compilation: &Compilation) {
    let chars = &compilation.chars;

    w.line("// Returns 0 when the queue is empty or the key has no ASCII value.");
    w.open("char getNextASCII() {");
    w.line("if(keys.size() == 0) return 0;");
    w.line("Key k = keys.get();");
    w.line(format!("static const char keyMapping[] = {{ {} }};", char_list(chars.base_table())));
    w.line("char res = keyMapping[k];");
    w.open("if(isCapslockPressed() && res >= 'a' && res <= 'z' && !isShiftPressed()) {");
    w.line("res = res - 32;");
    w.close("}");
    w.open("if(res != 0 && isShiftPressed()) {");
    w.line(format!("static const char shiftTable[] = {{ {} }};", char_list(chars.shifted_table())));
    w.open("if(shiftTable[k] != 0) {");
    w.line("res = shiftTable[k];");
    w.close("}");
    w.close("}");
    w.line("return res;");
    w.close("}");
}

fn char_list(values: &[Option<char>]) -> String {
    values
        .iter()
        .map(|value| cpp_char(*value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// C character literal, `0` for "no value"
fn cpp_char(value: Option<char>) -> String {
    match value {
        Some('\x08') => "'\\b'".to_string(),
        Some('\t') => "'\\t'".to_string(),
        Some('\n') => "'\\n'".to_string(),
        Some('\\') => "'\\\\'".to_string(),
        Some('\'') => "'\\''".to_string(),
        Some(c) if c.is_ascii_graphic() || c == ' ' => format!("'{c}'"),
        Some(c) if c.is_ascii() && c != '\0' => format!("'\\x{:02x}'", c as u8),
        _ => "0".to_string(),
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
E0,75\tcursor up pressed
E0,F0,75\tcursor up released
E1,75\tF1 pressed
14\tLeft Control pressed
F0,14\tLeft Control released
E0,14\tRight Control pressed
E0,F0,14\tRight Control released
66\tBackspace pressed
";

    fn emit() -> String {
        let compilation = compile(TABLE, &Layout::us()).unwrap();
        CppBackend.emit(&compilation, &EmitOptions::default())
    }

    #[test]
    fn test_cpp_char_literals() {
        assert_eq!(cpp_char(Some('a')), "'a'");
        assert_eq!(cpp_char(Some(' ')), "' '");
        assert_eq!(cpp_char(Some('\x08')), "'\\b'");
        assert_eq!(cpp_char(Some('\\')), "'\\\\'");
        assert_eq!(cpp_char(Some('\'')), "'\\''");
        assert_eq!(cpp_char(Some('\x1b')), "'\\x1b'");
        assert_eq!(cpp_char(None), "0");
    }

    #[test]
    fn test_camel_name() {
        assert_eq!(camel_name("Control"), "Control");
        assert_eq!(camel_name("num lock"), "NumLock");
    }

    #[test]
    fn test_header_shape() {
        let source = emit();
        assert!(source.contains("#include <ds/staticqueue.h>"));
        assert!(source.contains("enum Key : u8 {"));
        assert!(source.contains("StaticQueue<Key, 1024> keys;"));
        assert!(source.contains("\tbool handleKey(u8 byte) {"));
        assert!(source.contains("char getNextASCII() {"));
        assert!(source.ends_with("};\n"));
    }

    #[test]
    fn test_guarded_levels() {
        let source = emit();
        assert!(source.contains("bool handleKeyLevel2(u8 byte) {"));
        assert!(source.contains("if(lastLevelCode == 0xE0) {"));
        assert!(source.contains("else if(lastLevelCode == 0xE1) {"));
        assert!(source.contains("if(lastLevelCode == 0xF0) {"));
        assert!(source.contains("case KeyLevel2: return handleKeyLevel2(byte);"));
    }

    #[test]
    fn test_modifiers_only_reference_present_keys() {
        let source = emit();
        assert!(source.contains("case Key::Left_Control: return 1;"));
        assert!(source.contains("case Key::Right_Control: return 2;"));
        assert!(!source.contains("Key::Left_Shift"));
        assert!(source.contains(
            "return isModifierPressed(Key::Left_Control) || isModifierPressed(Key::Right_Control);"
        ));
        assert!(source.contains("modifierReleased(Key::Right_Control);"));
        assert!(source.contains("bool isShiftPressed() {\n\t\treturn false;"));
    }

    #[test]
    fn test_char_tables() {
        let source = emit();
        // Alpha_A, Backspace, Cursor_Up, F1, Left_Control, Right_Control
        assert!(source.contains("keyMapping[] = { 'a', '\\b', 0, 0, 0, 0 };"));
        assert!(source.contains("shiftTable[] = { 'A', 0, 0, 0, 0, 0 };"));
    }
}
