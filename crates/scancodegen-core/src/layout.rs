// Scancodegen Layout Tables
// Symbol names, literal ASCII keys, shift substitutions and the modifier order

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::label::capitalize;

/// Highest usable modifier bit: bit 0 is reserved, the bitmask is a u64
pub const MAX_MODIFIERS: usize = 63;

/// Keyboard layout configuration consumed by the compiler
///
/// A layout is immutable once built and is passed explicitly to the compiler,
/// so several layouts can be compiled side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Punctuation character -> symbol name (`;` -> `Semicolon`)
    symbols: IndexMap<char, String>,
    /// Named keys with a literal ASCII value (`Space` -> ' ')
    literals: IndexMap<String, char>,
    /// Capitalized key part -> character produced while shift is held
    shift: IndexMap<String, char>,
    /// Ordered modifier keys; bit position is the 1-based index
    modifiers: Vec<String>,
}

/// Errors that can occur when loading a layout
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("invalid layout entry: {0}")]
    InvalidEntry(String),

    #[error("too many modifiers: {0} (at most {MAX_MODIFIERS})")]
    TooManyModifiers(usize),

    #[error("modifier {0} listed twice")]
    DuplicateModifier(String),
}

/// TOML representation for deserializing layouts
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LayoutToml {
    #[serde(default)]
    modifiers: Option<Vec<String>>,

    #[serde(default)]
    symbols: Option<IndexMap<String, String>>,

    #[serde(default)]
    literals: Option<IndexMap<String, String>>,

    #[serde(default)]
    shift: Option<IndexMap<String, String>>,
}

const US_SYMBOLS: &[(char, &str)] = &[
    ('`', "Backtick"),
    (',', "Comma"),
    ('.', "Dot"),
    ('/', "Backslash"),
    ('\'', "SingleQuote"),
    ('[', "SquareOpen"),
    (']', "SquareClose"),
    ('=', "Equals"),
    ('\\', "ForwardSlash"),
    ('+', "Plus"),
    ('-', "Minus"),
    ('*', "Star"),
    (';', "Semicolon"),
];

const US_LITERALS: &[(&str, char)] = &[
    ("Space", ' '),
    ("Tab", '\t'),
    ("Backspace", '\x08'),
    ("Enter", '\n'),
];

const US_SHIFT: &[(&str, char)] = &[
    ("Backtick", '~'),
    ("1", '!'),
    ("2", '@'),
    ("3", '#'),
    ("4", '$'),
    ("5", '%'),
    ("6", '^'),
    ("7", '&'),
    ("8", '*'),
    ("9", '('),
    ("0", ')'),
    ("Squareopen", '{'),
    ("Squareclose", '}'),
    ("Semicolon", ':'),
    ("Forwardslash", '|'),
    ("Singlequote", '"'),
    ("Comma", '<'),
    ("Dot", '>'),
    ("Backslash", '?'),
    ("Minus", '_'),
    ("Equals", '+'),
];

const US_MODIFIERS: &[&str] = &[
    "Left_Control",
    "Right_Control",
    "Left_Alt",
    "Right_Alt",
    "Numberlock",
    "Left_Shift",
    "Right_Shift",
    "Capslock",
];

impl Default for Layout {
    fn default() -> Self {
        Self::us()
    }
}

impl Layout {
    /// The built-in US layout
    pub fn us() -> Self {
        Self {
            symbols: US_SYMBOLS
                .iter()
                .map(|&(c, name)| (c, name.to_string()))
                .collect(),
            literals: US_LITERALS
                .iter()
                .map(|&(name, c)| (name.to_string(), c))
                .collect(),
            shift: US_SHIFT
                .iter()
                .map(|&(name, c)| (name.to_string(), c))
                .collect(),
            modifiers: US_MODIFIERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Load a layout from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LayoutError> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Load a layout from a TOML string
    ///
    /// Sections missing from the document keep their US defaults.
    pub fn from_toml(content: &str) -> Result<Self, LayoutError> {
        let parsed: LayoutToml =
            toml::from_str(content).map_err(|e| LayoutError::TomlParse(e.to_string()))?;

        let mut layout = Self::us();

        if let Some(modifiers) = parsed.modifiers {
            layout.modifiers = modifiers;
        }

        if let Some(symbols) = parsed.symbols {
            layout.symbols = symbols
                .into_iter()
                .map(|(symbol, name)| Ok((single_char("symbols", &symbol)?, name)))
                .collect::<Result<_, LayoutError>>()?;
        }

        if let Some(literals) = parsed.literals {
            layout.literals = literals
                .into_iter()
                .map(|(name, value)| Ok((name, single_char("literals", &value)?)))
                .collect::<Result<_, LayoutError>>()?;
        }

        if let Some(shift) = parsed.shift {
            layout.shift = shift
                .into_iter()
                .map(|(name, value)| Ok((name, single_char("shift", &value)?)))
                .collect::<Result<_, LayoutError>>()?;
        }

        layout.validate()?;
        Ok(layout)
    }

    /// Get the default layout path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scancodegen").join("layout.toml"))
    }

    /// Load from default location (~/.config/scancodegen/layout.toml)
    pub fn load_default() -> Result<Self, LayoutError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::us())
    }

    /// Check the invariants the compiler relies on
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.modifiers.len() > MAX_MODIFIERS {
            return Err(LayoutError::TooManyModifiers(self.modifiers.len()));
        }
        for (i, name) in self.modifiers.iter().enumerate() {
            if self.modifiers[..i].contains(name) {
                return Err(LayoutError::DuplicateModifier(name.clone()));
            }
        }

        let chars = self
            .symbols
            .keys()
            .chain(self.literals.values())
            .chain(self.shift.values());
        for &c in chars {
            if !c.is_ascii() {
                return Err(LayoutError::InvalidEntry(format!(
                    "{c:?} is not an ASCII character"
                )));
            }
        }
        Ok(())
    }

    /// Symbol name for a punctuation character
    pub fn symbol_name(&self, symbol: char) -> Option<&str> {
        self.symbols.get(&symbol).map(String::as_str)
    }

    /// Recover the punctuation character from a capitalized symbol name
    ///
    /// Canonical names are capitalized (`SquareOpen` becomes `Squareopen`), so
    /// the comparison is made against the capitalized table entry.
    pub fn symbol_for_name(&self, name: &str) -> Option<char> {
        self.symbols
            .iter()
            .find(|(_, symbol_name)| capitalize(symbol_name) == name)
            .map(|(&c, _)| c)
    }

    /// Literal ASCII value of a named key
    pub fn literal(&self, name: &str) -> Option<char> {
        self.literals.get(name).copied()
    }

    /// Character produced by a key part while shift is held
    pub fn shifted(&self, name: &str) -> Option<char> {
        self.shift.get(name).copied()
    }

    /// Ordered modifier key names
    pub fn modifiers(&self) -> &[String] {
        &self.modifiers
    }
}

fn single_char(section: &str, value: &str) -> Result<char, LayoutError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(LayoutError::InvalidEntry(format!(
            "[{section}] expects a single character, got {value:?}"
        ))),
    }
}
