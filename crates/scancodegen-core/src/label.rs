// Scancodegen Key Canonicalizer
// Turns raw table labels ("Left Shift pressed", "(;) pressed") into canonical key names

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::layout::Layout;

static LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.*?)\s*\b(?P<transition>pressed|released)\s*\)?\s*$")
        .expect("label pattern is valid")
});

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Names the generated sources cannot use as key variants: `Self` is a Rust
/// keyword and `Key` would shadow the C++ enum it lives in
const RESERVED_NAMES: &[&str] = &["Self", "Key"];

/// Whether `name` can be emitted as a key variant in every target
fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(name) && !RESERVED_NAMES.contains(&name) && !name.contains("__")
}

/// Whether a table row describes a key going down or coming back up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Transition {
    Pressed,
    Released,
}

impl Transition {
    pub fn is_pressed(self) -> bool {
        matches!(self, Transition::Pressed)
    }
}

/// Category a canonical key was classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCategory {
    /// Final token is a single letter
    Alpha,
    /// Final token is a single digit
    Numeric,
    /// Final token is a punctuation character from the symbol table
    Symbol,
    /// Anything else, kept verbatim
    Named,
}

impl KeyCategory {
    /// Name part prepended to the tokens of this category
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            KeyCategory::Alpha => Some("Alpha"),
            KeyCategory::Numeric => Some("Num"),
            KeyCategory::Symbol => Some("Sym"),
            KeyCategory::Named => None,
        }
    }
}

/// A deduplicated symbolic key name such as `Alpha_A` or `Cursor_Up`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey {
    name: String,
    category: KeyCategory,
    parts: Vec<String>,
}

impl CanonicalKey {
    fn from_parts(category: KeyCategory, parts: Vec<String>) -> Self {
        Self {
            name: parts.join("_"),
            category,
            parts,
        }
    }

    /// The identifier used in the generated key enumeration
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> KeyCategory {
        self.category
    }

    /// The last name part (`5` for `Num_Keypad_5`)
    pub fn last_part(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Result of canonicalizing one raw label
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLabel {
    pub key: CanonicalKey,
    pub transition: Transition,
    /// Label tokens before capitalization, used to tell real collisions apart
    /// from the pressed/released pair of one key
    pub tokens: Vec<String>,
}

/// Errors that can occur while canonicalizing a label
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LabelError {
    #[error("label {0:?} does not end in 'pressed' or 'released'")]
    MissingTransition(String),

    #[error("label {0:?} has no key name")]
    EmptyName(String),

    #[error("label {label:?} uses symbol {symbol:?} which has no symbol name")]
    UnknownSymbol { symbol: char, label: String },

    #[error("label {label:?} produces {name:?}, which is not a valid identifier")]
    InvalidIdentifier { name: String, label: String },
}

/// Capitalize a name part: first character upper case, the rest lower case
pub fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Canonicalize a raw label into a key name and transition
///
/// # Examples
/// ```
/// use scancodegen_core::label::{canonicalize, Transition};
/// use scancodegen_core::Layout;
///
/// let parsed = canonicalize("Left Shift released", &Layout::us()).unwrap();
/// assert_eq!(parsed.key.name(), "Left_Shift");
/// assert_eq!(parsed.transition, Transition::Released);
/// ```
pub fn canonicalize(label: &str, layout: &Layout) -> Result<ParsedLabel, LabelError> {
    let trimmed = label.trim();
    let captures = LABEL_PATTERN
        .captures(trimmed)
        .ok_or_else(|| LabelError::MissingTransition(trimmed.to_string()))?;

    let transition: Transition = captures["transition"]
        .parse()
        .map_err(|_| LabelError::MissingTransition(trimmed.to_string()))?;

    let stripped: String = captures["name"]
        .chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .collect();
    let tokens: Vec<String> = stripped.split_whitespace().map(str::to_string).collect();

    let Some(last) = tokens.last() else {
        return Err(LabelError::EmptyName(trimmed.to_string()));
    };

    let mut last_chars = last.chars();
    let category_and_parts = match (last_chars.next(), last_chars.next()) {
        (Some(c), None) if c.is_alphabetic() => (KeyCategory::Alpha, tokens.clone()),
        (Some(c), None) if c.is_numeric() => (KeyCategory::Numeric, tokens.clone()),
        (Some(c), None) => {
            let symbol_name = layout
                .symbol_name(c)
                .ok_or_else(|| LabelError::UnknownSymbol {
                    symbol: c,
                    label: trimmed.to_string(),
                })?;
            let mut parts = tokens[..tokens.len() - 1].to_vec();
            parts.push(symbol_name.to_string());
            (KeyCategory::Symbol, parts)
        }
        _ => (KeyCategory::Named, tokens.clone()),
    };
    let (category, raw_parts) = category_and_parts;

    let parts: Vec<String> = category
        .prefix()
        .map(str::to_string)
        .into_iter()
        .chain(raw_parts)
        .map(|p| capitalize(&p))
        .collect();

    let key = CanonicalKey::from_parts(category, parts);
    if !is_valid_identifier(key.name()) {
        return Err(LabelError::InvalidIdentifier {
            name: key.name().to_string(),
            label: trimmed.to_string(),
        });
    }

    Ok(ParsedLabel {
        key,
        transition,
        tokens,
    })
}
