//! Text normalization for node names and metadata fields.
//!
//! A [`Formatter`] applies an ordered list of literal replacements
//! (case-insensitive) and then a [`Casing`] chosen by context. Defaults strip
//! characters that are hostile to file systems.
//!
//! # Example
//!
//! ```ignore
//! let mut formatter = Formatter::default();
//! formatter.track_casing = Casing::Lower;
//! formatter.add(" ", "_")?;
//! assert_eq!(formatter.format(Some(FormatContext::Track), "Seven Nation Army"), "seven_nation_army");
//! ```

pub mod renamer;

use std::borrow::Cow;

use regex::{NoExpand, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::NodeKind;

/// Formatter configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Replacement for {0:?} is already defined")]
    DuplicateKey(String),

    #[error("Replacement pattern must not be empty")]
    EmptyPattern,
}

/// Letter casing applied after replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Casing {
    /// First letter of each word upper, rest lower. All-caps words are kept.
    #[default]
    Title,
    Lower,
    Upper,
}

impl Casing {
    pub fn apply(self, text: &str) -> String {
        match self {
            Casing::Title => title_case(text),
            Casing::Lower => text.to_lowercase(),
            Casing::Upper => text.to_uppercase(),
        }
    }
}

/// What the formatted text names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatContext {
    Release,
    Track,
    Flat,
}

impl From<NodeKind> for FormatContext {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Release => FormatContext::Release,
            NodeKind::Track => FormatContext::Track,
            NodeKind::Flat => FormatContext::Flat,
        }
    }
}

/// One literal substitution rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub pattern: String,
    pub replacement: String,
}

impl Replacement {
    fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }

    /// Replace every non-overlapping, case-insensitive occurrence of the
    /// pattern. The replacement is inserted literally.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.pattern.is_empty() {
            return Cow::Borrowed(text);
        }
        match RegexBuilder::new(&regex::escape(&self.pattern))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re.replace_all(text, NoExpand(&self.replacement)),
            Err(e) => {
                warn!(pattern = %self.pattern, error = %e, "Unusable replacement pattern");
                Cow::Borrowed(text)
            }
        }
    }
}

/// Replacement rules plus per-context casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formatter {
    pub replacements: Vec<Replacement>,
    pub release_casing: Casing,
    pub track_casing: Casing,
    pub flat_casing: Casing,
    pub metadata_casing: Casing,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            replacements: vec![
                Replacement::new("\\", " "),
                Replacement::new("/", " "),
                Replacement::new(":", " "),
                Replacement::new("*", ""),
                Replacement::new("?", ""),
                Replacement::new("<", ""),
                Replacement::new(">", ""),
            ],
            release_casing: Casing::default(),
            track_casing: Casing::default(),
            flat_casing: Casing::default(),
            metadata_casing: Casing::default(),
        }
    }
}

impl Formatter {
    /// A formatter with no replacement rules.
    pub fn empty() -> Self {
        Self {
            replacements: Vec::new(),
            ..Self::default()
        }
    }

    /// Append a replacement rule. Duplicate patterns are rejected.
    pub fn add(&mut self, pattern: &str, replacement: &str) -> Result<(), FormatError> {
        if pattern.is_empty() {
            return Err(FormatError::EmptyPattern);
        }
        if self.replacements.iter().any(|r| r.pattern == pattern) {
            return Err(FormatError::DuplicateKey(pattern.to_string()));
        }
        self.replacements.push(Replacement::new(pattern, replacement));
        Ok(())
    }

    /// Casing rule for a context. `None` selects the metadata casing.
    pub fn casing(&self, context: Option<FormatContext>) -> Casing {
        match context {
            Some(FormatContext::Release) => self.release_casing,
            Some(FormatContext::Track) => self.track_casing,
            Some(FormatContext::Flat) => self.flat_casing,
            None => self.metadata_casing,
        }
    }

    /// Apply every replacement in order, then the context's casing.
    pub fn format(&self, context: Option<FormatContext>, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let replaced = self
            .replacements
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc).into_owned());
        self.casing(context).apply(&replaced)
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '\'' {
            word.push(ch);
        } else {
            out.push_str(&title_word(&word));
            word.clear();
            out.push(ch);
        }
    }
    out.push_str(&title_word(&word));
    out
}

fn title_word(word: &str) -> String {
    let letters = word.chars().filter(|c| c.is_alphabetic()).count();
    // acronyms like "AC" or "USA" stay as written
    if letters > 1 && word.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
