//! Template-based file and directory naming.
//!
//! Templates hold `%Token%` placeholders, matched case-insensitively:
//! `%Track%`, `%ReleaseArtist%`, `%Artist%`, `%Release%`, `%Title%`,
//! `%Genre%` and `%ReleaseYear%`. Unknown tokens are copied verbatim and
//! substituted values are never rescanned.

use serde::{Deserialize, Serialize};

use crate::metadata::Field;
use crate::model::NodeKind;

/// A recognized template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Track,
    ReleaseArtist,
    Artist,
    Release,
    Title,
    Genre,
    ReleaseYear,
}

impl Token {
    /// Parse a placeholder name without its `%` delimiters.
    pub fn parse(name: &str) -> Option<Self> {
        const NAMES: [(&str, Token); 7] = [
            ("track", Token::Track),
            ("releaseartist", Token::ReleaseArtist),
            ("artist", Token::Artist),
            ("release", Token::Release),
            ("title", Token::Title),
            ("genre", Token::Genre),
            ("releaseyear", Token::ReleaseYear),
        ];
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, t)| *t)
    }

    pub fn field(self) -> Field {
        match self {
            Token::Track => Field::Track,
            Token::ReleaseArtist => Field::AlbumArtist,
            Token::Artist => Field::Artist,
            Token::Release => Field::Release,
            Token::Title => Field::Title,
            Token::Genre => Field::Genre,
            Token::ReleaseYear => Field::Year,
        }
    }
}

/// One naming template per node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Renamer {
    pub release: String,
    pub track: String,
    pub flat: String,
}

impl Default for Renamer {
    fn default() -> Self {
        Self {
            release: "%ReleaseArtist%-%Release%-%ReleaseYear%".to_string(),
            track: "%Track%-%Artist%-%Title%".to_string(),
            flat: "00-%ReleaseArtist%-%Release%".to_string(),
        }
    }
}

impl Renamer {
    pub fn template(&self, kind: NodeKind) -> &str {
        match kind {
            NodeKind::Release => &self.release,
            NodeKind::Track => &self.track,
            NodeKind::Flat => &self.flat,
        }
    }

    /// Expand the template for `kind` using `lookup` for field values.
    ///
    /// `%ReleaseArtist%` falls back to the track artist when no album
    /// artist is set. Missing values expand to nothing.
    pub fn render(&self, kind: NodeKind, lookup: impl Fn(Field) -> Option<String>) -> String {
        expand(self.template(kind), |token| match token {
            Token::ReleaseArtist => lookup(Field::AlbumArtist).or_else(|| lookup(Field::Artist)),
            other => lookup(other.field()),
        })
    }
}

/// Single-pass `%Token%` expansion.
pub fn expand(template: &str, value: impl Fn(Token) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('%') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('%') else {
            out.push_str(&rest[open..]);
            return out;
        };
        match Token::parse(&after[..close]) {
            Some(token) => {
                out.push_str(&value(token).unwrap_or_default());
                rest = &after[close + 1..];
            }
            None => {
                // closing '%' may open the next token
                out.push('%');
                out.push_str(&after[..close]);
                rest = &after[close..];
            }
        }
    }
    out.push_str(rest);
    out
}
