use super::ConfigurationError;
use std::collections::BTreeMap;

/// Replaces one character with a LaTeX rendering of it, as declared by `\newunicodechar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphSubstitution {
    pub source: char,
    pub replacement: String,
}

impl GlyphSubstitution {
    /// Builds a substitution from the two arguments of `\newunicodechar`.
    pub fn from_directive(source: &str, replacement: &str) -> Result<GlyphSubstitution, ConfigurationError> {
        let mut chars = source.chars();
        match (chars.next(), chars.next()) {
            (Some(source), None) => Ok(GlyphSubstitution {
                source,
                replacement: replacement.to_string(),
            }),
            _ => Err(ConfigurationError::InvalidGlyph(source.to_string())),
        }
    }
}

/// Exact-match lookup from characters to their substitutions.
#[derive(Debug, Clone, Default)]
pub struct GlyphTable {
    entries: BTreeMap<char, String>,
}

impl GlyphTable {
    pub fn insert(&mut self, glyph: GlyphSubstitution) -> Result<(), ConfigurationError> {
        if self.entries.contains_key(&glyph.source) {
            return Err(ConfigurationError::DuplicateGlyph(glyph.source));
        }
        self.entries.insert(glyph.source, glyph.replacement);
        Ok(())
    }

    pub fn get(&self, c: char) -> Option<&str> {
        self.entries.get(&c).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> {
        self.entries.iter().map(|(c, r)| (*c, r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
