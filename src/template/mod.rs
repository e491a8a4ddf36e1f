//! The LaTeX document template and its loader.
//!
//! A template is plain LaTeX with three tables the renderer reads back out of it:
//! styling (`geometry`, `\hypersetup`, `\lstset`), languages (`\lstdefinelanguage`,
//! `\lstalias`) and glyph substitutions (`\newunicodechar`). It also carries empty
//! `\title{}`, `\author{}` and `\date{}` slots and a single insertion marker line where
//! the converted chapters are spliced in.

mod glyphs;
mod keyval;
mod language;
mod scanner;
mod style;

pub use glyphs::*;
pub use language::*;
pub use style::*;

use crate::latex::escape::escape_prose;
use crate::splice::{self, SpliceError};
use thiserror::Error;

/// The template shipped with the renderer.
pub const DEFAULT_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/template.tex"
));

/// The line generated content replaces.
pub const INSERTION_MARKER: &str = "%% mdbook-tectonic begin";

/// Reasons a template cannot be loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("line {line}: malformed `\\{directive}`: {reason}")]
    MalformedDirective {
        directive: String,
        line: usize,
        reason: String,
    },
    #[error("language `{0}` is defined more than once")]
    DuplicateLanguage(String),
    #[error("alias `{alias}` refers to undefined language `{target}`")]
    UnresolvedAlias { alias: String, target: String },
    #[error("alias `{0}` collides with another language name")]
    AliasCollision(String),
    #[error("no highlighting rules for language `{0}`")]
    UnknownLanguage(String),
    #[error("glyph substitution for `{0}` is defined more than once")]
    DuplicateGlyph(char),
    #[error("glyph substitution source `{0}` must be exactly one character")]
    InvalidGlyph(String),
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
}

/// Title page metadata filled into the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    /// Raw LaTeX, e.g. `\today`
    pub date: String,
}

/// A loaded template: its source text plus the tables read from it.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    pub style: StyleConfig,
    pub languages: LanguageTable,
    pub glyphs: GlyphTable,
}

impl Template {
    /// Loads the built-in template.
    pub fn builtin() -> Result<Template, ConfigurationError> {
        Template::load(DEFAULT_TEMPLATE)
    }

    /// Parses a template's styling, language and glyph tables.
    pub fn load<S: Into<String>>(source: S) -> Result<Template, ConfigurationError> {
        let source = source.into();
        let mut style = StyleConfig::default();
        let mut languages = LanguageTable::default();
        let mut glyphs = GlyphTable::default();

        for directive in scanner::scan(&source)? {
            match directive.name.as_str() {
                "usepackage" => match (directive.required(0), directive.optional(0)) {
                    (Some("geometry"), Some(options)) => style.apply_geometry(options),
                    (Some("hyperref"), Some(options)) => style.apply_hypersetup(options),
                    _ => {}
                },
                "geometry" => style.apply_geometry(directive.expect_required(0)?),
                "hypersetup" => style.apply_hypersetup(directive.expect_required(0)?),
                "lstset" => style.apply_lstset(directive.expect_required(0)?)?,
                "lstdefinelanguage" => {
                    let name = directive.expect_required(0)?.trim();
                    let body = directive.expect_required(1)?;
                    if name.is_empty() {
                        return Err(ConfigurationError::MalformedDirective {
                            directive: directive.name.clone(),
                            line: directive.line,
                            reason: "empty language name".to_string(),
                        });
                    }
                    languages.insert(LanguageDefinition::from_listings(name, body)?)?;
                }
                "lstalias" => {
                    let alias = directive.expect_required(0)?.trim();
                    let target = directive.expect_required(1)?.trim();
                    languages.add_alias(alias, target)?;
                }
                "newunicodechar" => {
                    let source = directive.expect_required(0)?;
                    let replacement = directive.expect_required(1)?;
                    glyphs.insert(GlyphSubstitution::from_directive(source, replacement)?)?;
                }
                _ => {}
            }
        }

        languages.validate()?;
        for (a, b) in languages.identical_rulesets() {
            log::warn!(
                "languages `{a}` and `{b}` share identical highlighting rules; \
                 one of them is probably a copy-paste placeholder"
            );
        }
        log::debug!(
            "loaded template with {} languages and {} glyph substitutions",
            languages.len(),
            glyphs.len()
        );

        Ok(Template {
            source,
            style,
            languages,
            glyphs,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fills the empty `\title{}`, `\author{}` and `\date{}` slots. Title and authors
    /// are escaped; the date is raw LaTeX and must not contain the insertion marker.
    pub fn set_metadata(&mut self, metadata: &Metadata) -> Result<(), ConfigurationError> {
        if metadata.date.contains(INSERTION_MARKER) {
            return Err(ConfigurationError::InvalidValue {
                key: "date".to_string(),
                value: metadata.date.clone(),
            });
        }
        let title = escape_prose(&metadata.title, &self.glyphs);
        let authors = metadata
            .authors
            .iter()
            .map(|author| escape_prose(author, &self.glyphs))
            .collect::<Vec<String>>()
            .join(r" \and ");

        self.source = self
            .source
            .replace(r"\title{}", &format!(r"\title{{{title}}}"))
            .replace(r"\author{}", &format!(r"\author{{{authors}}}"))
            .replace(r"\date{}", &format!(r"\date{{{}}}", metadata.date));
        Ok(())
    }

    /// Splices `body` in at the insertion marker.
    pub fn render(&self, body: &str) -> Result<String, SpliceError> {
        splice::splice(&self.source, INSERTION_MARKER, body)
    }
}
