//! Language tables for code block highlighting.
//!
//! Each `\lstdefinelanguage` in the template becomes a [`LanguageDefinition`], and each
//! `\lstalias` an alternative name for one. Code blocks look their rules up by the
//! language tag of the fence, so names must be unique across the table.

use super::keyval::{self, KeyValue};
use super::ConfigurationError;
use derive_builder::Builder;
use std::collections::{BTreeMap, BTreeSet};

/// The highlighting rules for one language.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(setter(into))]
pub struct LanguageDefinition {
    pub name: String,
    #[builder(setter(each(name = "keyword", into)), default)]
    pub keywords: BTreeSet<String>,
    #[builder(setter(each(name = "secondary_keyword", into)), default)]
    pub secondary_keywords: BTreeSet<String>,
    #[builder(default = "true")]
    pub case_sensitive: bool,
    #[builder(setter(into, strip_option), default)]
    pub line_comment: Option<String>,
    #[builder(setter(strip_option), default)]
    pub block_comment: Option<(String, String)>,
    #[builder(setter(each(name = "string_delimiter")), default)]
    pub string_delimiters: BTreeSet<char>,
}

impl LanguageDefinition {
    /// Parses the body of `\lstdefinelanguage{name}{body}`.
    pub fn from_listings(name: &str, body: &str) -> Result<LanguageDefinition, ConfigurationError> {
        let mut keywords = BTreeSet::new();
        let mut secondary_keywords = BTreeSet::new();
        let mut case_sensitive = true;
        let mut line_comment: Option<String> = None;
        let mut block_comment: Option<(String, String)> = None;
        let mut string_delimiters = BTreeSet::new();

        for KeyValue { key, value } in keyval::parse(body) {
            let value = value.unwrap_or_default();
            match key.as_str() {
                "keywords" | "morekeywords" | "ndkeywords" | "morendkeywords" => {
                    let (class, list) = split_class(&value);
                    let secondary = key.contains("nd") || class.as_deref() == Some("2");
                    let target = if secondary {
                        &mut secondary_keywords
                    } else {
                        &mut keywords
                    };
                    if !key.starts_with("more") {
                        target.clear();
                    }
                    target.extend(word_list(list));
                }
                "sensitive" => {
                    case_sensitive = parse_bool(&key, &value)?;
                }
                "comment" | "morecomment" => {
                    let (class, rest) = split_class(&value);
                    let delimiters = delimiters(rest);
                    match (class.as_deref(), delimiters.as_slice()) {
                        (Some("l"), [start]) => {
                            if line_comment.is_none() {
                                line_comment = Some(start.clone());
                            } else {
                                log::debug!(
                                    "language `{name}`: ignoring additional line comment `{start}`"
                                );
                            }
                        }
                        (Some("s" | "n"), [start, end]) => {
                            if block_comment.is_none() {
                                block_comment = Some((start.clone(), end.clone()));
                            } else {
                                log::debug!(
                                    "language `{name}`: ignoring additional block comment `{start}`"
                                );
                            }
                        }
                        _ => {
                            return Err(ConfigurationError::InvalidValue {
                                key: format!("{name}: {key}"),
                                value,
                            })
                        }
                    }
                }
                "string" | "morestring" => {
                    let (_, rest) = split_class(&value);
                    let delimiters = delimiters(rest);
                    let mut chars = delimiters.first().map(|d| d.chars()).into_iter().flatten();
                    match (delimiters.len(), chars.next(), chars.next()) {
                        (1, Some(c), None) => {
                            string_delimiters.insert(c);
                        }
                        _ => {
                            return Err(ConfigurationError::InvalidValue {
                                key: format!("{name}: {key}"),
                                value,
                            })
                        }
                    }
                }
                _ => log::trace!("language `{name}`: ignoring listings key `{key}`"),
            }
        }

        let mut builder = LanguageDefinitionBuilder::default();
        builder
            .name(name)
            .keywords(keywords)
            .secondary_keywords(secondary_keywords)
            .case_sensitive(case_sensitive)
            .string_delimiters(string_delimiters);
        if let Some(line_comment) = line_comment {
            builder.line_comment(line_comment);
        }
        if let Some(block_comment) = block_comment {
            builder.block_comment(block_comment);
        }
        builder
            .build()
            .map_err(|e| ConfigurationError::InvalidValue {
                key: name.to_string(),
                value: e.to_string(),
            })
    }

    /// Whether the definition highlights anything at all.
    pub fn has_rules(&self) -> bool {
        !self.keywords.is_empty()
            || !self.secondary_keywords.is_empty()
            || self.line_comment.is_some()
            || self.block_comment.is_some()
            || !self.string_delimiters.is_empty()
    }

    /// Whether two definitions highlight identically, ignoring their names.
    pub fn same_rules(&self, other: &LanguageDefinition) -> bool {
        self.keywords == other.keywords
            && self.secondary_keywords == other.secondary_keywords
            && self.case_sensitive == other.case_sensitive
            && self.line_comment == other.line_comment
            && self.block_comment == other.block_comment
            && self.string_delimiters == other.string_delimiters
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        contains_word(&self.keywords, word, self.case_sensitive)
    }

    pub fn is_secondary_keyword(&self, word: &str) -> bool {
        contains_word(&self.secondary_keywords, word, self.case_sensitive)
    }
}

fn contains_word(words: &BTreeSet<String>, word: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        words.contains(word)
    } else {
        words.iter().any(|w| w.eq_ignore_ascii_case(word))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim() {
        "" | "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigurationError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Splits a leading `[class]` off a listings value.
fn split_class(value: &str) -> (Option<String>, &str) {
    let value = value.trim();
    if let Some(rest) = value.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return (Some(rest[..end].trim().to_string()), rest[end + 1..].trim());
        }
    }
    (None, value)
}

fn word_list(list: &str) -> impl Iterator<Item = String> + '_ {
    keyval::split_top_level(keyval::strip_braces(list.trim()), ',')
        .into_iter()
        .map(|word| keyval::unescape(word.trim()))
        .filter(|word| !word.is_empty())
}

/// Reads delimiters written either as `{groups}` or as single (possibly escaped)
/// characters, e.g. `{/*}{*/}`, `"` or `\#`.
fn delimiters(text: &str) -> Vec<String> {
    let mut delimiters = Vec::new();
    let mut chars = text.trim().chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '{' => {
                let mut group = String::new();
                let mut depth = 0usize;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            group.push(c);
                            if let Some(escaped) = chars.next() {
                                group.push(escaped);
                            }
                        }
                        '{' => {
                            depth += 1;
                            group.push(c);
                        }
                        '}' if depth == 0 => break,
                        '}' => {
                            depth -= 1;
                            group.push(c);
                        }
                        _ => group.push(c),
                    }
                }
                delimiters.push(keyval::unescape(&group));
            }
            '\\' => match chars.next() {
                Some(escaped) => delimiters.push(escaped.to_string()),
                None => delimiters.push(c.to_string()),
            },
            c => delimiters.push(c.to_string()),
        }
    }
    delimiters
}

/// All languages known to a template, with their aliases.
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    languages: BTreeMap<String, LanguageDefinition>,
    aliases: BTreeMap<String, String>,
}

impl LanguageTable {
    fn has_language(&self, name: &str) -> bool {
        self.languages.keys().any(|n| n.eq_ignore_ascii_case(name))
    }

    fn has_alias(&self, name: &str) -> bool {
        self.aliases.keys().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Adds a definition. Names are unique ignoring ASCII case, matching [`LanguageTable::get`].
    pub fn insert(&mut self, language: LanguageDefinition) -> Result<(), ConfigurationError> {
        if self.has_alias(&language.name) {
            return Err(ConfigurationError::AliasCollision(language.name));
        }
        if self.has_language(&language.name) {
            return Err(ConfigurationError::DuplicateLanguage(language.name));
        }
        self.languages.insert(language.name.clone(), language);
        Ok(())
    }

    /// Registers `alias` as another name for `target`. Targets are checked by
    /// [`LanguageTable::validate`] once the whole template has been read.
    ///
    /// An alias differing from its target only in case is redundant and dropped.
    pub fn add_alias<A: ToString, T: ToString>(
        &mut self,
        alias: A,
        target: T,
    ) -> Result<(), ConfigurationError> {
        let alias = alias.to_string();
        let target = target.to_string();
        if alias.eq_ignore_ascii_case(&target) {
            log::debug!("alias `{alias}` only differs from `{target}` in case, skipping");
            return Ok(());
        }
        if self.has_language(&alias) || self.has_alias(&alias) {
            return Err(ConfigurationError::AliasCollision(alias));
        }
        self.aliases.insert(alias, target);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (alias, target) in &self.aliases {
            if self.has_language(alias) {
                return Err(ConfigurationError::AliasCollision(alias.clone()));
            }
            if self.definition(target).is_none() {
                return Err(ConfigurationError::UnresolvedAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Looks a language up by name or alias: exact match first, then ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&LanguageDefinition> {
        if let Some(language) = self.languages.get(name) {
            return Some(language);
        }
        if let Some(target) = self.aliases.get(name) {
            return self.definition(target);
        }

        if let Some(language) = self
            .languages
            .values()
            .find(|l| l.name.eq_ignore_ascii_case(name))
        {
            return Some(language);
        }
        self.aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .and_then(|(_, target)| self.definition(target))
    }

    fn definition(&self, name: &str) -> Option<&LanguageDefinition> {
        self.languages.get(name).or_else(|| {
            self.languages
                .values()
                .find(|l| l.name.eq_ignore_ascii_case(name))
        })
    }

    /// Every name a code block may use, definitions and aliases alike, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .languages
            .keys()
            .chain(self.aliases.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn definitions(&self) -> impl Iterator<Item = &LanguageDefinition> {
        self.languages.values()
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// Pairs of distinct definitions with identical, non-empty rules.
    pub fn identical_rulesets(&self) -> Vec<(&str, &str)> {
        let definitions: Vec<&LanguageDefinition> =
            self.languages.values().filter(|l| l.has_rules()).collect();
        let mut pairs = Vec::new();
        for (i, a) in definitions.iter().enumerate() {
            for b in definitions.iter().skip(i + 1) {
                if a.same_rules(b) {
                    pairs.push((a.name.as_str(), b.name.as_str()));
                }
            }
        }
        pairs
    }
}
