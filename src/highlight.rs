//! Code block highlighting driven by the template's language tables.
//!
//! A fenced code block is resolved by the first word of its info string (`rust,ignore`
//! resolves as `rust`). Blocks whose language the template does not know are rendered
//! as plain text rather than failing the document, unless strict languages are
//! requested. Tokens are wrapped in the styles from the template's `\lstset` and
//! written into a `fancyvrb` `Verbatim` environment whose options mirror the same
//! `\lstset` (line numbers, frame, tab width).

use crate::latex::escape::push_verbatim;
use crate::template::{
    CodeBlockStyle, ConfigurationError, GlyphTable, LanguageDefinition, LanguageTable, LineNumbers,
    Template,
};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TokenKind {
    Plain,
    Keyword,
    SecondaryKeyword,
    Comment,
    String,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Token<'c> {
    pub kind: TokenKind,
    pub text: &'c str,
}

/// What a code block's language tag resolved to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution<'t> {
    Language(&'t LanguageDefinition),
    PlainText,
}

/// The language tag of a fence info string: its first word.
pub fn language_tag(info: &str) -> Option<&str> {
    info.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .find(|word| !word.is_empty())
}

pub struct Highlighter<'t> {
    languages: &'t LanguageTable,
    style: &'t CodeBlockStyle,
    glyphs: &'t GlyphTable,
    strict: bool,
}

impl<'t> Highlighter<'t> {
    pub fn new(template: &'t Template, strict: bool) -> Highlighter<'t> {
        Highlighter {
            languages: &template.languages,
            style: &template.style.code,
            glyphs: &template.glyphs,
            strict,
        }
    }

    /// Resolves a fence info string to highlighting rules.
    pub fn resolve(&self, info: &str) -> Result<Resolution<'t>, ConfigurationError> {
        let Some(tag) = language_tag(info) else {
            return Ok(Resolution::PlainText);
        };

        match self.languages.get(tag) {
            Some(language) => Ok(Resolution::Language(language)),
            None if self.strict => Err(ConfigurationError::UnknownLanguage(tag.to_string())),
            None => {
                log::debug!("no highlighting rules for `{tag}`, rendering as plain text");
                Ok(Resolution::PlainText)
            }
        }
    }

    /// Renders a code block as a `Verbatim` environment.
    pub fn render_block(&self, info: &str, code: &str) -> Result<String, ConfigurationError> {
        let code = expand_tabs(code, self.style.tab_size);
        let tokens = match self.resolve(info)? {
            Resolution::Language(language) => tokenize(language, &code),
            Resolution::PlainText => vec![Token {
                kind: TokenKind::Plain,
                text: &code,
            }],
        };

        let mut out = String::with_capacity(code.len() * 2);
        out.push_str(&self.environment_begin());
        out.push('\n');
        for token in &tokens {
            self.push_token(&mut out, token);
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("\\end{Verbatim}\n");
        Ok(out)
    }

    fn environment_begin(&self) -> String {
        let mut options = vec![r"commandchars=\\\{\}".to_string()];
        if self.style.numbers != LineNumbers::None {
            options.push(format!("numbers={}", self.style.numbers));
            options.push(format!("firstnumber={}", self.style.first_number));
        }
        options.push(format!("frame={}", self.style.frame.fancyvrb()));
        if self.style.break_lines {
            // fvextra
            options.push("breaklines".to_string());
        }
        if !self.style.basic_style.is_empty() {
            options.push(format!("formatcom={{{}}}", self.style.basic_style));
        }
        format!(r"\begin{{Verbatim}}[{}]", options.join(","))
    }

    fn style_of(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Plain => "",
            TokenKind::Keyword => &self.style.keyword_style,
            TokenKind::SecondaryKeyword => &self.style.secondary_keyword_style,
            TokenKind::Comment => &self.style.comment_style,
            TokenKind::String => &self.style.string_style,
        }
    }

    /// Styles are reopened on every line: `fancyvrb` reads its input line by line and a
    /// group may not span a line break.
    fn push_token(&self, out: &mut String, token: &Token<'_>) {
        let style = self.style_of(token.kind);
        for (i, line) in token.text.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if line.is_empty() {
                continue;
            }
            if style.is_empty() {
                push_verbatim(out, line, self.glyphs);
            } else {
                out.push('{');
                out.push_str(style);
                out.push_str("{}");
                push_verbatim(out, line, self.glyphs);
                out.push('}');
            }
        }
    }
}

/// Expands tabs to the next multiple of `tab_size` columns.
pub fn expand_tabs(code: &str, tab_size: usize) -> String {
    if !code.contains('\t') {
        return code.to_string();
    }
    let tab_size = tab_size.max(1);
    let mut out = String::with_capacity(code.len());
    let mut column = 0;
    for c in code.chars() {
        match c {
            '\t' => {
                let width = tab_size - column % tab_size;
                out.extend(std::iter::repeat(' ').take(width));
                column += width;
            }
            '\n' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$' || c == '@'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '@'
}

/// Length in bytes of the string literal at the start of `rest`, opened by `delimiter`.
/// Backslash escapes the next character; an unterminated literal ends with its line.
fn string_len(rest: &str, delimiter: char) -> usize {
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\n' => return i,
            c if c == delimiter => return i + c.len_utf8(),
            _ => {}
        }
    }
    rest.len()
}

/// Splits `code` into highlighted tokens. Adjacent plain text is merged.
pub fn tokenize<'c>(language: &LanguageDefinition, code: &'c str) -> Vec<Token<'c>> {
    let mut tokens = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while pos < code.len() {
        let rest = &code[pos..];
        let Some(c) = rest.chars().next() else { break };

        let (kind, len) = match (&language.block_comment, &language.line_comment) {
            (Some((start, end)), _) if !start.is_empty() && rest.starts_with(start.as_str()) => {
                let body = &rest[start.len()..];
                let len = match body.find(end.as_str()) {
                    Some(i) if !end.is_empty() => start.len() + i + end.len(),
                    _ => rest.len(),
                };
                (TokenKind::Comment, len)
            }
            (_, Some(start)) if !start.is_empty() && rest.starts_with(start.as_str()) => {
                (TokenKind::Comment, rest.find('\n').unwrap_or(rest.len()))
            }
            _ if language.string_delimiters.contains(&c) => (TokenKind::String, string_len(rest, c)),
            _ if is_word_start(c) => {
                let len = rest
                    .char_indices()
                    .find(|(_, c)| !is_word_char(*c))
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                let word = &rest[..len];
                let kind = if language.is_keyword(word) {
                    TokenKind::Keyword
                } else if language.is_secondary_keyword(word) {
                    TokenKind::SecondaryKeyword
                } else {
                    TokenKind::Plain
                };
                (kind, len)
            }
            _ if c.is_ascii_digit() => {
                let len = rest
                    .char_indices()
                    .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_' && *c != '.')
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                (TokenKind::Plain, len)
            }
            _ => (TokenKind::Plain, c.len_utf8()),
        };

        if kind != TokenKind::Plain {
            if plain_start < pos {
                tokens.push(Token {
                    kind: TokenKind::Plain,
                    text: &code[plain_start..pos],
                });
            }
            tokens.push(Token {
                kind,
                text: &code[pos..pos + len],
            });
            plain_start = pos + len;
        }
        pos += len;
    }

    if plain_start < code.len() {
        tokens.push(Token {
            kind: TokenKind::Plain,
            text: &code[plain_start..],
        });
    }
    tokens
}
