//! Scanner for the top-level directives of a LaTeX template.
//!
//! The scanner does not understand TeX. It recognises a control sequence followed by
//! any number of `[optional]` and `{required}` groups, which is all the loader needs to
//! read package options, `\lstset`, `\lstdefinelanguage` and `\newunicodechar` tables.
//! Groups are balanced on braces, escaped characters (`\{`, `\%`, ...) never count as
//! delimiters, and `%` comments are dropped both between and inside directives.

use super::ConfigurationError;

/// A single argument group following a control sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Optional(String),
    Required(String),
}

/// A control sequence and the groups that directly follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<Arg>,
    /// 1-indexed line the control sequence starts on
    pub line: usize,
}

impl Directive {
    /// The `index`th `{required}` argument.
    pub fn required(&self, index: usize) -> Option<&str> {
        self.args
            .iter()
            .filter_map(|arg| match arg {
                Arg::Required(s) => Some(s.as_str()),
                Arg::Optional(_) => None,
            })
            .nth(index)
    }

    /// The `index`th `[optional]` argument.
    pub fn optional(&self, index: usize) -> Option<&str> {
        self.args
            .iter()
            .filter_map(|arg| match arg {
                Arg::Optional(s) => Some(s.as_str()),
                Arg::Required(_) => None,
            })
            .nth(index)
    }

    /// Like [`Directive::required`], but a missing argument is a configuration error.
    pub fn expect_required(&self, index: usize) -> Result<&str, ConfigurationError> {
        self.required(index)
            .ok_or_else(|| ConfigurationError::MalformedDirective {
                directive: self.name.clone(),
                line: self.line,
                reason: format!("missing required argument #{}", index + 1),
            })
    }
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Scanner<'a> {
        Scanner {
            src,
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Reads the name of a control sequence; the backslash has already been consumed.
    fn control_sequence(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.bump();
        }
        if self.pos == start {
            // control symbol such as `\\` or `\%`
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    /// Skips spaces and at most one line break, the way TeX looks for arguments.
    fn skip_argument_space(&mut self) {
        let mut newlines = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' if newlines == 0 => {
                    newlines += 1;
                    self.bump();
                }
                _ => break,
            }
        }
    }

    /// Reads a group up to `close`; the opening delimiter has already been consumed.
    fn group(&mut self, directive: &str, line: usize, close: char) -> Result<String, ConfigurationError> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            let Some(c) = self.bump() else {
                return Err(ConfigurationError::MalformedDirective {
                    directive: directive.to_string(),
                    line,
                    reason: format!("unbalanced group, expected `{close}`"),
                });
            };
            match c {
                '\\' => {
                    text.push(c);
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                }
                '%' => self.skip_comment(),
                '{' => {
                    depth += 1;
                    text.push(c);
                }
                '}' if depth > 0 => {
                    depth -= 1;
                    text.push(c);
                }
                c if c == close && depth == 0 => return Ok(text),
                '}' => {
                    return Err(ConfigurationError::MalformedDirective {
                        directive: directive.to_string(),
                        line,
                        reason: "unexpected `}`".to_string(),
                    });
                }
                _ => text.push(c),
            }
        }
    }

    fn directive(&mut self) -> Result<Directive, ConfigurationError> {
        let line = self.line;
        let name = self.control_sequence();
        let mut args = Vec::new();

        // control symbols never take arguments
        if name.chars().all(|c| c.is_ascii_alphabetic()) {
            loop {
                self.skip_argument_space();
                match self.peek() {
                    Some('{') => {
                        self.bump();
                        args.push(Arg::Required(self.group(&name, line, '}')?));
                    }
                    Some('[') => {
                        self.bump();
                        args.push(Arg::Optional(self.group(&name, line, ']')?));
                    }
                    _ => break,
                }
            }
        }

        Ok(Directive { name, args, line })
    }
}

/// Scans `source` for directives, in document order.
pub fn scan(source: &str) -> Result<Vec<Directive>, ConfigurationError> {
    let mut scanner = Scanner::new(source);
    let mut directives = Vec::new();

    while let Some(c) = scanner.bump() {
        match c {
            '%' => scanner.skip_comment(),
            '\\' => directives.push(scanner.directive()?),
            _ => {}
        }
    }

    Ok(directives)
}
