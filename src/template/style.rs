//! Document and code block styling read from the template preamble.
//!
//! Page geometry comes from the `geometry` package options, link colours from
//! `\hypersetup` and code block parameters from `\lstset`. Anything the template does not
//! set keeps the documented defaults: 1in margins, `red!50!black` internal links,
//! `blue!50!black` citations, `blue!80!black` URLs, and code blocks numbered on the left
//! from 1, framed top and bottom, in fixed columns with a tab width of 2.

use super::keyval::{self, KeyValue};
use super::ConfigurationError;
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LineNumbers {
    Left,
    Right,
    None,
}

impl LineNumbers {
    fn parse(value: &str) -> Result<LineNumbers, ConfigurationError> {
        match value {
            "left" => Ok(LineNumbers::Left),
            "right" => Ok(LineNumbers::Right),
            "none" => Ok(LineNumbers::None),
            _ => Err(invalid("numbers", value)),
        }
    }
}

impl fmt::Display for LineNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineNumbers::Left => write!(f, "left"),
            LineNumbers::Right => write!(f, "right"),
            LineNumbers::None => write!(f, "none"),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Columns {
    Fixed,
    Flexible,
    FullFlexible,
    SpaceFlexible,
}

impl Columns {
    fn parse(value: &str) -> Result<Columns, ConfigurationError> {
        // listings allows an alignment prefix such as `[c]fixed`
        let name = match value.strip_prefix('[') {
            Some(rest) => rest.split_once(']').map(|(_, name)| name).unwrap_or(rest),
            None => value,
        };
        match name.trim() {
            "fixed" => Ok(Columns::Fixed),
            "flexible" => Ok(Columns::Flexible),
            "fullflexible" => Ok(Columns::FullFlexible),
            "spaceflexible" => Ok(Columns::SpaceFlexible),
            _ => Err(invalid("columns", value)),
        }
    }
}

/// Which sides of a code block are ruled.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Frame {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Frame {
    fn parse(value: &str) -> Result<Frame, ConfigurationError> {
        let all = Frame {
            top: true,
            bottom: true,
            left: true,
            right: true,
        };
        match value {
            "" | "none" => return Ok(Frame::default()),
            "single" | "shadowbox" => return Ok(all),
            "lines" => {
                return Ok(Frame {
                    top: true,
                    bottom: true,
                    ..Frame::default()
                })
            }
            "leftline" => {
                return Ok(Frame {
                    left: true,
                    ..Frame::default()
                })
            }
            "topline" => {
                return Ok(Frame {
                    top: true,
                    ..Frame::default()
                })
            }
            "bottomline" => {
                return Ok(Frame {
                    bottom: true,
                    ..Frame::default()
                })
            }
            _ => {}
        }

        let mut frame = Frame::default();
        for c in value.chars() {
            match c.to_ascii_lowercase() {
                't' => frame.top = true,
                'b' => frame.bottom = true,
                'l' => frame.left = true,
                'r' => frame.right = true,
                _ => return Err(invalid("frame", value)),
            }
        }
        Ok(frame)
    }

    /// The closest `fancyvrb` frame style.
    pub fn fancyvrb(&self) -> &'static str {
        match (self.top, self.bottom, self.left || self.right) {
            (false, false, false) => "none",
            (true, true, false) => "lines",
            (true, false, false) => "topline",
            (false, true, false) => "bottomline",
            (false, false, true) if !self.right => "leftline",
            _ => "single",
        }
    }
}

/// Visual parameters for code blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockStyle {
    pub basic_style: String,
    pub numbers: LineNumbers,
    pub first_number: u32,
    pub frame: Frame,
    pub columns: Columns,
    pub tab_size: usize,
    /// Wrap lines longer than the text width
    pub break_lines: bool,
    pub keyword_style: String,
    pub secondary_keyword_style: String,
    pub comment_style: String,
    pub string_style: String,
}

impl Default for CodeBlockStyle {
    fn default() -> Self {
        CodeBlockStyle {
            basic_style: r"\ttfamily\small".to_string(),
            numbers: LineNumbers::Left,
            first_number: 1,
            frame: Frame {
                top: true,
                bottom: true,
                ..Frame::default()
            },
            columns: Columns::Fixed,
            tab_size: 2,
            break_lines: false,
            keyword_style: r"\bfseries".to_string(),
            secondary_keyword_style: String::new(),
            comment_style: r"\itshape".to_string(),
            string_style: String::new(),
        }
    }
}

/// Document-wide styling for one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleConfig {
    pub margin: String,
    pub link_color: String,
    pub cite_color: String,
    pub url_color: String,
    pub code: CodeBlockStyle,
}

impl Default for StyleConfig {
    fn default() -> Self {
        StyleConfig {
            margin: "1in".to_string(),
            link_color: "red!50!black".to_string(),
            cite_color: "blue!50!black".to_string(),
            url_color: "blue!80!black".to_string(),
            code: CodeBlockStyle::default(),
        }
    }
}

impl StyleConfig {
    /// Applies the options of `\usepackage[..]{geometry}` or `\geometry{..}`.
    pub fn apply_geometry(&mut self, options: &str) {
        for KeyValue { key, value } in keyval::parse(options) {
            if key == "margin" {
                if let Some(value) = value {
                    self.margin = value;
                }
            }
        }
    }

    /// Applies the options of `\hypersetup{..}` (or `\usepackage[..]{hyperref}`).
    pub fn apply_hypersetup(&mut self, options: &str) {
        for KeyValue { key, value } in keyval::parse(options) {
            let Some(value) = value else { continue };
            match key.as_str() {
                "linkcolor" => self.link_color = value,
                "citecolor" => self.cite_color = value,
                "urlcolor" => self.url_color = value,
                _ => {}
            }
        }
    }

    /// Applies the options of `\lstset{..}`.
    pub fn apply_lstset(&mut self, options: &str) -> Result<(), ConfigurationError> {
        let code = &mut self.code;
        for KeyValue { key, value } in keyval::parse(options) {
            let value = value.unwrap_or_default();
            match key.as_str() {
                "basicstyle" => code.basic_style = value,
                "numbers" => code.numbers = LineNumbers::parse(&value)?,
                "firstnumber" => {
                    code.first_number = match value.as_str() {
                        "auto" => 1,
                        v => v.parse().map_err(|_| invalid(&key, &value))?,
                    }
                }
                "frame" => code.frame = Frame::parse(&value)?,
                "columns" => code.columns = Columns::parse(&value)?,
                "tabsize" => {
                    code.tab_size = value.parse().map_err(|_| invalid(&key, &value))?;
                    if code.tab_size == 0 {
                        return Err(invalid(&key, &value));
                    }
                }
                "breaklines" => {
                    code.break_lines = match value.as_str() {
                        "" | "true" => true,
                        "false" => false,
                        _ => return Err(invalid(&key, &value)),
                    }
                }
                "keywordstyle" => code.keyword_style = value,
                "ndkeywordstyle" => code.secondary_keyword_style = value,
                "commentstyle" => code.comment_style = value,
                "stringstyle" => code.string_style = value,
                _ => {}
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_the_styling_contract() {
        let style = StyleConfig::default();
        assert_eq!(style.margin, "1in");
        assert_eq!(style.link_color, "red!50!black");
        assert_eq!(style.cite_color, "blue!50!black");
        assert_eq!(style.url_color, "blue!80!black");
        assert_eq!(style.code.numbers, LineNumbers::Left);
        assert_eq!(style.code.first_number, 1);
        assert_eq!(style.code.frame.fancyvrb(), "lines");
        assert_eq!(style.code.columns, Columns::Fixed);
        assert_eq!(style.code.tab_size, 2);
    }

    #[test]
    fn can_apply_lstset() {
        let mut style = StyleConfig::default();
        style
            .apply_lstset(
                r"basicstyle=\ttfamily\footnotesize, numbers=right, firstnumber=10,
                  frame=single, columns=[l]flexible, tabsize=4, breaklines,
                  keywordstyle=\color{keywordcolor}\bfseries",
            )
            .expect("can apply lstset");
        assert_eq!(style.code.basic_style, r"\ttfamily\footnotesize");
        assert_eq!(style.code.numbers, LineNumbers::Right);
        assert_eq!(style.code.first_number, 10);
        assert_eq!(style.code.frame.fancyvrb(), "single");
        assert_eq!(style.code.columns, Columns::Flexible);
        assert_eq!(style.code.tab_size, 4);
        assert!(style.code.break_lines);
        assert_eq!(style.code.keyword_style, r"\color{keywordcolor}\bfseries");
    }

    #[test]
    fn frame_letters() {
        assert_eq!(Frame::parse("tb").expect("valid frame").fancyvrb(), "lines");
        assert_eq!(Frame::parse("t").expect("valid frame").fancyvrb(), "topline");
        assert_eq!(Frame::parse("l").expect("valid frame").fancyvrb(), "leftline");
        assert_eq!(Frame::parse("trBL").expect("valid frame").fancyvrb(), "single");
        assert!(Frame::parse("tx").is_err());
    }

    #[test]
    fn invalid_tabsize_is_rejected() {
        let mut style = StyleConfig::default();
        assert_eq!(
            style.apply_lstset("tabsize=two"),
            Err(ConfigurationError::InvalidValue {
                key: "tabsize".to_string(),
                value: "two".to_string()
            })
        );
        assert!(style.apply_lstset("tabsize=0").is_err());
        assert!(style.apply_lstset("breaklines=sometimes").is_err());
    }

    #[test]
    fn can_apply_link_colours() {
        let mut style = StyleConfig::default();
        style.apply_hypersetup("colorlinks=true, linkcolor=blue, urlcolor={green!40!black}");
        assert_eq!(style.link_color, "blue");
        assert_eq!(style.cite_color, "blue!50!black");
        assert_eq!(style.url_color, "green!40!black");
    }
}
