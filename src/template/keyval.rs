//! `key=value` list handling shared by package options, `\hypersetup`, `\lstset` and
//! language definitions.

/// One entry of a `key=value` list. Bare keys (`colorlinks`) carry no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

/// Splits a `key=value` list on top-level commas.
pub fn parse(list: &str) -> Vec<KeyValue> {
    split_top_level(list, ',')
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            match split_top_level_once(entry, '=') {
                Some((key, value)) => Some(KeyValue {
                    key: key.trim().to_string(),
                    value: Some(strip_braces(value.trim()).to_string()),
                }),
                None => Some(KeyValue {
                    key: entry.to_string(),
                    value: None,
                }),
            }
        })
        .collect()
}

/// Splits on `separator` wherever it appears outside braces and brackets.
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn split_top_level_once(text: &str, separator: char) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                return Some((&text[..i], &text[i + c.len_utf8()..]));
            }
            _ => {}
        }
    }
    None
}

/// Removes one pair of braces when they enclose the whole value.
pub fn strip_braces(value: &str) -> &str {
    if !(value.starts_with('{') && value.ends_with('}')) || value.len() < 2 {
        return value;
    }

    // make sure the opening brace is closed by the final one
    let mut depth = 0usize;
    let mut chars = value.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != value.len() - 1 {
                    return value;
                }
            }
            _ => {}
        }
    }
    &value[1..value.len() - 1]
}

/// Resolves escaped characters such as `\#` or `\{` to the character itself.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(&next)) if !next.is_ascii_alphabetic() => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn can_parse_hypersetup_options() {
        let options = parse("colorlinks=true,\n  linkcolor=red!50!black,\n  urlcolor={blue!80!black}\n");
        assert_eq!(
            options,
            vec![
                KeyValue {
                    key: "colorlinks".to_string(),
                    value: Some("true".to_string())
                },
                KeyValue {
                    key: "linkcolor".to_string(),
                    value: Some("red!50!black".to_string())
                },
                KeyValue {
                    key: "urlcolor".to_string(),
                    value: Some("blue!80!black".to_string())
                },
            ]
        );
    }

    #[test]
    fn commas_inside_groups_are_kept() {
        let options = parse("keywords={a, b, c}, sensitive");
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].value.as_deref(), Some("a, b, c"));
        assert_eq!(options[1].key, "sensitive");
        assert_eq!(options[1].value, None);
    }

    #[test]
    fn only_enclosing_braces_are_stripped() {
        assert_eq!(strip_braces("{//}"), "//");
        assert_eq!(strip_braces("{/*}{*/}"), "{/*}{*/}");
        assert_eq!(strip_braces("plain"), "plain");
    }

    #[test]
    fn can_unescape_special_characters() {
        assert_eq!(unescape(r"\#"), "#");
        assert_eq!(unescape(r"<\#"), "<#");
        assert_eq!(unescape(r"\{\{!"), "{{!");
        assert_eq!(unescape(r"\bfseries"), r"\bfseries");
    }
}
