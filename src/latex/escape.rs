//! Character-level output: glyph substitution first, then escaping for the context.

use crate::template::GlyphTable;

/// Writes `text` for use in running prose.
pub fn push_prose(out: &mut String, text: &str, glyphs: &GlyphTable) {
    for c in text.chars() {
        if let Some(replacement) = glyphs.get(c) {
            out.push_str(replacement);
            continue;
        }
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
}

pub fn escape_prose(text: &str, glyphs: &GlyphTable) -> String {
    let mut out = String::with_capacity(text.len());
    push_prose(&mut out, text, glyphs);
    out
}

/// Writes `text` for a `Verbatim` environment with `commandchars=\\\{\}`, where only
/// the backslash and braces are special.
pub fn push_verbatim(out: &mut String, text: &str, glyphs: &GlyphTable) {
    for c in text.chars() {
        if let Some(replacement) = glyphs.get(c) {
            out.push_str(replacement);
            continue;
        }
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            _ => out.push(c),
        }
    }
}

/// Escapes a URL for the first argument of `\href`.
pub fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '%' | '#' | '{' | '}' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::template::GlyphSubstitution;

    fn glyphs() -> GlyphTable {
        let mut glyphs = GlyphTable::default();
        glyphs
            .insert(GlyphSubstitution::from_directive("’", "'").expect("valid glyph"))
            .expect("can insert");
        glyphs
            .insert(
                GlyphSubstitution::from_directive("└", r"\mbox{\vrule width.4pt}")
                    .expect("valid glyph"),
            )
            .expect("can insert");
        glyphs
    }

    #[test]
    fn can_escape_prose() {
        assert_eq!(
            escape_prose(r"50% of $x_1 & {y} # \ ~ ^", &GlyphTable::default()),
            r"50\% of \$x\_1 \& \{y\} \# \textbackslash{} \textasciitilde{} \textasciicircum{}"
        );
    }

    #[test]
    fn glyphs_are_substituted_not_escaped() {
        assert_eq!(escape_prose("don’t └", &glyphs()), r"don't \mbox{\vrule width.4pt}");
    }

    #[test]
    fn verbatim_only_escapes_command_characters() {
        let mut out = String::new();
        push_verbatim(&mut out, r"fn f() { 100% \n } └", &glyphs());
        assert_eq!(
            out,
            r"fn f() \{ 100% \textbackslash{}n \} \mbox{\vrule width.4pt}"
        );
    }

    #[test]
    fn can_escape_urls() {
        assert_eq!(
            escape_url("https://example.com/a%20b#frag"),
            r"https://example.com/a\%20b\#frag"
        );
    }
}
