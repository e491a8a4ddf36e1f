//! Markdown to LaTeX conversion.
//!
//! Walks the `pulldown-cmark` event stream of the (already image-relocated) book and
//! writes the LaTeX body that gets spliced into the template. Prose goes through the
//! template's glyph table and is escaped; code blocks go through the [`Highlighter`].
//! Top-level headings become `\section`s, which the template starts on fresh pages.

pub mod escape;

use crate::highlight::Highlighter;
use crate::template::{ConfigurationError, Template};
use escape::{escape_url, push_prose};
use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Markdown extensions understood by the converter.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

fn heading_command(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "section",
        HeadingLevel::H2 => "subsection",
        HeadingLevel::H3 => "subsubsection",
        HeadingLevel::H4 => "paragraph",
        HeadingLevel::H5 | HeadingLevel::H6 => "subparagraph",
    }
}

pub(crate) fn is_external(url: &str) -> bool {
    url.contains("://") || url.starts_with("mailto:")
}

struct CodeBlock {
    info: String,
    code: String,
}

struct Image {
    url: String,
    alt: String,
}

struct Writer<'t> {
    template: &'t Template,
    highlighter: Highlighter<'t>,
    out: String,
    code_block: Option<CodeBlock>,
    image: Option<Image>,
    /// whether each open list is ordered
    lists: Vec<bool>,
    /// whether each open link was written as `\href`
    links: Vec<bool>,
    table_cell: usize,
}

impl<'t> Writer<'t> {
    fn text(&mut self, text: &str) {
        if let Some(block) = &mut self.code_block {
            block.code.push_str(text);
        } else if let Some(image) = &mut self.image {
            image.alt.push_str(text);
        } else {
            push_prose(&mut self.out, text, &self.template.glyphs);
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                self.out.push_str(&format!("\\{}{{", heading_command(level)));
            }
            Tag::BlockQuote(_) => self.out.push_str("\\begin{quote}\n"),
            Tag::CodeBlock(kind) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code_block = Some(CodeBlock {
                    info,
                    code: String::new(),
                });
            }
            Tag::List(start) => {
                match start {
                    Some(start) => {
                        let depth = self.lists.iter().filter(|ordered| **ordered).count();
                        self.out.push_str("\\begin{enumerate}\n");
                        if start != 1 && depth < 4 {
                            let counter = ["enumi", "enumii", "enumiii", "enumiv"][depth];
                            self.out.push_str(&format!(
                                "\\setcounter{{{counter}}}{{{}}}\n",
                                start.saturating_sub(1)
                            ));
                        }
                    }
                    None => self.out.push_str("\\begin{itemize}\n"),
                }
                self.lists.push(start.is_some());
            }
            Tag::Item => self.out.push_str("\\item "),
            Tag::FootnoteDefinition(label) => {
                self.out.push_str("\\par\\noindent\\textsuperscript{");
                push_prose(&mut self.out, &label, &self.template.glyphs);
                self.out.push_str("} ");
            }
            Tag::Table(alignments) => {
                let columns: String = alignments
                    .iter()
                    .map(|alignment| match alignment {
                        Alignment::Center => 'c',
                        Alignment::Right => 'r',
                        Alignment::Left | Alignment::None => 'l',
                    })
                    .collect();
                self.out
                    .push_str(&format!("\\begin{{longtable}}{{{columns}}}\n\\toprule\n"));
            }
            Tag::TableHead | Tag::TableRow => self.table_cell = 0,
            Tag::TableCell => {
                if self.table_cell > 0 {
                    self.out.push_str(" & ");
                }
                self.table_cell += 1;
            }
            Tag::Emphasis => self.out.push_str("\\emph{"),
            Tag::Strong => self.out.push_str("\\textbf{"),
            Tag::Strikethrough => self.out.push_str("\\sout{"),
            Tag::Link { dest_url, .. } => {
                let external = is_external(&dest_url);
                if external {
                    self.out
                        .push_str(&format!("\\href{{{}}}{{", escape_url(&dest_url)));
                }
                self.links.push(external);
            }
            Tag::Image { dest_url, .. } => {
                self.image = Some(Image {
                    url: dest_url.to_string(),
                    alt: String::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) -> Result<(), ConfigurationError> {
        match tag {
            TagEnd::Paragraph => self.out.push_str("\n\n"),
            TagEnd::Heading(_) => self.out.push_str("}\n\n"),
            TagEnd::BlockQuote(_) => self.out.push_str("\\end{quote}\n\n"),
            TagEnd::CodeBlock => {
                if let Some(block) = self.code_block.take() {
                    let latex = self.highlighter.render_block(&block.info, &block.code)?;
                    self.out.push_str(&latex);
                    self.out.push('\n');
                }
            }
            TagEnd::List(ordered) => {
                self.lists.pop();
                if ordered {
                    self.out.push_str("\\end{enumerate}\n\n");
                } else {
                    self.out.push_str("\\end{itemize}\n\n");
                }
            }
            TagEnd::Item => {
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
            }
            TagEnd::FootnoteDefinition => self.out.push_str("\n\n"),
            TagEnd::Table => self.out.push_str("\\bottomrule\n\\end{longtable}\n\n"),
            TagEnd::TableHead => self.out.push_str(" \\\\\n\\midrule\n"),
            TagEnd::TableRow => self.out.push_str(" \\\\\n"),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.out.push('}'),
            TagEnd::Link => {
                if self.links.pop().unwrap_or(false) {
                    self.out.push('}');
                }
            }
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.push_image(image);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn push_image(&mut self, image: Image) {
        if is_external(&image.url) {
            // remote images can't be embedded, link to them instead
            self.out
                .push_str(&format!("\\href{{{}}}{{", escape_url(&image.url)));
            let label = if image.alt.is_empty() {
                image.url.clone()
            } else {
                image.alt
            };
            push_prose(&mut self.out, &label, &self.template.glyphs);
            self.out.push('}');
        } else {
            self.out.push_str(&format!(
                "\\includegraphics[width=\\linewidth,keepaspectratio]{{{}}}",
                image.url
            ));
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ConfigurationError> {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag)?,
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if let Some(image) = &mut self.image {
                    image.alt.push_str(&code);
                } else {
                    self.out.push_str("\\texttt{");
                    push_prose(&mut self.out, &code, &self.template.glyphs);
                    self.out.push('}');
                }
            }
            Event::SoftBreak => self.text("\n"),
            Event::HardBreak => self.out.push_str("\\\\\n"),
            Event::Rule => self
                .out
                .push_str("\\par\\noindent\\rule{\\linewidth}{0.4pt}\n\n"),
            Event::FootnoteReference(label) => {
                self.out.push_str("\\textsuperscript{");
                push_prose(&mut self.out, &label, &self.template.glyphs);
                self.out.push('}');
            }
            Event::TaskListMarker(checked) => {
                self.out
                    .push_str(if checked { "$\\boxtimes$ " } else { "$\\square$ " });
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                log::debug!("skipping raw HTML: {}", html.trim());
            }
            _ => {}
        }
        Ok(())
    }
}

/// Converts markdown into a LaTeX body for the given template.
///
/// `strict_languages` turns code blocks with an unknown language tag into an error
/// instead of plain text.
pub fn markdown_to_latex(
    markdown: &str,
    template: &Template,
    strict_languages: bool,
) -> Result<String, ConfigurationError> {
    let mut writer = Writer {
        template,
        highlighter: Highlighter::new(template, strict_languages),
        out: String::with_capacity(markdown.len() * 2),
        code_block: None,
        image: None,
        lists: Vec::new(),
        links: Vec::new(),
        table_cell: 0,
    };

    let options = markdown_options() | Options::ENABLE_SMART_PUNCTUATION;
    for event in Parser::new_ext(markdown, options) {
        writer.event(event)?;
    }

    Ok(writer.out)
}

#[cfg(test)]
mod test {
    use super::*;

    fn convert(markdown: &str) -> String {
        let template = Template::builtin().expect("built-in template is valid");
        markdown_to_latex(markdown, &template, false).expect("can convert")
    }

    #[test]
    fn can_convert_a_paragraph() {
        assert_eq!(convert("Hello, *world* & **you**."), "Hello, \\emph{world} \\& \\textbf{you}.\n\n");
    }

    #[test]
    fn headings_become_sections() {
        let latex = convert("# Intro\n\n## Details\n\ntext\n");
        assert_eq!(
            latex,
            "\\section{Intro}\n\n\\subsection{Details}\n\ntext\n\n"
        );
    }

    #[test]
    fn smart_quotes_use_glyph_substitutions() {
        assert_eq!(convert("\"it's\""), "``it's''\n\n");
    }

    #[test]
    fn tree_characters_are_drawn() {
        let latex = convert("├ a\n");
        assert!(latex.starts_with("\\mbox{"));
        assert!(!latex.contains('├'));
    }

    #[test]
    fn code_blocks_are_highlighted() {
        let latex = convert("```rust,ignore\nfn main() {}\n```\n");
        assert!(latex.contains("\\begin{Verbatim}"));
        assert!(latex.contains("{\\color{keywordcolor}\\bfseries{}fn} main() \\{\\}\n"));
    }

    #[test]
    fn unknown_languages_render_as_plain_text() {
        let latex = convert("```brainfuck\n+[>+<-]\n```\n");
        assert!(latex.contains("\n+[>+<-]\n\\end{Verbatim}"));
    }

    #[test]
    fn strict_languages_fail_on_unknown_tags() {
        let template = Template::builtin().expect("built-in template is valid");
        let err = markdown_to_latex("```brainfuck\n+\n```\n", &template, true)
            .expect_err("unknown language");
        assert_eq!(err, ConfigurationError::UnknownLanguage("brainfuck".to_string()));
    }

    #[test]
    fn can_convert_lists() {
        assert_eq!(
            convert("- a\n- b\n"),
            "\\begin{itemize}\n\\item a\n\\item b\n\\end{itemize}\n\n"
        );
        assert_eq!(
            convert("3. c\n4. d\n"),
            "\\begin{enumerate}\n\\setcounter{enumi}{2}\n\\item c\n\\item d\n\\end{enumerate}\n\n"
        );
    }

    #[test]
    fn can_convert_tables() {
        let latex = convert("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        assert_eq!(
            latex,
            "\\begin{longtable}{lr}\n\\toprule\na & b \\\\\n\\midrule\n1 & 2 \\\\\n\\bottomrule\n\\end{longtable}\n\n"
        );
    }

    #[test]
    fn external_links_use_href() {
        assert_eq!(
            convert("[docs](https://example.com/a#b) and [chapter](./ch2.md)"),
            "\\href{https://example.com/a\\#b}{docs} and chapter\n\n"
        );
    }

    #[test]
    fn local_images_are_included() {
        assert_eq!(
            convert("![a cat](images/ch1/cat.png)"),
            "\\includegraphics[width=\\linewidth,keepaspectratio]{images/ch1/cat.png}\n\n"
        );
    }

    #[test]
    fn remote_images_become_links() {
        assert_eq!(
            convert("![logo](https://example.com/logo.png)"),
            "\\href{https://example.com/logo.png}{logo}\n\n"
        );
    }

    #[test]
    fn inline_code_is_escaped() {
        assert_eq!(convert("`a_b{}`"), "\\texttt{a\\_b\\{\\}}\n\n");
    }
}
