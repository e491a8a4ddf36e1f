//! The render pass: book in, `.md` / `.tex` / `.pdf` out.

use crate::config::LatexConfig;
use crate::context::{Chapter, RenderContext};
use crate::engine::Engine;
use crate::images::relocate_images;
use crate::latex::markdown_to_latex;
use crate::template::{Metadata, Template};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::fmt;
use std::path::{Path, PathBuf};

/// Stem used for output files when the book has no title.
const UNTITLED: &str = "book";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Markdown,
    Latex,
    Pdf,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Markdown => write!(f, "Markdown"),
            OutputKind::Latex => write!(f, "LaTeX"),
            OutputKind::Pdf => write!(f, "PDF"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Output {
    pub kind: OutputKind,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    pub chapters: usize,
    pub skipped: usize,
    pub images: usize,
    pub outputs: Vec<Output>,
}

/// Loads the configured template, or the built-in one.
pub fn load_template(root: &Path, config: &LatexConfig) -> Result<Template> {
    match &config.custom_template {
        Some(path) => {
            let path = root.join(path);
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            Template::load(source)
                .with_context(|| format!("Failed to load template {}", path.display()))
        }
        None => Template::builtin().with_context(|| "Failed to load the built-in template"),
    }
}

/// File name stem for the outputs, derived from the book title.
pub fn output_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        UNTITLED.to_string()
    } else {
        stem
    }
}

fn write_output(
    stats: &mut RenderStats,
    kind: OutputKind,
    path: PathBuf,
    contents: &str,
) -> Result<()> {
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    stats.outputs.push(Output {
        kind,
        path,
        bytes: contents.len() as u64,
    });
    Ok(())
}

fn chapter_dir(chapter: &Chapter) -> PathBuf {
    chapter
        .path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Renders the book described by `ctx` into its destination directory.
pub fn render(ctx: &RenderContext, progress: &ProgressBar) -> Result<RenderStats> {
    ctx.check_version();
    let config = ctx.latex_config()?;
    let filter = config.chapter_filter()?;

    let mut template = load_template(&ctx.root, &config)?;
    let title = ctx.config.book.title.clone().unwrap_or_default();
    template.set_metadata(&Metadata {
        title: title.clone(),
        authors: ctx.config.book.authors.clone(),
        date: config.date.clone(),
    })
    .with_context(|| "Failed to fill in the book metadata")?;

    std::fs::create_dir_all(&ctx.destination).with_context(|| {
        format!(
            "Failed to create output directory {}",
            ctx.destination.display()
        )
    })?;

    let mut stats = RenderStats::default();
    let mut chapters = Vec::new();
    for chapter in ctx.chapters() {
        if chapter.path.is_none() {
            log::debug!("skipping draft chapter `{}`", chapter.name);
            stats.skipped += 1;
        } else if filter.is_ignored(chapter) {
            log::info!("ignoring chapter `{}`", chapter.name);
            stats.skipped += 1;
        } else {
            chapters.push(chapter);
        }
    }

    progress.set_length(chapters.len() as u64);
    let source_dir = ctx.source_dir();
    let mut content = String::new();
    for chapter in chapters {
        progress.set_message(chapter.name.clone());
        let relocated = relocate_images(
            &chapter.content,
            &chapter_dir(chapter),
            &source_dir,
            &ctx.destination,
        )
        .with_context(|| format!("Failed to process chapter `{}`", chapter.name))?;
        content.push_str(&relocated.markdown);
        content.push_str("\n\n");
        stats.images += relocated.images.len();
        stats.chapters += 1;
        progress.inc(1);
    }

    let stem = output_stem(&title);
    if config.markdown {
        let path = ctx.destination.join(format!("{stem}.md"));
        write_output(&mut stats, OutputKind::Markdown, path, &content)?;
    }

    if config.latex || config.pdf {
        progress.set_message("Converting to LaTeX...");
        let body = markdown_to_latex(&content, &template, config.strict_languages)
            .with_context(|| "Failed to convert the book to LaTeX")?;
        let document = template
            .render(&body)
            .with_context(|| "Failed to splice the book into the template")?;

        if config.latex {
            let path = ctx.destination.join(format!("{stem}.tex"));
            write_output(&mut stats, OutputKind::Latex, path, &document)?;
        }

        if config.pdf {
            progress.set_message("Compiling PDF...");
            let engine = Engine::from_config(&config);
            let compiled = engine
                .compile(&document, &ctx.destination)
                .with_context(|| "Failed to compile the PDF")?;
            let path = ctx.destination.join(format!("{stem}.pdf"));
            std::fs::rename(&compiled, &path).with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    compiled.display(),
                    path.display()
                )
            })?;
            let bytes = std::fs::metadata(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?
                .len();
            stats.outputs.push(Output {
                kind: OutputKind::Pdf,
                path,
                bytes,
            });
        }
    }

    progress.finish_with_message("Done");
    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::{Book, BookConfig, BookItem, BookMetadata};

    fn chapter(name: &str, path: &str, content: &str) -> BookItem {
        BookItem::Chapter(Chapter {
            name: name.to_string(),
            content: content.to_string(),
            path: Some(PathBuf::from(path)),
            ..Default::default()
        })
    }

    fn context(root: &Path, title: Option<&str>, sections: Vec<BookItem>) -> RenderContext {
        let mut output = serde_json::Map::new();
        output.insert("latex".to_string(), serde_json::json!({ "pdf": false }));
        RenderContext {
            version: "0.4.40".to_string(),
            root: root.to_path_buf(),
            book: Book { sections },
            config: BookConfig {
                book: BookMetadata {
                    title: title.map(str::to_string),
                    ..Default::default()
                },
                output,
            },
            destination: root.join("book"),
        }
    }

    #[test]
    fn can_derive_output_stem() {
        assert_eq!(output_stem("My Book"), "My Book");
        assert_eq!(output_stem("A/B: C"), "A-B- C");
        assert_eq!(output_stem("  "), "book");
    }

    #[test]
    fn untitled_single_paragraph_book() {
        let root = tempfile::tempdir().expect("can create temp dir");
        let ctx = context(
            root.path(),
            None,
            vec![chapter("Only", "only.md", "Just one paragraph.\n")],
        );

        let stats = render(&ctx, &ProgressBar::hidden()).expect("can render");
        assert_eq!(stats.chapters, 1);
        assert_eq!(stats.outputs.len(), 2);

        let tex = std::fs::read_to_string(ctx.destination.join("book.tex")).expect("tex written");
        assert!(tex.contains(r"\title{}"));
        assert!(tex.contains(r"\author{}"));
        assert!(tex.contains(r"\date{\today}"));
        assert!(tex.contains(r"\maketitle"));
        assert!(tex.contains(r"\tableofcontents"));
        assert!(!tex.lines().any(|line| line.starts_with(r"\section")));
        assert!(tex.contains("Just one paragraph."));
        assert!(!tex.contains("%% mdbook-tectonic begin"));

        let md = std::fs::read_to_string(ctx.destination.join("book.md")).expect("md written");
        assert!(md.contains("Just one paragraph."));
    }

    #[test]
    fn ignored_and_draft_chapters_are_skipped() {
        let root = tempfile::tempdir().expect("can create temp dir");
        let draft = BookItem::Chapter(Chapter {
            name: "Draft".to_string(),
            ..Default::default()
        });
        let mut ctx = context(
            root.path(),
            Some("Guide"),
            vec![
                chapter("Intro", "intro.md", "# Intro\n\nWelcome.\n"),
                chapter("Changelog", "CHANGELOG.md", "# Changelog\n\nNothing.\n"),
                draft,
            ],
        );
        ctx.config.output.insert(
            "latex".to_string(),
            serde_json::json!({ "pdf": false, "markdown": false, "ignores": ["Changelog"] }),
        );

        let stats = render(&ctx, &ProgressBar::hidden()).expect("can render");
        assert_eq!(stats.chapters, 1);
        assert_eq!(stats.skipped, 2);
        assert!(!ctx.destination.join("Guide.md").exists());

        let tex = std::fs::read_to_string(ctx.destination.join("Guide.tex")).expect("tex written");
        assert!(tex.contains(r"\title{Guide}"));
        assert!(tex.contains(r"\section{Intro}"));
        assert!(!tex.contains("Changelog"));
    }

    #[test]
    fn chapter_images_are_copied() {
        let root = tempfile::tempdir().expect("can create temp dir");
        std::fs::create_dir_all(root.path().join("src/guide")).expect("can create src");
        std::fs::write(root.path().join("src/guide/diagram.png"), b"png").expect("can write image");
        let ctx = context(
            root.path(),
            Some("Guide"),
            vec![chapter("Usage", "guide/usage.md", "![diagram](diagram.png)\n")],
        );

        let stats = render(&ctx, &ProgressBar::hidden()).expect("can render");
        assert_eq!(stats.images, 1);
        assert!(ctx.destination.join("images/guide/diagram.png").exists());
        let tex = std::fs::read_to_string(ctx.destination.join("Guide.tex")).expect("tex written");
        assert!(tex.contains("{images/guide/diagram.png}"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let first = tempfile::tempdir().expect("can create temp dir");
        let second = tempfile::tempdir().expect("can create temp dir");
        let sections = vec![chapter(
            "Code",
            "code.md",
            "# Code\n\n```rust\nfn main() { let ok = true; }\n```\n",
        )];

        let mut outputs = Vec::new();
        for root in [&first, &second] {
            let ctx = context(root.path(), Some("Same"), sections.clone());
            render(&ctx, &ProgressBar::hidden()).expect("can render");
            outputs.push(std::fs::read(ctx.destination.join("Same.tex")).expect("tex written"));
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn missing_custom_template_is_an_error() {
        let root = tempfile::tempdir().expect("can create temp dir");
        let config = LatexConfig {
            custom_template: Some(PathBuf::from("missing.tex")),
            ..Default::default()
        };
        let err = load_template(root.path(), &config).expect_err("template does not exist");
        assert!(format!("{err:#}").contains("missing.tex"));
    }

    #[test]
    fn custom_template_without_marker_fails_the_pass() {
        let root = tempfile::tempdir().expect("can create temp dir");
        std::fs::write(
            root.path().join("plain.tex"),
            "\\documentclass{article}\n\\begin{document}\n\\end{document}\n",
        )
        .expect("can write template");
        let mut ctx = context(root.path(), Some("T"), vec![chapter("A", "a.md", "text\n")]);
        ctx.config.output.insert(
            "latex".to_string(),
            serde_json::json!({ "pdf": false, "custom-template": "plain.tex" }),
        );

        let err = render(&ctx, &ProgressBar::hidden()).expect_err("template has no marker");
        assert!(format!("{err:#}").contains("insertion marker"));
    }
}
