//! The render context mdBook hands a backend on stdin.
//!
//! Only the fields the renderer uses are modelled; everything else in the JSON is
//! ignored.

use crate::config::LatexConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

/// mdBook versions this renderer understands.
pub const SUPPORTED_MDBOOK: &str = ">=0.4, <0.6";

#[derive(Debug, Clone, Deserialize)]
pub struct RenderContext {
    /// Version of the mdBook that invoked us
    pub version: String,
    /// The book's root directory, containing `book.toml`
    pub root: PathBuf,
    pub book: Book,
    pub config: BookConfig,
    /// Directory the renderer writes into
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Book {
    /// Top-level items; mdBook 0.5 renamed the field to `items`
    #[serde(default, alias = "items")]
    pub sections: Vec<BookItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub enum BookItem {
    Chapter(Chapter),
    Separator,
    PartTitle(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Chapter {
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sub_items: Vec<BookItem>,
    /// Path relative to the source directory; `None` for draft chapters
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookConfig {
    #[serde(default)]
    pub book: BookMetadata,
    #[serde(default)]
    pub output: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default = "default_src")]
    pub src: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self {
            title: None,
            authors: Vec::new(),
            src: default_src(),
        }
    }
}

impl RenderContext {
    pub fn from_json<R: Read>(reader: R) -> Result<RenderContext> {
        serde_json::from_reader(reader)
            .with_context(|| "Failed to parse the render context as JSON")
    }

    /// Absolute path of the book's source directory.
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.config.book.src)
    }

    /// The `[output.latex]` table, or the defaults when it is absent.
    pub fn latex_config(&self) -> Result<LatexConfig> {
        match self.config.output.get("latex") {
            Some(value) => serde_json::from_value(value.clone())
                .with_context(|| "Failed to read the [output.latex] configuration"),
            None => Ok(LatexConfig::default()),
        }
    }

    /// Logs a warning when the invoking mdBook is outside the supported range.
    ///
    /// Returns whether the version is supported.
    pub fn check_version(&self) -> bool {
        let required = match semver::VersionReq::parse(SUPPORTED_MDBOOK) {
            Ok(required) => required,
            Err(e) => {
                log::warn!("invalid mdBook version requirement: {e}");
                return false;
            }
        };
        match semver::Version::parse(&self.version) {
            Ok(running) if required.matches(&running) => true,
            Ok(running) => {
                log::warn!(
                    "this renderer supports mdBook {SUPPORTED_MDBOOK}, \
                     but is being called from version {running}"
                );
                false
            }
            Err(e) => {
                log::warn!("can't parse mdBook version `{}`: {e}", self.version);
                false
            }
        }
    }

    /// All chapters in reading order, parents before their children.
    pub fn chapters(&self) -> Chapters<'_> {
        Chapters {
            stack: vec![self.book.sections.iter()],
        }
    }
}

/// Depth-first iterator over a book's chapters.
pub struct Chapters<'b> {
    stack: Vec<std::slice::Iter<'b, BookItem>>,
}

impl<'b> Iterator for Chapters<'b> {
    type Item = &'b Chapter;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let items = self.stack.last_mut()?;
            match items.next() {
                Some(BookItem::Chapter(chapter)) => {
                    self.stack.push(chapter.sub_items.iter());
                    return Some(chapter);
                }
                Some(_) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
