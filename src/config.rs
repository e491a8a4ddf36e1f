//! The `[output.latex]` table of `book.toml`.

use crate::context::Chapter;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LatexConfig {
    /// Chapter names, or globs on chapter paths, that are left out of the output.
    pub ignores: Vec<String>,
    /// Write `<title>.tex`.
    pub latex: bool,
    /// Compile `<title>.pdf` with the TeX engine.
    pub pdf: bool,
    /// Write the concatenated `<title>.md`.
    pub markdown: bool,
    /// Template to use instead of the built-in one, relative to the book root.
    pub custom_template: Option<PathBuf>,
    /// Raw LaTeX for `\date{}`.
    pub date: String,
    /// Fail on code blocks in languages the template has no rules for.
    pub strict_languages: bool,
    /// TeX engine executable.
    pub engine: String,
    /// Extra arguments passed to the engine before the output options.
    pub engine_args: Vec<String>,
}

fn default_date() -> String {
    r"\today".to_string()
}

fn default_engine() -> String {
    "tectonic".to_string()
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            ignores: Vec::new(),
            latex: true,
            pdf: true,
            markdown: true,
            custom_template: None,
            date: default_date(),
            strict_languages: false,
            engine: default_engine(),
            engine_args: Vec::new(),
        }
    }
}

impl LatexConfig {
    /// The default configuration as a `[output.latex]` TOML table.
    pub fn default_toml() -> Result<String> {
        #[derive(Serialize)]
        struct Output<'c> {
            latex: &'c LatexConfig,
        }
        #[derive(Serialize)]
        struct Root<'c> {
            output: Output<'c>,
        }

        toml::to_string(&Root {
            output: Output {
                latex: &LatexConfig::default(),
            },
        })
        .with_context(|| "Failed to serialize default configuration")
    }

    pub fn chapter_filter(&self) -> Result<ChapterFilter> {
        ChapterFilter::new(&self.ignores)
    }
}

/// Decides which chapters are left out, by exact name or by a glob on the chapter path.
#[derive(Debug, Clone)]
pub struct ChapterFilter {
    names: Vec<String>,
    globs: GlobSet,
}

impl ChapterFilter {
    pub fn new(ignores: &[String]) -> Result<ChapterFilter> {
        let mut globs = GlobSetBuilder::new();
        for pattern in ignores {
            match Glob::new(pattern) {
                Ok(glob) => {
                    globs.add(glob);
                }
                Err(e) => log::debug!("ignore `{pattern}` only matches chapter names: {e}"),
            }
        }
        Ok(ChapterFilter {
            names: ignores.to_vec(),
            globs: globs
                .build()
                .with_context(|| "Failed to build chapter ignore globs")?,
        })
    }

    pub fn is_ignored(&self, chapter: &Chapter) -> bool {
        if self.names.iter().any(|name| *name == chapter.name) {
            return true;
        }
        chapter
            .path
            .as_ref()
            .is_some_and(|path| self.globs.is_match(path))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn chapter(name: &str, path: &str) -> Chapter {
        Chapter {
            name: name.to_string(),
            path: Some(PathBuf::from(path)),
            ..Default::default()
        }
    }

    #[test]
    fn can_parse_kebab_case_keys() {
        let config: LatexConfig = toml::from_str(
            r#"
            ignores = ["Appendix"]
            pdf = false
            custom-template = "tex/book.tex"
            strict-languages = true
            engine = "xelatex-wrapper"
            engine-args = ["--keep-logs"]
            "#,
        )
        .expect("valid config");
        assert_eq!(config.ignores, vec!["Appendix"]);
        assert!(!config.pdf);
        assert!(config.latex);
        assert_eq!(config.custom_template, Some(PathBuf::from("tex/book.tex")));
        assert!(config.strict_languages);
        assert_eq!(config.engine, "xelatex-wrapper");
        assert_eq!(config.engine_args, vec!["--keep-logs"]);
        assert_eq!(config.date, r"\today");
    }

    #[test]
    fn empty_table_is_the_default() {
        let config: LatexConfig = toml::from_str("").expect("valid config");
        assert_eq!(config, LatexConfig::default());
    }

    #[test]
    fn default_toml_round_trips() {
        let text = LatexConfig::default_toml().expect("can serialize");
        assert!(text.contains("latex]"));
        let value: toml::Table = toml::from_str(&text).expect("valid toml");
        let latex: LatexConfig = value["output"]["latex"]
            .clone()
            .try_into()
            .expect("valid config");
        assert_eq!(latex, LatexConfig::default());
    }

    #[test]
    fn can_ignore_chapters_by_name_or_path() {
        let filter = ChapterFilter::new(&["Changelog".to_string(), "drafts/**".to_string()])
            .expect("valid ignores");
        assert!(filter.is_ignored(&chapter("Changelog", "CHANGELOG.md")));
        assert!(filter.is_ignored(&chapter("Ideas", "drafts/ideas.md")));
        assert!(!filter.is_ignored(&chapter("Intro", "intro.md")));
    }

    #[test]
    fn invalid_globs_still_match_names() {
        let filter = ChapterFilter::new(&["Notes [old".to_string()]).expect("valid ignores");
        assert!(filter.is_ignored(&chapter("Notes [old", "notes.md")));
        assert!(!filter.is_ignored(&chapter("Notes", "notes.md")));
    }
}
