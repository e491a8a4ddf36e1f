//! Image relocation for chapters.
//!
//! Chapters reference images relative to their own location in the book's source
//! directory, but the rendered document is a single file in the destination directory.
//! Every local image is therefore copied to `images/<chapter dir>/<image path>` under
//! the destination and its reference rewritten to match. Root-relative references
//! (`/assets/x.png`) are resolved against the source directory; remote images are left
//! alone.

use crate::latex::{is_external, markdown_options};
use anyhow::{Context, Result};
use pulldown_cmark::{Event, Parser, Tag};
use pulldown_cmark_to_cmark::cmark;
use std::path::{Component, Path, PathBuf};

/// A chapter's markdown after its images were copied.
#[derive(Debug)]
pub struct RelocatedChapter {
    pub markdown: String,
    /// Destination-relative paths of the copied images
    pub images: Vec<PathBuf>,
}

/// Resolves `.` and `..` lexically and drops any root, leaving a relative path.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    out
}

/// Forward-slash form of a relative path, for use in markdown and LaTeX.
fn to_url(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_local(url: &str) -> bool {
    !url.is_empty() && !is_external(url) && !url.starts_with("data:")
}

/// Copies the chapter's local images into `destination` and rewrites their references.
///
/// `chapter_dir` is the chapter's directory relative to `source_dir`.
pub fn relocate_images(
    markdown: &str,
    chapter_dir: &Path,
    source_dir: &Path,
    destination: &Path,
) -> Result<RelocatedChapter> {
    let mut events = Vec::new();
    let mut images = Vec::new();

    for event in Parser::new_ext(markdown, markdown_options()) {
        let event = match event {
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) if is_local(&dest_url) => {
                let relative = normalize(&chapter_dir.join(&*dest_url));
                let image_path = Path::new("images").join(&relative);
                let source = source_dir.join(&relative);
                let target = destination.join(&image_path);

                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create image directory {}", parent.display())
                    })?;
                }
                std::fs::copy(&source, &target).with_context(|| {
                    format!(
                        "Failed to copy image {} to {}",
                        source.display(),
                        target.display()
                    )
                })?;
                log::debug!("copied image {} to {}", source.display(), target.display());

                let url = to_url(&image_path);
                images.push(image_path);
                Event::Start(Tag::Image {
                    link_type,
                    dest_url: url.into(),
                    title,
                    id,
                })
            }
            event => event,
        };
        events.push(event);
    }

    let mut out = String::with_capacity(markdown.len());
    cmark(events.iter(), &mut out).with_context(|| "Failed to write relocated markdown")?;

    Ok(RelocatedChapter {
        markdown: out,
        images,
    })
}
