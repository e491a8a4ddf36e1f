//! Splicing generated content into a template at its insertion marker.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpliceError {
    #[error("insertion marker `{marker}` not found in template")]
    MissingMarker { marker: String },
    #[error("insertion marker `{marker}` appears {count} times in template, expected exactly once")]
    DuplicateMarker { marker: String, count: usize },
}

/// Number of times `marker` appears in `template`.
pub fn marker_count(template: &str, marker: &str) -> usize {
    if marker.is_empty() {
        return 0;
    }
    template.matches(marker).count()
}

/// Replaces the marker, and whatever follows it up to the end of its line, with
/// `content`. Text before the marker on the same line is kept. The content itself is
/// inserted as-is and never searched for further markers.
pub fn splice(template: &str, marker: &str, content: &str) -> Result<String, SpliceError> {
    let start = match marker_count(template, marker) {
        0 => {
            return Err(SpliceError::MissingMarker {
                marker: marker.to_string(),
            })
        }
        1 => template.find(marker).unwrap_or_default(),
        count => {
            return Err(SpliceError::DuplicateMarker {
                marker: marker.to_string(),
                count,
            })
        }
    };

    let after = start + marker.len();
    let end = template[after..]
        .find('\n')
        .map(|i| after + i + 1)
        .unwrap_or(template.len());

    let mut out = String::with_capacity(template.len() + content.len() + 1);
    out.push_str(&template[..start]);
    out.push_str(content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&template[end..]);
    Ok(out)
}
