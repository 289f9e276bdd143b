//! Filename sanitizing and collision naming.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Highest collision suffix tried before giving up.
pub const MAX_COLLISION_SUFFIX: u32 = 9999;

/// Make a site-supplied name safe to use as a single file name.
///
/// Path separators and characters reserved on common filesystems are
/// replaced, leading dots and surrounding whitespace are removed. Names that
/// end up empty are rejected.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim().trim_start_matches('.').trim_end_matches(['.', ' ']);
    if sanitized.is_empty() {
        return Err(Error::InvalidFilename(format!(
            "'{}' has no usable characters",
            name
        )));
    }

    Ok(sanitized.to_string())
}

/// Split a file name into stem and extension (with its dot).
///
/// A leading dot does not start an extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => filename.split_at(pos),
        _ => (filename, ""),
    }
}

/// `report.pdf` with `n = 2` becomes `report (2).pdf`.
pub fn numbered_filename(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    let (stem, ext) = split_extension(filename);
    format!("{} ({}){}", stem, n, ext)
}

/// Candidate paths for `filename` in `dir`: the plain name first, then
/// numbered variants.
pub fn collision_candidates<'a>(
    dir: &'a Path,
    filename: &str,
) -> impl Iterator<Item = PathBuf> + 'a {
    let filename = filename.to_string();
    (0..=MAX_COLLISION_SUFFIX).map(move |n| dir.join(numbered_filename(&filename, n)))
}
