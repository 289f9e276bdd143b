//! Download directory management.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs::naming::sanitize_filename;
use crate::model::Handle;

/// Directory name for a collection in a mirrored tree.
///
/// Uses the sanitized title when `use_title` is set and the title has usable
/// characters, the handle otherwise.
pub fn collection_directory_name(handle: &Handle, title: Option<&str>, use_title: bool) -> String {
    if use_title {
        if let Some(name) = title.and_then(|t| sanitize_filename(t).ok()) {
            return name;
        }
    }
    handle.to_string()
}

/// Join directory names below `base`.
pub fn nested_directory<I, S>(base: &Path, names: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .fold(base.to_path_buf(), |path, name| path.join(name.as_ref()))
}

/// Ensure a directory exists, creating it if necessary.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} is not a directory", path.display()),
        ))),
        Err(_) => {
            tokio::fs::create_dir_all(path).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_directory_name() {
        let handle: Handle = "Collection-12".parse().unwrap();
        assert_eq!(
            collection_directory_name(&handle, Some("Specs: 2024"), true),
            "Specs_ 2024"
        );
        assert_eq!(
            collection_directory_name(&handle, Some("Specs"), false),
            "Collection-12"
        );
        assert_eq!(collection_directory_name(&handle, Some("..."), true), "Collection-12");
        assert_eq!(collection_directory_name(&handle, None, true), "Collection-12");
    }

    #[test]
    fn test_nested_directory() {
        let path = nested_directory(Path::new("/out"), ["a", "b"]);
        assert_eq!(path, PathBuf::from("/out/a/b"));
    }

    #[tokio::test]
    async fn test_ensure_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("x").join("y");
        ensure_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).await.unwrap();

        let file = dir.path().join("file");
        std::fs::write(&file, b"data").unwrap();
        assert!(ensure_dir(&file).await.is_err());
    }
}
