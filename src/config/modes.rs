//! Enumerated configuration choices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the documents of a collection are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadLayout {
    /// Direct child documents only (default).
    #[default]
    Children,
    /// Every descendant document in one directory, each once.
    Flatten,
    /// Mirror the collection hierarchy as directories.
    Tree,
}

impl fmt::Display for DownloadLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadLayout::Children => write!(f, "children"),
            DownloadLayout::Flatten => write!(f, "flatten"),
            DownloadLayout::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for DownloadLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "children" => Ok(DownloadLayout::Children),
            "flatten" => Ok(DownloadLayout::Flatten),
            "tree" => Ok(DownloadLayout::Tree),
            _ => Err(format!("Unknown layout: {} (expected children, flatten or tree)", s)),
        }
    }
}

/// Where the login password comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordSource {
    /// Ask on the terminal for every login (default).
    #[default]
    Prompt,
    /// Platform keyring, prompting once when nothing is stored.
    Keyring,
    /// An environment variable.
    Env,
}

impl fmt::Display for PasswordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordSource::Prompt => write!(f, "prompt"),
            PasswordSource::Keyring => write!(f, "keyring"),
            PasswordSource::Env => write!(f, "env"),
        }
    }
}

impl FromStr for PasswordSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prompt" => Ok(PasswordSource::Prompt),
            "keyring" => Ok(PasswordSource::Keyring),
            "env" => Ok(PasswordSource::Env),
            _ => Err(format!("Unknown password source: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_parse_and_display() {
        for layout in [DownloadLayout::Children, DownloadLayout::Flatten, DownloadLayout::Tree] {
            assert_eq!(layout.to_string().parse::<DownloadLayout>().unwrap(), layout);
        }
        assert_eq!("TREE".parse::<DownloadLayout>().unwrap(), DownloadLayout::Tree);
        assert!("mirror".parse::<DownloadLayout>().is_err());
    }

    #[test]
    fn test_password_source_parse() {
        assert_eq!("Keyring".parse::<PasswordSource>().unwrap(), PasswordSource::Keyring);
        assert!("file".parse::<PasswordSource>().is_err());
    }
}
