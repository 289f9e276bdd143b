//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, DownloadLayout};

/// DocuShare document downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "docushare-dl",
    version,
    about = "Browse and download documents from a Xerox DocuShare site",
    long_about = "A CLI tool to inspect DocuShare objects, print collection trees and download \
                  documents, versions and whole collections.\n\n\
                  Handles look like Document-123, Version-456 or Collection-789."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file [default: platform config directory].
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root URL of the DocuShare site.
    #[arg(long = "base-url", env = "DOCUSHARE_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Login name.
    #[arg(short, long, env = "DOCUSHARE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the properties of an object.
    Info {
        /// Handle of the object.
        handle: String,
    },

    /// Print the hierarchy below a collection.
    Tree {
        /// Handle of the collection.
        collection: String,

        /// Label nodes with handles only (no title lookups).
        #[arg(long)]
        handles_only: bool,
    },

    /// Download documents, versions or collections.
    Download {
        /// Handles to download.
        #[arg(required = true, num_args = 1..)]
        handles: Vec<String>,

        /// Base directory for downloads.
        #[arg(short = 'd', long = "directory")]
        directory: Option<PathBuf>,

        /// Layout for collection downloads.
        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,

        /// Replace existing files instead of numbering new ones.
        #[arg(long)]
        overwrite: bool,

        /// Name tree directories after collection handles instead of titles.
        #[arg(long)]
        handle_directories: bool,

        /// Simultaneous downloads.
        #[arg(short = 'j', long)]
        jobs: Option<usize>,

        /// Hide download progress bars.
        #[arg(long, short)]
        quiet: bool,
    },
}

/// CLI collection layout argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LayoutArg {
    /// Direct child documents only.
    Children,
    /// All descendant documents in one directory.
    Flatten,
    /// Mirror the collection hierarchy.
    Tree,
}

impl From<LayoutArg> for DownloadLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Children => DownloadLayout::Children,
            LayoutArg::Flatten => DownloadLayout::Flatten,
            LayoutArg::Tree => DownloadLayout::Tree,
        }
    }
}

impl Args {
    /// Configuration file to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .or_else(Config::default_path)
            .unwrap_or_else(|| PathBuf::from(crate::config::CONFIG_FILE_NAME))
    }

    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.site.base_url = base_url.clone();
        }

        if let Some(username) = &self.username {
            config.site.username = username.clone();
        }

        if let Command::Download {
            directory,
            layout,
            overwrite,
            handle_directories,
            jobs,
            quiet,
            ..
        } = &self.command
        {
            if let Some(dir) = directory {
                config.download.directory = Some(dir.clone());
            }

            if let Some(layout) = layout {
                config.download.layout = (*layout).into();
            }

            // Boolean flags (only override if set to non-default)
            if *overwrite {
                config.download.overwrite = true;
            }

            if *handle_directories {
                config.download.collection_title_as_directory_name = false;
            }

            if let Some(jobs) = jobs {
                config.download.concurrency = *jobs;
            }

            if *quiet {
                config.download.show_progress = false;
            }
        }
    }
}
