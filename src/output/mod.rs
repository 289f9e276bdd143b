//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Progress sinks and bars
//! - Statistics reporting

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{
    print_config_summary, print_error, print_info, print_object, print_success, print_warning,
};
pub use progress::{create_spinner, DownloadBar, DownloadBars, ProgressSink};
pub use stats::print_download_stats;
