//! Download progress reporting.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Receives byte counts while a download streams.
pub trait ProgressSink: Send + Sync {
    /// `total` is `None` when the server declared no length.
    fn update(&self, transferred: u64, total: Option<u64>);

    /// The download ended, successfully or not.
    fn finish(&self) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u64, Option<u64>) + Send + Sync,
{
    fn update(&self, transferred: u64, total: Option<u64>) {
        self(transferred, total)
    }
}

/// Create a spinner for long-running operations.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

fn bytes_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg:30!} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap()
        .progress_chars("#>-")
}

fn unknown_length_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg:30!} {bytes} ({bytes_per_sec})")
        .unwrap()
}

/// Progress bar for one download.
pub struct DownloadBar {
    bar: ProgressBar,
}

impl DownloadBar {
    pub fn new(label: &str) -> Self {
        Self::from_bar(ProgressBar::new_spinner(), label)
    }

    fn from_bar(bar: ProgressBar, label: &str) -> Self {
        bar.set_style(unknown_length_style());
        bar.set_message(label.to_string());
        Self { bar }
    }
}

impl ProgressSink for DownloadBar {
    fn update(&self, transferred: u64, total: Option<u64>) {
        if let Some(total) = total {
            if self.bar.length() != Some(total) {
                self.bar.set_length(total);
                self.bar.set_style(bytes_style());
            }
        }
        self.bar.set_position(transferred);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Stack of download bars for concurrent downloads.
#[derive(Clone, Default)]
pub struct DownloadBars {
    multi: MultiProgress,
}

impl DownloadBars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bar labelled `label`.
    pub fn add(&self, label: &str) -> DownloadBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        DownloadBar::from_bar(bar, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |transferred: u64, total: Option<u64>| {
            seen.lock().unwrap().push((transferred, total));
        };
        sink.update(10, Some(100));
        sink.update(100, Some(100));
        sink.finish();
        assert_eq!(*seen.lock().unwrap(), vec![(10, Some(100)), (100, Some(100))]);
    }

    #[test]
    fn test_download_bar_learns_length() {
        let bar = DownloadBar::from_bar(ProgressBar::hidden(), "report.pdf");
        bar.update(5, None);
        assert_eq!(bar.bar.position(), 5);
        bar.update(50, Some(200));
        assert_eq!(bar.bar.length(), Some(200));
        assert_eq!(bar.bar.position(), 50);
    }
}
