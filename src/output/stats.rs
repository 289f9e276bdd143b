//! Statistics reporting.

use console::style;

use crate::download::DownloadStats;

/// Print statistics for a download run.
pub fn print_download_stats(stats: &DownloadStats) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Download Statistics:").bold());
    println!("  Targets processed: {}", stats.targets_processed);
    if stats.targets_failed > 0 {
        println!("  Targets failed:    {}", style(stats.targets_failed).red());
    }
    println!("  Files:  {} downloaded", stats.files_downloaded);
    if stats.files_failed > 0 {
        println!("  Failed: {}", style(stats.files_failed).red());
    }
    println!("  Size:   {}", indicatif::HumanBytes(stats.bytes_downloaded));
    println!("{}", style("═".repeat(50)).dim());
}
