//! Console output utilities.

use console::style;

use crate::model::DocuShareObject;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print configuration summary.
pub fn print_config_summary(base_url: &str, username: &str, download_dir: &str) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Site: {}", base_url);
    println!("  User: {}", if username.is_empty() { "(prompt)" } else { username });
    println!("  Directory: {}", download_dir);
    println!();
}

/// Print the typed fields and raw properties of an object.
pub fn print_object(object: &DocuShareObject) {
    println!("{}", style(format!("{}  {}", object.handle(), object.title())).bold());

    match object {
        DocuShareObject::Document(doc) => {
            println!("  Filename: {}", doc.filename);
            if let Some(dcn) = &doc.document_control_number {
                println!("  Document control number: {}", dcn);
            }
            if let Some(current) = &doc.current_version_handle {
                println!("  Current version: {}", current);
            }
            if !doc.version_handles.is_empty() {
                let versions: Vec<String> =
                    doc.version_handles.iter().map(ToString::to_string).collect();
                println!("  Versions: {}", versions.join(", "));
            }
        }
        DocuShareObject::Version(ver) => {
            println!("  Filename: {}", ver.filename);
            println!("  Version number: {}", ver.version_number);
            if let Some(doc) = &ver.document_handle {
                println!("  Document: {}", doc);
            }
        }
        DocuShareObject::Collection(col) => {
            println!(
                "  Children: {} documents, {} collections",
                col.documents().count(),
                col.collections().count()
            );
        }
    }

    let mut labels: Vec<&String> = object.properties().keys().collect();
    labels.sort();
    println!("{}", style("  Properties:").dim());
    for label in labels {
        println!("    {}: {}", label, object.properties()[label]);
    }
}
