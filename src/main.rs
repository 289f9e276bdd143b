//! docushare-dl - CLI entry point.

use std::collections::HashMap;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use docushare_dl::{
    cli::{Args, Command},
    client::{credential_source, DocuShare},
    config::{validate_config, Config},
    download::{
        CollectionDownloadOptions, DownloadOptions, DownloadRequest, DownloadStats, ProgressFactory,
    },
    error::{exit_codes, Error, Result},
    model::Handle,
    objects::CollectionTreeNode,
    output::{
        create_spinner, print_config_summary, print_download_stats, print_error, print_info,
        print_object, print_success, print_warning, DownloadBars,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            ExitCode::from(exit_code_for(&e) as u8)
        }
    }
}

fn exit_code_for(error: &Error) -> i32 {
    match error {
        Error::Config(_)
        | Error::ConfigValidation { .. }
        | Error::MissingConfig(_)
        | Error::TomlParse(_)
        | Error::UrlParse(_) => exit_codes::CONFIG_ERROR,
        Error::Authentication(_) | Error::SessionExpired | Error::PermissionDenied { .. } => {
            exit_codes::AUTH_ERROR
        }
        Error::NotFound { .. } | Error::InvalidHandle(_) => exit_codes::NOT_FOUND,
        Error::Network(_)
        | Error::HttpStatus { .. }
        | Error::SystemError { .. }
        | Error::DownloadIntegrity { .. }
        | Error::InvalidFilename(_)
        | Error::Io(_) => exit_codes::DOWNLOAD_ERROR,
        _ => exit_codes::UNEXPECTED_ERROR,
    }
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "docushare_dl=debug" } else { "docushare_dl=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration; an explicitly named file must exist
    let config_path = args.config_path();
    let mut config = if args.config.is_some() {
        Config::load(&config_path)?
    } else {
        Config::load_or_default(&config_path)?
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;

    let client = DocuShare::from_config(&config)?;

    let spinner = create_spinner(&format!("Logging in to {}", client.base_url()));
    let login = client.login(credential_source(&config)).await;
    spinner.finish_and_clear();
    login?;

    if let Some(username) = client.username().await {
        print_info(&format!("Logged in as: {}", username));
    }

    match args.command {
        Command::Info { handle } => {
            let handle: Handle = handle.parse()?;
            let object = client.object(&handle).await?;
            print_object(&object);
            Ok(exit_codes::SUCCESS)
        }
        Command::Tree {
            collection,
            handles_only,
        } => {
            let collection: Handle = collection.parse()?;
            print_tree(&client, &collection, handles_only).await?;
            Ok(exit_codes::SUCCESS)
        }
        Command::Download { handles, .. } => download(&client, &config, &handles).await,
    }
}

async fn print_tree(client: &DocuShare, collection: &Handle, handles_only: bool) -> Result<()> {
    let tree = client.tree(collection).await?;
    if handles_only {
        print!("{}", tree.render());
        return Ok(());
    }

    let mut handles = vec![tree.handle.clone()];
    collect_handles(&tree, &mut handles);
    handles.sort();
    handles.dedup();

    let objects = client.objects(&handles).await?;
    let titles: HashMap<&Handle, &str> = handles
        .iter()
        .zip(objects.iter())
        .map(|(handle, object)| (handle, object.title()))
        .collect();

    print!(
        "{}",
        tree.render_with(|handle| match titles.get(handle) {
            Some(title) => format!("{}  {}", handle, title),
            None => handle.to_string(),
        })
    );
    Ok(())
}

fn collect_handles(node: &CollectionTreeNode, out: &mut Vec<Handle>) {
    for child in &node.children {
        out.push(child.handle.clone());
        collect_handles(child, out);
    }
}

async fn download(client: &DocuShare, config: &Config, handles: &[String]) -> Result<i32> {
    let directory = config.download_directory();
    print_config_summary(
        client.base_url().as_str(),
        &client.username().await.unwrap_or_default(),
        &directory.display().to_string(),
    );

    let collection_options = CollectionDownloadOptions {
        layout: config.download.layout,
        title_as_directory_name: config.download.collection_title_as_directory_name,
        overwrite: config.download.overwrite,
        concurrency: config.download.concurrency,
    };

    let mut stats = DownloadStats::new();
    let mut requests = Vec::new();

    for raw in handles {
        let handle: Handle = match raw.parse() {
            Ok(handle) => handle,
            Err(e) => {
                print_error(&e.to_string());
                stats.mark_target_failed();
                continue;
            }
        };

        if handle.is_collection() {
            match client
                .engine()
                .plan_collection(&handle, &directory, &collection_options)
                .await
            {
                Ok(planned) => {
                    print_info(&format!(
                        "{}: {} documents ({} layout)",
                        handle,
                        planned.len(),
                        config.download.layout
                    ));
                    requests.extend(planned);
                    stats.mark_target_done();
                }
                Err(e) => {
                    print_error(&format!("Failed to process {}: {}", handle, e));
                    stats.mark_target_failed();
                }
            }
        } else {
            requests.push(DownloadRequest {
                handle,
                directory: directory.clone(),
                options: DownloadOptions {
                    filename: None,
                    overwrite: config.download.overwrite,
                },
            });
            stats.mark_target_done();
        }
    }

    if requests.is_empty() {
        print_warning("Nothing to download");
    } else {
        let bars = config.download.show_progress.then(DownloadBars::new);
        let outcomes = client
            .download_many(
                requests,
                config.download.concurrency,
                bars.as_ref().map(|b| b as &dyn ProgressFactory),
            )
            .await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(path) => print_success(&format!("{} -> {}", outcome.handle, path.display())),
                Err(e) => print_error(&format!("{}: {}", outcome.handle, e)),
            }
        }
        stats.record_outcomes(&outcomes);
    }

    print_download_stats(&stats);

    if stats.has_failures() {
        let nothing_written = stats.files_downloaded == 0;
        return Ok(if nothing_written {
            exit_codes::DOWNLOAD_ERROR
        } else {
            exit_codes::SOME_DOWNLOADS_FAILED
        });
    }

    Ok(exit_codes::SUCCESS)
}
