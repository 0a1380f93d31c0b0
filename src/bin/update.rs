//! disposable-update: CLI tool for building snapshot files from domain lists.

use clap::{Parser, Subcommand};
use disposable::snapshot;
use disposable::update::{
    load_sources, parse_domain_list, write_text_list, ListMerger, Source, UpdateStats,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "disposable-update")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(
    about = "Build disposable email snapshot files from public domain lists",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download all sources and write a new data.bin
    Update {
        /// Output directory for data.bin
        #[arg(short, long, default_value = "data")]
        output_dir: PathBuf,

        /// Sources file (default: <output-dir>/sources.txt)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Extra blocklist domains, one per line
        #[arg(long)]
        manual: Option<PathBuf>,

        /// HTTP timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        /// Write a one-line change summary to this file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Verbose output, also writes blocklist.txt and allowlist.txt
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the metadata of a snapshot file
    Inspect {
        /// Snapshot file
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = match &cli.command {
        Commands::Update { verbose: true, .. } => "debug",
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match cli.command {
        Commands::Update {
            output_dir,
            sources,
            manual,
            timeout,
            summary,
            verbose,
        } => {
            let sources = sources.unwrap_or_else(|| output_dir.join("sources.txt"));
            run_update(
                &output_dir,
                &sources,
                manual.as_deref(),
                Duration::from_secs(timeout),
                summary.as_deref(),
                verbose,
            )
        }
        Commands::Inspect { file, json } => inspect(&file, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_update(
    output_dir: &Path,
    sources_file: &Path,
    manual_file: Option<&Path>,
    timeout: Duration,
    summary_file: Option<&Path>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stats = UpdateStats::default();
    let output_path = output_dir.join("data.bin");

    // Existing data, for the change summary
    if let Ok(existing) = fs::read(&output_path) {
        if let Ok(old) = snapshot::decode(&existing) {
            stats.old_blocklist_count = old.blocklist.size();
            stats.old_allowlist_count = old.allowlist.size();
            log::debug!(
                "Existing data: {} blocklist, {} allowlist domains",
                stats.old_blocklist_count,
                stats.old_allowlist_count
            );
        }
    }

    log::debug!("Loading sources from {:?}", sources_file);
    let sources = load_sources(sources_file)?;
    log::debug!("Loaded {} sources", sources.len());

    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    let mut merger = ListMerger::new();

    for source in &sources {
        log::debug!("Downloading {}: {}", source.name, source.url);
        match download_source(&client, source) {
            Ok(entries) => {
                let accepted = merger.add_source(source, &entries);
                log::debug!(
                    "  Downloaded {} entries from {} ({} valid)",
                    entries.len(),
                    source.name,
                    accepted
                );
            }
            Err(e) => {
                log::error!("Failed to download {}: {} (skipping)", source.name, e);
                merger.add_failure(source);
            }
        }
    }

    let default_manual = output_dir.join("manual.txt");
    let manual_files = manual_file
        .map(Path::to_path_buf)
        .into_iter()
        .chain(default_manual.exists().then_some(default_manual));
    for path in manual_files {
        match fs::read_to_string(&path) {
            Ok(content) => {
                let accepted = merger.add_manual(&parse_domain_list(&content));
                log::debug!("Loaded {} manual domains from {:?}", accepted, path);
            }
            Err(e) => log::warn!("Could not load manual file {:?}: {}", path, e),
        }
    }

    let (lists, failed_sources) = merger.finish()?;
    stats.failed_sources = failed_sources;
    stats.new_blocklist_count = lists.blocklist.len();
    stats.new_allowlist_count = lists.allowlist.len();

    fs::create_dir_all(output_dir)?;
    let data = lists.encode()?;
    fs::write(&output_path, &data)?;

    println!("Successfully generated {:?}", output_path);
    println!("  Blocklist domains: {}", stats.new_blocklist_count);
    println!("  Allowlist domains: {}", stats.new_allowlist_count);
    println!(
        "  File size: {} bytes ({:.2} KB)",
        data.len(),
        data.len() as f64 / 1024.0
    );
    println!("  Summary: {}", stats.summary());
    if !stats.failed_sources.is_empty() {
        println!("  Failed sources: {}", stats.failed_sources.join(", "));
    }

    if let Some(path) = summary_file {
        if let Err(e) = fs::write(path, stats.summary()) {
            log::warn!("Could not write summary file {:?}: {}", path, e);
        }
    }

    if verbose {
        let text_lists = [
            ("blocklist.txt", &lists.blocklist),
            ("allowlist.txt", &lists.allowlist),
        ];
        for (name, domains) in text_lists {
            if let Err(e) = write_text_list(output_dir.join(name), domains) {
                log::warn!("Could not write {}: {}", name, e);
            }
        }
    }

    Ok(())
}

fn download_source(
    client: &reqwest::blocking::Client,
    source: &Source,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let response = client.get(&source.url).send()?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()).into());
    }
    Ok(parse_domain_list(&response.text()?))
}

fn inspect(file: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(file)?;
    let decoded = snapshot::decode(&data)?;

    if json {
        let output = serde_json::json!({
            "info": decoded.info,
            "blocklist_count": decoded.blocklist.size(),
            "allowlist_count": decoded.allowlist.size(),
            "file_size": data.len(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("File: {:?} ({} bytes)", file, data.len());
        println!("  Version: {}", decoded.info.version);
        println!(
            "  Created: {} (unix)",
            decoded
                .info
                .created_at
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        );
        println!("  Domain count: {}", decoded.info.domain_count);
        println!("  Blocklist domains: {}", decoded.blocklist.size());
        println!("  Allowlist domains: {}", decoded.allowlist.size());
    }

    Ok(())
}
