use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use exif_cleaner::{config, jpeg, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "exif-cleaner",
    version,
    about = "Strip EXIF, XMP, ICC, and comment metadata from JPEG images without re-encoding"
)]
struct Cli {
    /// JPEG files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Metadata categories to strip (exif, xmp, icc, comment); defaults to
    /// the config file's list
    #[arg(short, long, value_name = "CATEGORY", value_delimiter = ',')]
    strip: Vec<String>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Rewrite files in place instead of writing a .cleaned copy
    #[arg(long)]
    in_place: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Load config
    let mut config = config::Config::load(cli.config.as_deref())?;

    // Override output mode from CLI flag
    if cli.in_place {
        config.output.in_place = true;
    }

    // Resolve the removal policy, failing fast on unknown category names
    let categories = if cli.strip.is_empty() {
        config.strip.categories.clone()
    } else {
        cli.strip.clone()
    };
    let rules = jpeg::RuleSet::from_names(&categories).map_err(|e| {
        let valid: Vec<&str> = jpeg::MetadataKind::ALL.iter().map(|k| k.name()).collect();
        anyhow::anyhow!("{e}. Valid categories: {}", valid.join(", "))
    })?;
    if rules.is_empty() {
        anyhow::bail!("No metadata categories selected. Use --strip or the config file.");
    }

    // Collect images
    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No JPEG files found in the specified paths.");
    }

    log::info!("Found {} JPEG file(s) to process", images.len());
    log::info!("Stripping: {}", categories.join(", "));

    // Process each file
    let total = images.len();
    let mut reports = Vec::new();

    for (i, image_path) in images.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, image_path.display());

        let report = pipeline::process_file(image_path, &rules, &config);

        if let Some(ref err) = report.error {
            log::error!("  Error: {err}");
        } else if let Some(ref output) = report.output_path {
            let removed = report.bytes_in.saturating_sub(report.bytes_out);
            log::info!("  Wrote: {} ({removed} bytes removed)", output.display());
        }

        reports.push(report);
    }

    // JSON output
    if cli.json {
        let json_reports: Vec<serde_json::Value> = reports
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.path.display().to_string(),
                    "output_path": r.output_path.as_ref().map(|p| p.display().to_string()),
                    "bytes_in": r.bytes_in,
                    "bytes_out": r.bytes_out,
                    "error": r.error,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    }

    // Summary
    let success = reports.iter().filter(|r| r.error.is_none()).count();
    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    log::info!("Done: {success} succeeded, {failed} failed out of {total} files");

    Ok(())
}
