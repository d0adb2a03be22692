use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use heic_convert::{
    archive_file_name, run_batch, ArchiveCompression, BatchOptions, BatchReport, CancelToken,
    ConversionConfig, ConvertError, InputItem, TargetFormat, DEFAULT_JPEG_QUALITY,
};
use serde_json::json;
use shared_utils::logging::{init_logging, log_operation_end, LogConfig};
use shared_utils::{format_bytes, print_summary_report, UnifiedProgressBar, HEIC_EXTENSIONS};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "heic-convert")]
#[command(version, about = "Batch convert HEIC images to PNG or JPEG and pack them into a ZIP", long_about = None)]
struct Cli {
    /// HEIC files and/or directories containing them
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value = "png")]
    format: FormatArg,

    /// JPEG quality 1-100 (ignored for PNG)
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY as u32)]
    quality: u32,

    /// Archive path (default: converted_images_<format>.zip)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    recursive: bool,

    /// Parallel workers (default: based on CPU cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    #[arg(long, value_enum, default_value = "human")]
    output_format: OutputFormat,

    /// Number of outputs to list as a preview
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Also write the preview outputs into this directory
    #[arg(long, value_name = "DIR")]
    preview_dir: Option<PathBuf>,

    /// Store entries without deflate (PNG/JPEG barely shrink further)
    #[arg(long)]
    store: bool,

    /// Write a rolling log file into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for TargetFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => TargetFormat::Png,
            FormatArg::Jpeg => TargetFormat::Jpeg,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default();
    if cli.verbose {
        log_config = log_config.with_level(tracing::Level::DEBUG);
    }
    if let Some(ref dir) = cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    if let Err(e) = init_logging("heic_convert", log_config) {
        eprintln!("⚠️  {:#}", e);
    }

    let format = TargetFormat::from(cli.format);
    let config = match format {
        TargetFormat::Png => ConversionConfig::png(),
        TargetFormat::Jpeg => ConversionConfig::jpeg(cli.quality),
    };
    if let Err(e) = config.validated() {
        eprintln!("❌ {}", e);
        std::process::exit(2);
    }

    let paths = shared_utils::collect_inputs(&cli.inputs, HEIC_EXTENSIONS, cli.recursive);
    let items = load_items(&paths);
    if items.is_empty() {
        println!("📂 No HEIC files found");
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("\n⚠️  Cancelling after the items already in progress...");
            cancel.cancel();
        }) {
            warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    }

    let mut options = BatchOptions::new().with_cancel_token(cancel);
    if let Some(jobs) = cli.jobs {
        options = options.with_workers(jobs);
    }

    let pb = match cli.output_format {
        OutputFormat::Human => UnifiedProgressBar::new(items.len() as u64, "Converting"),
        OutputFormat::Json => UnifiedProgressBar::hidden(items.len() as u64),
    };

    let start = Instant::now();
    let report = match run_batch(&items, &config, &options, |event| {
        pb.inc();
        pb.set_message(event.name.clone());
        if !event.succeeded {
            pb.println(&format!("❌ {} failed", event.name));
        }
    }) {
        Ok(report) => report,
        Err(ConvertError::Config(msg)) => {
            eprintln!("❌ Invalid configuration: {}", msg);
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };
    pb.finish_with_message("Complete!");

    let compression = if cli.store {
        ArchiveCompression::Stored
    } else {
        ArchiveCompression::Deflated
    };
    let archive_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(archive_file_name(format)));

    // Pack failures still leave the per-item report intact for the summary below
    let archive_result = report
        .pack_with(compression)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| {
            std::fs::write(&archive_path, &bytes)
                .with_context(|| format!("Failed to write archive {}", archive_path.display()))?;
            Ok(bytes.len() as u64)
        });

    if let Some(ref dir) = cli.preview_dir {
        if let Err(e) = write_preview(&report, cli.preview, dir) {
            warn!(error = %e, "Failed to write preview files");
        }
    }

    let input_bytes: u64 = items.iter().map(|i| i.bytes.len() as u64).sum();
    match cli.output_format {
        OutputFormat::Human => {
            print_human(&report, &config, cli.preview, start, input_bytes);
            match &archive_result {
                Ok(size) => println!(
                    "📦 Archive: {} ({})",
                    archive_path.display(),
                    format_bytes(*size)
                ),
                Err(e) => eprintln!("❌ Archive not written: {:#}", e),
            }
        }
        OutputFormat::Json => {
            let value = json!({
                "report": report,
                "archive": archive_result.as_ref().ok().map(|size| json!({
                    "path": archive_path.display().to_string(),
                    "bytes": size,
                })),
                "archive_error": archive_result.as_ref().err().map(|e| format!("{:#}", e)),
                "elapsed_secs": start.elapsed().as_secs_f64(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    log_operation_end("heic batch", start.elapsed(), archive_result.is_ok());
    archive_result.map(|_| ())
}

/// Read inputs; unreadable files are reported and left out of the batch.
fn load_items(paths: &[PathBuf]) -> Vec<InputItem> {
    paths
        .iter()
        .filter_map(|path| match InputItem::from_path(path) {
            Ok(item) => Some(item),
            Err(e) => {
                eprintln!("⚠️  Skipping {}: {}", path.display(), e);
                warn!(path = %path.display(), error = %e, "Failed to read input");
                None
            }
        })
        .collect()
}

fn write_preview(report: &BatchReport, count: usize, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create preview directory {}", dir.display()))?;
    for output in report.preview(count) {
        let path = dir.join(&output.name);
        std::fs::write(&path, &output.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    info!(count = report.preview(count).len(), dir = %dir.display(), "Preview files written");
    Ok(())
}

fn print_human(
    report: &BatchReport,
    config: &ConversionConfig,
    preview: usize,
    start: Instant,
    input_bytes: u64,
) {
    let errors: Vec<(String, String)> = report
        .failures
        .iter()
        .map(|f| (f.name.clone(), f.reason.clone()))
        .collect();
    print_summary_report(
        &report.summary,
        &errors,
        start.elapsed(),
        input_bytes,
        report.output_bytes(),
        "HEIC Conversion",
    );

    if report.outputs.is_empty() {
        if report.summary.total > 0 {
            println!("❌ No files were converted.");
        }
        return;
    }

    let shown = report.preview(preview);
    if !shown.is_empty() {
        println!();
        println!("🖼️  Preview (first {}):", shown.len());
        for output in shown {
            println!("   {} ({})", output.name, format_bytes(output.bytes.len() as u64));
        }
        let remaining = report.outputs.len() - shown.len();
        if remaining > 0 {
            println!("   … {} more in the archive", remaining);
        }
    }

    println!();
    println!(
        "✅ Converted {} file(s) to {}",
        report.summary.succeeded, config.format
    );
    if let Some(quality) = config.validated().ok().and_then(|c| c.jpeg_quality()) {
        println!("   JPEG quality: {}", quality);
    }
    if report.cancelled {
        println!("⚠️  Cancelled: {} file(s) not processed", report.summary.skipped);
    }
}
