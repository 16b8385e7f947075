//! Command-line interface for inspecting VFP cadastral exchange files.
//!
//! This binary is a thin façade over the [`vfp_core`] library: it parses
//! arguments, configures logging, and delegates to command handlers that print
//! their results as tables.
//!
//! # Available Commands
//!
//! - `drivers` - List the known cadastral drivers and their capabilities
//! - `sniff` - Classify a file from its root element
//! - `info` - Open a file and show the schema of each layer

mod display;

use std::path::Path;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use vfp_core::drivers::get_drivers;
use vfp_core::operations;
use vfp_core::{OpenMode, OpenOptions, VfpDataSource, VfpError};
use vfp_xml::{ScanOptions, SniffOptions};

use crate::display::{display_dataset_info, display_drivers, display_sniff_report};

#[derive(Parser)]
#[command(
    name = "vfp",
    version,
    about = "Inspect VFP cadastral land consolidation files",
    long_about = "vfp classifies VFP (Czech land consolidation exchange format) XML files\n\
                  and discovers the schema of their layers with bounded, streaming reads."
)]
/// Command-line arguments and options for the `vfp` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `vfp` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Lists the known cadastral drivers and their capabilities.
    Drivers,

    /// Classifies a file as VFP or not from its first start tag.
    ///
    /// Reading stops as soon as the root element has been seen, or after
    /// `--max-chunks` chunks without one.
    Sniff {
        /// Path to the file to classify.
        #[arg(value_name = "DATASET")]
        input: String,

        /// Size of each read, in bytes.
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<usize>,

        /// Chunks read before giving up with an `Unknown` classification.
        #[arg(long, value_name = "COUNT")]
        max_chunks: Option<u64>,

        /// Root attribute holding the format version.
        #[arg(long, value_name = "NAME")]
        version_attribute: Option<String>,
    },

    /// Opens a VFP file and shows the layers and their schemas.
    Info {
        /// Path to the VFP file.
        #[arg(value_name = "DATASET")]
        input: String,

        /// Size of each read, in bytes.
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<usize>,

        /// Chunks without any element or text before a scan is abandoned.
        #[arg(long, value_name = "COUNT")]
        stall_limit: Option<u64>,

        /// Only scan the named layer (repeatable).
        #[arg(short, long, value_name = "LAYER")]
        layer: Vec<String>,

        /// Infer field types from element text.
        #[arg(long)]
        infer_types: bool,

        /// Request update access (always refused, VFP is read-only).
        #[arg(long)]
        update: bool,
    },
}

/// Entry point for the `vfp` command-line interface.
///
/// # Errors
///
/// Returns an error if the logging system cannot be initialized. Failures of
/// the commands themselves are printed with a suggestion and end the process
/// with exit code 1.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let outcome = match cli.command {
        Commands::Drivers => handle_drivers(),
        Commands::Sniff {
            input,
            chunk_size,
            max_chunks,
            version_attribute,
        } => {
            info!("Sniffing {input}");
            let options = sniff_options(chunk_size, max_chunks, version_attribute);
            handle_sniff(&input, &options)
        },
        Commands::Info {
            input,
            chunk_size,
            stall_limit,
            layer,
            infer_types,
            update,
        } => {
            info!("Displaying info for {input}");
            let options = open_options(chunk_size, stall_limit, layer, infer_types);
            let mode = if update {
                OpenMode::Update
            } else {
                OpenMode::ReadOnly
            };
            handle_info(&input, &options, mode)
        },
    };

    if let Err(err) = outcome {
        report_error(&err);
        process::exit(1);
    }
    Ok(())
}

fn report_error(err: &VfpError) {
    eprintln!("Error: {}", err.user_message());
    if let Some(suggestion) = err.recovery_suggestion() {
        eprintln!("\n{suggestion}");
    }
}

fn sniff_options(
    chunk_size: Option<usize>,
    max_chunks: Option<u64>,
    version_attribute: Option<String>,
) -> SniffOptions {
    let mut options = SniffOptions::default().with_version_attribute(version_attribute);
    if let Some(chunk_size) = chunk_size {
        options = options.with_chunk_size(chunk_size);
    }
    if let Some(max_chunks) = max_chunks {
        options = options.with_max_chunks(max_chunks);
    }
    options
}

fn open_options(
    chunk_size: Option<usize>,
    stall_limit: Option<u64>,
    layers: Vec<String>,
    infer_types: bool,
) -> OpenOptions {
    let mut scan = ScanOptions::default();
    if let Some(chunk_size) = chunk_size {
        scan = scan.with_chunk_size(chunk_size);
    }
    if let Some(stall_limit) = stall_limit {
        scan = scan.with_stall_limit(stall_limit);
    }

    let options = OpenOptions::default()
        .with_sniff_options(sniff_options(chunk_size, None, None))
        .with_scan_options(scan)
        .with_layers((!layers.is_empty()).then_some(layers));

    if infer_types {
        options.with_text_inference()
    } else {
        options
    }
}

fn handle_drivers() -> vfp_core::Result<()> {
    display_drivers(&get_drivers());
    Ok(())
}

fn handle_sniff(input: &str, options: &SniffOptions) -> vfp_core::Result<()> {
    let report = operations::sniff(Path::new(input), options)?;
    display_sniff_report(input, &report);
    Ok(())
}

fn handle_info(input: &str, options: &OpenOptions, mode: OpenMode) -> vfp_core::Result<()> {
    debug!("Opening {input} in {mode} mode");
    let info = if mode.is_update() {
        VfpDataSource::open(input, mode, options)?.dataset_info()
    } else {
        operations::info(Path::new(input), options)?
    };
    display_dataset_info(&info);
    Ok(())
}
