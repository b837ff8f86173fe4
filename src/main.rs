//! heatline CLI
//!
//! Records CPU profiles of the built-in workload, serves the HTTP control
//! routes and inspects report files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use heatline::commands::{
    display_schema, display_version, execute_record, execute_serve, validate_args,
    validate_report_file, validate_serve_args, RecordArgs, ServeArgs,
};
use heatline::flamegraph::FlamegraphConfig;
use heatline::utils::config::{
    DEFAULT_CONTROL_HOST, DEFAULT_CONTROL_PORT, DEFAULT_LABEL, DEFAULT_SAMPLING_INTERVAL_US,
};

/// heatline - sampling CPU profiler with per-line hit statistics
#[derive(Parser, Debug)]
#[command(name = "heatline")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Profile the built-in workload
    Record {
        /// Session label
        #[arg(short, long, default_value = DEFAULT_LABEL)]
        label: String,

        /// Sampling interval in microseconds
        #[arg(short, long, default_value_t = i64::from(DEFAULT_SAMPLING_INTERVAL_US), allow_hyphen_values = true)]
        interval: i64,

        /// Number of workload iterations
        #[arg(long, default_value = "200")]
        iterations: u32,

        /// Loop rounds inside each inner call
        #[arg(long, default_value = "20000")]
        rounds: u64,

        /// Output path for JSON report
        #[arg(short, long, default_value = "profile.json")]
        output: PathBuf,

        /// Output path for SVG flamegraph (optional)
        #[arg(short, long)]
        flamegraph: Option<PathBuf>,

        /// Number of top hot paths to include
        #[arg(long, default_value = "20")]
        top_paths: usize,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200")]
        width: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Serve the HTTP control routes (GET /info, POST /start, POST /stop)
    Serve {
        /// Interface to bind
        #[arg(long, default_value = DEFAULT_CONTROL_HOST)]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_CONTROL_PORT, env = "HEATLINE_PORT")]
        port: u16,

        /// Session label
        #[arg(short, long, default_value = DEFAULT_LABEL)]
        label: String,

        /// Sampling interval in microseconds
        #[arg(short, long, default_value_t = i64::from(DEFAULT_SAMPLING_INTERVAL_US), allow_hyphen_values = true)]
        interval: i64,

        /// Keep the built-in workload running in the background
        #[arg(long)]
        workload: bool,

        /// Loop rounds inside each inner call of the workload
        #[arg(long, default_value = "20000")]
        rounds: u64,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Record {
            label,
            interval,
            iterations,
            rounds,
            output,
            flamegraph,
            top_paths,
            title,
            width,
            summary,
        } => {
            let fg_config = flamegraph.as_ref().map(|_| {
                let config = FlamegraphConfig::new().with_width(width);
                match title {
                    Some(title) => config.with_title(title),
                    None => config.with_title(format!("heatline: {}", label)),
                }
            });

            let args = RecordArgs {
                label,
                interval_us: interval,
                iterations,
                rounds,
                output_json: output,
                output_svg: flamegraph,
                top_paths,
                flamegraph_config: fg_config,
                print_summary: summary,
            };

            validate_args(&args)?;
            execute_record(args)?;
        }

        Commands::Serve {
            host,
            port,
            label,
            interval,
            workload,
            rounds,
        } => {
            let args = ServeArgs {
                host,
                port,
                label,
                interval_us: interval,
                workload,
                rounds,
            };

            validate_serve_args(&args)?;
            execute_serve(args)?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
