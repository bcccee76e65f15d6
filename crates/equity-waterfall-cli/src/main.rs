mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::scenarios::ScenariosArgs;
use commands::sensitivity::{BreakEvenArgs, SensitivityArgs};
use commands::waterfall::{SummaryArgs, WaterfallArgs};

/// Liquidation waterfall and employee option valuation
#[derive(Parser)]
#[command(
    name = "eqw",
    version,
    about = "Liquidation waterfall and employee option valuation",
    long_about = "Distributes exit proceeds across a preferred-stock cap table \
                  (reverse-chronological preferences, participation and \
                  non-participating conversion) and values an employee option \
                  grant under each exit scenario, with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Distribute a single exit valuation through the waterfall
    Waterfall(WaterfallArgs),
    /// Value the option grant across named exit scenarios
    Scenarios(ScenariosArgs),
    /// Sweep option value across multiples of a base exit
    Sensitivity(SensitivityArgs),
    /// Find the exit valuation at which the options start to carry value
    BreakEven(BreakEvenArgs),
    /// Summarise the cap table's liquidation terms
    Summary(SummaryArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::BreakEven(args) => commands::sensitivity::run_break_even(args),
        Commands::Summary(args) => commands::waterfall::run_summary(args),
        Commands::Version => {
            println!("eqw {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
