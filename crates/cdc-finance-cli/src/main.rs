mod commands;
mod input;
mod output;
mod telemetry;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::rate::RateArgs;
use commands::schedule::ScheduleArgs;
use commands::valuation::{AnnualizeArgs, CoefficientArgs, PayoffArgs};

/// Installment-financing price tables
#[derive(Parser)]
#[command(
    name = "cdc",
    version,
    about = "Installment-financing (CDC) price tables",
    long_about = "Computes consumer-credit financing with decimal precision: implied \
                  periodic rate from cash and credit prices, financing coefficient, \
                  level payment, the full price table, and early-payoff figures."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "cdc_finance_core=trace")
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Full calculation: rate, coefficient, payment, price table and summary
    Schedule(ScheduleArgs),
    /// Solve the implied periodic rate from cash and credit prices
    Rate(RateArgs),
    /// Financing coefficient (and optionally payment / credit price)
    Coefficient(CoefficientArgs),
    /// Nominal and discounted early-payoff amounts
    Payoff(PayoffArgs),
    /// Compound a monthly percentage rate into an annual one
    Annualize(AnnualizeArgs),
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

fn main() {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init(&cli.log_level) {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(2);
    }

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::Rate(args) => commands::rate::run_rate(args),
        Commands::Coefficient(args) => commands::valuation::run_coefficient(args),
        Commands::Payoff(args) => commands::valuation::run_payoff(args),
        Commands::Annualize(args) => commands::valuation::run_annualize(args),
        Commands::Version => {
            println!("cdc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::error!(error = %e, "calculation failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
