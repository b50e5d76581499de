mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::assess::AssessArgs;
use commands::financial::{AmortizeArgs, CashFlowArgs, OptimalSizeArgs};
use commands::layout::{OrientationArgs, RoofLayoutArgs};
use commands::production::SolarMetricsArgs;
use commands::rates::{BillComponentsArgs, ProjectRatesArgs};

/// Commercial rooftop solar feasibility calculations
#[derive(Parser)]
#[command(
    name = "solarcalc",
    version,
    about = "Commercial rooftop solar feasibility calculations",
    long_about = "A CLI for estimating rooftop solar feasibility with decimal precision. \
                  Supports roof layout, electricity rate projection, 25-year cash-flow \
                  analysis, loan amortization, payback-driven sizing and full site \
                  assessments against live data sources."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Year-by-year cash flow with payback, ROI, NPV, IRR and LCOE
    CashFlow(CashFlowArgs),
    /// Monthly schedule for a fixed-rate loan
    Amortize(AmortizeArgs),
    /// Project an electricity rate forward with compound escalation
    ProjectRates(ProjectRatesArgs),
    /// Split an electricity rate into typical bill components
    BillComponents(BillComponentsArgs),
    /// Estimate how many panels fit on a roof
    RoofLayout(RoofLayoutArgs),
    /// Yield factor for a panel azimuth and tilt
    OrientationFactor(OrientationArgs),
    /// System size that meets a target payback period
    OptimalSize(OptimalSizeArgs),
    /// Facility consumption, panel count, savings and payback month
    SolarMetrics(SolarMetricsArgs),
    /// Full assessment of a site from its coordinates
    Assess(AssessArgs),
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
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("solar_feasibility_core=info")),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::CashFlow(args) => commands::financial::run_cash_flow(args),
        Commands::Amortize(args) => commands::financial::run_amortize(args),
        Commands::ProjectRates(args) => commands::rates::run_project_rates(args),
        Commands::BillComponents(args) => commands::rates::run_bill_components(args),
        Commands::RoofLayout(args) => commands::layout::run_roof_layout(args),
        Commands::OrientationFactor(args) => commands::layout::run_orientation_factor(args),
        Commands::OptimalSize(args) => commands::financial::run_optimal_size(args),
        Commands::SolarMetrics(args) => commands::production::run_solar_metrics(args),
        Commands::Assess(args) => commands::assess::run_assess(args),
        Commands::Version => {
            println!("solarcalc {}", env!("CARGO_PKG_VERSION"));
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
