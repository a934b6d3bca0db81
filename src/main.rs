//! statement-kpis: CLI entry point.
//!
//! Extracts KPIs from a financial statement workbook and prints tables,
//! cards and ratios, or exports them.

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use statement_kpis::excel::export_xlsx;
use statement_kpis::layout::WorkbookLayout;
use statement_kpis::render::{
    format_summary, render_cards, render_ratios, render_table, write_csv,
};
use statement_kpis::runner::ReportRunner;
use statement_kpis::types::{ReportKind, ReportOutcome};

const DEFAULT_WORKBOOK: &str = "data/iras-fs-fy2324.xlsx";

#[derive(Parser)]
#[command(name = "statement-kpis")]
#[command(about = "KPI extraction for annual financial statement workbooks")]
#[command(version)]
struct Cli {
    /// Path to the statement workbook.
    #[arg(short, long, env = "KPI_WORKBOOK", default_value = DEFAULT_WORKBOOK)]
    workbook: PathBuf,

    /// YAML layout replacing the built-in row/column positions.
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Reporting period length in months (burn rate and runway).
    #[arg(long)]
    months: Option<u32>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print KPI tables, cards and ratios.
    Report {
        /// Statement to report (all when omitted).
        report: Option<Report>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Print the one-line-per-metric text summary of a statement.
    Summary {
        report: Report,
    },
    /// Export all statements to an XLSX file.
    Export {
        output: PathBuf,
    },
    /// Print the effective layout as YAML.
    Layout,
}

#[derive(Clone, Copy, ValueEnum)]
enum Report {
    Position,
    Income,
    Equity,
    CashFlows,
}

impl From<Report> for ReportKind {
    fn from(report: Report) -> Self {
        match report {
            Report::Position => Self::FinancialPosition,
            Report::Income => Self::ComprehensiveIncome,
            Report::Equity => Self::ChangesInEquity,
            Report::CashFlows => Self::CashFlows,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Yaml,
    Csv,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "statement_kpis=warn",
        1 => "statement_kpis=info",
        _ => "statement_kpis=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut layout = match &cli.layout {
        Some(path) => WorkbookLayout::load(path)
            .with_context(|| format!("Failed to load layout {}", path.display()))?,
        None => WorkbookLayout::default(),
    };
    if let Some(months) = cli.months {
        layout.period_months = months;
    }

    if matches!(cli.command, Command::Layout) {
        layout.validate()?;
        print!("{}", layout.to_yaml()?);
        return Ok(());
    }

    let runner = ReportRunner::new(cli.workbook, layout)?;

    match cli.command {
        Command::Report { report, format } => {
            let outcomes = match report {
                Some(report) => vec![runner.run(report.into())?],
                None => runner.run_all()?,
            };
            match format {
                Format::Table => print_outcomes(&runner, &outcomes),
                Format::Yaml => print!("{}", serde_yaml_ng::to_string(&outcomes)?),
                Format::Csv => write_csv(&outcomes, io::stdout().lock())?,
            }
        }
        Command::Summary { report } => {
            let outcome = runner.run(report.into())?;
            println!("{}", format_summary(&outcome.result, &runner.layout().periods));
        }
        Command::Export { output } => {
            let outcomes = runner.run_all()?;
            export_xlsx(&outcomes, &runner.layout().periods, &output)
                .with_context(|| format!("Failed to export {}", output.display()))?;
            println!(
                "  {} exported {} reports to {}",
                "✓".green(),
                outcomes.len(),
                output.display()
            );
        }
        Command::Layout => {}
    }

    Ok(())
}

fn print_outcomes(runner: &ReportRunner, outcomes: &[ReportOutcome]) {
    let periods = &runner.layout().periods;

    println!("{}", "statement-kpis".bold());
    println!("  Workbook: {}", runner.workbook().display());
    println!("  Periods: {} vs {}", periods.current, periods.prior);

    for outcome in outcomes {
        println!();
        println!("{}", "═".repeat(60));
        println!("{}", outcome.kind.title().bold());
        println!("{}", "═".repeat(60));

        if !outcome.ratios.is_empty() {
            println!();
            println!("{}", "Financial KPIs".cyan());
            print!("{}", render_ratios(&outcome.ratios));
        }

        println!();
        println!("{}", "KPI Summary Table".cyan());
        print!("{}", render_table(&outcome.result, periods));

        println!();
        println!("{}", "Quick View".cyan());
        print!("{}", render_cards(&outcome.result));
    }
}
