//! Pathfinder Reports - printable documents from registration CSV exports
//!
//! Each report subcommand reads one Planning Center CSV export and writes a
//! standalone HTML file. Open it in a browser and print (or print to PDF).

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pathfinder_reports::pipeline::{
    default_output_path, describe_layout, export_roster, write_document, DEFAULT_ROWS_PER_PAGE,
};
use pathfinder_reports::{ReportConfig, ReportKind, ReportWorkspace};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pathfinder-reports")]
#[command(about = "Generate printable Pathfinder reports from registration CSV exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ReportArgs {
    /// Input CSV file (registration export)
    #[arg(short, long)]
    input: PathBuf,

    /// Output HTML file (default: "<Report Name> - <date>.html" next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print date (YYYY-MM-DD), used in the title and page footers. Defaults to today.
    #[arg(long, env = "PATHFINDER_REPORT_DATE", value_parser = parse_date)]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct SheetArgs {
    /// Blank write-in rows after the last attendee of each group
    #[arg(long)]
    write_in_rows: Option<usize>,

    /// Rows per printed page (0 keeps each group on one page)
    #[arg(long, default_value_t = DEFAULT_ROWS_PER_PAGE)]
    rows_per_page: usize,

    /// Leave the shirt check box off the sheets
    #[arg(long)]
    no_shirt: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// One attendance sheet per grade/class
    AttendanceSheets {
        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        sheet: SheetArgs,

        /// Column to group by (default: Assignment Area, Grade, Group, then Club)
        #[arg(long)]
        group_column: Option<String>,
    },

    /// One attendance sheet per honor session
    HonorDay {
        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Honor day schedule cards, four per page
    StudentCards {
        #[command(flatten)]
        report: ReportArgs,

        /// Start each club's cards on a new page
        #[arg(long)]
        page_per_club: bool,
    },

    /// Show how the CSV columns were classified
    Inspect {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write the normalized roster (one row per honor) as CSV
    ExportRoster {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut workspace = ReportWorkspace::new();

    match cli.command {
        Commands::AttendanceSheets {
            report,
            sheet,
            group_column,
        } => {
            let mut config = report_config(ReportKind::AttendanceSheets, &report);
            apply_sheet_args(&mut config, &sheet);
            config.group_column = group_column;
            run_report(&mut workspace, &report, &config)?;
        }
        Commands::HonorDay { report, sheet } => {
            let mut config = report_config(ReportKind::HonorDay, &report);
            apply_sheet_args(&mut config, &sheet);
            run_report(&mut workspace, &report, &config)?;
        }
        Commands::StudentCards {
            report,
            page_per_club,
        } => {
            let mut config = report_config(ReportKind::StudentCards, &report);
            config.page_per_club = page_per_club;
            run_report(&mut workspace, &report, &config)?;
        }
        Commands::Inspect { input } => {
            let session = workspace.load(&input)?;
            print!("{}", describe_layout(session)?);
        }
        Commands::ExportRoster { input, output } => {
            let session = workspace.load(&input)?;
            let rows = export_roster(session.roster(), &output)?;
            eprintln!("Wrote {} rows to {}", rows, output.display());
        }
    }

    Ok(())
}

fn report_config(kind: ReportKind, args: &ReportArgs) -> ReportConfig {
    match args.date {
        Some(date) => ReportConfig::new(kind, date),
        None => ReportConfig::today(kind),
    }
}

fn apply_sheet_args(config: &mut ReportConfig, args: &SheetArgs) {
    if let Some(rows) = args.write_in_rows {
        config.write_in_rows = rows;
    }
    config.rows_per_page = args.rows_per_page;
    config.show_shirt = !args.no_shirt;
}

fn run_report(workspace: &mut ReportWorkspace, args: &ReportArgs, config: &ReportConfig) -> Result<()> {
    let session = workspace.load(&args.input)?;
    let document = session.generate(config)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, &document.title));
    write_document(&document, &output)?;
    eprintln!(
        "Done! {} ({} pages) -> {}",
        document.title,
        document.pages,
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rows_per_page_defaults_to_library_value() {
        let cli = Cli::try_parse_from(["pathfinder-reports", "honor-day", "-i", "export.csv"]).unwrap();
        let Commands::HonorDay { sheet, .. } = cli.command else {
            panic!("expected honor-day");
        };
        assert_eq!(sheet.rows_per_page, DEFAULT_ROWS_PER_PAGE);
        assert_eq!(sheet.write_in_rows, None);
    }
}
