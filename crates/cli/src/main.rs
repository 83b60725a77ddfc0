//! CLI tool for syncing numbers in PowerPoint files with spreadsheet values.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use decksync_core::{extract_runs, run_locations, UpdateReport, ValueMap};
use decksync_pptx::PptxParser;
use decksync_sheet::SheetReader;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Update numbers in a PowerPoint deck from an Excel/CSV file.
#[derive(Parser, Debug)]
#[command(name = "deck-sync")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value mapping extracted from a spreadsheet as JSON
    Values {
        /// Spreadsheet file (.xlsx, .xlsm, .xlsb, .xls, .ods or .csv)
        sheet: PathBuf,

        #[command(flatten)]
        sheet_options: SheetOptions,
    },

    /// Print the editable text runs of a presentation as JSON
    Runs {
        /// Presentation file (.pptx)
        pptx: PathBuf,

        /// List every run by slide/shape/paragraph/run index instead of by text
        #[arg(short, long)]
        structural: bool,

        #[command(flatten)]
        deck_options: DeckOptions,
    },

    /// Update numeric runs of a presentation from a spreadsheet
    Sync {
        /// Presentation file (.pptx)
        pptx: PathBuf,

        /// Spreadsheet file (.xlsx, .xlsm, .xlsb, .xls, .ods or .csv)
        sheet: PathBuf,

        /// Output file (default: updated_<name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the slide parts and the list of changed runs as JSON
        #[arg(short, long)]
        report: bool,

        #[command(flatten)]
        sheet_options: SheetOptions,

        #[command(flatten)]
        deck_options: DeckOptions,
    },
}

#[derive(ClapArgs, Debug)]
struct SheetOptions {
    /// Name columns by letter instead of reading names from the first row
    #[arg(long)]
    no_header: bool,
}

impl SheetOptions {
    fn reader(&self) -> SheetReader {
        SheetReader::new().with_header_row(!self.no_header)
    }
}

#[derive(ClapArgs, Debug)]
struct DeckOptions {
    /// Also visit shapes nested inside group shapes
    #[arg(long)]
    grouped: bool,
}

impl DeckOptions {
    fn parser(&self) -> PptxParser {
        PptxParser::new().with_grouped_shapes(self.grouped)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &args.command {
        Command::Values { sheet, sheet_options } => {
            let values = read_values(sheet, sheet_options)?;
            print_json(&values)
        }
        Command::Runs {
            pptx,
            structural,
            deck_options,
        } => {
            let document = deck_options
                .parser()
                .open(pptx)
                .with_context(|| format!("Failed to read {}", pptx.display()))?;
            if *structural {
                print_json(&run_locations(document.deck()))
            } else {
                print_json(&extract_runs(document.deck()))
            }
        }
        Command::Sync {
            pptx,
            sheet,
            output,
            report,
            sheet_options,
            deck_options,
        } => {
            // Both sources are read before anything is written.
            let values = read_values(sheet, sheet_options)?;
            let mut document = deck_options
                .parser()
                .open(pptx)
                .with_context(|| format!("Failed to read {}", pptx.display()))?;

            let output_path = match output {
                Some(path) => path.clone(),
                None => get_output_path(pptx),
            };

            let changes = document.apply(&values);
            document
                .save(&output_path)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;

            if args.verbose {
                eprintln!(
                    "  {} values, {} of {} runs changed",
                    values.len(),
                    changes.changed(),
                    changes.runs_visited
                );
            }
            if *report {
                print_json(&SyncReport {
                    output: &output_path,
                    slides: document.slide_paths().collect(),
                    update: &changes,
                })?;
            }
            println!("Updated PPT saved at {}", output_path.display());
            Ok(())
        }
    }
}

/// What `sync --report` prints.
#[derive(Serialize, Debug)]
struct SyncReport<'a> {
    output: &'a Path,
    /// Slide part names in presentation order; `changes[].path.slide` indexes this list.
    slides: Vec<&'a str>,
    #[serde(flatten)]
    update: &'a UpdateReport,
}

/// Read a spreadsheet into a value mapping.
fn read_values(path: &Path, options: &SheetOptions) -> Result<ValueMap> {
    options
        .reader()
        .extract(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Determine the default output path: `updated_<name>` beside the input.
fn get_output_path(input_path: &Path) -> PathBuf {
    let filename = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("presentation.pptx");

    let output_filename = format!("updated_{}", filename);
    match input_path.parent() {
        Some(parent) => parent.join(output_filename),
        None => PathBuf::from(output_filename),
    }
}

/// Print a value as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
