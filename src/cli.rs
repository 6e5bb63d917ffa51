use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "sales-report")]
#[command(version, about = "Clean retail sales data, load it into SQLite and chart profit and growth")]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true, env = "SALES_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DbArgs {
    /// SQLite database path
    #[arg(short, long, env = "SALES_DATABASE")]
    pub database: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Directory for the rendered charts
    #[arg(long, env = "SALES_CHART_DIR")]
    pub chart_dir: Option<PathBuf>,

    /// Also write query results as CSV into this directory
    #[arg(long, env = "SALES_REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    /// First order year of the analysis window
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Last order year of the analysis window
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Sub-categories per region in the profit charts
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Show a full-screen dashboard instead of log output
    #[arg(long)]
    pub tui: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean, import and analyze in one go
    Run {
        /// Sales spreadsheet (.xlsx, .xls, .ods or .csv)
        input: PathBuf,

        /// Cleaned CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        analyze: AnalyzeArgs,
    },

    /// Clean a spreadsheet into a pipe-delimited CSV
    Clean {
        /// Sales spreadsheet (.xlsx, .xls, .ods or .csv)
        input: PathBuf,

        /// Cleaned CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a cleaned CSV into the sales table
    Import {
        /// Cleaned, pipe-delimited CSV
        csv: PathBuf,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Fix up the sales table, run the analysis queries and render charts
    Analyze {
        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        analyze: AnalyzeArgs,
    },

    /// Show the sales table columns and order lines per year
    Describe {
        #[command(flatten)]
        db: DbArgs,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

impl DbArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
    }
}

impl AnalyzeArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.chart_dir {
            config.chart_dir = dir.clone();
        }
        if let Some(dir) = &self.report_dir {
            config.report_dir = Some(dir.clone());
        }
        if let Some(year) = self.start_year {
            config.start_year = year;
        }
        if let Some(year) = self.end_year {
            config.end_year = year;
        }
        if let Some(n) = self.top_n {
            config.top_n = n;
        }
    }
}
