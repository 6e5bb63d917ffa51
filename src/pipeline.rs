//! The stages of a run, in order: clean, import, transform, query, render.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db::SalesDb;
use crate::loader::{
    clean_sheet, read_sheet, verify_cleaned_csv, write_cleaned_csv, CleanOptions, CleanReport,
    CleanedSummary,
};
use crate::query::{
    alter_order_date_type, create_yearly_view, growth_rates, profit_by_subcategory,
    substitute_states, top_product_per_region, yearly_line_items, GrowthRateRow, ProfitRow,
    TopProductRow, YearlyLineItems,
};
use crate::report::{
    columns_table, export_results, growth_table, line_items_table, profit_table, render_charts,
    top_products_table,
};
use crate::schema::ColumnInfo;
use crate::ui::{Phase, Ui};

/// Result of the cleaning stage
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub output: PathBuf,
    pub report: CleanReport,
    pub summary: CleanedSummary,
}

/// Everything the analysis stage computed
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    /// True when this run changed the order date column to DATE
    pub date_type_changed: bool,
    pub states_renamed: usize,
    pub columns: Vec<ColumnInfo>,
    pub line_items: Vec<YearlyLineItems>,
    pub growth: Vec<GrowthRateRow>,
    pub profit: Vec<ProfitRow>,
    pub top_products: Vec<TopProductRow>,
    pub charts: Vec<PathBuf>,
    pub exports: Vec<PathBuf>,
}

impl AnalysisSummary {
    pub fn headline(&self) -> String {
        format!(
            "{} growth rows, {} profit rows, {} regions, {} charts",
            self.growth.len(),
            self.profit.len(),
            self.top_products.len(),
            self.charts.len()
        )
    }
}

/// Read the spreadsheet, clean it and write the pipe-delimited CSV
pub fn run_clean(input: &Path, output: &Path, ui: &mut impl Ui) -> Result<CleanOutcome> {
    ui.set_phase(Phase::Cleaning);
    ui.set_info(format!("{:?}", input));

    let mut sheet = read_sheet(input)?;
    ui.log(format!(
        "Read {} rows x {} columns from {:?}",
        sheet.len(),
        sheet.headers.len(),
        input
    ));

    let report = clean_sheet(&mut sheet, &CleanOptions::default())
        .with_context(|| format!("Failed to clean {:?}", input))?;
    ui.log(format!(
        "Stripped non-ASCII characters from {} product names; {} dates parsed, {} empty",
        report.text_cells_changed, report.dates_parsed, report.dates_empty
    ));

    let written = write_cleaned_csv(&sheet, output)?;
    let summary = verify_cleaned_csv(output, written)?;
    ui.log(format!(
        "Wrote {} rows to {:?} ({} states, {} regions)",
        written, output, summary.states, summary.regions
    ));
    if let (Some(first), Some(last)) = (summary.first_order, summary.last_order) {
        ui.log(format!("Orders from {} to {}", first, last));
    }

    Ok(CleanOutcome {
        output: output.to_path_buf(),
        report,
        summary,
    })
}

/// Load the cleaned CSV into the sales table
pub fn run_import(csv: &Path, db: &mut SalesDb, ui: &mut impl Ui) -> Result<u64> {
    ui.set_phase(Phase::Importing);
    ui.set_info(format!("{:?}", csv));
    db.import_csv(csv, ui)
}

/// Print the table layout and the order lines per year
pub fn describe(db: &SalesDb, ui: &mut impl Ui) -> Result<(Vec<ColumnInfo>, Vec<YearlyLineItems>)> {
    db.require_sales_table()?;
    let columns = db.columns()?;
    ui.show_table(columns_table(&columns));
    let line_items = yearly_line_items(db.conn())?;
    ui.show_table(line_items_table(&line_items));
    Ok((columns, line_items))
}

/// Fix up the sales table, run the analysis queries and render the charts
pub fn run_analyze(db: &mut SalesDb, config: &Config, ui: &mut impl Ui) -> Result<AnalysisSummary> {
    config.validate()?;
    let window = config.window();

    ui.set_phase(Phase::Transforming);
    ui.set_info(format!("Analysis window {}", window));
    db.require_sales_table()?;

    let date_type_changed = alter_order_date_type(db.conn_mut())?;
    if date_type_changed {
        ui.log("Changed 'Order Date' to DATE");
    }
    let (columns, line_items) = describe(db, ui)?;

    let states_renamed = substitute_states(db.conn_mut(), &config.state_names)?;
    ui.log(format!("Replaced state abbreviations in {} rows", states_renamed));

    create_yearly_view(db.conn(), window)?;

    ui.set_phase(Phase::Querying);
    let growth = growth_rates(db.conn())?;
    ui.show_table(growth_table(&growth));

    let profit = profit_by_subcategory(db.conn(), window)?;
    ui.show_table(profit_table(&profit));

    let top_products = top_product_per_region(db.conn(), window)?;
    ui.show_table(top_products_table(&top_products));

    ui.set_phase(Phase::Rendering);
    let charts = render_charts(&config.chart_dir, &profit, &top_products, config.top_n, window)?;
    for chart in &charts {
        ui.log(format!("Wrote {:?}", chart));
    }

    let exports = match &config.report_dir {
        Some(dir) => export_results(dir, &growth, &profit, &top_products)?,
        None => Vec::new(),
    };
    for export in &exports {
        ui.log(format!("Wrote {:?}", export));
    }

    Ok(AnalysisSummary {
        date_type_changed,
        states_renamed,
        columns,
        line_items,
        growth,
        profit,
        top_products,
        charts,
        exports,
    })
}

/// Every stage against one database handle
pub fn run_all(
    input: &Path,
    output: &Path,
    config: &Config,
    ui: &mut impl Ui,
) -> Result<AnalysisSummary> {
    let cleaned = run_clean(input, output, ui)?;

    let mut db = SalesDb::open(&config.database)?;
    run_import(&cleaned.output, &mut db, ui)?;
    let summary = run_analyze(&mut db, config, ui)?;
    db.finalize()?;

    Ok(summary)
}
