use anyhow::Result;
use log::info;
use sales_report::{
    cli::{Cli, Commands},
    db::SalesDb,
    init_logging,
    pipeline::{describe, run_all, run_analyze, run_clean, run_import},
    AnalysisSummary, Config, LogUi, UiApp,
};
use std::time::Instant;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse_args();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            output,
            db,
            analyze,
        } => {
            let start = Instant::now();
            db.apply(&mut config);
            analyze.apply(&mut config);
            config.validate()?;
            let output = output.unwrap_or_else(|| config.cleaned_csv_for(&input));

            let summary = if analyze.tui {
                let mut ui = UiApp::new()?;
                let result = run_all(&input, &output, &config, &mut ui);
                close_dashboard(ui, result)?
            } else {
                run_all(&input, &output, &config, &mut LogUi::new())?
            };

            info!(
                "Finished {:?} -> {:?} ({}) in {:.1}s",
                input,
                config.database,
                summary.headline(),
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Clean { input, output } => {
            let output = output.unwrap_or_else(|| config.cleaned_csv_for(&input));
            let outcome = run_clean(&input, &output, &mut LogUi::new())?;
            println!("{} rows written to {:?}", outcome.summary.rows, outcome.output);
        }

        Commands::Import { csv, db } => {
            let start = Instant::now();
            db.apply(&mut config);

            let mut sales = SalesDb::open(&config.database)?;
            let rows = run_import(&csv, &mut sales, &mut LogUi::new())?;
            sales.finalize()?;

            println!(
                "Imported {} rows into {:?} in {:.1}s",
                rows,
                config.database,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Analyze { db, analyze } => {
            let start = Instant::now();
            db.apply(&mut config);
            analyze.apply(&mut config);
            config.validate()?;

            let mut sales = SalesDb::open(&config.database)?;
            let summary = if analyze.tui {
                let mut ui = UiApp::new()?;
                let result = run_analyze(&mut sales, &config, &mut ui);
                close_dashboard(ui, result)?
            } else {
                run_analyze(&mut sales, &config, &mut LogUi::new())?
            };
            sales.finalize()?;

            info!("{} in {:.1}s", summary.headline(), start.elapsed().as_secs_f64());
        }

        Commands::Describe { db } => {
            db.apply(&mut config);
            let sales = SalesDb::open(&config.database)?;
            describe(&sales, &mut LogUi::new())?;
        }
    }

    Ok(())
}

/// Leave the dashboard up until a key press on success, tear it down on error
fn close_dashboard(ui: UiApp, result: Result<AnalysisSummary>) -> Result<AnalysisSummary> {
    match result {
        Ok(summary) => {
            ui.finish(&summary.headline())?;
            Ok(summary)
        }
        Err(e) => {
            ui.restore()?;
            Err(e)
        }
    }
}
