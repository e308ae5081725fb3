use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use divcalc::cli::{Cli, Command, OutputFormat, build_estimate, build_inputs};
use divcalc::core::{project, quick_estimate};
use divcalc::report::{COLUMNS, drip_label, format_currency, render_csv, rows_from_snapshots};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Serve(args) => divcalc::api::run_http_server(args)
            .await
            .map_err(|e| e.to_string()),
        Command::Project(args) => run_project(&args),
        Command::Estimate(args) => run_estimate(&args),
    };

    if let Err(e) = outcome {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run_project(args: &divcalc::cli::ProjectArgs) -> Result<(), String> {
    let inputs = build_inputs(args)?;
    let snapshots = project(&inputs).map_err(|e| e.to_string())?;
    let rows = rows_from_snapshots(&snapshots);

    match args.format {
        OutputFormat::Csv => {
            let bytes = render_csv(&rows).map_err(|e| e.to_string())?;
            print!("{}", String::from_utf8_lossy(&bytes));
        }
        OutputFormat::Table => {
            println!(
                "{} years compound at {:.2}% yield",
                inputs.years, inputs.base_dividend_yield
            );
            println!(
                "{:>6} {:>18} {:>18} {:>18} {:>12}",
                COLUMNS[0], COLUMNS[1], COLUMNS[2], COLUMNS[3], COLUMNS[4]
            );
            for row in &rows {
                println!(
                    "{:>6} {:>18} {:>18} {:>18} {:>12}",
                    row.year, row.contributions, row.profits, row.balance, row.intret
                );
            }
        }
    }
    Ok(())
}

fn run_estimate(args: &divcalc::cli::EstimateArgs) -> Result<(), String> {
    let inputs = build_estimate(args)?;
    let estimate = quick_estimate(inputs.principal, inputs.price, inputs.true_yield)
        .map_err(|e| e.to_string())?;

    println!("True yield:        {:.2}%", inputs.true_yield);
    println!("Shares:            {}", estimate.share_count);
    println!(
        "Dividend / share:  {}",
        format_currency(estimate.per_share_annual_dividend)
    );
    println!("Yearly income:     {}", format_currency(estimate.yearly_gain));
    println!(
        "Monthly income:    {}  DRIP {}",
        format_currency(estimate.monthly_gain),
        drip_label(estimate.drip_eligible, estimate.drip_multiple)
    );
    println!(
        "Quarterly income:  {}  DRIP {}",
        format_currency(estimate.quarterly_gain),
        drip_label(
            estimate.quarterly_drip_eligible,
            estimate.quarterly_drip_multiple
        )
    );
    Ok(())
}
