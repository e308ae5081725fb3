use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::{MAX_YEARS, SimulationInputs, true_yield};
use crate::gateway::{DEFAULT_UPSTREAM_URL, UpstreamConfig};

#[derive(Parser, Debug)]
#[command(
    name = "divcalc",
    about = "Dividend income calculator (quick estimate + compounding projection + web UI)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the web front-end, GraphQL proxy and report endpoints
    Serve(ServeArgs),
    /// Print a multi-year compounding projection
    Project(ProjectArgs),
    /// Print the one-shot yearly/monthly/quarterly income estimate
    Estimate(EstimateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,
    #[arg(long, env = "API_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub api_url: String,
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    #[arg(long, env = "API_HOST")]
    pub api_host: Option<String>,
    #[arg(
        long,
        env = "UPSTREAM_TIMEOUT_SECS",
        default_value_t = 15,
        help = "Timeout for upstream GraphQL requests in seconds"
    )]
    pub upstream_timeout_secs: u64,
}

impl ServeArgs {
    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            api_host: self.api_host.clone(),
            timeout: Duration::from_secs(self.upstream_timeout_secs.max(1)),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub principal: f64,
    #[arg(long)]
    pub stock_price: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Gross annual dividend yield in percent, e.g. 4.5"
    )]
    pub dividend_yield: f64,
    #[arg(
        long,
        help = "Fund expense ratio in percent, subtracted from the dividend yield"
    )]
    pub expense_ratio: Option<f64>,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Extra contribution per year, spread evenly over the months"
    )]
    pub extra_contribution: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Yield increase in percentage points per year"
    )]
    pub dividend_growth: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Share price appreciation in percent per year"
    )]
    pub price_appreciation: f64,
    #[arg(long, default_value_t = 1, help = "Compounding years")]
    pub years: u32,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct EstimateArgs {
    #[arg(long)]
    pub principal: f64,
    #[arg(long)]
    pub price: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Gross annual dividend yield in percent, e.g. 4.5"
    )]
    pub dividend_yield: f64,
    #[arg(
        long,
        help = "Fund expense ratio in percent, subtracted from the dividend yield"
    )]
    pub expense_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateInputs {
    pub principal: f64,
    pub price: f64,
    pub true_yield: f64,
}

pub fn build_inputs(args: &ProjectArgs) -> Result<SimulationInputs, String> {
    for (flag, value) in [
        ("--principal", args.principal),
        ("--stock-price", args.stock_price),
        ("--dividend-yield", args.dividend_yield),
        ("--extra-contribution", args.extra_contribution),
        ("--dividend-growth", args.dividend_growth),
        ("--price-appreciation", args.price_appreciation),
    ] {
        if !value.is_finite() {
            return Err(format!("{flag} must be a finite number"));
        }
    }

    if args.stock_price <= 0.0 {
        return Err("--stock-price must be > 0".to_string());
    }

    if args.years == 0 || args.years > MAX_YEARS {
        return Err(format!("--years must be between 1 and {MAX_YEARS}"));
    }

    if args.extra_contribution < 0.0 {
        return Err("--extra-contribution must be >= 0".to_string());
    }

    let expense_ratio = checked_expense_ratio(args.expense_ratio)?;

    Ok(SimulationInputs {
        principal: args.principal,
        stock_price: args.stock_price,
        base_dividend_yield: true_yield(args.dividend_yield, expense_ratio),
        extra_annual_contribution: args.extra_contribution,
        dividend_growth_rate_per_year: args.dividend_growth,
        price_appreciation_rate_per_year: args.price_appreciation,
        years: args.years,
    })
}

pub fn build_estimate(args: &EstimateArgs) -> Result<EstimateInputs, String> {
    for (flag, value) in [
        ("--principal", args.principal),
        ("--price", args.price),
        ("--dividend-yield", args.dividend_yield),
    ] {
        if !value.is_finite() {
            return Err(format!("{flag} must be a finite number"));
        }
    }

    if args.price <= 0.0 {
        return Err("--price must be > 0".to_string());
    }

    if args.principal < 0.0 {
        return Err("--principal must be >= 0".to_string());
    }

    let expense_ratio = checked_expense_ratio(args.expense_ratio)?;

    Ok(EstimateInputs {
        principal: args.principal,
        price: args.price,
        true_yield: true_yield(args.dividend_yield, expense_ratio),
    })
}

fn checked_expense_ratio(expense_ratio: Option<f64>) -> Result<Option<f64>, String> {
    match expense_ratio {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err("--expense-ratio must be a finite number >= 0".to_string())
        }
        other => Ok(other),
    }
}
