use serde::Serialize;
use thiserror::Error;

/// Longest horizon `project` accepts.
pub const MAX_YEARS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationInputs {
    pub principal: f64,
    pub stock_price: f64,
    /// Starting annual yield in percent (4.5 means 4.5%).
    pub base_dividend_yield: f64,
    pub extra_annual_contribution: f64,
    /// Percentage points added to the yield per year, ramped monthly.
    pub dividend_growth_rate_per_year: f64,
    /// Percent growth applied to share valuation per year, ramped monthly.
    pub price_appreciation_rate_per_year: f64,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlySnapshot {
    pub year: u32,
    pub cumulative_contributions: f64,
    pub cumulative_dividends: f64,
    pub ending_balance: f64,
    pub total_return_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickEstimate {
    pub share_count: u64,
    pub per_share_annual_dividend: f64,
    pub yearly_gain: f64,
    pub monthly_gain: f64,
    pub quarterly_gain: f64,
    pub drip_eligible: bool,
    pub drip_multiple: i64,
    pub quarterly_drip_eligible: bool,
    pub quarterly_drip_multiple: i64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("numeric overflow in month {month}: simulation produced a non-finite value")]
    NumericOverflow { month: u32 },
}

impl ProjectionError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ProjectionError::InvalidInput(msg.into())
    }
}
