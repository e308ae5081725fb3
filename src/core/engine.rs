use super::types::{MAX_YEARS, ProjectionError, QuickEstimate, SimulationInputs, YearlySnapshot};

const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug)]
struct Ledger {
    balance: f64,
    cumulative_dividends: f64,
    cumulative_contributions: f64,
    dividend_yield_offset: f64,
    price_appreciation_offset: f64,
}

impl Ledger {
    fn is_finite(&self) -> bool {
        self.balance.is_finite()
            && self.cumulative_dividends.is_finite()
            && self.cumulative_contributions.is_finite()
            && self.dividend_yield_offset.is_finite()
            && self.price_appreciation_offset.is_finite()
    }
}

/// Runs the month-by-month compounding projection and returns one snapshot per year.
///
/// Dividends are reinvested every month, the extra annual contribution is spread evenly
/// over the months, and both the yield and the notional share valuation ramp linearly by
/// `rate / 12` after each month. The run either yields exactly `inputs.years` snapshots
/// or fails as a whole.
pub fn project(inputs: &SimulationInputs) -> Result<Vec<YearlySnapshot>, ProjectionError> {
    validate_inputs(inputs)?;

    let total_months = inputs.years * MONTHS_PER_YEAR;
    let monthly_contribution = inputs.extra_annual_contribution / MONTHS_PER_YEAR as f64;
    let monthly_yield_step = inputs.dividend_growth_rate_per_year / MONTHS_PER_YEAR as f64;
    let monthly_appreciation_step =
        inputs.price_appreciation_rate_per_year / MONTHS_PER_YEAR as f64;

    let mut snapshots = vec![YearlySnapshot::default(); inputs.years as usize];
    let mut ledger = Ledger {
        balance: inputs.principal,
        cumulative_dividends: 0.0,
        cumulative_contributions: 0.0,
        dividend_yield_offset: 0.0,
        price_appreciation_offset: 0.0,
    };

    for month in 1..=total_months {
        let shares = ledger.balance * (1.0 + ledger.price_appreciation_offset / 100.0)
            / inputs.stock_price;
        let effective_yield = (inputs.base_dividend_yield + ledger.dividend_yield_offset) / 100.0;
        let monthly_dividend =
            shares * inputs.stock_price * effective_yield / MONTHS_PER_YEAR as f64;

        ledger.cumulative_dividends += monthly_dividend;
        ledger.balance += monthly_dividend + monthly_contribution;

        ledger.dividend_yield_offset += monthly_yield_step;
        ledger.price_appreciation_offset += monthly_appreciation_step;

        ledger.cumulative_contributions += if month == 1 {
            inputs.principal + monthly_contribution
        } else {
            monthly_contribution
        };

        if !ledger.is_finite() {
            return Err(ProjectionError::NumericOverflow { month });
        }

        if month % MONTHS_PER_YEAR == 0 {
            let year = month / MONTHS_PER_YEAR;
            let total_return_percent = total_return_percent(&ledger, year)?;
            if !total_return_percent.is_finite() {
                return Err(ProjectionError::NumericOverflow { month });
            }
            snapshots[(year - 1) as usize] = YearlySnapshot {
                year,
                cumulative_contributions: ledger.cumulative_contributions,
                cumulative_dividends: ledger.cumulative_dividends,
                ending_balance: ledger.balance,
                total_return_percent,
            };
        }
    }

    Ok(snapshots)
}

/// One-shot, non-compounding income estimate for `principal` invested at `price`.
///
/// `true_yield` is a percentage and should already be net of any expense ratio.
pub fn quick_estimate(
    principal: f64,
    price: f64,
    true_yield: f64,
) -> Result<QuickEstimate, ProjectionError> {
    for (name, value) in [
        ("principal", principal),
        ("price", price),
        ("yield", true_yield),
    ] {
        if !value.is_finite() {
            return Err(ProjectionError::invalid(format!("{name} must be a finite number")));
        }
    }
    if price <= 0.0 {
        return Err(ProjectionError::invalid("price must be > 0"));
    }
    if principal < 0.0 {
        return Err(ProjectionError::invalid("principal must be >= 0"));
    }

    let share_count = whole_count(principal / price, "share count")?;
    let per_share_annual_dividend = price * true_yield / 100.0;
    let yearly_gain = share_count * per_share_annual_dividend;
    let monthly_gain = yearly_gain / 12.0;
    let quarterly_gain = yearly_gain / 4.0;
    let drip_multiple = whole_count(monthly_gain / price, "DRIP multiple")?;
    let quarterly_drip_multiple =
        whole_count(monthly_gain * 4.0 / price, "quarterly DRIP multiple")?;

    Ok(QuickEstimate {
        share_count: share_count as u64,
        per_share_annual_dividend,
        yearly_gain,
        monthly_gain,
        quarterly_gain,
        drip_eligible: monthly_gain >= price,
        drip_multiple: drip_multiple as i64,
        quarterly_drip_eligible: monthly_gain * 4.0 >= price,
        quarterly_drip_multiple: quarterly_drip_multiple as i64,
    })
}

/// Largest whole number an `f64` still represents exactly (2^53).
const MAX_EXACT_COUNT: f64 = 9_007_199_254_740_992.0;

/// Floors `value`, rejecting counts the integer fields cannot hold exactly.
fn whole_count(value: f64, what: &str) -> Result<f64, ProjectionError> {
    let floored = value.floor();
    if !floored.is_finite() || floored.abs() > MAX_EXACT_COUNT {
        return Err(ProjectionError::invalid(format!(
            "{what} is too large to count exactly"
        )));
    }
    Ok(floored)
}

/// Dividend yield net of the fund's expense ratio, both in percent.
///
/// Subtracts in hundredths so `4.5 - 0.06` comes out as `4.44`.
pub fn true_yield(gross_yield: f64, expense_ratio: Option<f64>) -> f64 {
    match expense_ratio {
        Some(expense) => (gross_yield * 100.0 - expense * 100.0) / 100.0,
        None => gross_yield,
    }
}

/// Parses a percentage string such as `"4.50%"` or `"4.5"`.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn total_return_percent(ledger: &Ledger, year: u32) -> Result<f64, ProjectionError> {
    if ledger.cumulative_contributions == 0.0 {
        return Err(ProjectionError::invalid(format!(
            "cumulative contributions are zero in year {year}; total return is undefined"
        )));
    }
    Ok((ledger.balance - ledger.cumulative_contributions) / ledger.cumulative_contributions
        * 100.0)
}

fn validate_inputs(inputs: &SimulationInputs) -> Result<(), ProjectionError> {
    for (name, value) in [
        ("principal", inputs.principal),
        ("stock_price", inputs.stock_price),
        ("base_dividend_yield", inputs.base_dividend_yield),
        ("extra_annual_contribution", inputs.extra_annual_contribution),
        (
            "dividend_growth_rate_per_year",
            inputs.dividend_growth_rate_per_year,
        ),
        (
            "price_appreciation_rate_per_year",
            inputs.price_appreciation_rate_per_year,
        ),
    ] {
        if !value.is_finite() {
            return Err(ProjectionError::invalid(format!("{name} must be a finite number")));
        }
    }

    if inputs.stock_price <= 0.0 {
        return Err(ProjectionError::invalid("stock_price must be > 0"));
    }
    if inputs.years == 0 {
        return Err(ProjectionError::invalid("years must be > 0"));
    }
    if inputs.years > MAX_YEARS {
        return Err(ProjectionError::invalid(format!(
            "years must be <= {MAX_YEARS}"
        )));
    }
    if inputs.extra_annual_contribution < 0.0 {
        return Err(ProjectionError::invalid(
            "extra_annual_contribution must be >= 0",
        ));
    }
    if inputs.principal == 0.0 && inputs.extra_annual_contribution == 0.0 {
        return Err(ProjectionError::invalid(
            "principal and extra_annual_contribution are both zero; there is nothing to compound",
        ));
    }
    Ok(())
}
