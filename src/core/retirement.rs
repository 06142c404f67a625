use serde::Serialize;

use super::error::{
    EngineError, EngineResult, ensure_count, ensure_finite_result, ensure_non_negative,
};
use super::types::MAX_HORIZON_MONTHS;

/// Longest horizon scanned by [`savings_rate_curve`], in months.
pub const SAVINGS_RATE_CURVE_MONTHS: u32 = 50 * 12;
/// Upper bound on `years_to_retire`, matching the simulation horizon cap.
pub const MAX_YEARS_TO_RETIRE: u32 = MAX_HORIZON_MONTHS / 12;

const GRID_BUY_POWER_STEP: u32 = 1_000;
const GRID_BUY_POWER_END: u32 = 50_000;
const GRID_YEARS: [u32; 5] = [5, 10, 15, 20, 25];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementPlan {
    pub wanted_buy_power: f64,
    pub years_to_retire: u32,
    /// Monthly amount to invest until retirement. Negative when the current
    /// capital already outgrows the target.
    pub monthly_savings: f64,
    /// Wanted buying power expressed in money of the retirement month.
    pub salary_at_retirement: f64,
    /// Capital whose real return pays `salary_at_retirement` every month.
    pub target_capital: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsRatePoint {
    pub months_to_retire: u32,
    pub savings_rate: f64,
}

fn ensure_spread(
    monthly_inflation_rate: f64,
    monthly_investment_return_rate: f64,
) -> EngineResult<()> {
    ensure_non_negative("monthly_inflation_rate", monthly_inflation_rate)?;
    ensure_non_negative(
        "monthly_investment_return_rate",
        monthly_investment_return_rate,
    )?;
    if monthly_investment_return_rate <= monthly_inflation_rate {
        return Err(EngineError::invalid(
            "monthly_investment_return_rate",
            "must exceed monthly_inflation_rate",
        ));
    }
    Ok(())
}

/// Monthly savings needed to live off the real return of the accumulated
/// capital after `years_to_retire`, keeping today's buying power.
pub fn required_monthly_savings(
    wanted_buy_power: f64,
    years_to_retire: u32,
    current_capital: f64,
    monthly_inflation_rate: f64,
    monthly_investment_return_rate: f64,
) -> EngineResult<RetirementPlan> {
    ensure_non_negative("wanted_buy_power", wanted_buy_power)?;
    ensure_non_negative("current_capital", current_capital)?;
    ensure_spread(monthly_inflation_rate, monthly_investment_return_rate)?;
    ensure_count("years_to_retire", years_to_retire, MAX_YEARS_TO_RETIRE)?;

    let months = f64::from(years_to_retire) * 12.0;
    let r = monthly_investment_return_rate;
    let i = monthly_inflation_rate;
    let salary_at_retirement = ensure_finite_result(
        "salary_at_retirement",
        wanted_buy_power * (1.0 + i).powf(months),
    )?;
    let target_capital = ensure_finite_result("target_capital", salary_at_retirement / (r - i))?;
    let grown = (1.0 + r).powf(months);
    let monthly_savings = ensure_finite_result(
        "monthly_savings",
        r * (target_capital - current_capital * grown) / (grown - 1.0),
    )?;

    Ok(RetirementPlan {
        wanted_buy_power,
        years_to_retire,
        monthly_savings,
        salary_at_retirement,
        target_capital,
    })
}

pub fn required_savings_grid(
    current_capital: f64,
    monthly_inflation_rate: f64,
    monthly_investment_return_rate: f64,
) -> EngineResult<Vec<RetirementPlan>> {
    let mut plans = Vec::new();
    for buy_power in (GRID_BUY_POWER_STEP..GRID_BUY_POWER_END).step_by(GRID_BUY_POWER_STEP as usize)
    {
        for years in GRID_YEARS {
            plans.push(required_monthly_savings(
                f64::from(buy_power),
                years,
                current_capital,
                monthly_inflation_rate,
                monthly_investment_return_rate,
            )?);
        }
    }
    Ok(plans)
}

/// Required monthly savings as a fraction of the wanted monthly buying power,
/// starting from no capital.
pub fn savings_rate_to_retire(
    months_to_retire: u32,
    monthly_inflation_rate: f64,
    monthly_investment_return_rate: f64,
    savings_grow_with_inflation: bool,
) -> EngineResult<f64> {
    ensure_spread(monthly_inflation_rate, monthly_investment_return_rate)?;
    ensure_count("months_to_retire", months_to_retire, MAX_HORIZON_MONTHS)?;

    let m = f64::from(months_to_retire);
    let r = monthly_investment_return_rate;
    let i = monthly_inflation_rate;
    let accumulation = if savings_grow_with_inflation {
        ((1.0 + r).powf(m + 1.0) - (1.0 + i).powf(m + 1.0)) / (r - i)
    } else {
        ((1.0 + r).powf(m) - 1.0) / r
    };
    ensure_finite_result("savings_rate", (1.0 + i).powf(m) / (r - i) / accumulation)
}

/// Savings rates from the longest horizon downwards, stopping once saving the
/// whole buying power would not be enough.
pub fn savings_rate_curve(
    monthly_inflation_rate: f64,
    monthly_investment_return_rate: f64,
    savings_grow_with_inflation: bool,
) -> EngineResult<Vec<SavingsRatePoint>> {
    let mut points = Vec::new();
    for months_to_retire in (1..=SAVINGS_RATE_CURVE_MONTHS).rev() {
        let savings_rate = savings_rate_to_retire(
            months_to_retire,
            monthly_inflation_rate,
            monthly_investment_return_rate,
            savings_grow_with_inflation,
        )?;
        if savings_rate > 1.0 {
            break;
        }
        points.push(SavingsRatePoint {
            months_to_retire,
            savings_rate,
        });
    }
    Ok(points)
}
