use tracing::{info, warn};

use super::amortization;
use super::cash::simulate_cash_purchase;
use super::comparison::compare;
use super::error::{EngineError, EngineResult};
use super::financed::simulate_financed_purchase;
use super::projection::project;
use super::types::{ComparisonReport, FinancedOutcome, SimulationParameters};

/// Runs both strategies for one parameter set and orders their completion months.
///
/// Financing that does not apply (cash already covers the price) or whose first
/// installment exceeds the first month's savings is reported in the financed
/// outcome rather than failing the run.
pub fn run_comparison(params: &SimulationParameters) -> EngineResult<ComparisonReport> {
    params.validate()?;

    let monthly_capacity = project(
        params.initial_monthly_saving,
        params.monthly_inflation_rate,
        params.horizon_months,
    )?;
    let rent = project(
        params.current_rent,
        params.monthly_inflation_rate,
        params.horizon_months,
    )?;

    let cash = simulate_cash_purchase(params, &monthly_capacity)?;
    let financed = run_financed(params, &monthly_capacity, &rent)?;
    let comparison = compare(cash.purchase_month, financed.completion_month());

    info!(
        target: "engine.compare",
        horizon_months = params.horizon_months,
        cash_month = ?comparison.cash_completion_month,
        financed_month = ?comparison.financed_completion_month,
        verdict = ?comparison.verdict,
        "comparison finished"
    );

    Ok(ComparisonReport {
        monthly_capacity,
        rent,
        cash,
        financed,
        comparison,
    })
}

fn run_financed(
    params: &SimulationParameters,
    capacity: &[f64],
    rent: &[f64],
) -> EngineResult<FinancedOutcome> {
    let schedule = match amortization::compute(
        params.principal(),
        params.monthly_loan_rate,
        params.number_of_installments,
    ) {
        Ok(schedule) => schedule,
        Err(EngineError::FinancingNotApplicable { principal }) => {
            return Ok(FinancedOutcome::NotApplicable { principal });
        }
        Err(err) => return Err(err),
    };

    match simulate_financed_purchase(params, &schedule, capacity, rent) {
        Ok(trajectory) => Ok(FinancedOutcome::Simulated(trajectory)),
        Err(EngineError::InsufficientFinancingCapacity {
            first_installment,
            capacity,
        }) => {
            warn!(
                target: "engine.financed",
                first_installment,
                capacity,
                "first installment exceeds savings capacity"
            );
            Ok(FinancedOutcome::Infeasible {
                first_installment_value: first_installment,
                capacity,
            })
        }
        Err(err) => Err(err),
    }
}
