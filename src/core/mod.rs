mod amortization;
mod cash;
mod comparison;
mod engine;
mod error;
mod financed;
mod projection;
mod retirement;
mod types;

pub use amortization::compute as compute_amortization;
pub use cash::simulate_cash_purchase;
pub use comparison::compare;
pub use engine::run_comparison;
pub use error::{EngineError, EngineResult};
pub use financed::{PAYOFF_EPSILON, simulate_financed_purchase};
pub use projection::project;
pub use retirement::{
    MAX_YEARS_TO_RETIRE, RetirementPlan, SAVINGS_RATE_CURVE_MONTHS, SavingsRatePoint, required_monthly_savings,
    required_savings_grid, savings_rate_curve, savings_rate_to_retire,
};
pub use types::{
    AmortizationSchedule, CashTrajectory, ComparisonReport, ComparisonResult,
    FinancedOutcome, FinancedTrajectory, InstallmentGrowthPolicy, MAX_HORIZON_MONTHS,
    MAX_INSTALLMENTS, SimulationParameters, Verdict,
};
