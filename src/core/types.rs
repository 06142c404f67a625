use serde::Serialize;

use super::error::{EngineResult, ensure_count, ensure_non_negative};

/// Upper bound on simulated months per run.
pub const MAX_HORIZON_MONTHS: u32 = 1_200;
/// Upper bound on loan installments per run.
pub const MAX_INSTALLMENTS: u32 = 1_200;

/// How not-yet-paid installments grow with the loan rate each month.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallmentGrowthPolicy {
    /// Every remaining installment accrues one month of interest before payment.
    #[default]
    AllRemaining,
    /// Only the installment due this month accrues interest before payment.
    CurrentOnly,
}

/// Immutable input bundle for one comparison run. Rates are monthly fractions
/// (0.0041 means 0.41 % per month).
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub property_value: f64,
    pub available_cash: f64,
    pub initial_monthly_saving: f64,
    pub current_rent: f64,
    pub monthly_inflation_rate: f64,
    pub monthly_investment_return_rate: f64,
    pub monthly_property_appreciation_rate: f64,
    pub monthly_property_appreciation_rate_post_purchase: f64,
    pub horizon_months: u32,
    pub monthly_loan_rate: f64,
    pub number_of_installments: u32,
    pub months_to_stop_paying_rent: u32,
    pub installment_growth: InstallmentGrowthPolicy,
}

impl SimulationParameters {
    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [
            ("property_value", self.property_value),
            ("available_cash", self.available_cash),
            ("initial_monthly_saving", self.initial_monthly_saving),
            ("current_rent", self.current_rent),
            ("monthly_inflation_rate", self.monthly_inflation_rate),
            (
                "monthly_investment_return_rate",
                self.monthly_investment_return_rate,
            ),
            (
                "monthly_property_appreciation_rate",
                self.monthly_property_appreciation_rate,
            ),
            (
                "monthly_property_appreciation_rate_post_purchase",
                self.monthly_property_appreciation_rate_post_purchase,
            ),
            ("monthly_loan_rate", self.monthly_loan_rate),
        ] {
            ensure_non_negative(name, value)?;
        }

        ensure_count("horizon_months", self.horizon_months, MAX_HORIZON_MONTHS)?;
        ensure_count(
            "number_of_installments",
            self.number_of_installments,
            MAX_INSTALLMENTS,
        )?;
        Ok(())
    }

    /// Amount that has to be financed; non-positive when cash already covers the price.
    pub fn principal(&self) -> f64 {
        self.property_value - self.available_cash
    }
}

/// Month-indexed trajectory of the pay-in-full strategy. Index 0 is the
/// starting position, index `t` the state after month `t`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashTrajectory {
    pub savings: Vec<f64>,
    pub property_value: Vec<f64>,
    pub total_capital: Vec<f64>,
    pub purchase_month: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSchedule {
    pub principal: f64,
    pub monthly_rate: f64,
    pub first_installment_value: f64,
    /// Installment `k + 1` discounted back `k + 1` months at the loan rate.
    pub nominal_schedule: Vec<f64>,
}

impl AmortizationSchedule {
    pub fn number_of_installments(&self) -> usize {
        self.nominal_schedule.len()
    }
}

/// Month-indexed debt trajectory of the financed strategy.
/// `need_to_pay[0]` is the debt before the first month; `payments[t]` and
/// `interest_accrued[t]` describe month `t`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancedTrajectory {
    pub first_installment_value: f64,
    pub need_to_pay: Vec<f64>,
    pub payments: Vec<f64>,
    pub interest_accrued: Vec<f64>,
    pub payoff_month: Option<u32>,
    pub forgiven_residual: f64,
    pub final_carry: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "status",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum FinancedOutcome {
    NotApplicable { principal: f64 },
    Infeasible {
        first_installment_value: f64,
        capacity: f64,
    },
    Simulated(FinancedTrajectory),
}

impl FinancedOutcome {
    pub fn completion_month(&self) -> Option<u32> {
        match self {
            Self::Simulated(trajectory) => trajectory.payoff_month,
            Self::NotApplicable { .. } | Self::Infeasible { .. } => None,
        }
    }

    pub fn first_installment_value(&self) -> Option<f64> {
        match self {
            Self::Simulated(trajectory) => Some(trajectory.first_installment_value),
            Self::Infeasible {
                first_installment_value,
                ..
            } => Some(*first_installment_value),
            Self::NotApplicable { .. } => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    CashFaster,
    FinancedFaster,
    NeitherCompletes,
    OnlyCash,
    OnlyFinanced,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub cash_completion_month: Option<u32>,
    pub financed_completion_month: Option<u32>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub monthly_capacity: Vec<f64>,
    pub rent: Vec<f64>,
    pub cash: CashTrajectory,
    pub financed: FinancedOutcome,
    pub comparison: ComparisonResult,
}

#[cfg(test)]
pub(crate) fn reference_parameters() -> SimulationParameters {
    SimulationParameters {
        property_value: 300_000.0,
        available_cash: 100_000.0,
        initial_monthly_saving: 1_000.0,
        current_rent: 1_000.0,
        monthly_inflation_rate: 0.0041,
        monthly_investment_return_rate: 0.01,
        monthly_property_appreciation_rate: 0.008,
        monthly_property_appreciation_rate_post_purchase: 0.008,
        horizon_months: 120,
        monthly_loan_rate: 0.0091,
        number_of_installments: 120,
        months_to_stop_paying_rent: 12,
        installment_growth: InstallmentGrowthPolicy::AllRemaining,
    }
}
