use tracing::debug;

use super::error::{EngineError, EngineResult};
use super::types::{
    AmortizationSchedule, FinancedTrajectory, InstallmentGrowthPolicy, SimulationParameters,
};

/// Outstanding debt at or below this is treated as settled and forgiven.
pub const PAYOFF_EPSILON: f64 = 1e-6;

/// Remaining value of every future installment. A zero entry is settled and
/// never revisited. Owned by one simulation run.
#[derive(Debug)]
struct InstallmentLedger {
    entries: Vec<f64>,
}

impl InstallmentLedger {
    fn from_schedule(schedule: &AmortizationSchedule) -> Self {
        Self {
            entries: schedule.nominal_schedule.clone(),
        }
    }

    fn open_entries_from(&mut self, month: usize) -> impl DoubleEndedIterator<Item = &mut f64> {
        let start = month.min(self.entries.len());
        self.entries[start..].iter_mut().filter(|entry| **entry > 0.0)
    }

    /// Grows open installments by one month of interest and returns the increase.
    fn accrue(&mut self, month: usize, rate: f64, policy: InstallmentGrowthPolicy) -> f64 {
        let mut accrued = 0.0;
        match policy {
            InstallmentGrowthPolicy::AllRemaining => {
                for entry in self.open_entries_from(month) {
                    accrued += *entry * rate;
                    *entry *= 1.0 + rate;
                }
            }
            InstallmentGrowthPolicy::CurrentOnly => {
                if let Some(entry) = self.entries.get_mut(month).filter(|entry| **entry > 0.0) {
                    accrued = *entry * rate;
                    *entry *= 1.0 + rate;
                }
            }
        }
        accrued
    }

    /// The installment due this month is always paid in full.
    fn settle_due(&mut self, month: usize) -> f64 {
        self.entries
            .get_mut(month)
            .map(std::mem::take)
            .unwrap_or(0.0)
    }

    /// Extinguishes whole future installments, farthest first, while `cash`
    /// covers them. Installments larger than the remaining cash are skipped.
    fn cascade(&mut self, month: usize, cash: &mut f64) -> f64 {
        let mut paid = 0.0;
        for entry in self.open_entries_from(month).rev() {
            if *cash >= *entry {
                *cash -= *entry;
                paid += *entry;
                *entry = 0.0;
            }
        }
        paid
    }

    fn outstanding(&self) -> f64 {
        self.entries.iter().filter(|entry| **entry > 0.0).sum()
    }

    fn forgive(&mut self) -> f64 {
        let residual = self.outstanding();
        self.entries.iter_mut().for_each(|entry| *entry = 0.0);
        residual
    }
}

/// Pays the loan month by month from savings capacity, leftover cash and, once
/// rent stops, the freed rent. Leftover cash after the due installment is used
/// to retire the most distant installments first.
pub fn simulate_financed_purchase(
    params: &SimulationParameters,
    schedule: &AmortizationSchedule,
    capacity: &[f64],
    rent: &[f64],
) -> EngineResult<FinancedTrajectory> {
    let horizon = params.horizon_months as usize;
    for (name, series) in [("capacity", capacity), ("rent", rent)] {
        if series.len() < horizon {
            return Err(EngineError::invalid(
                name,
                format!("needs {horizon} months, got {}", series.len()),
            ));
        }
    }

    let first_month_capacity = capacity.first().copied().unwrap_or(0.0);
    if schedule.first_installment_value > first_month_capacity {
        return Err(EngineError::InsufficientFinancingCapacity {
            first_installment: schedule.first_installment_value,
            capacity: first_month_capacity,
        });
    }

    let rent_stop = params.months_to_stop_paying_rent as usize;
    let mut ledger = InstallmentLedger::from_schedule(schedule);
    let mut need_to_pay = Vec::with_capacity(horizon + 1);
    let mut payments = Vec::with_capacity(horizon);
    let mut interest_accrued = Vec::with_capacity(horizon);
    let mut carry = 0.0;
    let mut payoff_month = None;
    let mut forgiven_residual = 0.0;

    need_to_pay.push(ledger.outstanding());

    for month in 0..horizon {
        interest_accrued.push(ledger.accrue(
            month,
            schedule.monthly_rate,
            params.installment_growth,
        ));

        let mut cash = capacity[month] + carry;
        if month >= rent_stop {
            cash += rent[month];
        }

        let due = ledger.settle_due(month);
        cash -= due;
        let prepaid = ledger.cascade(month, &mut cash);
        payments.push(due + prepaid);
        carry = cash;

        let mut outstanding = ledger.outstanding();
        if outstanding <= PAYOFF_EPSILON {
            forgiven_residual = ledger.forgive();
            outstanding = 0.0;
            payoff_month = Some(month as u32 + 1);
        }
        need_to_pay.push(outstanding);

        if payoff_month.is_some() {
            debug!(
                target: "engine.financed",
                month = month + 1,
                carry,
                forgiven_residual,
                "loan paid off"
            );
            break;
        }
    }

    Ok(FinancedTrajectory {
        first_installment_value: schedule.first_installment_value,
        need_to_pay,
        payments,
        interest_accrued,
        payoff_month,
        forgiven_residual,
        final_carry: carry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amortization::compute;
    use crate::core::projection::project;
    use crate::core::types::reference_parameters;
    use proptest::prelude::{prop_assert, prop_assume, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn zero_rate_params(horizon: u32, installments: u32) -> SimulationParameters {
        let mut params = reference_parameters();
        params.horizon_months = horizon;
        params.number_of_installments = installments;
        params.monthly_loan_rate = 0.0;
        params.monthly_inflation_rate = 0.0;
        params.months_to_stop_paying_rent = 0;
        params
    }

    fn reference_run(
        saving: f64,
        policy: InstallmentGrowthPolicy,
    ) -> EngineResult<FinancedTrajectory> {
        let mut params = reference_parameters();
        params.initial_monthly_saving = saving;
        params.installment_growth = policy;
        let capacity = project(saving, params.monthly_inflation_rate, params.horizon_months)?;
        let rent = project(
            params.current_rent,
            params.monthly_inflation_rate,
            params.horizon_months,
        )?;
        let schedule = compute(
            params.principal(),
            params.monthly_loan_rate,
            params.number_of_installments,
        )?;
        simulate_financed_purchase(&params, &schedule, &capacity, &rent)
    }

    #[test]
    fn zero_rate_exact_payments_finish_on_last_installment() {
        let params = zero_rate_params(12, 12);
        let schedule = compute(120_000.0, 0.0, 12).expect("valid");
        let trajectory =
            simulate_financed_purchase(&params, &schedule, &[10_000.0; 12], &[0.0; 12])
                .expect("affordable");

        assert_eq!(trajectory.payoff_month, Some(12));
        assert_eq!(trajectory.need_to_pay.len(), 13);
        assert_eq!(trajectory.need_to_pay[0], 120_000.0);
        assert_eq!(trajectory.need_to_pay[1], 110_000.0);
        assert_eq!(trajectory.need_to_pay[12], 0.0);
        assert!(trajectory.payments.iter().all(|p| *p == 10_000.0));
        assert_eq!(trajectory.forgiven_residual, 0.0);
        assert_eq!(trajectory.final_carry, 0.0);
    }

    #[test]
    fn surplus_retires_farthest_installment_first() {
        let params = zero_rate_params(5, 3);
        let schedule = compute(300.0, 0.0, 3).expect("valid");
        let trajectory = simulate_financed_purchase(&params, &schedule, &[150.0; 5], &[0.0; 5])
            .expect("affordable");

        // Month 1 leaves 50 which cannot cover a whole installment; month 2
        // pays the due one plus the last.
        assert_eq!(trajectory.need_to_pay, vec![300.0, 200.0, 0.0]);
        assert_eq!(trajectory.payoff_month, Some(2));
        assert_approx(trajectory.final_carry, 0.0);
    }

    #[test]
    fn cascade_skips_unaffordable_entries_and_pays_closer_ones() {
        let mut ledger = InstallmentLedger {
            entries: vec![0.0, 40.0, 90.0, 30.0],
        };
        let mut cash = 75.0;
        let paid = ledger.cascade(1, &mut cash);

        assert_approx(paid, 70.0);
        assert_approx(cash, 5.0);
        assert_eq!(ledger.entries, vec![0.0, 0.0, 90.0, 0.0]);
    }

    #[test]
    fn accrual_policies_differ_in_scope() {
        let mut all = InstallmentLedger {
            entries: vec![0.0, 100.0, 100.0],
        };
        let accrued = all.accrue(1, 0.01, InstallmentGrowthPolicy::AllRemaining);
        assert_approx(accrued, 2.0);
        assert_approx(all.entries[2], 101.0);

        let mut current = InstallmentLedger {
            entries: vec![0.0, 100.0, 100.0],
        };
        let accrued = current.accrue(1, 0.01, InstallmentGrowthPolicy::CurrentOnly);
        assert_approx(accrued, 1.0);
        assert_eq!(current.entries[2], 100.0);
    }

    #[test]
    fn reference_loan_is_infeasible_on_reference_savings() {
        let err = reference_run(1_000.0, InstallmentGrowthPolicy::AllRemaining)
            .expect_err("first installment exceeds savings");
        match err {
            EngineError::InsufficientFinancingCapacity {
                first_installment,
                capacity,
            } => {
                assert!((first_installment - 2_745.95).abs() < 0.005);
                assert_eq!(capacity, 1_000.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn reference_loan_pays_off_early_with_larger_savings() {
        let all = reference_run(3_000.0, InstallmentGrowthPolicy::AllRemaining).expect("feasible");
        assert_eq!(all.payoff_month, Some(62));
        assert!((all.need_to_pay[0] - 200_000.0).abs() < 1e-6);
        assert!((all.need_to_pay[1] - 199_074.048_88).abs() < 0.01);

        let current = reference_run(3_000.0, InstallmentGrowthPolicy::CurrentOnly).expect("feasible");
        assert_eq!(current.payoff_month, Some(49));
    }

    #[test]
    fn horizon_shorter_than_loan_leaves_debt_open() {
        let params = zero_rate_params(3, 12);
        let schedule = compute(120_000.0, 0.0, 12).expect("valid");
        let trajectory =
            simulate_financed_purchase(&params, &schedule, &[10_000.0; 3], &[0.0; 3])
                .expect("affordable");

        assert_eq!(trajectory.payoff_month, None);
        assert_eq!(trajectory.need_to_pay.last().copied(), Some(90_000.0));
    }

    #[test]
    fn rent_is_redirected_only_after_it_stops() {
        let mut params = zero_rate_params(4, 4);
        params.months_to_stop_paying_rent = 1;
        let schedule = compute(400.0, 0.0, 4).expect("valid");
        let trajectory = simulate_financed_purchase(&params, &schedule, &[100.0; 4], &[100.0; 4])
            .expect("affordable");

        assert_eq!(trajectory.payments[0], 100.0);
        assert_eq!(trajectory.payments[1], 200.0);
        assert_eq!(trajectory.need_to_pay[2], 100.0);
        assert_eq!(trajectory.payoff_month, Some(3));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(40))]

        #[test]
        fn prop_debt_is_conserved_every_month(
            principal in 10_000u32..500_000,
            rate_bp in 0u32..150,
            installments in 12u32..240,
            extra_saving in 0u32..5_000,
            inflation_bp in 0u32..80,
            rent in 0u32..3_000,
            rent_stop in 0u32..36,
            current_only in proptest::bool::ANY
        ) {
            let mut params = reference_parameters();
            params.horizon_months = 240;
            params.number_of_installments = installments;
            params.monthly_loan_rate = rate_bp as f64 / 10_000.0;
            params.months_to_stop_paying_rent = rent_stop;
            params.installment_growth = if current_only {
                InstallmentGrowthPolicy::CurrentOnly
            } else {
                InstallmentGrowthPolicy::AllRemaining
            };
            let schedule = compute(principal as f64, params.monthly_loan_rate, installments).expect("valid");
            let saving = schedule.first_installment_value + extra_saving as f64;
            let capacity = project(saving, inflation_bp as f64 / 10_000.0, 240).expect("valid");
            let rent = project(rent as f64, inflation_bp as f64 / 10_000.0, 240).expect("valid");
            let trajectory = simulate_financed_purchase(&params, &schedule, &capacity, &rent).expect("feasible");

            let mut accrued = 0.0;
            let mut paid = 0.0;
            for month in 0..trajectory.payments.len() {
                accrued += trajectory.interest_accrued[month];
                paid += trajectory.payments[month];
                let mut outstanding = trajectory.need_to_pay[month + 1];
                if trajectory.payoff_month == Some(month as u32 + 1) {
                    outstanding += trajectory.forgiven_residual;
                }
                let balance = trajectory.need_to_pay[0] + accrued - paid - outstanding;
                prop_assert!(balance.abs() <= 1e-6 * principal as f64, "month {} drift {}", month, balance);
            }
            prop_assert!(trajectory.payoff_month.is_some());
            prop_assert!(trajectory.payoff_month.unwrap_or(u32::MAX) <= installments);
            prop_assert!(trajectory.forgiven_residual <= PAYOFF_EPSILON);
        }

        #[test]
        fn prop_large_capacity_pays_off_before_last_installment(
            principal in 10_000u32..500_000,
            rate_bp in 0u32..150,
            installments in 2u32..240,
            head_start in 1u32..4
        ) {
            prop_assume!(installments > head_start);
            let mut params = reference_parameters();
            params.horizon_months = 240;
            params.number_of_installments = installments;
            params.monthly_loan_rate = rate_bp as f64 / 10_000.0;
            let schedule = compute(principal as f64, params.monthly_loan_rate, installments).expect("valid");
            let lump = schedule.first_installment_value * installments as f64 / head_start as f64 + 1.0;
            let capacity = vec![lump; 240];
            let trajectory = simulate_financed_purchase(&params, &schedule, &capacity, &[0.0; 240]).expect("feasible");

            let payoff = trajectory.payoff_month.unwrap_or(u32::MAX);
            prop_assert!(payoff <= head_start.min(installments));
            prop_assert!(payoff < installments);
        }
    }
}
