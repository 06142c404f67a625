use super::error::{EngineError, EngineResult, ensure_count, ensure_non_negative};
use super::types::{AmortizationSchedule, MAX_INSTALLMENTS};

const ZERO_RATE: f64 = 1e-12;

/// Fixed-payment annuity for `principal` over `number_of_installments` months.
///
/// The nominal schedule holds each installment discounted back to today, so the
/// schedule sums to the principal and an entry grown once per elapsed month
/// reaches `first_installment_value` in the month it falls due.
pub fn compute(
    principal: f64,
    monthly_rate: f64,
    number_of_installments: u32,
) -> EngineResult<AmortizationSchedule> {
    if !principal.is_finite() {
        return Err(EngineError::invalid("principal", "must be finite"));
    }
    if principal <= 0.0 {
        return Err(EngineError::FinancingNotApplicable { principal });
    }
    ensure_non_negative("monthly_rate", monthly_rate)?;
    ensure_count("number_of_installments", number_of_installments, MAX_INSTALLMENTS)?;

    let first_installment_value =
        first_installment_value(principal, monthly_rate, number_of_installments);
    let growth = 1.0 + monthly_rate;
    let mut nominal_schedule = Vec::with_capacity(number_of_installments as usize);
    let mut discount = 1.0;
    for _ in 0..number_of_installments {
        discount *= growth;
        nominal_schedule.push(first_installment_value / discount);
    }

    Ok(AmortizationSchedule {
        principal,
        monthly_rate,
        first_installment_value,
        nominal_schedule,
    })
}

/// `P * r * (1+r)^n / ((1+r)^n - 1)`, or `P / n` when the rate is zero.
/// Callers guarantee `1 <= installments <= MAX_INSTALLMENTS`.
fn first_installment_value(principal: f64, monthly_rate: f64, installments: u32) -> f64 {
    if monthly_rate.abs() < ZERO_RATE {
        return principal / f64::from(installments);
    }
    let compounded = (1.0 + monthly_rate).powi(installments as i32);
    principal * monthly_rate * compounded / (compounded - 1.0)
}
