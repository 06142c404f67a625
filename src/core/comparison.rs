use super::types::{ComparisonResult, Verdict};

/// Orders the two completion months. Equal months go to the cash strategy,
/// which reaches ownership without carrying debt.
pub fn compare(
    cash_completion_month: Option<u32>,
    financed_completion_month: Option<u32>,
) -> ComparisonResult {
    let verdict = match (cash_completion_month, financed_completion_month) {
        (None, None) => Verdict::NeitherCompletes,
        (Some(_), None) => Verdict::OnlyCash,
        (None, Some(_)) => Verdict::OnlyFinanced,
        (Some(cash), Some(financed)) if cash <= financed => Verdict::CashFaster,
        (Some(_), Some(_)) => Verdict::FinancedFaster,
    };

    ComparisonResult {
        cash_completion_month,
        financed_completion_month,
        verdict,
    }
}
