use tracing::debug;

use super::error::{EngineError, EngineResult};
use super::types::{CashTrajectory, SimulationParameters};

/// Grows the invested balance and the property price side by side and buys the
/// property outright in the first month where `savings >= property_value`.
///
/// Month 0 is checked before any growth is applied. Later months compare the
/// already-grown values of that month. Once bought, the property appreciates at
/// the post-purchase rate and counts towards total capital.
pub fn simulate_cash_purchase(
    params: &SimulationParameters,
    capacity: &[f64],
) -> EngineResult<CashTrajectory> {
    let horizon = params.horizon_months as usize;
    if capacity.len() < horizon {
        return Err(EngineError::invalid(
            "capacity",
            format!("needs {horizon} months, got {}", capacity.len()),
        ));
    }

    let mut savings = Vec::with_capacity(horizon + 1);
    let mut property_value = Vec::with_capacity(horizon + 1);
    let mut total_capital = Vec::with_capacity(horizon + 1);
    let mut purchase_month = None;

    let mut balance = params.available_cash;
    let mut price = params.property_value;
    if balance >= price {
        balance -= price;
        purchase_month = Some(0);
        debug!(target: "engine.cash", month = 0, price, "purchase triggered");
    }
    savings.push(balance);
    property_value.push(price);
    total_capital.push(capital(balance, price, purchase_month.is_some()));

    for month in 1..=horizon {
        let appreciation = if purchase_month.is_some() {
            params.monthly_property_appreciation_rate_post_purchase
        } else {
            params.monthly_property_appreciation_rate
        };

        balance = balance * (1.0 + params.monthly_investment_return_rate) + capacity[month - 1];
        price *= 1.0 + appreciation;

        if purchase_month.is_none() && balance >= price {
            balance -= price;
            purchase_month = Some(month as u32);
            debug!(target: "engine.cash", month, price, "purchase triggered");
        }

        savings.push(balance);
        property_value.push(price);
        total_capital.push(capital(balance, price, purchase_month.is_some()));
    }

    Ok(CashTrajectory {
        savings,
        property_value,
        total_capital,
        purchase_month,
    })
}

fn capital(savings: f64, property_value: f64, owned: bool) -> f64 {
    if owned {
        savings + property_value
    } else {
        savings
    }
}
