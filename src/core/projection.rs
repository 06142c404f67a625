use super::error::{EngineError, EngineResult, ensure_non_negative};

/// Monthly compounding series: element 0 is `initial_value`, each following
/// element grows by `growth_rate` over its predecessor.
pub fn project(initial_value: f64, growth_rate: f64, length: u32) -> EngineResult<Vec<f64>> {
    if length < 1 {
        return Err(EngineError::invalid("length", "must be >= 1"));
    }
    ensure_non_negative("growth_rate", growth_rate)?;

    let mut series = Vec::with_capacity(length as usize);
    let mut value = initial_value;
    series.push(value);
    for _ in 1..length {
        value *= 1.0 + growth_rate;
        series.push(value);
    }
    Ok(series)
}
