use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("financing is not applicable: principal {principal:.2} must be > 0")]
    FinancingNotApplicable { principal: f64 },

    #[error(
        "first installment {first_installment:.2} exceeds first month savings capacity {capacity:.2}"
    )]
    InsufficientFinancingCapacity { first_installment: f64, capacity: f64 },
}

impl EngineError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> EngineResult<()> {
    if !value.is_finite() {
        return Err(EngineError::invalid(name, "must be finite"));
    }
    if value < 0.0 {
        return Err(EngineError::invalid(name, "must be >= 0"));
    }
    Ok(())
}

pub(crate) fn ensure_count(name: &'static str, value: u32, max: u32) -> EngineResult<()> {
    if value == 0 {
        return Err(EngineError::invalid(name, "must be >= 1"));
    }
    if value > max {
        return Err(EngineError::invalid(name, format!("must be <= {max}")));
    }
    Ok(())
}

pub(crate) fn ensure_finite_result(name: &'static str, value: f64) -> EngineResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::invalid(name, "result is not finite for these rates"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_non_negative_rejects_nan_and_negative() {
        assert!(ensure_non_negative("rate", 0.0).is_ok());
        let err = ensure_non_negative("rate", -0.01).expect_err("negative must fail");
        assert_eq!(
            err,
            EngineError::InvalidParameter {
                name: "rate",
                reason: "must be >= 0".to_string(),
            }
        );
        assert!(ensure_non_negative("rate", f64::NAN).is_err());
        assert!(ensure_non_negative("rate", f64::INFINITY).is_err());
    }

    #[test]
    fn messages_name_the_parameter() {
        let err = EngineError::invalid("horizon_months", "must be >= 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter `horizon_months`: must be >= 1"
        );

        let err = EngineError::InsufficientFinancingCapacity {
            first_installment: 2745.951,
            capacity: 1000.0,
        };
        assert!(err.to_string().contains("2745.95"));
    }

    #[test]
    fn counts_are_bounded_on_both_sides() {
        assert!(ensure_count("horizon_months", 1, 1_200).is_ok());
        assert!(ensure_count("horizon_months", 1_200, 1_200).is_ok());
        assert_eq!(
            ensure_count("horizon_months", 1_201, 1_200),
            Err(EngineError::invalid("horizon_months", "must be <= 1200"))
        );
        assert!(ensure_count("horizon_months", 0, 1_200).is_err());
    }

    #[test]
    fn non_finite_results_are_rejected() {
        assert_eq!(ensure_finite_result("rate", 0.25), Ok(0.25));
        assert!(ensure_finite_result("rate", f64::NAN).is_err());
        assert!(ensure_finite_result("rate", f64::INFINITY).is_err());
    }
}
