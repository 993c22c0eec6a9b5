use super::error::PlanError;

pub fn monthly_installment(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
) -> Result<f64, PlanError> {
    if term_months == 0 {
        return Err(PlanError::InvalidTerm);
    }
    if principal <= 0.0 {
        return Ok(0.0);
    }

    let rate = annual_rate_percent / 12.0 / 100.0;
    let growth = (1.0 + rate).powi(term_months as i32);
    // growth == 1.0 covers both a zero rate and a rate too small to
    // register at f64 precision; either way the denominator below would
    // be zero.
    if growth <= 1.0 {
        return Ok(principal / term_months as f64);
    }

    Ok(principal * rate * growth / (growth - 1.0))
}

pub fn future_value(present_amount: f64, periods: u32, annual_rate_percent: f64) -> f64 {
    present_amount * (1.0 + annual_rate_percent / 100.0).powi(periods as i32)
}

// Effective monthly rate for an annual percentage. Compounding the annual
// formula per month instead of converting through this changes outcomes
// materially, so every monthly escalation in the engine goes through here.
pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    (1.0 + annual_rate_percent / 100.0).powf(1.0 / 12.0) - 1.0
}
