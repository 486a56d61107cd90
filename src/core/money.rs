use rust_decimal::Decimal;

/// Decimal places used for all monetary amounts (two-decimal currency
/// convention)
pub const SCALE: u32 = 2;

/// Rounds a monetary amount to the currency scale
pub fn round(amount: Decimal) -> Decimal {
    amount.round_dp(SCALE)
}

/// Clamps an amount at zero; discounts may never drive a value negative
pub fn floor_at_zero(amount: Decimal) -> Decimal {
    amount.max(Decimal::ZERO)
}

/// Coerces an optional amount to zero when absent
pub fn or_zero(amount: Option<Decimal>) -> Decimal {
    amount.unwrap_or(Decimal::ZERO)
}
