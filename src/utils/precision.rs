// src/utils/precision.rs
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every order quantity.
pub const QUANTITY_DP: u32 = 4;

/// Rounds a quantity to `QUANTITY_DP` places, midpoint away from zero.
/// Example: 6.66666 -> 6.6667
pub fn round_quantity(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Units of an asset a dollar allocation buys at `price`.
/// Returns `None` for non-positive prices or when the division overflows.
pub fn order_quantity(allocation: Decimal, price: Decimal) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return None;
    }
    allocation.checked_div(price).map(round_quantity)
}
