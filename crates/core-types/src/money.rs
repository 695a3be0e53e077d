use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a USD value to 2 decimal places using banker's rounding (half-even).
///
/// Every cash amount that enters the ledger passes through this function, so
/// cash arithmetic is exact: debiting a cost and crediting it back always
/// returns the balance to its original value.
pub fn round_usd(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}
