//! Depth-walk liquidity pricing.
//!
//! Pure functions that turn a raw depth snapshot into the realizable fill
//! for a target amount, consuming levels in favorable-price order. All
//! arithmetic is exact decimal; prices and sizes arrive as decimal strings
//! from the wire and never touch binary floats.
//!
//! Venues without raw depth (aggregators that answer one quote per request)
//! produce the same [`QuoteTable`](crate::venue::QuoteTable) shape directly,
//! so callers price both kinds of venue identically.

use rust_decimal::Decimal;

/// One priced liquidity level. Not necessarily sorted on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthLevel {
    pub price: Decimal,
    /// Base units still resting at this price.
    pub remaining: Decimal,
}

/// Result of walking a depth snapshot.
///
/// `unfilled` reports the input remainder when depth ran out; callers get
/// the shortfall, it is never silently clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFill {
    /// Units received: base for buys, quote for sells.
    pub amount_out: Decimal,
    /// Input actually spent.
    pub consumed: Decimal,
    /// Input left over after depth was exhausted.
    pub unfilled: Decimal,
}

impl DepthFill {
    fn empty(unfilled: Decimal) -> Self {
        Self {
            amount_out: Decimal::ZERO,
            consumed: Decimal::ZERO,
            unfilled,
        }
    }
}

/// Buy base with `quote_value` quote units against ask levels.
///
/// Levels are consumed cheapest-first; equal-priced levels in the order
/// presented. Empty depth yields zero out with the full value unfilled.
pub fn walk_asks(levels: &[DepthLevel], quote_value: Decimal) -> DepthFill {
    let quote_value = quote_value.max(Decimal::ZERO);
    if levels.is_empty() || quote_value.is_zero() {
        return DepthFill::empty(quote_value);
    }

    let mut sorted: Vec<&DepthLevel> = levels.iter().collect();
    // Stable sort: equal-priced levels keep their presented order.
    sorted.sort_by(|a, b| a.price.cmp(&b.price));

    let mut budget = quote_value;
    let mut amount_out = Decimal::ZERO;

    for level in sorted {
        if budget <= Decimal::ZERO {
            break;
        }
        if level.price <= Decimal::ZERO || level.remaining <= Decimal::ZERO {
            // Malformed or empty level; nothing executable here.
            continue;
        }
        let affordable = budget / level.price;
        let take = level.remaining.min(affordable);
        amount_out += take;
        budget -= take * level.price;
    }

    DepthFill {
        amount_out,
        consumed: quote_value - budget,
        unfilled: budget,
    }
}

/// Sell `base_amount` base units into bid levels for quote out.
///
/// Levels are consumed highest-bid-first; equal-priced levels in the order
/// presented.
pub fn walk_bids(levels: &[DepthLevel], base_amount: Decimal) -> DepthFill {
    let base_amount = base_amount.max(Decimal::ZERO);
    if levels.is_empty() || base_amount.is_zero() {
        return DepthFill::empty(base_amount);
    }

    let mut sorted: Vec<&DepthLevel> = levels.iter().collect();
    sorted.sort_by(|a, b| b.price.cmp(&a.price));

    let mut remaining = base_amount;
    let mut amount_out = Decimal::ZERO;

    for level in sorted {
        if remaining <= Decimal::ZERO {
            break;
        }
        if level.price <= Decimal::ZERO || level.remaining <= Decimal::ZERO {
            continue;
        }
        let take = level.remaining.min(remaining);
        amount_out += take * level.price;
        remaining -= take;
    }

    DepthFill {
        amount_out,
        consumed: base_amount - remaining,
        unfilled: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, remaining: Decimal) -> DepthLevel {
        DepthLevel { price, remaining }
    }

    #[test]
    fn buy_walks_cheapest_ask_first() {
        // asks = [{100, 1}, {101, 5}], V = 150:
        // 1 unit at 100 spends 100, then 50/101 units at 101.
        let asks = vec![level(dec!(100), dec!(1)), level(dec!(101), dec!(5))];
        let fill = walk_asks(&asks, dec!(150));

        let expected = dec!(1) + dec!(50) / dec!(101);
        assert_eq!(fill.amount_out, expected);
        assert!(fill.consumed <= dec!(150));
        // Division rounding leaves at most a dust remainder.
        assert!(fill.unfilled >= Decimal::ZERO);
        assert!(fill.unfilled < dec!(0.000000000000000001));
    }

    #[test]
    fn buy_sorts_unordered_levels() {
        let shuffled = vec![
            level(dec!(101), dec!(5)),
            level(dec!(100), dec!(1)),
        ];
        let ordered = vec![
            level(dec!(100), dec!(1)),
            level(dec!(101), dec!(5)),
        ];
        assert_eq!(walk_asks(&shuffled, dec!(150)), walk_asks(&ordered, dec!(150)));
    }

    #[test]
    fn sell_walks_highest_bid_first() {
        let bids = vec![level(dec!(99), dec!(2)), level(dec!(100), dec!(1))];
        let fill = walk_bids(&bids, dec!(2));

        // 1 unit at 100, then 1 unit at 99.
        assert_eq!(fill.amount_out, dec!(199));
        assert_eq!(fill.consumed, dec!(2));
        assert_eq!(fill.unfilled, Decimal::ZERO);
    }

    #[test]
    fn empty_depth_reports_full_remainder() {
        let fill = walk_asks(&[], dec!(150));
        assert_eq!(fill.amount_out, Decimal::ZERO);
        assert_eq!(fill.consumed, Decimal::ZERO);
        assert_eq!(fill.unfilled, dec!(150));

        let fill = walk_bids(&[], dec!(3));
        assert_eq!(fill.unfilled, dec!(3));
    }

    #[test]
    fn shallow_depth_reports_shortfall() {
        let asks = vec![level(dec!(100), dec!(1))];
        let fill = walk_asks(&asks, dec!(150));
        assert_eq!(fill.amount_out, dec!(1));
        assert_eq!(fill.consumed, dec!(100));
        assert_eq!(fill.unfilled, dec!(50));
    }

    #[test]
    fn amount_out_is_monotone_in_target_value() {
        let asks = vec![
            level(dec!(100), dec!(0.5)),
            level(dec!(100.5), dec!(2)),
            level(dec!(103), dec!(10)),
        ];

        let mut previous = Decimal::ZERO;
        let mut value = Decimal::ZERO;
        while value <= dec!(1500) {
            let fill = walk_asks(&asks, value);
            assert!(fill.amount_out >= previous, "not monotone at V={value}");
            assert!(fill.consumed <= value);
            previous = fill.amount_out;
            value += dec!(37.5);
        }
    }

    #[test]
    fn identical_input_is_deterministic() {
        let bids = vec![
            level(dec!(0.2956), dec!(1000)),
            level(dec!(0.2955), dec!(5000)),
            level(dec!(0.2956), dec!(250)),
        ];
        let a = walk_bids(&bids, dec!(4000));
        let b = walk_bids(&bids, dec!(4000));
        assert_eq!(a, b);
    }

    #[test]
    fn equal_priced_levels_consumed_in_presented_order() {
        // Both orderings fill identically; the tie-break only fixes which
        // resting order gets consumed, which the totals must not depend on.
        let first = vec![level(dec!(100), dec!(1)), level(dec!(100), dec!(3))];
        let second = vec![level(dec!(100), dec!(3)), level(dec!(100), dec!(1))];
        assert_eq!(
            walk_asks(&first, dec!(250)),
            walk_asks(&second, dec!(250))
        );
    }

    #[test]
    fn zero_and_negative_values_yield_empty_fill() {
        let asks = vec![level(dec!(100), dec!(1))];
        let fill = walk_asks(&asks, Decimal::ZERO);
        assert_eq!(fill.amount_out, Decimal::ZERO);
        assert_eq!(fill.unfilled, Decimal::ZERO);

        let fill = walk_asks(&asks, dec!(-5));
        assert_eq!(fill.amount_out, Decimal::ZERO);
        assert_eq!(fill.unfilled, Decimal::ZERO);
    }

    #[test]
    fn malformed_levels_are_skipped() {
        let asks = vec![
            level(Decimal::ZERO, dec!(10)),
            level(dec!(-1), dec!(10)),
            level(dec!(100), dec!(1)),
        ];
        let fill = walk_asks(&asks, dec!(100));
        assert_eq!(fill.amount_out, dec!(1));
        assert_eq!(fill.unfilled, Decimal::ZERO);
    }
}
