//! Property-based tests for the risk gate, builder and synchronizer.
//!
//! These tests verify invariants hold under random inputs.

use pmm_funding::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

const PAIRS: [&str; 3] = ["BTC-USDC", "ETH-USDC", "SOL-USDC"];

// Strategies for generating test data
fn size_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000i64..50_000i64).prop_map(|x| Decimal::new(x, 2)) // -$10 to $500
}

fn spread_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=100i64).prop_map(|x| Decimal::new(x, 4)) // 1bp to 100bp
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000i64..10_000_000i64).prop_map(|x| Decimal::new(x, 2))
}

fn fraction_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000i64).prop_map(|x| Decimal::new(x, 3)) // 0 to 0.999
}

fn bias_strategy() -> impl Strategy<Value = Decimal> {
    (-500i64..=500i64).prop_map(|x| Decimal::new(x, 4))
}

fn intent_strategy() -> impl Strategy<Value = OrderIntent> {
    (0usize..PAIRS.len(), any::<bool>(), spread_strategy(), size_strategy()).prop_map(
        |(pair, buy, spread, size)| {
            let side = if buy { Side::Buy } else { Side::Sell };
            OrderIntent::new(PAIRS[pair], side, spread, Quote::new(size))
        },
    )
}

fn caps_strategy() -> impl Strategy<Value = BTreeMap<String, Quote>> {
    prop::collection::vec(prop::option::of(0i64..100_000i64), PAIRS.len()).prop_map(|caps| {
        caps.into_iter()
            .zip(PAIRS)
            .filter_map(|(cap, pair)| cap.map(|c| (pair.to_string(), Quote::new(Decimal::new(c, 2)))))
            .collect()
    })
}

fn gate(caps: BTreeMap<String, Quote>, max_position: Decimal) -> RiskGate {
    RiskGate::new(RiskParams {
        max_position_size: Quote::new(max_position),
        per_pair_caps: caps,
        ..RiskParams::default()
    })
}

proptest! {
    /// Filtered sizes are positive and never above the per order ceiling
    #[test]
    fn filtered_sizes_bounded(
        intents in prop::collection::vec(intent_strategy(), 0..40),
        caps in caps_strategy(),
        max_position in (1i64..100_000i64).prop_map(|x| Decimal::new(x, 2)),
    ) {
        let outcome = gate(caps, max_position).filter_orders_at(&intents, Timestamp(0));
        for order in &outcome.orders {
            prop_assert!(order.size_quote.is_positive());
            prop_assert!(order.size_quote.value() <= max_position);
        }
    }

    /// Per pair totals never exceed the configured cap
    #[test]
    fn pair_caps_never_exceeded(
        intents in prop::collection::vec(intent_strategy(), 0..40),
        caps in caps_strategy(),
    ) {
        let outcome = gate(caps.clone(), Decimal::new(1_000, 0)).filter_orders_at(&intents, Timestamp(0));
        for (pair, cap) in &caps {
            prop_assert!(outcome.total_for(pair) <= *cap);
            prop_assert_eq!(outcome.audit[pair].used, outcome.total_for(pair));
            prop_assert_eq!(outcome.audit[pair].remaining, cap.saturating_sub(outcome.total_for(pair)));
        }
        prop_assert_eq!(outcome.audit.len(), caps.len());
    }

    /// Every input is kept, truncated-and-kept, or skipped
    #[test]
    fn filter_accounts_for_every_intent(
        intents in prop::collection::vec(intent_strategy(), 0..40),
        caps in caps_strategy(),
    ) {
        let outcome = gate(caps, Decimal::new(1_000, 0)).filter_orders_at(&intents, Timestamp(0));
        prop_assert_eq!(outcome.orders.len() + outcome.skipped, intents.len());
        prop_assert!(outcome.capped <= outcome.orders.len());
    }

    /// Nothing passes during a loss cooldown
    #[test]
    fn cooldown_blocks_all(
        intents in prop::collection::vec(intent_strategy(), 0..20),
        elapsed in 0i64..60_000i64,
    ) {
        let mut gate = RiskGate::new(RiskParams {
            cooldown_ms: 60_000,
            ..RiskParams::default()
        });
        gate.record_fill_at(Quote::new(Decimal::NEGATIVE_ONE), Timestamp(0));
        let outcome = gate.filter_orders_at(&intents, Timestamp(elapsed));
        prop_assert!(outcome.orders.is_empty());
        prop_assert!(outcome.is_blocked());
    }

    /// Barriers bracket the entry for positive prices and are zero otherwise
    #[test]
    fn barriers_bracket_entry(
        entry in price_strategy(),
        stop_loss in fraction_strategy(),
        take_profit in fraction_strategy(),
    ) {
        let gate = RiskGate::new(RiskParams { stop_loss, take_profit, ..RiskParams::default() });
        let b = gate.compute_barriers(entry);
        if entry > Decimal::ZERO {
            prop_assert_eq!(b.stop_loss_px, entry * (Decimal::ONE - stop_loss));
            prop_assert_eq!(b.take_profit_px, entry * (Decimal::ONE + take_profit));
            prop_assert!(b.stop_loss_px <= entry && entry <= b.take_profit_px);
        } else {
            prop_assert_eq!(b.stop_loss_px, Decimal::ZERO);
            prop_assert_eq!(b.take_profit_px, Decimal::ZERO);
        }
    }

    /// Peak is the running max and the breaker matches the drawdown formula
    #[test]
    fn drawdown_matches_formula(
        equities in prop::collection::vec((1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)), 1..30),
        max_dd in (1i64..=100i64).prop_map(|x| Decimal::new(x, 2)),
    ) {
        let mut tracker = EquityTracker::new();
        for e in &equities {
            tracker.update_equity(Quote::new(*e));
        }
        let peak = equities.iter().copied().max().unwrap_or_default();
        let now = *equities.last().unwrap();
        prop_assert_eq!(tracker.peak(), Some(Quote::new(peak)));
        prop_assert_eq!(tracker.breached(max_dd), Decimal::ONE - now / peak >= max_dd);
    }

    /// Syncing the same desired set twice yields an empty diff
    #[test]
    fn sync_is_idempotent(
        first in prop::collection::vec(intent_strategy(), 0..20),
        second in prop::collection::vec(intent_strategy(), 0..20),
    ) {
        let mut sync = OrderSynchronizer::new(ExecutionMode::DryRun);
        sync.start();
        sync.sync_orders(&first);
        sync.sync_orders(&second);
        let again = sync.sync_orders(&second);
        prop_assert!(again.is_noop());
    }

    /// Additions never overlap removals and each list is duplicate free
    #[test]
    fn sync_diff_is_disjoint(
        first in prop::collection::vec(intent_strategy(), 0..20),
        second in prop::collection::vec(intent_strategy(), 0..20),
    ) {
        let mut sync = OrderSynchronizer::new(ExecutionMode::DryRun);
        sync.start();
        sync.sync_orders(&first);
        let outcome = sync.sync_orders(&second);
        for add in &outcome.to_add {
            prop_assert!(!outcome.to_remove.contains(add));
            prop_assert!(second.contains(add) && !first.contains(add));
        }
        for (i, a) in outcome.to_add.iter().enumerate() {
            prop_assert!(!outcome.to_add[i + 1..].contains(a));
        }
    }

    /// Bias only ever widens spreads, and only on one side
    #[test]
    fn skew_widens_one_side(bias in bias_strategy()) {
        let (buy, sell) = order::skew_factors(bias);
        prop_assert!(buy >= Decimal::ONE && sell >= Decimal::ONE);
        prop_assert!(buy == Decimal::ONE || sell == Decimal::ONE);
    }
}
