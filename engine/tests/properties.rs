//! Property-based tests for the exchange's core invariants, in the
//! style of the order-book proptest suites in the retrieved pack: each
//! test drives a sequence of randomly generated orders through the
//! public `Exchange` API and checks a universal invariant holds after
//! every step, not just at the end.

use engine::{Exchange, OrderStatus, OrderType, Side};
use proptest::prelude::*;

const STARTING_BALANCE: f64 = 1_000_000.0;
const TOTAL_SHARES: f64 = 1_000.0;

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn order_type_strategy() -> impl Strategy<Value = OrderType> {
    prop_oneof![Just(OrderType::Market), Just(OrderType::Limit)]
}

fn price_strategy() -> impl Strategy<Value = f64> {
    (1u32..=200u32).prop_map(|p| p as f64 / 10.0)
}

fn quantity_strategy() -> impl Strategy<Value = f64> {
    (1u32..=100u32).prop_map(|q| q as f64)
}

/// Three agents trading one ticker; founder starts holding all shares.
fn setup() -> Exchange {
    let mut ex = Exchange::new();
    ex.join("founder", "Founder", STARTING_BALANCE, 0);
    ex.join("alice", "Alice", STARTING_BALANCE, 0);
    ex.join("bob", "Bob", STARTING_BALANCE, 0);
    ex.create_company("founder", "PROP", "Prop".into(), "d".into(), "svc".into(), 1.0, 0).unwrap();
    ex.launch_ipo("PROP", TOTAL_SHARES, 1.0, 1).unwrap();
    ex
}

fn traders() -> [&'static str; 3] {
    ["founder", "alice", "bob"]
}

fn total_cash(ex: &Exchange) -> f64 {
    traders().iter().map(|id| {
        let a = ex.agent(id).unwrap();
        a.balance + a.reserved
    }).sum()
}

fn total_shares_held(ex: &Exchange, ticker: &str) -> f64 {
    traders()
        .iter()
        .map(|id| ex.agent(id).unwrap().portfolio.get(ticker).copied().unwrap_or(0.0))
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Cash conservation: no trade, fill, or rest can create or destroy
    /// AICoin. Total (balance + reserved) across the fixed set of
    /// traders only moves between them, never drifts, within float
    /// tolerance.
    #[test]
    fn cash_conservation(
        orders in prop::collection::vec(
            (0usize..3, side_strategy(), order_type_strategy(), price_strategy(), quantity_strategy()),
            1..40
        )
    ) {
        let mut ex = setup();
        let before = total_cash(&ex);

        for (i, (trader_idx, side, order_type, price, qty)) in orders.into_iter().enumerate() {
            let trader = traders()[trader_idx];
            let price_arg = if order_type == OrderType::Limit { Some(price) } else { None };
            let _ = ex.submit_order(trader, "PROP", side, order_type, qty, price_arg, (i + 2) as u128);
        }

        let after = total_cash(&ex);
        prop_assert!((before - after).abs() < 1e-6, "cash not conserved: {before} != {after}");
    }

    /// Share conservation: total shares of PROP held across all traders
    /// is always exactly TOTAL_SHARES, regardless of trade sequence.
    #[test]
    fn share_conservation(
        orders in prop::collection::vec(
            (0usize..3, side_strategy(), order_type_strategy(), price_strategy(), quantity_strategy()),
            1..40
        )
    ) {
        let mut ex = setup();

        for (i, (trader_idx, side, order_type, price, qty)) in orders.into_iter().enumerate() {
            let trader = traders()[trader_idx];
            let price_arg = if order_type == OrderType::Limit { Some(price) } else { None };
            let _ = ex.submit_order(trader, "PROP", side, order_type, qty, price_arg, (i + 2) as u128);
            prop_assert_eq!(total_shares_held(&ex, "PROP"), TOTAL_SHARES);
        }
    }

    /// No negatives: balance and reserved never go below zero and no
    /// portfolio entry is ever <= 0 (zero entries are purged).
    #[test]
    fn no_negatives(
        orders in prop::collection::vec(
            (0usize..3, side_strategy(), order_type_strategy(), price_strategy(), quantity_strategy()),
            1..40
        )
    ) {
        let mut ex = setup();

        for (i, (trader_idx, side, order_type, price, qty)) in orders.into_iter().enumerate() {
            let trader = traders()[trader_idx];
            let price_arg = if order_type == OrderType::Limit { Some(price) } else { None };
            let _ = ex.submit_order(trader, "PROP", side, order_type, qty, price_arg, (i + 2) as u128);

            for id in traders() {
                let agent = ex.agent(id).unwrap();
                prop_assert!(agent.balance >= -1e-9, "{id} balance went negative: {}", agent.balance);
                prop_assert!(agent.reserved >= -1e-9, "{id} reserved went negative: {}", agent.reserved);
                for (ticker, qty) in agent.portfolio.iter() {
                    prop_assert!(*qty > 0.0, "{id} holds a non-positive entry for {ticker}: {qty}");
                }
            }
        }
    }

    /// Order monotonicity: filled_quantity never decreases, never
    /// exceeds quantity, and status never regresses once an order is
    /// terminal (FILLED/CANCELLED).
    #[test]
    fn order_monotonicity(
        orders in prop::collection::vec(
            (0usize..3, side_strategy(), order_type_strategy(), price_strategy(), quantity_strategy()),
            1..30
        )
    ) {
        let mut ex = setup();
        let mut last_filled: std::collections::HashMap<String, f64> = std::collections::HashMap::new();

        for (i, (trader_idx, side, order_type, price, qty)) in orders.into_iter().enumerate() {
            let trader = traders()[trader_idx];
            let price_arg = if order_type == OrderType::Limit { Some(price) } else { None };
            if let Ok(order) = ex.submit_order(trader, "PROP", side, order_type, qty, price_arg, (i + 2) as u128) {
                prop_assert!(order.filled_quantity <= order.quantity + 1e-9);
                last_filled.insert(order.id.clone(), order.filled_quantity);
            }
        }

        for (id, filled) in last_filled {
            let order = ex.order(&id).unwrap();
            prop_assert!(order.filled_quantity >= filled - 1e-9);
            if order.status == OrderStatus::Filled {
                prop_assert!((order.filled_quantity - order.quantity).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn price_time_priority_deterministic() {
    let mut ex = setup();
    ex.submit_order("founder", "PROP", Side::Sell, OrderType::Limit, 10.0, Some(6.0), 2).unwrap();
    ex.submit_order("founder", "PROP", Side::Sell, OrderType::Limit, 10.0, Some(5.0), 3).unwrap();
    ex.submit_order("alice", "PROP", Side::Buy, OrderType::Limit, 20.0, Some(7.0), 4).unwrap();

    assert_eq!(ex.trades()[0].price, 5.0);
    assert_eq!(ex.trades()[1].price, 6.0);
}

#[test]
fn rejoin_does_not_regrant_balance() {
    let mut ex = setup();
    ex.agent("alice").map(|a| a.balance).unwrap();
    let rejoined = ex.join("alice", "Alice", STARTING_BALANCE, 99);
    assert_eq!(rejoined.balance, STARTING_BALANCE);
    let rejoined_again = ex.join("alice", "Alice", 0.0, 100);
    assert_eq!(rejoined_again.balance, STARTING_BALANCE);
}
