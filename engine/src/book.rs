//! Per-ticker price-time priority order book.
//!
//! A `BTreeMap` of price level to FIFO queue, with lazy cancellation: a
//! resting order is only eligible while its status is PENDING or PARTIAL
//! *and*, for a SELL, while its owner still actually holds the shares.
//! There is no explicit remove; stale heads are discarded the moment
//! they're seen. Prices are floating point, so the map key is a small
//! total-order newtype rather than the raw float.

use crate::model::{Agent, Order, Side};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Total-ordering wrapper over `f64` so prices can key a `BTreeMap`.
/// Only ever constructed from finite, validated prices (admission
/// rejects NaN/negative/non-finite prices before they reach the book).
#[derive(Clone, Copy, Debug, PartialEq)]
struct Px(f64);

impl Eq for Px {}
impl Ord for Px {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl PartialOrd for Px {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
pub struct OrderBook {
    /// Resting BUY order ids, keyed by price ascending (best = highest = last).
    bids: BTreeMap<Px, VecDeque<String>>,
    /// Resting SELL order ids, keyed by price ascending (best = lowest = first).
    asks: BTreeMap<Px, VecDeque<String>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a resting LIMIT order. Precondition: `order.status == Pending`.
    pub fn add(&mut self, side: Side, price: f64, order_id: String) {
        let levels = self.levels_mut(side);
        levels.entry(Px(price)).or_default().push_back(order_id);
    }

    /// Returns the id of the order that would trade next on `side`,
    /// pruning any stale (no-longer-eligible) heads along the way.
    /// This is the only reclamation path for matched/cancelled/wiped
    /// resting orders.
    pub fn best_id(
        &mut self,
        side: Side,
        orders: &HashMap<String, Order>,
        agents: &HashMap<String, Agent>,
    ) -> Option<String> {
        loop {
            let key = self.top_key(side)?;
            let deque = self.levels_mut(side).get_mut(&key).expect("level exists");

            while let Some(id) = deque.front() {
                if Self::eligible(id, orders, agents) {
                    return Some(id.clone());
                }
                deque.pop_front();
            }

            self.levels_mut(side).remove(&key);
        }
    }

    /// Best price without mutating the book. May include stale heads;
    /// used only as an estimate for market-order pricing before the
    /// matching loop runs its own (mutating, authoritative) lookup.
    pub fn peek_best_price(
        &self,
        side: Side,
        orders: &HashMap<String, Order>,
        agents: &HashMap<String, Agent>,
    ) -> Option<f64> {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        let iter: Box<dyn Iterator<Item = (&Px, &VecDeque<String>)>> = match side {
            Side::Buy => Box::new(levels.iter().rev()),
            Side::Sell => Box::new(levels.iter()),
        };
        for (px, deque) in iter {
            if deque.iter().any(|id| Self::eligible(id, orders, agents)) {
                return Some(px.0);
            }
        }
        None
    }

    /// `(best_bid, best_ask)` prices, mutating to reclaim stale heads.
    pub fn spread(
        &mut self,
        orders: &HashMap<String, Order>,
        agents: &HashMap<String, Agent>,
    ) -> (Option<f64>, Option<f64>) {
        let bid = self
            .best_id(Side::Buy, orders, agents)
            .and_then(|id| orders.get(&id))
            .map(|o| o.price.expect("resting order has a price"));
        let ask = self
            .best_id(Side::Sell, orders, agents)
            .and_then(|id| orders.get(&id))
            .map(|o| o.price.expect("resting order has a price"));
        (bid, ask)
    }

    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    fn eligible(id: &str, orders: &HashMap<String, Order>, agents: &HashMap<String, Agent>) -> bool {
        let order = match orders.get(id) {
            Some(o) => o,
            None => return false,
        };
        if !order.is_resting_eligible() {
            return false;
        }
        if order.side == Side::Sell {
            let held = agents
                .get(&order.agent_id)
                .and_then(|a| a.portfolio.get(&order.ticker))
                .copied()
                .unwrap_or(0.0);
            if held < order.remaining() {
                return false;
            }
        }
        true
    }

    fn top_key(&self, side: Side) -> Option<Px> {
        match side {
            Side::Buy => self.bids.keys().next_back().copied(),
            Side::Sell => self.asks.keys().next().copied(),
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<Px, VecDeque<String>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}
