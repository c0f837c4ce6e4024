//! Core data model: agents, companies, orders, trades.
//!
//! All monetary amounts and quantities are `f64` ("AICoin" is a float
//! currency by design, not fixed-point). Equality on floats is never
//! used for control flow; fill completion is `filled_quantity >= quantity`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Ticker = String;
pub type AgentId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Partial,
    Filled,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Private,
    Ipo,
    Public,
    Bankrupt,
}

/// An autonomous participant in the world.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub balance: f64,
    /// Cash set aside to cover the unfilled remainder of this agent's
    /// resting BUY limit orders. Spendable balance is `balance`, not
    /// `balance + reserved` — reserved cash is already spoken for.
    pub reserved: f64,
    /// ticker -> quantity. Never holds an entry with quantity <= 0.
    pub portfolio: HashMap<Ticker, f64>,
    pub reputation: f64,
    pub total_trades: u64,
    pub created_at: u128,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, balance: f64, now: u128) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance,
            reserved: 0.0,
            portfolio: HashMap::new(),
            reputation: 100.0,
            total_trades: 0,
            created_at: now,
        }
    }

    /// Cash plus holdings marked to the given per-ticker prices.
    pub fn net_worth(&self, prices: &HashMap<Ticker, f64>) -> f64 {
        let holdings_value: f64 = self
            .portfolio
            .iter()
            .map(|(ticker, qty)| qty * prices.get(ticker).copied().unwrap_or(0.0))
            .sum();
        self.balance + self.reserved + holdings_value
    }

    pub(crate) fn credit_shares(&mut self, ticker: &str, qty: f64) {
        *self.portfolio.entry(ticker.to_string()).or_insert(0.0) += qty;
    }

    pub(crate) fn debit_shares(&mut self, ticker: &str, qty: f64) {
        if let Some(held) = self.portfolio.get_mut(ticker) {
            *held -= qty;
            if *held <= 0.0 {
                self.portfolio.remove(ticker);
            }
        }
    }
}

/// An issuer with a fixed share supply and a priced service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Company {
    pub ticker: Ticker,
    pub name: String,
    pub description: String,
    pub founder_id: AgentId,
    pub status: CompanyStatus,
    pub total_shares: f64,
    pub public_shares: f64,
    pub share_price: f64,
    pub service_type: String,
    pub service_cost: f64,
    pub revenue: f64,
    pub total_api_calls: u64,
    pub daily_active_users: u64,
    pub created_at: u128,
}

impl Company {
    /// Always a pure function of total_shares and share_price, never stored.
    pub fn market_cap(&self) -> f64 {
        self.total_shares * self.share_price
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub agent_id: AgentId,
    pub ticker: Ticker,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: f64,
    /// Required for LIMIT orders; stamped with the effective market
    /// price for MARKET orders once admitted.
    pub price: Option<f64>,
    pub status: OrderStatus,
    pub filled_quantity: f64,
    pub filled_price: f64,
    pub created_at: u128,
    pub filled_at: Option<u128>,
}

impl Order {
    pub fn remaining(&self) -> f64 {
        (self.quantity - self.filled_quantity).max(0.0)
    }

    pub fn is_resting_eligible(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Partial)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub ticker: Ticker,
    pub buyer_id: AgentId,
    pub seller_id: AgentId,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: u128,
    pub buyer_order_id: String,
    pub seller_order_id: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarketData {
    pub last_price: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub change_24h: f64,
    pub market_cap: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldEventType {
    Join,
    CompanyCreated,
    Ipo,
    Trade,
    Dividend,
    Bankruptcy,
    News,
}

/// Append-only. Settlement appends these inside the exchange, under
/// whatever lock the caller holds; the caller drains and fans them out
/// once that lock is released (spec: never hold a lock across a
/// broadcast).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldEvent {
    pub timestamp: u128,
    pub event_type: WorldEventType,
    pub ticker: Option<Ticker>,
    pub agent_id: Option<AgentId>,
    pub data: serde_json::Value,
    pub message: String,
}

/// A single paid call from one agent to one company's service.
/// Present in the original world model but dropped by the distilled
/// spec; kept as an audit log, not exposed as a control-flow input.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceUsage {
    pub timestamp: u128,
    pub agent_id: AgentId,
    pub ticker: Ticker,
    pub cost: f64,
    pub success: bool,
}
