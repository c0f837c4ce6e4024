//! Core matching engine: data model, per-ticker order book, and the
//! `Exchange` aggregate that admits orders, matches them, and settles
//! the resulting trades. No async runtime, no HTTP — `world-service`
//! wraps this crate behind one lock and adds the ambient surface.

pub mod book;
pub mod exchange;
pub mod model;

pub use exchange::{EngineError, Exchange, CREATION_COST};
pub use model::{
    Agent, AgentId, Company, CompanyStatus, MarketData, Order, OrderStatus, OrderType,
    ServiceUsage, Side, Ticker, Trade, WorldEvent, WorldEventType,
};
