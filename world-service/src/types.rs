//! Wire types for the HTTP and WebSocket surface.

use engine::{Agent, Company, Order, OrderType, Side, WorldEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub agent_id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub reserved: f64,
    pub portfolio: std::collections::HashMap<String, f64>,
    pub reputation: f64,
    pub total_trades: u64,
}

impl From<&Agent> for AgentView {
    fn from(a: &Agent) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            balance: a.balance,
            reserved: a.reserved,
            portfolio: a.portfolio.clone(),
            reputation: a.reputation,
            total_trades: a.total_trades,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub founder_id: String,
    pub ticker: String,
    pub name: String,
    pub description: String,
    pub service_type: String,
    pub service_cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct IpoRequest {
    pub shares: f64,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct CompanyView {
    pub ticker: String,
    pub name: String,
    pub description: String,
    pub founder_id: String,
    pub status: String,
    pub total_shares: f64,
    pub public_shares: f64,
    pub share_price: f64,
    pub market_cap: f64,
    pub service_type: String,
    pub service_cost: f64,
    pub revenue: f64,
    pub total_api_calls: u64,
    pub daily_active_users: u64,
}

impl From<&Company> for CompanyView {
    fn from(c: &Company) -> Self {
        Self {
            ticker: c.ticker.clone(),
            name: c.name.clone(),
            description: c.description.clone(),
            founder_id: c.founder_id.clone(),
            status: format!("{:?}", c.status).to_uppercase(),
            total_shares: c.total_shares,
            public_shares: c.public_shares,
            share_price: c.share_price,
            market_cap: c.market_cap(),
            service_type: c.service_type.clone(),
            service_cost: c.service_cost,
            revenue: c.revenue,
            total_api_calls: c.total_api_calls,
            daily_active_users: c.daily_active_users,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
    pub agent_id: String,
    pub name: String,
    pub net_worth: f64,
}

#[derive(Debug, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UseServiceRequest {
    pub agent_id: String,
    pub ticker: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub agent_id: String,
    pub ticker: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub filled_quantity: f64,
    pub filled_price: f64,
}

impl From<&Order> for OrderResponse {
    fn from(o: &Order) -> Self {
        Self {
            order_id: o.id.clone(),
            status: format!("{:?}", o.status).to_uppercase(),
            filled_quantity: o.filled_quantity,
            filled_price: o.filled_price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub ticker: Option<String>,
    pub limit: Option<usize>,
}

/// Server-pushed WebSocket frame, one variant per `WorldEvent` kind,
/// sourced from the broadcast channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WsFrame {
    #[serde(rename = "event")]
    Event {
        event_type: String,
        ticker: Option<String>,
        agent_id: Option<String>,
        message: String,
        timestamp: u128,
    },
}

impl From<WorldEvent> for WsFrame {
    fn from(e: WorldEvent) -> Self {
        WsFrame::Event {
            // `WorldEventType` derives `#[serde(rename_all = "snake_case")]`
            // (e.g. CompanyCreated -> "company_created"); go through serde
            // rather than `Debug` + `to_lowercase`, which would instead
            // produce "companycreated".
            event_type: serde_json::to_value(e.event_type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            ticker: e.ticker,
            agent_id: e.agent_id,
            message: e.message,
            timestamp: e.timestamp,
        }
    }
}
