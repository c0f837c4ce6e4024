//! Application-facing wrapper around [`World`]/[`Exchange`].
//!
//! Settlement mutates `Agent` balances and portfolios that span tickers,
//! and the daily cycle walks every agent and company at once, so
//! per-book locking can't preserve atomicity here. `Service` holds one
//! `RwLock<World>` — a single "giant world lock" — and every method
//! follows the same shape: take the lock, mutate, drain the events the
//! mutation produced, drop the lock, *then* broadcast. The callback to
//! the WS fan-out must never run while the lock is held.

use std::sync::Arc;

use engine::{Agent, Company, EngineError, MarketData, Order, OrderType, Side, Trade, WorldEvent};
use tokio::sync::{broadcast, RwLock};

use crate::config::{self, Config};
use crate::world::{StateSnapshot, World};

#[derive(Clone)]
pub struct Service {
    world: Arc<RwLock<World>>,
    events_tx: broadcast::Sender<WorldEvent>,
}

impl Service {
    pub fn bootstrap(events_tx: broadcast::Sender<WorldEvent>) -> Self {
        let world = World::bootstrap(crate::world::now_ms());
        Self { world: Arc::new(RwLock::new(world)), events_tx }
    }

    pub fn events_tx(&self) -> broadcast::Sender<WorldEvent> {
        self.events_tx.clone()
    }

    pub fn spawn_tick_loop(&self, cfg: &Config) {
        crate::world::spawn_tick_loop(self.world.clone(), self.events_tx.clone(), cfg);
    }

    fn broadcast(&self, events: Vec<WorldEvent>) {
        for event in events {
            let _ = self.events_tx.send(event);
        }
    }

    pub async fn join(&self, agent_id: &str, name: &str) -> Agent {
        let now = crate::world::now_ms();
        let (agent, events) = {
            let mut world = self.world.write().await;
            let agent = world.exchange_mut().join(agent_id, name, config::STARTING_BALANCE, now);
            (agent, world.exchange_mut().drain_events())
        };
        self.broadcast(events);
        agent
    }

    pub async fn agent(&self, agent_id: &str) -> Option<Agent> {
        self.world.read().await.exchange().agent(agent_id).cloned()
    }

    pub async fn agents(&self) -> Vec<Agent> {
        self.world
            .read()
            .await
            .exchange()
            .agents()
            .filter(|a| a.id != config::SYSTEM_AGENT_ID)
            .cloned()
            .collect()
    }

    pub async fn leaderboard(&self, limit: usize) -> Vec<(Agent, f64)> {
        self.world
            .read()
            .await
            .exchange()
            .leaderboard(usize::MAX)
            .into_iter()
            .filter(|(agent, _)| agent.id != config::SYSTEM_AGENT_ID)
            .take(limit)
            .map(|(agent, net_worth)| (agent.clone(), net_worth))
            .collect()
    }

    pub async fn state(&self) -> StateSnapshot {
        self.world.read().await.state()
    }

    pub async fn news(&self, limit: usize) -> Vec<WorldEvent> {
        self.world.read().await.news(limit)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_company(
        &self,
        founder_id: &str,
        ticker: &str,
        name: String,
        description: String,
        service_type: String,
        service_cost: f64,
    ) -> Result<Company, EngineError> {
        let now = crate::world::now_ms();
        let (result, events) = {
            let mut world = self.world.write().await;
            let result =
                world.exchange_mut().create_company(founder_id, ticker, name, description, service_type, service_cost, now);
            (result, world.exchange_mut().drain_events())
        };
        self.broadcast(events);
        result
    }

    pub async fn launch_ipo(&self, ticker: &str, shares: f64, price: f64) -> Result<(), EngineError> {
        let now = crate::world::now_ms();
        let (result, events) = {
            let mut world = self.world.write().await;
            let result = world.exchange_mut().launch_ipo(ticker, shares, price, now);
            (result, world.exchange_mut().drain_events())
        };
        self.broadcast(events);
        result
    }

    pub async fn use_service(&self, agent_id: &str, ticker: &str) -> Result<(), EngineError> {
        let now = crate::world::now_ms();
        let mut world = self.world.write().await;
        world.exchange_mut().use_service(agent_id, ticker, now)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn submit_order(
        &self,
        agent_id: &str,
        ticker: &str,
        side: Side,
        order_type: OrderType,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<Order, EngineError> {
        let now = crate::world::now_ms();
        let (result, events) = {
            let mut world = self.world.write().await;
            let result = world.exchange_mut().submit_order(agent_id, ticker, side, order_type, quantity, price, now);
            (result, world.exchange_mut().drain_events())
        };
        self.broadcast(events);
        result
    }

    pub async fn company(&self, ticker: &str) -> Option<Company> {
        self.world.read().await.exchange().company(ticker).cloned()
    }

    pub async fn companies(&self) -> Vec<Company> {
        self.world.read().await.exchange().companies().cloned().collect()
    }

    pub async fn market_data(&self, ticker: &str) -> Option<MarketData> {
        let now = crate::world::now_ms();
        let mut world = self.world.write().await;
        world.exchange_mut().market_data(ticker, now)
    }

    pub async fn trades(&self, ticker: Option<&str>, limit: usize) -> Vec<Trade> {
        let world = self.world.read().await;
        let mut trades: Vec<Trade> = match ticker {
            Some(t) => world.exchange().trades().iter().filter(|tr| tr.ticker.eq_ignore_ascii_case(t)).cloned().collect(),
            None => world.exchange().trades().to_vec(),
        };
        trades.reverse();
        trades.truncate(limit);
        trades
    }
}
