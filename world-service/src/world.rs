//! The `World` state machine: owns the `Exchange`, the tick counter,
//! and cold-start bootstrap. Events raised during a mutation are
//! buffered and handed to the caller as a batch, to be fanned out over
//! a broadcast channel only after the world lock is released.

use crate::config::{self, Config};
use engine::{Company, Exchange, WorldEvent};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub struct World {
    exchange: Exchange,
    tick: u64,
    started_at: u128,
}

#[derive(serde::Serialize)]
pub struct StateSnapshot {
    pub tick: u64,
    pub uptime_hours: f64,
    pub agent_count: usize,
    pub company_count: usize,
    pub market_caps: std::collections::HashMap<String, f64>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(serde::Serialize)]
pub struct LeaderboardEntry {
    pub agent_id: String,
    pub name: String,
    pub net_worth: f64,
}

impl World {
    pub fn bootstrap(now: u128) -> Self {
        let mut exchange = Exchange::new();
        exchange.join(config::SYSTEM_AGENT_ID, "System", config::SYSTEM_AGENT_BALANCE, now);

        for (ticker, name, service_type, service_cost) in config::SEED_COMPANIES {
            exchange
                .create_company(
                    config::SYSTEM_AGENT_ID,
                    ticker,
                    name.to_string(),
                    format!("{name} — a seed company of the AIVERSE economy"),
                    service_type.to_string(),
                    service_cost,
                    now,
                )
                .expect("seed company tickers are unique and system agent is funded");

            let company = exchange.company(ticker).expect("just created").clone();
            let shares = company.total_shares * config::SEED_IPO_FRACTION;
            let price = service_cost * config::SEED_IPO_PRICE_MULTIPLIER;
            exchange
                .launch_ipo(ticker, shares, price, now)
                .expect("seed company is PRIVATE and founder holds all shares");
        }

        exchange.drain_events();
        info!(seed_companies = config::SEED_COMPANIES.len(), "world bootstrapped");

        Self { exchange, tick: 0, started_at: now }
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn exchange_mut(&mut self) -> &mut Exchange {
        &mut self.exchange
    }

    /// Advances the world clock by one tick, running the daily cycle
    /// every `TICKS_PER_DAY` ticks. Returns the events appended this
    /// tick (drained, ready for the caller to fan out after unlocking).
    pub fn tick(&mut self, now: u128) -> Vec<WorldEvent> {
        self.tick += 1;
        if self.tick % config::TICKS_PER_DAY == 0 {
            info!(tick = self.tick, "running daily cycle");
            self.exchange.run_daily_cycle(config::DAILY_INCOME, config::DIVIDEND_RATE, now);
        }
        self.exchange.drain_events()
    }

    pub fn state(&self) -> StateSnapshot {
        let market_caps = self
            .exchange
            .companies()
            .map(|c: &Company| (c.ticker.clone(), c.market_cap()))
            .collect();

        let leaderboard = self
            .exchange
            .leaderboard(usize::MAX)
            .into_iter()
            .filter(|(agent, _)| agent.id != config::SYSTEM_AGENT_ID)
            .take(5)
            .map(|(agent, net_worth)| LeaderboardEntry {
                agent_id: agent.id.clone(),
                name: agent.name.clone(),
                net_worth,
            })
            .collect();

        let uptime_ms = now_ms().saturating_sub(self.started_at) as f64;

        StateSnapshot {
            tick: self.tick,
            uptime_hours: uptime_ms / (1000.0 * 60.0 * 60.0),
            agent_count: self.exchange.agents().filter(|a| a.id != config::SYSTEM_AGENT_ID).count(),
            company_count: self.exchange.companies().count(),
            market_caps,
            leaderboard,
        }
    }

    pub fn news(&self, limit: usize) -> Vec<WorldEvent> {
        self.exchange.news(limit)
    }
}

pub fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis()
}

pub fn spawn_tick_loop(state: std::sync::Arc<tokio::sync::RwLock<World>>, events_tx: tokio::sync::broadcast::Sender<WorldEvent>, cfg: &Config) {
    let interval_ms = cfg.tick_interval_ms;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
        loop {
            interval.tick().await;
            let events = {
                let mut world = state.write().await;
                world.tick(now_ms())
            };
            for event in events {
                let _ = events_tx.send(event);
            }
        }
    });
}
