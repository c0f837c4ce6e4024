//! World configuration: bind address and simulation constants, read
//! once at boot from the environment. No config crate — plain
//! `std::env` lookups with hardcoded defaults are enough for the knobs
//! this service exposes.

use std::env;

pub const CREATION_COST: f64 = engine::CREATION_COST;
pub const STARTING_BALANCE: f64 = 1_000.0;
pub const DAILY_INCOME: f64 = 1_000.0;
pub const DIVIDEND_RATE: f64 = 0.1;
pub const TICKS_PER_DAY: u64 = 1_440;

pub const SYSTEM_AGENT_ID: &str = "system";
pub const SYSTEM_AGENT_BALANCE: f64 = 1_000_000_000.0;

/// `(ticker, name, service_type, service_cost)` for the five companies
/// the system agent founds and IPOs on cold start.
pub const SEED_COMPANIES: [(&str, &str, &str, f64); 5] = [
    ("CTX", "Context Corp", "context-window-api", 5.0),
    ("PROMPT", "Promptworks", "prompt-optimization", 3.0),
    ("FACT", "Factbase", "fact-checking-api", 2.0),
    ("TOKEN", "Tokenomics", "token-pricing-api", 1.0),
    ("MOOD", "Moodring", "sentiment-api", 4.0),
];

/// Seed IPOs float this fraction of `total_shares`, per spec bootstrap.
pub const SEED_IPO_FRACTION: f64 = 0.3;
/// Seed IPO price is the company's service cost times this multiplier.
pub const SEED_IPO_PRICE_MULTIPLIER: f64 = 10.0;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub tick_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let tick_interval_ms = env::var("TICK_INTERVAL_MS")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(60_000);
        Self { host, port, tick_interval_ms }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
