//! The matching engine aggregate: agents, companies, order books, the
//! order index and the trade/event logs all live behind one `Exchange`
//! value, meant to sit behind one caller-supplied lock. Settlement
//! touches Agent balances and portfolios that span tickers, so per-book
//! locking can't preserve atomicity here — the aggregate is the lock
//! boundary, not the individual book.

use crate::book::OrderBook;
use crate::model::{
    Agent, AgentId, Company, CompanyStatus, MarketData, Order, OrderStatus, OrderType,
    ServiceUsage, Side, Ticker, Trade, WorldEvent, WorldEventType,
};
use std::collections::HashMap;

pub const CREATION_COST: f64 = 10_000.0;

#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    AgentNotFound(AgentId),
    CompanyNotFound(Ticker),
    TickerCollision(Ticker),
    InvalidOrder(String),
    InsufficientFunds,
    InsufficientHoldings,
    WrongCompanyStatus,
    CompanyBankrupt,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::AgentNotFound(id) => write!(f, "agent '{id}' not found"),
            EngineError::CompanyNotFound(t) => write!(f, "company '{t}' not found"),
            EngineError::TickerCollision(t) => write!(f, "ticker '{t}' already exists"),
            EngineError::InvalidOrder(msg) => write!(f, "invalid order: {msg}"),
            EngineError::InsufficientFunds => write!(f, "insufficient funds"),
            EngineError::InsufficientHoldings => write!(f, "insufficient holdings"),
            EngineError::WrongCompanyStatus => write!(f, "company is not in the required state"),
            EngineError::CompanyBankrupt => write!(f, "company is bankrupt"),
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Default)]
pub struct Exchange {
    agents: HashMap<AgentId, Agent>,
    companies: HashMap<Ticker, Company>,
    books: HashMap<Ticker, OrderBook>,
    orders: HashMap<String, Order>,
    trades: Vec<Trade>,
    price_history: HashMap<Ticker, Vec<(u128, f64)>>,
    service_log: Vec<ServiceUsage>,
    events: Vec<WorldEvent>,
}

impl Exchange {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- agents -------------------------------------------------------

    /// Idempotent: re-joining an existing id returns that Agent unchanged.
    pub fn join(&mut self, agent_id: &str, name: &str, starting_balance: f64, now: u128) -> Agent {
        if let Some(existing) = self.agents.get(agent_id) {
            return existing.clone();
        }
        let agent = Agent::new(agent_id, name, starting_balance, now);
        self.agents.insert(agent_id.to_string(), agent.clone());
        self.push_event(
            WorldEventType::Join,
            None,
            Some(agent_id.to_string()),
            serde_json::json!({ "name": name }),
            format!("{name} joined AIVERSE"),
            now,
        );
        agent
    }

    pub fn agent(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.get(agent_id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn company(&self, ticker: &str) -> Option<&Company> {
        self.companies.get(ticker)
    }

    pub fn companies(&self) -> impl Iterator<Item = &Company> {
        self.companies.values()
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn price_history(&self, ticker: &str) -> &[(u128, f64)] {
        self.price_history
            .get(ticker)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Audit log of every `use_service` call, successful or not.
    pub fn service_log(&self) -> &[ServiceUsage] {
        &self.service_log
    }

    /// Ranked by net worth (cash + reserved + marked-to-last-price
    /// holdings), descending. The caller filters out the system agent.
    pub fn leaderboard(&self, limit: usize) -> Vec<(&Agent, f64)> {
        let prices: HashMap<Ticker, f64> = self
            .companies
            .values()
            .map(|c| (c.ticker.clone(), c.share_price))
            .collect();
        let mut ranked: Vec<(&Agent, f64)> = self
            .agents
            .values()
            .map(|a| (a, a.net_worth(&prices)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(limit);
        ranked
    }

    /// Drains and returns events appended since the last drain. Callers
    /// must release any exclusive lock before fanning these out.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn news(&self, limit: usize) -> Vec<WorldEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    // ---- companies ------------------------------------------------------

    pub fn create_company(
        &mut self,
        founder_id: &str,
        ticker: &str,
        name: String,
        description: String,
        service_type: String,
        service_cost: f64,
        now: u128,
    ) -> Result<Company, EngineError> {
        let ticker = ticker.to_uppercase();
        if self.companies.contains_key(&ticker) {
            return Err(EngineError::TickerCollision(ticker));
        }
        let founder = self
            .agents
            .get(founder_id)
            .ok_or_else(|| EngineError::AgentNotFound(founder_id.to_string()))?;
        if founder.balance < CREATION_COST {
            return Err(EngineError::InsufficientFunds);
        }

        let total_shares = 1_000_000.0;
        let company = Company {
            ticker: ticker.clone(),
            name,
            description,
            founder_id: founder_id.to_string(),
            status: CompanyStatus::Private,
            total_shares,
            public_shares: 0.0,
            share_price: 1.0,
            service_type,
            service_cost,
            revenue: 0.0,
            total_api_calls: 0,
            daily_active_users: 0,
            created_at: now,
        };

        let founder = self.agents.get_mut(founder_id).expect("checked above");
        founder.balance -= CREATION_COST;
        founder.credit_shares(&ticker, total_shares);

        self.companies.insert(ticker.clone(), company.clone());
        self.books.insert(ticker.clone(), OrderBook::new());

        self.push_event(
            WorldEventType::CompanyCreated,
            Some(ticker.clone()),
            Some(founder_id.to_string()),
            serde_json::json!({ "name": company.name }),
            format!("{} founded {}", company.name, ticker),
            now,
        );

        Ok(company)
    }

    /// PRIVATE -> PUBLIC (via IPO). Source only accepts from PRIVATE;
    /// re-IPO of an already-PUBLIC company is rejected (confirmed, not
    /// guessed: source checks `== PRIVATE`).
    pub fn launch_ipo(
        &mut self,
        ticker: &str,
        shares: f64,
        price: f64,
        now: u128,
    ) -> Result<(), EngineError> {
        let ticker = ticker.to_uppercase();
        let company = self
            .companies
            .get(&ticker)
            .ok_or_else(|| EngineError::CompanyNotFound(ticker.clone()))?;
        if company.status != CompanyStatus::Private {
            return Err(EngineError::WrongCompanyStatus);
        }
        let founder_id = company.founder_id.clone();
        let founder_holding = self
            .agents
            .get(&founder_id)
            .and_then(|a| a.portfolio.get(&ticker))
            .copied()
            .unwrap_or(0.0);
        if founder_holding < shares {
            return Err(EngineError::InsufficientHoldings);
        }

        let company = self.companies.get_mut(&ticker).expect("checked above");
        company.status = CompanyStatus::Ipo;
        company.public_shares = shares;
        company.share_price = price;

        let order_id = uuid::Uuid::new_v4().to_string();
        let order = Order {
            id: order_id.clone(),
            agent_id: founder_id.clone(),
            ticker: ticker.clone(),
            side: Side::Sell,
            order_type: OrderType::Limit,
            quantity: shares,
            price: Some(price),
            status: OrderStatus::Pending,
            filled_quantity: 0.0,
            filled_price: 0.0,
            created_at: now,
            filled_at: None,
        };
        self.orders.insert(order_id.clone(), order);

        // Route through the same matching loop as any other LIMIT order:
        // an agent may already have a resting BUY on this ticker (created
        // while the company was still PRIVATE, submit_order has no
        // status gate on that), and it must cross immediately rather
        // than leave a crossed book for some later order to clear.
        self.run_matching(&order_id, now);
        let resting = self.orders.get(&order_id).expect("just inserted").is_resting_eligible();
        if resting {
            self.books
                .get_mut(&ticker)
                .expect("book created with company")
                .add(Side::Sell, price, order_id);
        }

        let company = self.companies.get_mut(&ticker).expect("checked above");
        company.status = CompanyStatus::Public;

        self.push_event(
            WorldEventType::Ipo,
            Some(ticker.clone()),
            Some(founder_id),
            serde_json::json!({ "shares": shares, "price": price }),
            format!("{ticker} went public: {shares} shares @ {price}"),
            now,
        );
        Ok(())
    }

    pub fn use_service(&mut self, agent_id: &str, ticker: &str, now: u128) -> Result<(), EngineError> {
        let ticker = ticker.to_uppercase();
        let cost = {
            let company = self
                .companies
                .get(&ticker)
                .ok_or_else(|| EngineError::CompanyNotFound(ticker.clone()))?;
            if company.status == CompanyStatus::Bankrupt {
                return Err(EngineError::CompanyBankrupt);
            }
            company.service_cost
        };
        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;
        if agent.balance < cost {
            self.service_log.push(ServiceUsage {
                timestamp: now,
                agent_id: agent_id.to_string(),
                ticker,
                cost,
                success: false,
            });
            return Err(EngineError::InsufficientFunds);
        }

        self.agents.get_mut(agent_id).expect("checked above").balance -= cost;
        let company = self.companies.get_mut(&ticker).expect("checked above");
        company.revenue += cost;
        company.total_api_calls += 1;

        self.service_log.push(ServiceUsage {
            timestamp: now,
            agent_id: agent_id.to_string(),
            ticker,
            cost,
            success: true,
        });
        Ok(())
    }

    // ---- order submission / matching ------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn submit_order(
        &mut self,
        agent_id: &str,
        ticker: &str,
        side: Side,
        order_type: OrderType,
        quantity: f64,
        price: Option<f64>,
        now: u128,
    ) -> Result<Order, EngineError> {
        let ticker = ticker.to_uppercase();
        if quantity <= 0.0 || !quantity.is_finite() {
            return Err(EngineError::InvalidOrder("quantity must be positive".into()));
        }
        if order_type == OrderType::Limit {
            match price {
                Some(p) if p > 0.0 && p.is_finite() => {}
                _ => return Err(EngineError::InvalidOrder("limit orders require a positive price".into())),
            }
        }
        if !self.agents.contains_key(agent_id) {
            return Err(EngineError::AgentNotFound(agent_id.to_string()));
        }
        if !self.companies.contains_key(&ticker) {
            return Err(EngineError::CompanyNotFound(ticker));
        }

        let effective_price = match (order_type, price) {
            (OrderType::Limit, Some(p)) => p,
            _ => self.reference_price(&ticker, side),
        };

        match side {
            Side::Buy => {
                let agent = self.agents.get(agent_id).expect("checked above");
                if agent.balance < quantity * effective_price {
                    return Err(EngineError::InsufficientFunds);
                }
            }
            Side::Sell => {
                let held = self
                    .agents
                    .get(agent_id)
                    .and_then(|a| a.portfolio.get(&ticker))
                    .copied()
                    .unwrap_or(0.0);
                if held < quantity {
                    return Err(EngineError::InsufficientHoldings);
                }
            }
        }

        let order_id = uuid::Uuid::new_v4().to_string();
        let order = Order {
            id: order_id.clone(),
            agent_id: agent_id.to_string(),
            ticker: ticker.clone(),
            side,
            order_type,
            quantity,
            price: if order_type == OrderType::Limit { price } else { Some(effective_price) },
            status: OrderStatus::Pending,
            filled_quantity: 0.0,
            filled_price: 0.0,
            created_at: now,
            filled_at: None,
        };
        self.orders.insert(order_id.clone(), order);

        self.run_matching(&order_id, now);

        let order_after = self.orders.get(&order_id).expect("just inserted").clone();
        if order_type == OrderType::Market {
            if order_after.filled_quantity <= 0.0 {
                let o = self.orders.get_mut(&order_id).expect("just inserted");
                o.status = OrderStatus::Cancelled;
            }
        } else if order_after.is_resting_eligible() {
            let limit_price = order_after.price.expect("limit order has a price");
            if side == Side::Buy {
                let notional_remaining = order_after.remaining() * limit_price;
                let agent = self.agents.get_mut(agent_id).expect("checked above");
                agent.balance -= notional_remaining;
                agent.reserved += notional_remaining;
            }
            self.books
                .get_mut(&order_after.ticker)
                .expect("book exists for known ticker")
                .add(side, limit_price, order_id.clone());
        }

        Ok(self.orders.get(&order_id).expect("just inserted").clone())
    }

    /// Best ask for a BUY, best bid for a SELL, falling back to the
    /// company's last share price when the book has no eligible side.
    fn reference_price(&self, ticker: &str, side: Side) -> f64 {
        let opposite = side.opposite();
        let book_price = self.books.get(ticker).and_then(|b| b.peek_best_price(opposite, &self.orders, &self.agents));
        book_price.unwrap_or_else(|| self.companies.get(ticker).map(|c| c.share_price).unwrap_or(0.0))
    }

    fn run_matching(&mut self, order_id: &str, now: u128) {
        loop {
            let (ticker, side, order_type, limit_price, remaining, agent_id) = {
                let order = self.orders.get(order_id).expect("order exists");
                if order.remaining() <= 0.0 {
                    return;
                }
                (
                    order.ticker.clone(),
                    order.side,
                    order.order_type,
                    order.price,
                    order.remaining(),
                    order.agent_id.clone(),
                )
            };

            let opposite = side.opposite();
            let counter_id = match self
                .books
                .get_mut(&ticker)
                .expect("book exists")
                .best_id(opposite, &self.orders, &self.agents)
            {
                Some(id) => id,
                None => return,
            };
            let counter = self.orders.get(&counter_id).expect("resting order indexed").clone();
            let trade_price = counter.price.expect("resting order has a price");

            if order_type == OrderType::Limit {
                let my_price = limit_price.expect("limit order has a price");
                let crosses = match side {
                    Side::Buy => trade_price <= my_price,
                    Side::Sell => trade_price >= my_price,
                };
                if !crosses {
                    return;
                }
            }

            let mut trade_qty = remaining.min(counter.remaining());

            if order_type == OrderType::Market && side == Side::Buy {
                let affordable = self.agents.get(&agent_id).map(|a| a.balance / trade_price).unwrap_or(0.0);
                trade_qty = trade_qty.min(affordable.max(0.0));
                if trade_qty <= 0.0 {
                    return;
                }
            }

            let (buyer_order_id, seller_order_id, buyer_is_maker) = match side {
                Side::Buy => (order_id.to_string(), counter_id.clone(), false),
                Side::Sell => (counter_id.clone(), order_id.to_string(), true),
            };

            self.settle(&buyer_order_id, &seller_order_id, &ticker, trade_qty, trade_price, buyer_is_maker, now);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn settle(
        &mut self,
        buyer_order_id: &str,
        seller_order_id: &str,
        ticker: &str,
        qty: f64,
        price: f64,
        buyer_is_maker: bool,
        now: u128,
    ) {
        let notional = qty * price;
        let buyer_id = self.orders.get(buyer_order_id).expect("order exists").agent_id.clone();
        let seller_id = self.orders.get(seller_order_id).expect("order exists").agent_id.clone();

        {
            let buyer = self.agents.get_mut(&buyer_id).expect("agent exists");
            if buyer_is_maker {
                buyer.reserved -= notional;
                assert!(buyer.reserved >= -1e-6, "reserved cash went negative");
                buyer.reserved = buyer.reserved.max(0.0);
            } else {
                buyer.balance -= notional;
                assert!(buyer.balance >= -1e-6, "buyer overdrawn");
                buyer.balance = buyer.balance.max(0.0);
            }
            buyer.credit_shares(ticker, qty);
            buyer.total_trades += 1;
        }
        {
            let seller = self.agents.get_mut(&seller_id).expect("agent exists");
            seller.balance += notional;
            seller.debit_shares(ticker, qty);
            seller.total_trades += 1;
        }

        for id in [buyer_order_id, seller_order_id] {
            let order = self.orders.get_mut(id).expect("order exists");
            order.filled_quantity += qty;
            order.filled_price = price;
            if order.filled_quantity + 1e-9 >= order.quantity {
                order.status = OrderStatus::Filled;
                order.filled_at = Some(now);
            } else {
                order.status = OrderStatus::Partial;
            }
        }

        let trade = Trade {
            id: uuid::Uuid::new_v4().to_string(),
            ticker: ticker.to_string(),
            buyer_id: buyer_id.clone(),
            seller_id: seller_id.clone(),
            quantity: qty,
            price,
            timestamp: now,
            buyer_order_id: buyer_order_id.to_string(),
            seller_order_id: seller_order_id.to_string(),
        };
        self.trades.push(trade);
        self.price_history.entry(ticker.to_string()).or_default().push((now, price));

        if let Some(company) = self.companies.get_mut(ticker) {
            company.share_price = price;
        }

        self.push_event(
            WorldEventType::Trade,
            Some(ticker.to_string()),
            None,
            serde_json::json!({ "quantity": qty, "price": price, "buyer": buyer_id, "seller": seller_id }),
            format!("{qty} {ticker} traded @ {price}"),
            now,
        );
    }

    // ---- market data ------------------------------------------------------

    pub fn spread(&mut self, ticker: &str) -> (Option<f64>, Option<f64>) {
        match self.books.get_mut(ticker) {
            Some(book) => book.spread(&self.orders, &self.agents),
            None => (None, None),
        }
    }

    pub fn market_data(&mut self, ticker: &str, now: u128) -> Option<MarketData> {
        let company = self.companies.get(ticker)?.clone();
        let last_price = company.share_price;
        let (bid, ask) = self.spread(ticker);

        let window_start = now.saturating_sub(24 * 60 * 60 * 1000);
        let history = self.price_history(ticker);
        let in_window: Vec<(u128, f64)> = history
            .iter()
            .copied()
            .filter(|(ts, _)| *ts > window_start)
            .collect();

        let high_24h = in_window.iter().map(|(_, p)| *p).fold(f64::MIN, f64::max);
        let high_24h = if high_24h == f64::MIN { last_price } else { high_24h };
        let low_24h = in_window.iter().map(|(_, p)| *p).fold(f64::MAX, f64::min);
        let low_24h = if low_24h == f64::MAX { last_price } else { low_24h };
        let change_24h = match in_window.first() {
            Some((_, first)) if *first != 0.0 => ((last_price - first) / first) * 100.0,
            _ => 0.0,
        };
        let volume_24h: f64 = self
            .trades
            .iter()
            .filter(|t| t.ticker == ticker && t.timestamp > window_start)
            .map(|t| t.quantity * t.price)
            .sum();

        Some(MarketData {
            last_price,
            bid: bid.unwrap_or(0.0),
            ask: ask.unwrap_or(0.0),
            volume_24h,
            high_24h,
            low_24h,
            change_24h,
            market_cap: company.market_cap(),
        })
    }

    // ---- daily cycle ------------------------------------------------------

    /// Income grant, dividend distribution, bankruptcy detection. Driven
    /// by `world_service::world`'s tick counter (every 1,440 ticks).
    pub fn run_daily_cycle(&mut self, income_grant: f64, dividend_rate: f64, now: u128) {
        for agent in self.agents.values_mut() {
            agent.balance += income_grant;
        }

        let public_tickers: Vec<Ticker> = self
            .companies
            .values()
            .filter(|c| c.status == CompanyStatus::Public && c.revenue > 0.0)
            .map(|c| c.ticker.clone())
            .collect();
        for ticker in public_tickers {
            let (total_dividend, total_shares) = {
                let company = self.companies.get(&ticker).expect("listed above");
                (company.revenue * dividend_rate, company.total_shares)
            };
            let dividend_per_share = total_dividend / total_shares;
            for agent in self.agents.values_mut() {
                if let Some(held) = agent.portfolio.get(&ticker).copied() {
                    agent.balance += held * dividend_per_share;
                }
            }
            self.companies.get_mut(&ticker).expect("listed above").revenue = 0.0;
            self.push_event(
                WorldEventType::Dividend,
                Some(ticker.clone()),
                None,
                serde_json::json!({ "total_dividend": total_dividend, "per_share": dividend_per_share }),
                format!("{ticker} paid a dividend of {dividend_per_share} per share"),
                now,
            );
        }

        let bankrupt_tickers: Vec<Ticker> = self
            .companies
            .values()
            .filter(|c| c.status == CompanyStatus::Public && c.total_api_calls == 0 && c.share_price < 0.01)
            .map(|c| c.ticker.clone())
            .collect();
        for ticker in bankrupt_tickers {
            for agent in self.agents.values_mut() {
                agent.portfolio.remove(&ticker);
            }
            let company = self.companies.get_mut(&ticker).expect("listed above");
            company.status = CompanyStatus::Bankrupt;
            company.share_price = 0.0;
            self.push_event(
                WorldEventType::Bankruptcy,
                Some(ticker.clone()),
                None,
                serde_json::json!({}),
                format!("{ticker} has gone bankrupt"),
                now,
            );
        }
    }

    fn push_event(
        &mut self,
        event_type: WorldEventType,
        ticker: Option<Ticker>,
        agent_id: Option<AgentId>,
        data: serde_json::Value,
        message: String,
        now: u128,
    ) {
        self.events.push(WorldEvent {
            timestamp: now,
            event_type,
            ticker,
            agent_id,
            data,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_two_agents(ex: &mut Exchange) {
        ex.join("a", "Agent A", 10_000.0, 0);
        ex.join("b", "Agent B", 10_000.0, 0);
    }

    fn seed_ticker(ex: &mut Exchange, ticker: &str, owner: &str, shares: f64) {
        ex.companies.insert(
            ticker.to_string(),
            Company {
                ticker: ticker.to_string(),
                name: ticker.to_string(),
                description: String::new(),
                founder_id: owner.to_string(),
                status: CompanyStatus::Public,
                total_shares: 1000.0,
                public_shares: shares,
                share_price: 5.0,
                service_type: "test".to_string(),
                service_cost: 1.0,
                revenue: 0.0,
                total_api_calls: 0,
                daily_active_users: 0,
                created_at: 0,
            },
        );
        ex.books.insert(ticker.to_string(), OrderBook::new());
        ex.agents.get_mut(owner).unwrap().credit_shares(ticker, shares);
    }

    #[test]
    fn e1_simple_cross() {
        let mut ex = Exchange::new();
        seed_two_agents(&mut ex);
        seed_ticker(&mut ex, "XYZ", "b", 1000.0);

        ex.submit_order("b", "XYZ", Side::Sell, OrderType::Limit, 100.0, Some(5.0), 1).unwrap();
        ex.submit_order("a", "XYZ", Side::Buy, OrderType::Limit, 100.0, Some(5.0), 2).unwrap();

        assert_eq!(ex.trades().len(), 1);
        let trade = &ex.trades()[0];
        assert_eq!(trade.quantity, 100.0);
        assert_eq!(trade.price, 5.0);
        assert_eq!(ex.agent("a").unwrap().balance, 9_500.0);
        assert_eq!(*ex.agent("a").unwrap().portfolio.get("XYZ").unwrap(), 100.0);
        assert_eq!(ex.agent("b").unwrap().balance, 10_500.0);
        assert_eq!(*ex.agent("b").unwrap().portfolio.get("XYZ").unwrap(), 900.0);
        assert_eq!(ex.company("XYZ").unwrap().share_price, 5.0);
    }

    #[test]
    fn e2_partial_fill_rests_with_escrow() {
        let mut ex = Exchange::new();
        seed_two_agents(&mut ex);
        seed_ticker(&mut ex, "XYZ", "b", 1000.0);

        ex.submit_order("b", "XYZ", Side::Sell, OrderType::Limit, 50.0, Some(10.0), 1).unwrap();
        let order = ex.submit_order("a", "XYZ", Side::Buy, OrderType::Limit, 100.0, Some(10.0), 2).unwrap();

        assert_eq!(order.status, OrderStatus::Partial);
        assert_eq!(order.filled_quantity, 50.0);
        let (bid, _ask) = ex.spread("XYZ");
        assert_eq!(bid, Some(10.0));
        let a = ex.agent("a").unwrap();
        assert_eq!(a.balance, 10_000.0 - 500.0 - 500.0);
        assert_eq!(a.reserved, 500.0);
    }

    #[test]
    fn e3_price_time_priority() {
        let mut ex = Exchange::new();
        seed_two_agents(&mut ex);
        ex.join("c", "Agent C", 10_000.0, 0);
        seed_ticker(&mut ex, "XYZ", "b", 1000.0);
        ex.agents.get_mut("c").unwrap().credit_shares("XYZ", 10.0);

        ex.submit_order("b", "XYZ", Side::Sell, OrderType::Limit, 10.0, Some(6.0), 1).unwrap();
        ex.submit_order("c", "XYZ", Side::Sell, OrderType::Limit, 10.0, Some(5.0), 2).unwrap();
        ex.submit_order("a", "XYZ", Side::Buy, OrderType::Limit, 20.0, Some(7.0), 3).unwrap();

        assert_eq!(ex.trades().len(), 2);
        assert_eq!(ex.trades()[0].seller_id, "c");
        assert_eq!(ex.trades()[0].price, 5.0);
        assert_eq!(ex.trades()[1].seller_id, "b");
        assert_eq!(ex.trades()[1].price, 6.0);
    }

    #[test]
    fn e4_market_no_liquidity_cancels() {
        let mut ex = Exchange::new();
        seed_two_agents(&mut ex);
        seed_ticker(&mut ex, "XYZ", "b", 1000.0);

        let order = ex.submit_order("a", "XYZ", Side::Buy, OrderType::Market, 10.0, None, 1).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.filled_quantity, 0.0);
        assert_eq!(ex.agent("a").unwrap().balance, 10_000.0);
    }

    #[test]
    fn e5_ipo_bootstrap() {
        let mut ex = Exchange::new();
        ex.join("f", "Founder", 20_000.0, 0);
        ex.create_company("f", "NEW", "New Co".into(), "desc".into(), "svc".into(), 1.0, 0).unwrap();
        ex.launch_ipo("NEW", 300_000.0, 10.0, 1).unwrap();

        let company = ex.company("NEW").unwrap();
        assert_eq!(company.status, CompanyStatus::Public);
        assert_eq!(company.share_price, 10.0);
        let founder = ex.agent("f").unwrap();
        assert_eq!(*founder.portfolio.get("NEW").unwrap(), 1_000_000.0);
    }

    #[test]
    fn ipo_crosses_a_resting_bid_instead_of_leaving_book_crossed() {
        let mut ex = Exchange::new();
        ex.join("f", "Founder", 20_000.0, 0);
        ex.join("buyer", "Buyer", 10_000.0, 0);
        ex.create_company("f", "NEW", "New Co".into(), "desc".into(), "svc".into(), 1.0, 0).unwrap();

        // submit_order has no company-status gate, so a bid can land on a
        // still-PRIVATE company ahead of its IPO.
        ex.submit_order("buyer", "NEW", Side::Buy, OrderType::Limit, 100.0, Some(10.0), 1).unwrap();

        ex.launch_ipo("NEW", 300_000.0, 10.0, 2).unwrap();

        assert_eq!(ex.trades().len(), 1);
        let trade = &ex.trades()[0];
        assert_eq!(trade.quantity, 100.0);
        assert_eq!(trade.price, 10.0);
        assert_eq!(*ex.agent("buyer").unwrap().portfolio.get("NEW").unwrap(), 100.0);
        assert_eq!(*ex.agent("f").unwrap().portfolio.get("NEW").unwrap(), 999_900.0);

        let (bid, ask) = ex.spread("NEW");
        assert_eq!(bid, None, "the crossing bid must not still be resting");
        assert_eq!(ask, Some(10.0));
    }

    #[test]
    fn e6_daily_dividend() {
        let mut ex = Exchange::new();
        ex.join("x", "X", 0.0, 0);
        ex.join("y", "Y", 0.0, 0);
        ex.companies.insert(
            "C".to_string(),
            Company {
                ticker: "C".to_string(),
                name: "C".to_string(),
                description: String::new(),
                founder_id: "x".to_string(),
                status: CompanyStatus::Public,
                total_shares: 1_000_000.0,
                public_shares: 1000.0,
                share_price: 1.0,
                service_type: "svc".to_string(),
                service_cost: 1.0,
                revenue: 1000.0,
                total_api_calls: 5,
                daily_active_users: 0,
                created_at: 0,
            },
        );
        ex.agents.get_mut("x").unwrap().credit_shares("C", 100.0);
        ex.agents.get_mut("y").unwrap().credit_shares("C", 900.0);

        ex.run_daily_cycle(0.0, 0.1, 1);

        assert!((ex.agent("x").unwrap().balance - 0.01).abs() < 1e-9);
        assert!((ex.agent("y").unwrap().balance - 0.09).abs() < 1e-9);
        assert_eq!(ex.company("C").unwrap().revenue, 0.0);
    }

    #[test]
    fn idempotent_join() {
        let mut ex = Exchange::new();
        let first = ex.join("a", "Agent A", 1000.0, 0);
        ex.agents.get_mut("a").unwrap().balance = 50.0;
        let second = ex.join("a", "Agent A", 1000.0, 5);
        assert_eq!(first.id, second.id);
        assert_eq!(second.balance, 50.0);
    }

    #[test]
    fn self_trade_is_allowed_and_net_neutral() {
        let mut ex = Exchange::new();
        ex.join("a", "Agent A", 10_000.0, 0);
        seed_ticker(&mut ex, "XYZ", "a", 1000.0);

        ex.submit_order("a", "XYZ", Side::Sell, OrderType::Limit, 10.0, Some(5.0), 1).unwrap();
        ex.submit_order("a", "XYZ", Side::Buy, OrderType::Limit, 10.0, Some(5.0), 2).unwrap();

        assert_eq!(ex.trades().len(), 1);
        assert_eq!(ex.agent("a").unwrap().balance, 10_000.0);
        assert_eq!(*ex.agent("a").unwrap().portfolio.get("XYZ").unwrap(), 1000.0);
    }

    #[test]
    fn bankruptcy_wipes_portfolios_and_price() {
        let mut ex = Exchange::new();
        ex.join("x", "X", 0.0, 0);
        ex.companies.insert(
            "D".to_string(),
            Company {
                ticker: "D".to_string(),
                name: "D".to_string(),
                description: String::new(),
                founder_id: "x".to_string(),
                status: CompanyStatus::Public,
                total_shares: 1000.0,
                public_shares: 100.0,
                share_price: 0.001,
                service_type: "svc".to_string(),
                service_cost: 1.0,
                revenue: 0.0,
                total_api_calls: 0,
                daily_active_users: 0,
                created_at: 0,
            },
        );
        ex.agents.get_mut("x").unwrap().credit_shares("D", 100.0);

        ex.run_daily_cycle(0.0, 0.1, 1);

        assert_eq!(ex.company("D").unwrap().status, CompanyStatus::Bankrupt);
        assert_eq!(ex.company("D").unwrap().share_price, 0.0);
        assert!(ex.agent("x").unwrap().portfolio.get("D").is_none());
    }
}
