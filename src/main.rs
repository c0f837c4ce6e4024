//! AIVERSE scenario runner.
//!
//! Drives the `engine` crate in-process (no HTTP) through a handful of
//! end-to-end scenarios: IPO bootstrap, a simple cross, a partial fill
//! resting on the book, price-time priority across three sellers, a
//! market order with no counterparty, and a daily dividend cycle. Useful
//! as a smoke test and as a narrated demo of the matching engine.

use engine::{CompanyStatus, Exchange, OrderStatus, OrderType, Side};

fn main() {
    println!("=== AIVERSE Scenario Runner ===");

    simple_cross();
    partial_fill_rests();
    price_time_priority();
    market_order_no_liquidity();
    ipo_bootstrap();
    daily_dividend();
}

fn simple_cross() {
    println!("\n-- E1: simple cross --");
    let mut ex = Exchange::new();
    ex.join("a", "Agent A", 10_000.0, 0);
    ex.join("b", "Agent B", 10_000.0, 0);
    ex.create_company("b", "XYZ", "Xyz Corp".into(), "widgets".into(), "widget-api".into(), 1.0, 0).unwrap();
    ex.launch_ipo("XYZ", 1_000.0, 5.0, 1).unwrap();

    ex.submit_order("a", "XYZ", Side::Buy, OrderType::Limit, 100.0, Some(5.0), 2).unwrap();

    let trade = &ex.trades()[0];
    println!("trade: {} XYZ @ {}", trade.quantity, trade.price);
    println!("a.balance = {:.2}, a.portfolio[XYZ] = {:.2}", ex.agent("a").unwrap().balance, ex.agent("a").unwrap().portfolio["XYZ"]);
}

fn partial_fill_rests() {
    println!("\n-- E2: partial fill rests on the book --");
    let mut ex = Exchange::new();
    ex.join("a", "Agent A", 10_000.0, 0);
    ex.join("b", "Agent B", 10_000.0, 0);
    ex.create_company("b", "XYZ", "Xyz Corp".into(), "widgets".into(), "widget-api".into(), 1.0, 0).unwrap();
    ex.launch_ipo("XYZ", 50.0, 10.0, 1).unwrap();

    let order = ex.submit_order("a", "XYZ", Side::Buy, OrderType::Limit, 100.0, Some(10.0), 2).unwrap();
    println!("order status = {:?}, filled = {}/{}", order.status, order.filled_quantity, order.quantity);

    let (bid, _ask) = ex.spread("XYZ");
    println!("best bid remaining on book: {bid:?}");
}

fn price_time_priority() {
    println!("\n-- E3: price-time priority --");
    let mut ex = Exchange::new();
    ex.join("a", "Agent A", 10_000.0, 0);
    ex.join("b", "Agent B", 10_000.0, 0);
    ex.join("c", "Agent C", 10_000.0, 0);
    ex.create_company("b", "XYZ", "Xyz Corp".into(), "widgets".into(), "widget-api".into(), 1.0, 0).unwrap();
    ex.launch_ipo("XYZ", 10.0, 1.0, 1).unwrap();
    ex.submit_order("c", "XYZ", Side::Buy, OrderType::Limit, 10.0, Some(1.0), 2).unwrap();

    ex.submit_order("b", "XYZ", Side::Sell, OrderType::Limit, 10.0, Some(6.0), 3).unwrap();
    ex.submit_order("c", "XYZ", Side::Sell, OrderType::Limit, 10.0, Some(5.0), 4).unwrap();
    ex.submit_order("a", "XYZ", Side::Buy, OrderType::Limit, 20.0, Some(7.0), 5).unwrap();

    for trade in ex.trades() {
        println!("trade {} @ {} (seller {})", trade.quantity, trade.price, trade.seller_id);
    }
}

fn market_order_no_liquidity() {
    println!("\n-- E4: market order, empty book --");
    let mut ex = Exchange::new();
    ex.join("a", "Agent A", 10_000.0, 0);
    ex.join("b", "Agent B", 10_000.0, 0);
    ex.create_company("b", "XYZ", "Xyz Corp".into(), "widgets".into(), "widget-api".into(), 1.0, 0).unwrap();

    let order = ex.submit_order("a", "XYZ", Side::Buy, OrderType::Market, 10.0, None, 1).unwrap();
    println!("order status = {:?} (no counterparty found)", order.status);
    assert_eq!(order.status, OrderStatus::Cancelled);
}

fn ipo_bootstrap() {
    println!("\n-- E5: IPO bootstrap --");
    let mut ex = Exchange::new();
    ex.join("f", "Founder", 20_000.0, 0);
    ex.create_company("f", "NEW", "New Co".into(), "launches".into(), "launch-api".into(), 1.0, 0).unwrap();
    ex.launch_ipo("NEW", 300_000.0, 10.0, 1).unwrap();

    let company = ex.company("NEW").unwrap();
    println!("status = {:?}, share_price = {}, market_cap = {}", company.status, company.share_price, company.market_cap());
    assert_eq!(company.status, CompanyStatus::Public);
}

fn daily_dividend() {
    println!("\n-- E6: daily dividend --");
    let mut ex = Exchange::new();
    ex.join("founder", "Founder", 20_000.0, 0);
    ex.join("x", "Holder X", 200.0, 0);
    ex.join("y", "Holder Y", 1_000.0, 0);
    ex.create_company("founder", "DIV", "Dividend Co".into(), "apis".into(), "api-calls".into(), 1.0, 0).unwrap();
    ex.launch_ipo("DIV", 1_000.0, 1.0, 1).unwrap();
    ex.submit_order("x", "DIV", Side::Buy, OrderType::Limit, 100.0, Some(1.0), 2).unwrap();
    ex.submit_order("y", "DIV", Side::Buy, OrderType::Limit, 900.0, Some(1.0), 3).unwrap();
    ex.use_service("founder", "DIV", 4).unwrap();

    ex.run_daily_cycle(0.0, 0.1, 100);
    println!("x.balance = {:.4}, y.balance = {:.4}", ex.agent("x").unwrap().balance, ex.agent("y").unwrap().balance);
}
