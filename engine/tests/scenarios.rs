//! End-to-end flows against the public `Exchange` API only: company
//! creation, IPO, trading, service revenue, and the daily cycle acting
//! together, as a client of this crate would drive it (no HTTP layer).

use engine::{CompanyStatus, Exchange, OrderStatus, OrderType, Side};

#[test]
fn full_lifecycle_creation_to_dividend() {
    let mut ex = Exchange::new();

    ex.join("founder", "Founder", 20_000.0, 0);
    ex.join("trader", "Trader", 50_000.0, 0);

    let company = ex
        .create_company(
            "founder",
            "acme",
            "Acme Inc".into(),
            "widgets".into(),
            "widget-api".into(),
            2.0,
            0,
        )
        .unwrap();
    assert_eq!(company.ticker, "ACME");
    assert_eq!(company.status, CompanyStatus::Private);
    assert_eq!(ex.agent("founder").unwrap().balance, 20_000.0 - 10_000.0);

    ex.launch_ipo("ACME", 300_000.0, 10.0, 1).unwrap();
    assert_eq!(ex.company("ACME").unwrap().status, CompanyStatus::Public);

    let order = ex
        .submit_order("trader", "ACME", Side::Buy, OrderType::Limit, 1_000.0, Some(10.0), 2)
        .unwrap();
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(ex.trades().len(), 1);
    assert_eq!(ex.agent("trader").unwrap().balance, 50_000.0 - 10_000.0);
    assert_eq!(*ex.agent("trader").unwrap().portfolio.get("ACME").unwrap(), 1_000.0);

    ex.use_service("trader", "ACME", 3).unwrap();
    assert_eq!(ex.company("ACME").unwrap().revenue, 2.0);
    assert_eq!(ex.company("ACME").unwrap().total_api_calls, 1);

    let founder_balance_before = ex.agent("founder").unwrap().balance;
    ex.run_daily_cycle(1_000.0, 0.1, 4);
    assert_eq!(ex.company("ACME").unwrap().revenue, 0.0);
    assert!(ex.agent("founder").unwrap().balance > founder_balance_before);
    assert_eq!(ex.agent("trader").unwrap().balance, 50_000.0 - 10_000.0 + 1_000.0);
}

#[test]
fn company_collision_is_rejected() {
    let mut ex = Exchange::new();
    ex.join("f1", "F1", 20_000.0, 0);
    ex.join("f2", "F2", 20_000.0, 0);
    ex.create_company("f1", "DUP", "One".into(), "d".into(), "svc".into(), 1.0, 0).unwrap();
    let result = ex.create_company("f2", "dup", "Two".into(), "d".into(), "svc".into(), 1.0, 1);
    assert!(result.is_err());
}

#[test]
fn reipo_of_public_company_is_rejected() {
    let mut ex = Exchange::new();
    ex.join("f", "F", 20_000.0, 0);
    ex.create_company("f", "RE", "Re".into(), "d".into(), "svc".into(), 1.0, 0).unwrap();
    ex.launch_ipo("RE", 10_000.0, 1.0, 1).unwrap();
    assert!(ex.launch_ipo("RE", 10_000.0, 2.0, 2).is_err());
}

#[test]
fn market_buy_walks_multiple_levels() {
    let mut ex = Exchange::new();
    ex.join("founder", "Founder", 20_000.0, 0);
    ex.join("s2", "Reseller", 10_000.0, 0);
    ex.join("buyer", "Buyer", 100_000.0, 0);
    ex.create_company("founder", "WLK", "Walk".into(), "d".into(), "svc".into(), 1.0, 0).unwrap();
    ex.launch_ipo("WLK", 1_000.0, 5.0, 1).unwrap();

    // s2 buys 500 off the IPO ask, then reposts them at a higher price.
    ex.submit_order("s2", "WLK", Side::Buy, OrderType::Limit, 500.0, Some(5.0), 2).unwrap();
    ex.submit_order("s2", "WLK", Side::Sell, OrderType::Limit, 500.0, Some(6.0), 3).unwrap();

    // Remaining IPO ask (500 @ 5.0) is still the best level ahead of s2's 6.0 ask.
    let order = ex
        .submit_order("buyer", "WLK", Side::Buy, OrderType::Market, 700.0, None, 4)
        .unwrap();
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(ex.trades().len(), 3);
    assert_eq!(ex.trades()[1].price, 5.0);
    assert_eq!(ex.trades()[2].price, 6.0);
}
