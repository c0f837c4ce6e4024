//! AIVERSE command line client. Maps 1:1 onto the world service's HTTP
//! routes: one subcommand per endpoint, one `reqwest` call each.

use clap::{Parser, Subcommand};
use engine::{OrderType, Side};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "aiverse")]
#[command(about = "AIVERSE CLI - command line client for the world service")]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join AIVERSE as a new agent (idempotent).
    Join {
        agent_id: String,
        name: String,
    },
    /// Show an agent's balance, reserved cash, and portfolio.
    Status {
        agent_id: String,
    },
    /// Buy shares of a ticker. Omit price for a market order.
    Buy {
        agent_id: String,
        ticker: String,
        quantity: f64,
        price: Option<f64>,
    },
    /// Sell shares of a ticker. Omit price for a market order.
    Sell {
        agent_id: String,
        ticker: String,
        quantity: f64,
        price: Option<f64>,
    },
    /// Show a ticker's market data (last/bid/ask/24h stats).
    Market {
        ticker: String,
    },
    /// List every company.
    Companies,
    /// Show the net-worth leaderboard.
    Leaderboard {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Show the latest world events.
    News {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Serialize)]
struct JoinRequest<'a> {
    agent_id: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    agent_id: &'a str,
    ticker: &'a str,
    side: Side,
    order_type: OrderType,
    quantity: f64,
    price: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct AgentView {
    id: String,
    name: String,
    balance: f64,
    reserved: f64,
    portfolio: HashMap<String, f64>,
    total_trades: u64,
}

#[derive(Deserialize, Debug)]
struct OrderResponse {
    order_id: String,
    status: String,
    filled_quantity: f64,
    filled_price: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Join { agent_id, name } => {
            let req = JoinRequest { agent_id: &agent_id, name: &name };
            let resp = client.post(format!("{}/agents/join", cli.server)).json(&req).send().await?;
            print_json(resp).await?;
        }

        Commands::Status { agent_id } => {
            let resp = client.get(format!("{}/agents/{}", cli.server, agent_id)).send().await?;
            if resp.status().is_success() {
                let agent: AgentView = resp.json().await?;
                println!("{} ({})", agent.name, agent.id);
                println!("  balance:  {:.2}", agent.balance);
                println!("  reserved: {:.2}", agent.reserved);
                println!("  trades:   {}", agent.total_trades);
                if agent.portfolio.is_empty() {
                    println!("  portfolio: (empty)");
                } else {
                    println!("  portfolio:");
                    for (ticker, qty) in &agent.portfolio {
                        println!("    {ticker}: {qty}");
                    }
                }
            } else {
                print_json(resp).await?;
            }
        }

        Commands::Buy { agent_id, ticker, quantity, price } => {
            submit_order(&client, &cli.server, &agent_id, &ticker, Side::Buy, quantity, price).await?;
        }

        Commands::Sell { agent_id, ticker, quantity, price } => {
            submit_order(&client, &cli.server, &agent_id, &ticker, Side::Sell, quantity, price).await?;
        }

        Commands::Market { ticker } => {
            let resp = client.get(format!("{}/market/{}", cli.server, ticker)).send().await?;
            print_json(resp).await?;
        }

        Commands::Companies => {
            let resp = client.get(format!("{}/companies", cli.server)).send().await?;
            print_json(resp).await?;
        }

        Commands::Leaderboard { limit } => {
            let resp = client.get(format!("{}/leaderboard?limit={}", cli.server, limit)).send().await?;
            print_json(resp).await?;
        }

        Commands::News { limit } => {
            let resp = client.get(format!("{}/news?limit={}", cli.server, limit)).send().await?;
            print_json(resp).await?;
        }
    }

    Ok(())
}

async fn submit_order(
    client: &reqwest::Client,
    server: &str,
    agent_id: &str,
    ticker: &str,
    side: Side,
    quantity: f64,
    price: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let order_type = if price.is_some() { OrderType::Limit } else { OrderType::Market };
    let req = OrderRequest { agent_id, ticker, side, order_type, quantity, price };
    let resp = client.post(format!("{server}/orders")).json(&req).send().await?;
    if resp.status().is_success() {
        let order: OrderResponse = resp.json().await?;
        println!("order {}: {} (filled {} @ {})", order.order_id, order.status, order.filled_quantity, order.filled_price);
    } else {
        print_json(resp).await?;
    }
    Ok(())
}

async fn print_json(resp: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
    if !status.is_success() {
        eprintln!("error: {status}");
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
