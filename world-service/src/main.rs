//! AIVERSE world service — REST API and WebSocket server fronting the
//! `engine` matching engine and world state machine.
//!
//! Provides HTTP endpoints for agents, companies, orders, market data,
//! and news, plus a `/ws` stream of world events. Built with Axum; state
//! lives behind one lock rather than per-symbol ones because settlement
//! spans tickers (see `exchange::Service`).

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use engine::{EngineError, OrderType};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::info;

mod config;
mod exchange;
mod types;
mod websocket;
mod world;

use config::Config;
use exchange::Service;
use types::*;

#[derive(Clone)]
struct AppState {
    service: Service,
    events_tx: broadcast::Sender<engine::WorldEvent>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cfg = Config::from_env();
    let (events_tx, _) = broadcast::channel(1024);
    let service = Service::bootstrap(events_tx.clone());
    service.spawn_tick_loop(&cfg);

    let state = AppState { service, events_tx };

    let app = Router::new()
        .route("/state", get(get_state))
        .route("/news", get(get_news))
        .route("/agents/join", post(join_agent))
        .route("/agents/:id", get(get_agent))
        .route("/agents", get(list_agents))
        .route("/leaderboard", get(get_leaderboard))
        .route("/companies/create", post(create_company))
        .route("/companies/:ticker/ipo", post(launch_ipo))
        .route("/companies/:ticker/use", post(use_service))
        .route("/companies/:ticker", get(get_company))
        .route("/companies", get(list_companies))
        .route("/orders", post(submit_order))
        .route("/market/:ticker", get(get_market_data))
        .route("/trades", get(get_trades))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(cfg.addr()).await.unwrap();
    info!(addr = %cfg.addr(), "AIVERSE world service starting");
    axum::serve(listener, app).await.unwrap();
}

async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.state().await)
}

async fn get_news(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> impl IntoResponse {
    let events: Vec<WsFrame> = state.service.news(q.limit.unwrap_or(20)).await.into_iter().map(WsFrame::from).collect();
    Json(events)
}

async fn join_agent(State(state): State<AppState>, Json(req): Json<JoinRequest>) -> impl IntoResponse {
    let agent = state.service.join(&req.agent_id, &req.name).await;
    Json(AgentView::from(&agent))
}

async fn get_agent(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let agent = state.service.agent(&id).await.ok_or(AppError::NotFound("agent not found"))?;
    Ok(Json(AgentView::from(&agent)))
}

async fn list_agents(State(state): State<AppState>) -> impl IntoResponse {
    let agents: Vec<AgentView> = state.service.agents().await.iter().map(AgentView::from).collect();
    Json(agents)
}

async fn get_leaderboard(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> impl IntoResponse {
    let ranked = state.service.leaderboard(q.limit.unwrap_or(10)).await;
    let entries: Vec<LeaderboardRow> = ranked
        .into_iter()
        .map(|(agent, net_worth)| LeaderboardRow { agent_id: agent.id, name: agent.name, net_worth })
        .collect();
    Json(entries)
}

async fn create_company(
    State(state): State<AppState>,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let company = state
        .service
        .create_company(&req.founder_id, &req.ticker, req.name, req.description, req.service_type, req.service_cost)
        .await
        .map_err(AppError::from)?;
    Ok(Json(CompanyView::from(&company)))
}

async fn launch_ipo(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Json(req): Json<IpoRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.service.launch_ipo(&ticker, req.shares, req.price).await.map_err(AppError::from)?;
    Ok(Json(ActionResult { success: true, message: format!("{} is public", ticker.to_uppercase()) }))
}

async fn use_service(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Json(req): Json<UseServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.service.use_service(&req.agent_id, &ticker).await.map_err(AppError::from)?;
    Ok(Json(ActionResult { success: true, message: "service used".to_string() }))
}

async fn get_company(State(state): State<AppState>, Path(ticker): Path<String>) -> Result<impl IntoResponse, AppError> {
    let company = state.service.company(&ticker.to_uppercase()).await.ok_or(AppError::NotFound("company not found"))?;
    Ok(Json(CompanyView::from(&company)))
}

async fn list_companies(State(state): State<AppState>) -> impl IntoResponse {
    let companies: Vec<CompanyView> = state.service.companies().await.iter().map(CompanyView::from).collect();
    Json(companies)
}

async fn submit_order(State(state): State<AppState>, Json(req): Json<OrderRequest>) -> Result<impl IntoResponse, AppError> {
    if req.order_type == OrderType::Limit && req.price.is_none() {
        return Err(AppError::BadRequest("limit orders require a price".to_string()));
    }
    let order = state
        .service
        .submit_order(&req.agent_id, &req.ticker, req.side, req.order_type, req.quantity, req.price)
        .await
        .map_err(AppError::from)?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

async fn get_market_data(State(state): State<AppState>, Path(ticker): Path<String>) -> Result<impl IntoResponse, AppError> {
    let data = state.service.market_data(&ticker.to_uppercase()).await.ok_or(AppError::NotFound("ticker not found"))?;
    Ok(Json(data))
}

async fn get_trades(State(state): State<AppState>, Query(q): Query<TradesQuery>) -> impl IntoResponse {
    let ticker = q.ticker.as_deref();
    let trades = state.service.trades(ticker, q.limit.unwrap_or(50)).await;
    Json(trades)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| websocket::handle_ws(socket, state))
}

#[derive(Debug)]
enum AppError {
    NotFound(&'static str),
    BadRequest(String),
    Rejected,
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AgentNotFound(_) | EngineError::CompanyNotFound(_) => AppError::NotFound("not found"),
            EngineError::TickerCollision(_) | EngineError::InvalidOrder(_) | EngineError::WrongCompanyStatus | EngineError::CompanyBankrupt => {
                AppError::BadRequest(err.to_string())
            }
            EngineError::InsufficientFunds | EngineError::InsufficientHoldings => AppError::Rejected,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Rejected => (StatusCode::BAD_REQUEST, "Order rejected".to_string()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
