//! The `/ws` handler: a single world-wide event stream. Every
//! `WorldEvent` — trades, IPOs, bankruptcies, daily cycles — is
//! broadcast on one channel rather than split per ticker, since
//! subscribers generally want the whole world, not one book.

use axum::extract::ws::{Message, WebSocket};
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::{error, info, warn};

use crate::types::WsFrame;
use crate::AppState;

pub async fn handle_ws(socket: WebSocket, state: AppState) {
    info!("new websocket connection");

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events_tx.subscribe();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.trim() == "ping" {
                            if sender.send(Message::Text("pong".to_string())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("websocket connection closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "websocket error");
                        break;
                    }
                    None => break,
                }
            }
            event = events_rx.recv() => {
                match event {
                    Ok(event) => {
                        let frame = WsFrame::from(event);
                        if let Ok(json) = serde_json::to_string(&frame) {
                            if sender.send(Message::Text(json)).await.is_err() {
                                warn!("failed to send event frame, dropping connection");
                                break;
                            }
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }

    info!("websocket handler ended");
}
