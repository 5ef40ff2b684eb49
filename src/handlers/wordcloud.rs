//! Live comment word cloud over WebSocket

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use crate::services::auth::Permission;
use crate::services::wordcloud::{Snapshot, WordCloudMessage};
use crate::state::AppState;
use crate::utils::errors::{Result, SportsHubError};

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// Upgrade after checking the admin token passed as `?token=`
pub async fn socket(
    ws: WebSocketUpgrade,
    Query(query): Query<SocketQuery>,
    State(state): State<AppState>,
) -> Result<Response> {
    let token = query
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SportsHubError::Authentication("Missing token".to_string()))?;

    let (_, ctx) = state.services.users.authenticate(token).await?;
    ctx.require(Permission::Admin)?;

    // the cached snapshot goes out first; a recompute follows for the window
    let rx = state.services.wordcloud.subscribe();
    state.services.wordcloud.mark_dirty();
    let user_id = ctx.user_id;
    info!(user_id = user_id, "Word cloud viewer connected");

    Ok(ws.on_upgrade(move |socket| serve(socket, rx, user_id)))
}

async fn serve(mut socket: WebSocket, mut rx: watch::Receiver<Snapshot>, user_id: i64) {
    let current = rx.borrow_and_update().clone();
    if send_snapshot(&mut socket, &current).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                if send_snapshot(&mut socket, &snapshot).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Ping(payload))) => {
                        if socket.send(WsMessage::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(user_id = user_id, error = %e, "Word cloud socket error");
                        break;
                    }
                }
            }
        }
    }

    info!(user_id = user_id, "Word cloud viewer disconnected");
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &Snapshot) -> std::result::Result<(), ()> {
    let text = match serde_json::to_string(&WordCloudMessage::update(snapshot.as_slice())) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to encode word cloud snapshot");
            return Err(());
        }
    };
    socket.send(WsMessage::Text(text)).await.map_err(|_| ())
}
