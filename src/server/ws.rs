//! WebSocket session driver: handshake, event routing, disconnect cleanup.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Extension;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::AppState;
use crate::session::protocol::{
    AuthPayload, ClientRequest, ConnectionEstablished, ErrorPayload, QueuedPayload, WireMessage,
};
use crate::session::{bot_user_id, SessionHandle};
use crate::table::TableMsg;

const LOG_TARGET: &str = "server::ws";
const HANDSHAKE_TIMEOUT_SECS: u64 = 10;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();

    // First message is the handshake; anything else is refused terminally.
    let auth = tokio::time::timeout(
        Duration::from_secs(HANDSHAKE_TIMEOUT_SECS),
        stream.next(),
    )
    .await;
    let identity = match auth {
        Ok(Some(Ok(Message::Text(text)))) => authenticate(&state, &text),
        _ => None,
    };
    let Some((user_id, name, avatar, is_bot)) = identity else {
        let refusal = WireMessage::new(
            "connection:error",
            ErrorPayload {
                message: "Authentication required",
            },
        );
        if let Ok(text) = serde_json::to_string(&refusal) {
            let _ = sink.send(Message::Text(text)).await;
        }
        let _ = sink.close().await;
        return;
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<WireMessage>();
    let session = SessionHandle::new(user_id.clone(), name, avatar, is_bot, tx);
    let session_id = session.id;
    state.sessions.insert(Arc::clone(&session));
    tracing::info!(target: LOG_TARGET, user_id = %user_id, %session_id, "session established");

    // Outbound pump: everything the rest of the system queues for this
    // session goes out here, in order.
    let pump = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    session.send(
        "connection:established",
        ConnectionEstablished {
            player_id: &user_id,
        },
    );
    session.send("maintenance:status", state.maintenance_status());
    session.send("announcement:status", state.announcement_status());

    // A reconnecting user whose seat survived gets rebound to it.
    if let Some(table) = state.manager.table_of_player(&user_id) {
        table.send(TableMsg::SessionRebound {
            user_id: user_id.clone(),
            session: Arc::clone(&session),
        });
    }

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => {
                handle_client_message(&state, &session, &text).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Disconnect cleanup: queue removal, table notification, registry drop.
    tracing::info!(target: LOG_TARGET, user_id = %user_id, %session_id, "session closed");
    state.pool.leave(&user_id);
    if state.sessions.get(session_id).is_some() {
        // Only tear down table residency if this is still the live session
        // for the user (a reconnect may have displaced us already).
        state.manager.send_to_players_table(
            &user_id,
            TableMsg::SessionDisconnected {
                user_id: user_id.clone(),
            },
        );
    }
    state.sessions.remove(session_id);
    pump.abort();
}

/// Token or bot-credential handshake; returns (user, name, avatar, is_bot).
fn authenticate(
    state: &AppState,
    text: &str,
) -> Option<(String, String, Option<String>, bool)> {
    let msg: WireMessage = serde_json::from_str(text).ok()?;
    if msg.event != "auth" {
        return None;
    }
    let payload: AuthPayload = serde_json::from_value(msg.payload).unwrap_or_default();
    if payload.is_bot {
        let bot_name = payload.bot_name?;
        if bot_name.trim().is_empty() {
            return None;
        }
        let user_id = bot_user_id(&bot_name);
        return Some((user_id, bot_name, payload.bot_avatar, true));
    }
    let token = payload.token?;
    let user_id = state.verifier.verify(&token)?;
    let name = user_id.clone();
    Some((user_id, name, None, false))
}

async fn handle_client_message(state: &Arc<AppState>, session: &Arc<SessionHandle>, text: &str) {
    let msg: WireMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(_) => {
            session.send(
                "table:error",
                ErrorPayload {
                    message: "Malformed message",
                },
            );
            return;
        }
    };
    let request = match ClientRequest::parse(&msg) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(target: LOG_TARGET, event = %msg.event, %err, "bad payload");
            session.send(
                "table:error",
                ErrorPayload {
                    message: "Malformed payload",
                },
            );
            return;
        }
    };

    match request {
        ClientRequest::MatchmakingJoin(p) => {
            match state
                .pool
                .join(Arc::clone(session), &p.blinds, p.is_fast_fold)
            {
                Ok(position) => {
                    session.send("matchmaking:queued", QueuedPayload { position });
                }
                Err(err) => {
                    session.send(
                        "table:error",
                        ErrorPayload {
                            message: &err.to_string(),
                        },
                    );
                }
            }
        }
        ClientRequest::MatchmakingLeave | ClientRequest::TableLeave => {
            state.pool.leave(&session.user_id);
            let seated = state.manager.send_to_players_table(
                &session.user_id,
                TableMsg::Leave {
                    user_id: session.user_id.clone(),
                },
            );
            if !seated {
                session.send_empty("table:left");
            }
        }
        ClientRequest::GameAction(p) => {
            let routed = state.manager.send_to_players_table(
                &session.user_id,
                TableMsg::ClientAction {
                    user_id: session.user_id.clone(),
                    action: p.action,
                    amount: p.amount,
                },
            );
            if !routed {
                session.send(
                    "table:error",
                    ErrorPayload {
                        message: "Not seated at a table",
                    },
                );
            }
        }
        ClientRequest::FastFold => {
            state.manager.send_to_players_table(
                &session.user_id,
                TableMsg::FastFold {
                    user_id: session.user_id.clone(),
                },
            );
        }
        ClientRequest::Spectate(p) => match state.manager.table(&p.table_id) {
            Some(table) => table.send(TableMsg::Spectate {
                session: Arc::clone(session),
            }),
            None => session.send(
                "table:error",
                ErrorPayload {
                    message: "Unknown table",
                },
            ),
        },
        ClientRequest::PrivateCreate(p) => {
            private_create(state, session, &p.blinds).await;
        }
        ClientRequest::PrivateJoin(p) => {
            match state.manager.table_by_invite(&p.invite_code.to_uppercase()) {
                Some(table) => {
                    seat_with_buy_in(state, session, table).await;
                }
                None => session.send(
                    "table:error",
                    ErrorPayload {
                        message: "Unknown invite code",
                    },
                ),
            }
        }
        ClientRequest::Unknown(event) => {
            tracing::debug!(target: LOG_TARGET, %event, "unknown client event");
            session.send(
                "table:error",
                ErrorPayload {
                    message: "Unknown event",
                },
            );
        }
    }
}

async fn private_create(state: &Arc<AppState>, session: &Arc<SessionHandle>, blinds: &str) {
    let Some((sb, bb)) = crate::config::ServerConfig::parse_blinds(blinds) else {
        session.send(
            "table:error",
            ErrorPayload {
                message: "Invalid blinds format",
            },
        );
        return;
    };
    let table = state.manager.create_private_table(crate::engine::types::TableStakes {
        small_blind: sb,
        big_blind: bb,
    });
    if let Some(code) = &table.invite_code {
        session.send(
            "table:created",
            serde_json::json!({ "tableId": table.id, "inviteCode": code }),
        );
    }
    seat_with_buy_in(state, session, table).await;
}

/// Debit, seat, and compensate on failure: the debit never half-applies.
async fn seat_with_buy_in(
    state: &Arc<AppState>,
    session: &Arc<SessionHandle>,
    table: crate::table::TableHandle,
) {
    let buy_in = table.stakes.big_blind * state.config.buy_in_bb;
    match state.storage.deduct_buy_in(&session.user_id, buy_in).await {
        Ok(true) => {}
        Ok(false) => {
            session.send(
                "table:error",
                ErrorPayload {
                    message: "Insufficient balance for buy-in",
                },
            );
            return;
        }
        Err(err) => {
            tracing::warn!(target: LOG_TARGET, %err, "buy-in debit failed");
            session.send(
                "table:error",
                ErrorPayload {
                    message: "Temporary failure, try again",
                },
            );
            return;
        }
    }
    let seated = state
        .manager
        .seat_player(
            &table,
            session.user_id.clone(),
            session.name.clone(),
            session.avatar.clone(),
            session.is_bot,
            Some(Arc::clone(session)),
            buy_in,
        )
        .await;
    if let Err(err) = seated {
        if let Err(refund_err) = state
            .storage
            .cash_out(&session.user_id, buy_in, Some(&table.id))
            .await
        {
            tracing::error!(target: LOG_TARGET, %refund_err, "refund after seat failure");
        }
        session.send(
            "table:error",
            ErrorPayload {
                message: &err.to_string(),
            },
        );
    }
}
