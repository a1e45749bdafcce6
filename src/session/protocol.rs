//! The wire protocol: `{event, payload}` JSON messages in both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cards::Card;
use crate::engine::types::{ActionKind, Chips, SeatId, Street, Winner};
use crate::engine::ValidAction;

/// The framing shared by every message on the socket.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireMessage {
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl WireMessage {
    pub fn new(event: &str, payload: impl Serialize) -> Self {
        Self {
            event: event.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        }
    }

    pub fn empty(event: &str) -> Self {
        Self {
            event: event.to_string(),
            payload: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// First client message on a fresh connection.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    pub bot_name: Option<String>,
    pub bot_avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// Client -> server payloads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakingJoinPayload {
    pub blinds: String,
    #[serde(default)]
    pub is_fast_fold: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameActionPayload {
    pub action: ActionKind,
    pub amount: Option<Chips>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectatePayload {
    pub table_id: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateCreatePayload {
    pub blinds: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateJoinPayload {
    pub invite_code: String,
}

/// A parsed client request. Unknown events fall through to `Unknown` so the
/// session layer can answer with a soft error.
#[derive(Clone, Debug)]
pub enum ClientRequest {
    MatchmakingJoin(MatchmakingJoinPayload),
    MatchmakingLeave,
    TableLeave,
    GameAction(GameActionPayload),
    FastFold,
    Spectate(SpectatePayload),
    PrivateCreate(PrivateCreatePayload),
    PrivateJoin(PrivateJoinPayload),
    Unknown(String),
}

impl ClientRequest {
    pub fn parse(msg: &WireMessage) -> Result<Self, serde_json::Error> {
        let payload = msg.payload.clone();
        Ok(match msg.event.as_str() {
            "matchmaking:join" => {
                ClientRequest::MatchmakingJoin(serde_json::from_value(payload)?)
            }
            "matchmaking:leave" => ClientRequest::MatchmakingLeave,
            "table:leave" => ClientRequest::TableLeave,
            "game:action" => ClientRequest::GameAction(serde_json::from_value(payload)?),
            "game:fast_fold" => ClientRequest::FastFold,
            "table:spectate" => ClientRequest::Spectate(serde_json::from_value(payload)?),
            "private:create" => ClientRequest::PrivateCreate(serde_json::from_value(payload)?),
            "private:join" => ClientRequest::PrivateJoin(serde_json::from_value(payload)?),
            other => ClientRequest::Unknown(other.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Server -> client payloads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEstablished<'a> {
    pub player_id: &'a str,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedPayload {
    pub position: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableAssignedPayload<'a> {
    pub table_id: &'a str,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableJoinedPayload<'a> {
    pub table_id: &'a str,
    pub seat: SeatId,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload<'a> {
    pub message: &'a str,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleCardsPayload {
    pub cards: Vec<Card>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatHoleCards {
    pub seat_index: SeatId,
    pub cards: Vec<Card>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllHoleCardsPayload {
    pub players: Vec<SeatHoleCards>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequiredPayload<'a> {
    pub player_id: &'a str,
    pub valid_actions: &'a [ValidAction],
    pub timeout_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTakenPayload<'a> {
    pub player_id: &'a str,
    pub action: ActionKind,
    pub amount: Chips,
    pub street_changed: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandCompletePayload {
    pub winners: Vec<Winner>,
    pub rake: Chips,
    pub pot: Chips,
    pub community_cards: Vec<Card>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub active: bool,
    pub message: Option<String>,
}

/// One seat of the client-visible snapshot; `hole_cards` is only populated
/// for the receiving seat (or at showdown).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub seat_index: SeatId,
    pub player_id: String,
    pub name: String,
    pub is_bot: bool,
    pub chips: Chips,
    pub current_bet: Chips,
    pub folded: bool,
    pub all_in: bool,
    pub connected: bool,
    pub waiting_for_next_hand: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole_cards: Option<Vec<Card>>,
}

/// Full client-visible table snapshot (`game:state`).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub table_id: String,
    pub blinds: String,
    pub is_fast_fold: bool,
    pub hand_no: Option<u64>,
    pub street: Option<Street>,
    pub community_cards: Vec<Card>,
    pub pot: Chips,
    pub current_bet: Chips,
    pub dealer_seat: Option<SeatId>,
    pub current_player: Option<SeatId>,
    pub seats: Vec<SeatView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_matchmaking_join() {
        let msg: WireMessage = serde_json::from_str(
            r#"{"event":"matchmaking:join","payload":{"blinds":"1/3","isFastFold":true}}"#,
        )
        .unwrap();
        let req = ClientRequest::parse(&msg).unwrap();
        match req {
            ClientRequest::MatchmakingJoin(p) => {
                assert_eq!(p.blinds, "1/3");
                assert!(p.is_fast_fold);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn parses_events_without_payload() {
        let msg: WireMessage =
            serde_json::from_str(r#"{"event":"matchmaking:leave"}"#).unwrap();
        assert!(matches!(
            ClientRequest::parse(&msg).unwrap(),
            ClientRequest::MatchmakingLeave
        ));
    }

    #[test]
    fn game_action_amount_is_optional() {
        let msg: WireMessage =
            serde_json::from_str(r#"{"event":"game:action","payload":{"action":"fold"}}"#)
                .unwrap();
        match ClientRequest::parse(&msg).unwrap() {
            ClientRequest::GameAction(p) => {
                assert_eq!(p.action, ActionKind::Fold);
                assert_eq!(p.amount, None);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn unknown_events_are_soft() {
        let msg: WireMessage =
            serde_json::from_str(r#"{"event":"game:teleport","payload":{}}"#).unwrap();
        assert!(matches!(
            ClientRequest::parse(&msg).unwrap(),
            ClientRequest::Unknown(_)
        ));
    }

    #[test]
    fn outbound_messages_carry_event_and_payload() {
        let wire = WireMessage::new("table:joined", TableJoinedPayload {
            table_id: "t1",
            seat: 2,
        });
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["event"], "table:joined");
        assert_eq!(json["payload"]["tableId"], "t1");
        assert_eq!(json["payload"]["seat"], 2);
    }
}
