//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//!
//! Every frame is a JSON envelope whose `data` field carries the payload as
//! a JSON document *encoded as a string*:
//!
//! ```text
//! {"type":"attack","data":"{\"gameId\":\"…\",\"x\":3,\"y\":4}","id":0}
//! ```
//!
//! Inbound frames may also carry `data` inline as an object, or omit it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::grid::Cell;
use crate::core::ids::{PlayerId, RoomId, SessionId};
use crate::game::combat::AttackStatus;
use crate::game::ship::{Orientation, Ship, ShipClass};

// =============================================================================
// ENVELOPE
// =============================================================================

/// Outer wire frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload: a JSON string on output; a string, object or nothing on input.
    #[serde(default)]
    pub data: Value,
    /// Always 0.
    #[serde(default)]
    pub id: u32,
}

/// Turn a wire frame into `{"type": .., "data": ..}` with the payload parsed.
fn unwrap_envelope(s: &str) -> Result<Value, serde_json::Error> {
    let frame: Envelope = serde_json::from_str(s)?;
    let data = match frame.data {
        Value::String(text) if text.trim().is_empty() => Value::Null,
        Value::String(text) => serde_json::from_str(&text)?,
        other => other,
    };

    let mut tagged = serde_json::Map::new();
    tagged.insert("type".into(), Value::String(frame.kind));
    if !data.is_null() {
        tagged.insert("data".into(), data);
    }
    Ok(Value::Object(tagged))
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Register or log in.
    #[serde(rename = "reg")]
    Register(RegRequest),

    /// Open a waiting room.
    #[serde(rename = "create_room")]
    CreateRoom,

    /// Join someone else's room.
    #[serde(rename = "add_user_to_room")]
    JoinRoom(JoinRoomRequest),

    /// Submit a fleet.
    #[serde(rename = "add_ships")]
    AddShips(AddShipsRequest),

    /// Fire at a cell.
    #[serde(rename = "attack")]
    Attack(AttackRequest),

    /// Fire at a random unshot cell.
    #[serde(rename = "randomAttack")]
    RandomAttack(RandomAttackRequest),
}

impl ClientMessage {
    /// Decode a wire frame.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_value(unwrap_envelope(s)?)
    }

    /// Wire type name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Register(_) => "reg",
            ClientMessage::CreateRoom => "create_room",
            ClientMessage::JoinRoom(_) => "add_user_to_room",
            ClientMessage::AddShips(_) => "add_ships",
            ClientMessage::Attack(_) => "attack",
            ClientMessage::RandomAttack(_) => "randomAttack",
        }
    }
}

/// Registration request. Missing fields decode as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegRequest {
    /// Player name.
    #[serde(default)]
    pub name: String,
    /// Plain-text password.
    #[serde(default)]
    pub password: String,
}

/// Join-room request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    /// Target room.
    #[serde(rename = "indexRoom", alias = "roomId", default)]
    pub index_room: Option<String>,
}

/// Fleet submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddShipsRequest {
    /// Session.
    pub game_id: SessionId,
    /// Ships.
    pub ships: Vec<ShipPayload>,
    /// Claimed player id; must match the registered player when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_player: Option<PlayerId>,
}

/// Targeted shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRequest {
    /// Session.
    pub game_id: SessionId,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Claimed player id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_player: Option<PlayerId>,
}

/// Random shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomAttackRequest {
    /// Session.
    pub game_id: SessionId,
    /// Claimed player id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_player: Option<PlayerId>,
}

// =============================================================================
// SHARED PAYLOADS
// =============================================================================

/// Board position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl From<Cell> for Position {
    fn from(cell: Cell) -> Self {
        Self { x: cell.x, y: cell.y }
    }
}

/// Ship as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPayload {
    /// First cell.
    pub position: Position,
    /// `true` when the ship extends along x.
    pub direction: bool,
    /// Hull length.
    pub length: u8,
    /// Class name.
    #[serde(rename = "type")]
    pub class: ShipClass,
}

impl From<ShipPayload> for Ship {
    fn from(p: ShipPayload) -> Self {
        Ship {
            origin: Cell::new(p.position.x, p.position.y),
            orientation: if p.direction {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            },
            length: p.length,
            class: p.class,
        }
    }
}

impl From<&Ship> for ShipPayload {
    fn from(ship: &Ship) -> Self {
        Self {
            position: ship.origin.into(),
            direction: ship.orientation == Orientation::Horizontal,
            length: ship.length,
            class: ship.class,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Registration result.
    #[serde(rename = "reg")]
    Reg(RegResponse),

    /// Rooms waiting for a second player.
    #[serde(rename = "update_room")]
    UpdateRoom(Vec<RoomPayload>),

    /// Win table.
    #[serde(rename = "update_winners")]
    UpdateWinners(Vec<WinnerPayload>),

    /// A session was created for this player.
    #[serde(rename = "create_game")]
    CreateGame(CreateGamePayload),

    /// Both fleets placed; combat begins.
    #[serde(rename = "start_game")]
    StartGame(StartGamePayload),

    /// Whose turn it is.
    #[serde(rename = "turn")]
    Turn(TurnPayload),

    /// Outcome of one shot, or of one cell of a kill.
    #[serde(rename = "attack")]
    Attack(AttackPayload),

    /// Game over.
    #[serde(rename = "finish")]
    Finish(FinishPayload),

    /// Rejected command.
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Encode as a wire frame with a stringified payload.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let tagged = serde_json::to_value(self)?;
        let kind = tagged
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = tagged.get("data").map(Value::to_string).unwrap_or_default();

        serde_json::to_string(&Envelope {
            kind,
            data: Value::String(data),
            id: 0,
        })
    }

    /// Decode a wire frame.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_value(unwrap_envelope(s)?)
    }

    /// Build an error event.
    pub fn error(text: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorPayload {
            error: true,
            error_text: text.into(),
        })
    }
}

/// Registration result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegResponse {
    /// Echoed name.
    pub name: String,
    /// Player id; absent on failure.
    pub index: Option<PlayerId>,
    /// Whether registration failed.
    pub error: bool,
    /// Failure reason, empty on success.
    pub error_text: String,
}

/// One occupant in a room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUserPayload {
    /// Name.
    pub name: String,
    /// Player id.
    pub index: PlayerId,
}

/// One open room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    /// Room id.
    pub room_id: RoomId,
    /// Occupants.
    pub room_users: Vec<RoomUserPayload>,
}

/// One row of the win table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerPayload {
    /// Player name.
    pub name: String,
    /// Games won.
    pub wins: u32,
}

/// Session handed to one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGamePayload {
    /// Session id.
    pub id_game: SessionId,
    /// The recipient's own player id.
    pub id_player: PlayerId,
}

/// Combat start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGamePayload {
    /// The recipient's own fleet.
    pub ships: Vec<ShipPayload>,
    /// The recipient's own player id.
    pub current_player_index: PlayerId,
}

/// Turn owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPayload {
    /// Player allowed to fire.
    pub current_player: PlayerId,
}

/// Shot outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackPayload {
    /// Cell.
    pub position: Position,
    /// Attacker.
    pub current_player: PlayerId,
    /// Outcome at this cell.
    pub status: AttackStatus,
}

/// Game over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishPayload {
    /// Winner.
    pub win_player: PlayerId,
}

/// Rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Always true.
    pub error: bool,
    /// Reason.
    pub error_text: String,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = "01010101-0101-0101-0101-010101010101";

    #[test]
    fn test_decode_reg_with_string_data() {
        let frame = r#"{"type":"reg","data":"{\"name\":\"alice\",\"password\":\"pw\"}","id":0}"#;
        let msg = ClientMessage::from_json(frame).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Register(RegRequest {
                name: "alice".into(),
                password: "pw".into(),
            })
        );
        assert_eq!(msg.kind(), "reg");
    }

    #[test]
    fn test_decode_create_room_with_empty_data() {
        let frame = r#"{"type":"create_room","data":"","id":0}"#;
        assert_eq!(ClientMessage::from_json(frame).unwrap(), ClientMessage::CreateRoom);

        let bare = r#"{"type":"create_room"}"#;
        assert_eq!(ClientMessage::from_json(bare).unwrap(), ClientMessage::CreateRoom);
    }

    #[test]
    fn test_decode_inline_object_data() {
        let frame = format!(
            r#"{{"type":"attack","data":{{"gameId":"{GAME}","x":3,"y":4}},"id":0}}"#
        );
        let ClientMessage::Attack(req) = ClientMessage::from_json(&frame).unwrap() else {
            panic!("expected attack");
        };
        assert_eq!((req.x, req.y), (3, 4));
        assert_eq!(req.game_id, SessionId::new([1; 16]));
        assert_eq!(req.index_player, None);
    }

    #[test]
    fn test_decode_join_room_alias() {
        let frame = r#"{"type":"add_user_to_room","data":{"roomId":"abc"}}"#;
        let ClientMessage::JoinRoom(req) = ClientMessage::from_json(frame).unwrap() else {
            panic!("expected join");
        };
        assert_eq!(req.index_room.as_deref(), Some("abc"));
    }

    #[test]
    fn test_decode_add_ships() {
        let data = format!(
            r#"{{"gameId":"{GAME}","ships":[{{"position":{{"x":0,"y":0}},"direction":true,"length":4,"type":"huge"}}]}}"#
        );
        let frame = serde_json::json!({"type": "add_ships", "data": data, "id": 0}).to_string();
        let ClientMessage::AddShips(req) = ClientMessage::from_json(&frame).unwrap() else {
            panic!("expected add_ships");
        };

        let ship: Ship = req.ships[0].clone().into();
        assert_eq!(ship, Ship::new(ShipClass::Huge, Cell::new(0, 0), Orientation::Horizontal));
    }

    #[test]
    fn test_decode_failures() {
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"type":"teleport","data":""}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"attack","data":"{\"x\":1}"}"#).is_err());
    }

    #[test]
    fn test_encode_stringifies_data() {
        let msg = ServerMessage::Turn(TurnPayload {
            current_player: PlayerId::new([2; 16]),
        });
        let json = msg.to_json().unwrap();

        let frame: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(frame["type"], "turn");
        assert_eq!(frame["id"], 0);
        let data = frame["data"].as_str().unwrap();
        assert_eq!(
            data,
            r#"{"currentPlayer":"02020202-0202-0202-0202-020202020202"}"#
        );

        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_encode_attack_status_names() {
        let msg = ServerMessage::Attack(AttackPayload {
            position: Position { x: 1, y: 2 },
            current_player: PlayerId::new([1; 16]),
            status: AttackStatus::Hit,
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#"\"status\":\"shot\""#));
    }

    #[test]
    fn test_error_event_shape() {
        let json = ServerMessage::error("Not your turn").to_json().unwrap();
        let frame: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(frame["type"], "error");
        let data: Value = serde_json::from_str(frame["data"].as_str().unwrap()).unwrap();
        assert_eq!(data, serde_json::json!({"error": true, "errorText": "Not your turn"}));
    }

    #[test]
    fn test_ship_payload_direction() {
        let vertical = Ship::new(ShipClass::Medium, Cell::new(4, 5), Orientation::Vertical);
        let payload = ShipPayload::from(&vertical);
        assert!(!payload.direction);
        assert_eq!(payload.position, Position { x: 4, y: 5 });
        assert_eq!(Ship::from(payload), vertical);
    }
}
