//! Wire protocol - line-delimited JSON messages
//!
//! Every line is one message of the form
//! `{"type": <kind>, "payload": <kind-specific>, "timestamp": <unix ms>}`.
//! Kinds without data omit `payload`.
//!
//! Decoding is two-phase: the envelope is parsed first so an unknown `type`
//! is reported as a protocol error, then the payload is decoded by its tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{unix_ms, GameSnapshot};
use crate::error::{NetError, Result};
use crate::types::{Difficulty, GameMode};

/// Version announced in the hello; peers must agree on the major component
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Connecting side's introduction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub player_name: String,
    pub protocol_version: String,
}

impl Hello {
    /// Whether the announced version is compatible with `ours`
    pub fn is_compatible_with(&self, ours: &str) -> bool {
        major(&self.protocol_version) == major(ours)
    }
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Accepting side's acknowledgement of a hello
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloAck {
    pub player_name: String,
    pub protocol_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub ready: bool,
}

/// Match rules proposed by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameModePayload {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub time_limit_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartPayload {
    /// Piece seed for the receiving side
    pub seed: u32,
}

/// Attack rows sent to the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackPayload {
    pub rows: u32,
    pub gap_column: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPayload {
    pub is_game_over: bool,
}

/// Result from the sender's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Win,
    Lose,
    Draw,
}

impl MatchOutcome {
    /// The same result seen from the other side
    pub fn flipped(self) -> Self {
        match self {
            MatchOutcome::Win => MatchOutcome::Lose,
            MatchOutcome::Lose => MatchOutcome::Win,
            MatchOutcome::Draw => MatchOutcome::Draw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResultPayload {
    pub outcome: MatchOutcome,
    pub score: u32,
    pub opponent_score: u32,
}

/// Remaining match time as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSyncPayload {
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// Message kinds with their payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Message {
    Hello(Hello),
    HelloAck(HelloAck),
    Ready(ReadyPayload),
    GameMode(GameModePayload),
    GameStart(GameStartPayload),
    StateUpdate(Box<GameSnapshot>),
    Attack(AttackPayload),
    Pause,
    Resume,
    GameOver(GameOverPayload),
    MatchResult(MatchResultPayload),
    TimeSync(TimeSyncPayload),
    /// Send time in Unix ms
    Ping(u64),
    /// Echo of the ping payload
    Pong(u64),
    RematchRequest,
    RematchAccept,
    RematchDecline,
    Disconnect,
    Error(ErrorPayload),
}

/// Every `type` tag the protocol knows
pub const MESSAGE_KINDS: [&str; 19] = [
    "hello",
    "hello_ack",
    "ready",
    "game_mode",
    "game_start",
    "state_update",
    "attack",
    "pause",
    "resume",
    "game_over",
    "match_result",
    "time_sync",
    "ping",
    "pong",
    "rematch_request",
    "rematch_accept",
    "rematch_decline",
    "disconnect",
    "error",
];

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello(_) => "hello",
            Message::HelloAck(_) => "hello_ack",
            Message::Ready(_) => "ready",
            Message::GameMode(_) => "game_mode",
            Message::GameStart(_) => "game_start",
            Message::StateUpdate(_) => "state_update",
            Message::Attack(_) => "attack",
            Message::Pause => "pause",
            Message::Resume => "resume",
            Message::GameOver(_) => "game_over",
            Message::MatchResult(_) => "match_result",
            Message::TimeSync(_) => "time_sync",
            Message::Ping(_) => "ping",
            Message::Pong(_) => "pong",
            Message::RematchRequest => "rematch_request",
            Message::RematchAccept => "rematch_accept",
            Message::RematchDecline => "rematch_decline",
            Message::Disconnect => "disconnect",
            Message::Error(_) => "error",
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Message::Error(ErrorPayload {
            code: code.to_string(),
            message: message.into(),
        })
    }
}

/// A message with its send time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkMessage {
    pub message: Message,
    /// Send time in Unix ms
    pub timestamp: u64,
}

impl NetworkMessage {
    pub fn new(message: Message, timestamp: u64) -> Self {
        Self { message, timestamp }
    }

    /// Stamp with the current wall-clock time
    pub fn now(message: Message) -> Self {
        Self::new(message, unix_ms())
    }
}

/// On-the-wire envelope
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
    #[serde(default)]
    timestamp: u64,
}

/// Encode a message as one JSON line (without the trailing newline)
pub fn encode(msg: &NetworkMessage) -> Result<String> {
    let tagged = serde_json::to_value(&msg.message)?;
    let payload = match tagged {
        Value::Object(mut map) => map.remove("payload").unwrap_or(Value::Null),
        _ => Value::Null,
    };
    let envelope = Envelope {
        kind: msg.message.kind().to_string(),
        payload,
        timestamp: msg.timestamp,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode one JSON line
pub fn decode(line: &str) -> Result<NetworkMessage> {
    let envelope: Envelope = serde_json::from_str(line)?;
    if !MESSAGE_KINDS.contains(&envelope.kind.as_str()) {
        return Err(NetError::Protocol(format!(
            "unknown message type: {}",
            envelope.kind
        )));
    }

    let mut tagged = serde_json::Map::new();
    tagged.insert("type".to_string(), Value::String(envelope.kind));
    if !envelope.payload.is_null() {
        tagged.insert("payload".to_string(), envelope.payload);
    }
    let message = serde_json::from_value(Value::Object(tagged))?;
    Ok(NetworkMessage::new(message, envelope.timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttackQueue, Engine, EngineConfig};

    #[test]
    fn test_attack_wire_format() {
        let msg = NetworkMessage::new(
            Message::Attack(AttackPayload {
                rows: 2,
                gap_column: 7,
            }),
            42,
        );
        let line = encode(&msg).unwrap();
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["type"], "attack");
        assert_eq!(v["payload"]["rows"], 2);
        assert_eq!(v["payload"]["gapColumn"], 7);
        assert_eq!(v["timestamp"], 42);
        assert_eq!(decode(&line).unwrap(), msg);
    }

    #[test]
    fn test_unit_kinds_omit_payload() {
        let line = encode(&NetworkMessage::new(Message::Pause, 1)).unwrap();
        assert_eq!(line, r#"{"type":"pause","timestamp":1}"#);
        assert_eq!(decode(&line).unwrap().message, Message::Pause);
    }

    #[test]
    fn test_ping_payload_is_timestamp() {
        let line = encode(&NetworkMessage::new(Message::Ping(1_700_000_000_000), 1_700_000_000_000)).unwrap();
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["payload"], 1_700_000_000_000u64);
    }

    #[test]
    fn test_game_over_payload() {
        let line = r#"{"type":"game_over","payload":{"isGameOver":true},"timestamp":5}"#;
        assert_eq!(
            decode(line).unwrap().message,
            Message::GameOver(GameOverPayload { is_game_over: true })
        );
    }

    #[test]
    fn test_state_update_roundtrip() {
        let mut engine = Engine::new(EngineConfig::default(), AttackQueue::new());
        engine.start();
        let snapshot = engine.snapshot();
        let msg = NetworkMessage::now(Message::StateUpdate(Box::new(snapshot.clone())));
        let back = decode(&encode(&msg).unwrap()).unwrap();
        match back.message {
            Message::StateUpdate(s) => assert_eq!(*s, snapshot),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_protocol_error() {
        let err = decode(r#"{"type":"teleport","timestamp":1}"#).unwrap_err();
        assert!(matches!(err, NetError::Protocol(_)));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(decode("not json"), Err(NetError::Decode(_))));
        assert!(matches!(
            decode(r#"{"type":"attack","payload":{"rows":"x"}}"#),
            Err(NetError::Decode(_))
        ));
    }

    #[test]
    fn test_every_kind_is_listed() {
        let samples = [
            Message::Pause,
            Message::Resume,
            Message::Disconnect,
            Message::RematchRequest,
            Message::RematchAccept,
            Message::RematchDecline,
            Message::Ping(1),
            Message::Pong(1),
            Message::error("bad", "oops"),
        ];
        for m in samples {
            assert!(MESSAGE_KINDS.contains(&m.kind()));
            let line = encode(&NetworkMessage::new(m.clone(), 0)).unwrap();
            assert_eq!(decode(&line).unwrap().message, m);
        }
    }

    #[test]
    fn test_version_compatibility() {
        let hello = Hello {
            player_name: "a".to_string(),
            protocol_version: "1.4.0".to_string(),
        };
        assert!(hello.is_compatible_with("1.0.0"));
        assert!(!hello.is_compatible_with("2.0.0"));
    }
}
