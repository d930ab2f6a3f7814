// Wire protocol: the message envelope, payload DTOs and conversions into domain types.
// Envelope decoding only checks the JSON shape and the type tag; payload checks live in
// `ServerMessage::try_from`.

use crate::domain::{
    AgentSnapshot, DestroyNotice, EntityKind, MatchResult, PlayerResult, ProjectileSnapshot,
    SnapshotError, Vec2,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message discriminant carried in the envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Debug,
    StartGame,
    StartSimulation,
    PlayerCode,
    // Player code raised on the server.
    #[serde(rename = "python_error")]
    ServerError,
    AgentStates,
    ProjectileStates,
    Destroy,
    Results,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Debug => "debug",
            MessageKind::StartGame => "start_game",
            MessageKind::StartSimulation => "start_simulation",
            MessageKind::PlayerCode => "player_code",
            MessageKind::ServerError => "python_error",
            MessageKind::AgentStates => "agent_states",
            MessageKind::ProjectileStates => "projectile_states",
            MessageKind::Destroy => "destroy",
            MessageKind::Results => "results",
        }
    }

    pub fn from_wire(tag: &str) -> Option<Self> {
        let kind = match tag {
            "debug" => MessageKind::Debug,
            "start_game" => MessageKind::StartGame,
            "start_simulation" => MessageKind::StartSimulation,
            "player_code" => MessageKind::PlayerCode,
            "python_error" => MessageKind::ServerError,
            "agent_states" => MessageKind::AgentStates,
            "projectile_states" => MessageKind::ProjectileStates,
            "destroy" => MessageKind::Destroy,
            "results" => MessageKind::Results,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message per transport frame: `{ "type": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug)]
pub enum DecodeError {
    // Not JSON, or not an object with a string `type`.
    Malformed(serde_json::Error),
    UnknownKind(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(err) => write!(f, "malformed envelope: {err}"),
            DecodeError::UnknownKind(tag) => write!(f, "unknown message type: {tag}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Malformed(err) => Some(err),
            DecodeError::UnknownKind(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct EncodeError(pub serde_json::Error);

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to encode message: {}", self.0)
    }
}

impl std::error::Error for EncodeError {}

pub fn decode(text: &str) -> Result<Envelope, DecodeError> {
    let raw: RawEnvelope = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    let kind = MessageKind::from_wire(&raw.kind).ok_or(DecodeError::UnknownKind(raw.kind))?;
    Ok(Envelope {
        kind,
        data: raw.data,
    })
}

pub fn encode(envelope: &Envelope) -> Result<String, EncodeError> {
    serde_json::to_string(envelope).map_err(EncodeError)
}

/// Payload did not match the shape its kind declares.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadError {
    // Kind is valid on the wire but has no inbound handler (client-to-server only).
    Unhandled(MessageKind),
    Shape {
        kind: MessageKind,
        expected: &'static str,
        actual: &'static str,
    },
    Invalid {
        kind: MessageKind,
        reason: String,
    },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Unhandled(kind) => write!(f, "unhandled message type: {kind}"),
            PayloadError::Shape {
                kind,
                expected,
                actual,
            } => write!(f, "{kind} payload: expected {expected}, got {actual}"),
            PayloadError::Invalid { kind, reason } => write!(f, "{kind} payload: {reason}"),
        }
    }
}

impl std::error::Error for PayloadError {}

fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Messages the server sends to the client, with validated payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Debug(String),
    StartGame,
    StartSimulation,
    ServerError(String),
    // Per-record results; one malformed record does not poison the batch.
    AgentStates(Vec<Result<AgentSnapshot, SnapshotError>>),
    ProjectileStates(Vec<Result<ProjectileSnapshot, SnapshotError>>),
    Destroy(DestroyNotice),
    Results(MatchResult),
}

impl TryFrom<Envelope> for ServerMessage {
    type Error = PayloadError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let Envelope { kind, data } = envelope;
        match kind {
            MessageKind::Debug => Ok(ServerMessage::Debug(match data {
                Value::String(text) => text,
                other => other.to_string(),
            })),
            MessageKind::StartGame => expect_null(kind, &data).map(|_| ServerMessage::StartGame),
            MessageKind::StartSimulation => {
                expect_null(kind, &data).map(|_| ServerMessage::StartSimulation)
            }
            MessageKind::ServerError => match data {
                Value::String(text) => Ok(ServerMessage::ServerError(text)),
                other => Err(PayloadError::Shape {
                    kind,
                    expected: "string",
                    actual: json_shape(&other),
                }),
            },
            MessageKind::AgentStates => {
                parse_batch::<AgentStateDto, _>(kind, EntityKind::Agent, data)
                    .map(ServerMessage::AgentStates)
            }
            MessageKind::ProjectileStates => {
                parse_batch::<ProjectileStateDto, _>(kind, EntityKind::Projectile, data)
                    .map(ServerMessage::ProjectileStates)
            }
            MessageKind::Destroy => parse_object::<DestroyDto>(kind, data)
                .map(|dto| ServerMessage::Destroy(dto.into())),
            MessageKind::Results => parse_object::<ResultsDto>(kind, data)
                .map(|dto| ServerMessage::Results(dto.into())),
            MessageKind::PlayerCode => Err(PayloadError::Unhandled(kind)),
        }
    }
}

fn expect_null(kind: MessageKind, data: &Value) -> Result<(), PayloadError> {
    if data.is_null() {
        Ok(())
    } else {
        Err(PayloadError::Shape {
            kind,
            expected: "null",
            actual: json_shape(data),
        })
    }
}

fn parse_object<D: DeserializeOwned>(kind: MessageKind, data: Value) -> Result<D, PayloadError> {
    if !data.is_object() {
        return Err(PayloadError::Shape {
            kind,
            expected: "object",
            actual: json_shape(&data),
        });
    }
    serde_json::from_value(data).map_err(|err| PayloadError::Invalid {
        kind,
        reason: err.to_string(),
    })
}

fn parse_batch<D, T>(
    kind: MessageKind,
    entity_kind: EntityKind,
    data: Value,
) -> Result<Vec<Result<T, SnapshotError>>, PayloadError>
where
    D: DeserializeOwned,
    T: From<D>,
{
    let Value::Array(items) = data else {
        return Err(PayloadError::Shape {
            kind,
            expected: "array",
            actual: json_shape(&data),
        });
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            // Keep the id for logs even when the rest of the record is unreadable.
            let id = item.get("id").and_then(Value::as_u64);
            serde_json::from_value::<D>(item)
                .map(T::from)
                .map_err(|err| SnapshotError {
                    kind: entity_kind,
                    index,
                    id,
                    reason: err.to_string(),
                })
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PositionDto {
    pub x: f64,
    pub y: f64,
}

impl From<PositionDto> for Vec2 {
    fn from(position: PositionDto) -> Self {
        Vec2::new(position.x, position.y)
    }
}

/// Per-agent state record inside `agent_states`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStateDto {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub position: PositionDto,
    pub angle: f64,
    pub health: u32,
    pub shield_enabled: bool,
}

impl From<AgentStateDto> for AgentSnapshot {
    fn from(dto: AgentStateDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            position: dto.position.into(),
            orientation: dto.angle,
            health: dto.health,
            shield_active: dto.shield_enabled,
        }
    }
}

/// Per-projectile state record inside `projectile_states`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileStateDto {
    pub id: u64,
    pub attacker_id: u64,
    pub angle: f64,
    pub position: PositionDto,
}

impl From<ProjectileStateDto> for ProjectileSnapshot {
    fn from(dto: ProjectileStateDto) -> Self {
        Self {
            id: dto.id,
            owner_id: dto.attacker_id,
            position: dto.position.into(),
            orientation: dto.angle,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKindDto {
    Agent,
    Projectile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DestroyDto {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: EntityKindDto,
}

impl From<DestroyDto> for DestroyNotice {
    fn from(dto: DestroyDto) -> Self {
        let kind = match dto.kind {
            EntityKindDto::Agent => EntityKind::Agent,
            EntityKindDto::Projectile => EntityKind::Projectile,
        };
        Self { id: dto.id, kind }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerResultDto {
    pub class_name: String,
    #[serde(default)]
    pub survival_time: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsDto {
    pub winner: bool,
    pub tie: bool,
    #[serde(default)]
    pub players: Vec<PlayerResultDto>,
    #[serde(default)]
    pub error: bool,
}

impl From<ResultsDto> for MatchResult {
    fn from(dto: ResultsDto) -> Self {
        Self {
            winner_declared: dto.winner,
            is_tie: dto.tie,
            players: dto
                .players
                .into_iter()
                .map(|player| PlayerResult {
                    class_name: player.class_name,
                    survival_time_seconds: player.survival_time,
                })
                .collect(),
            terminated_by_error: dto.error,
        }
    }
}

/// Payload for submitting player code before the simulation starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerCodePayload {
    pub code: String,
    pub class_name: String,
}

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Debug(String),
    PlayerCode(PlayerCodePayload),
}

impl ClientMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ClientMessage::Debug(_) => MessageKind::Debug,
            ClientMessage::PlayerCode(_) => MessageKind::PlayerCode,
        }
    }

    pub fn into_envelope(self) -> Result<Envelope, EncodeError> {
        let kind = self.kind();
        let data = match self {
            ClientMessage::Debug(text) => Value::String(text),
            ClientMessage::PlayerCode(payload) => {
                serde_json::to_value(payload).map_err(EncodeError)?
            }
        };
        Ok(Envelope { kind, data })
    }
}
