//! 7TV payload schemas — REST snapshots and EventAPI frames
//!
//! Every inbound shape is a strict serde struct: a missing field or a field
//! of the wrong type is a decode error, which callers turn into a dropped
//! message or an absent fetch.

use crate::error::{EmoteError, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// REST
// ---------------------------------------------------------------------------

/// An emote as it appears in sets and in `emote_set.update` pushes
#[derive(Debug, Clone, Deserialize)]
pub struct SevenTvEmote {
    pub name: String,
    pub data: SevenTvEmoteData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SevenTvEmoteData {
    pub animated: bool,
    pub host: SevenTvHost,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SevenTvHost {
    /// Protocol-relative CDN base, e.g. `//cdn.7tv.app/emote/<id>`
    pub url: String,
}

impl SevenTvEmote {
    /// CDN URL of the largest rendition
    pub fn asset_url(&self) -> String {
        let ext = if self.data.animated { "gif" } else { "png" };
        format!("{}/4x.{}", self.data.host.url.trim_end_matches('/'), ext)
    }
}

/// `GET /users/twitch/<id>`
#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub user: UserRef,
    pub emote_set: EmoteSetRef,
}

#[derive(Debug, Deserialize)]
pub struct UserRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct EmoteSetRef {
    pub id: String,
    pub emotes: Vec<SevenTvEmote>,
}

/// `GET /emote-sets/global`
#[derive(Debug, Deserialize)]
pub struct GlobalSetResponse {
    pub emotes: Vec<SevenTvEmote>,
}

// ---------------------------------------------------------------------------
// EventAPI
// ---------------------------------------------------------------------------

/// EventAPI v3 opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Dispatch = 0,
    Hello = 1,
    Heartbeat = 2,
    Reconnect = 4,
    Ack = 5,
    Error = 6,
    EndOfStream = 7,
    Subscribe = 35,
    Unsubscribe = 36,
}

impl TryFrom<u8> for Opcode {
    type Error = EmoteError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Opcode::Dispatch),
            1 => Ok(Opcode::Hello),
            2 => Ok(Opcode::Heartbeat),
            4 => Ok(Opcode::Reconnect),
            5 => Ok(Opcode::Ack),
            6 => Ok(Opcode::Error),
            7 => Ok(Opcode::EndOfStream),
            35 => Ok(Opcode::Subscribe),
            36 => Ok(Opcode::Unsubscribe),
            other => Err(EmoteError::schema(
                "7tv frame",
                format!("unknown opcode {}", other),
            )),
        }
    }
}

/// Event types the client subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    EmoteSet,
    User,
}

impl SubscriptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmoteSet => "emote_set.update",
            Self::User => "user.update",
        }
    }
}

/// Client → server frame
#[derive(Debug, Clone, Serialize)]
pub struct ClientMessage {
    pub op: u8,
    pub d: SubscriptionPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub condition: Condition,
}

#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    pub object_id: String,
}

impl ClientMessage {
    pub fn subscribe(kind: SubscriptionKind, object_id: impl Into<String>) -> Self {
        Self::new(Opcode::Subscribe, kind, object_id)
    }

    pub fn unsubscribe(kind: SubscriptionKind, object_id: impl Into<String>) -> Self {
        Self::new(Opcode::Unsubscribe, kind, object_id)
    }

    fn new(op: Opcode, kind: SubscriptionKind, object_id: impl Into<String>) -> Self {
        Self {
            op: op as u8,
            d: SubscriptionPayload {
                kind: kind.as_str(),
                condition: Condition {
                    object_id: object_id.into(),
                },
            },
        }
    }

    /// Encode as a single text frame
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    op: u8,
    #[serde(default)]
    d: serde_json::Value,
}

/// Decoded server → client frame
#[derive(Debug)]
pub enum ServerMessage {
    Dispatch(DispatchEvent),
    Hello { session_id: Option<String> },
    Heartbeat,
    /// Server asks the client to reconnect
    Reconnect,
    Ack,
    Error { message: String },
    /// Server is closing the stream
    EndOfStream,
}

impl ServerMessage {
    /// Decode one text frame, rejecting unknown opcodes and dispatch types
    pub fn parse(text: &str) -> Result<Self> {
        let frame: RawFrame =
            serde_json::from_str(text).map_err(|e| EmoteError::schema("7tv frame", e))?;

        let message = match Opcode::try_from(frame.op)? {
            Opcode::Dispatch => Self::Dispatch(
                serde_json::from_value(frame.d)
                    .map_err(|e| EmoteError::schema("7tv dispatch", e))?,
            ),
            Opcode::Hello => Self::Hello {
                session_id: frame
                    .d
                    .get("session_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            },
            Opcode::Heartbeat => Self::Heartbeat,
            Opcode::Reconnect => Self::Reconnect,
            Opcode::Ack => Self::Ack,
            Opcode::Error => Self::Error {
                message: frame
                    .d
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            },
            Opcode::EndOfStream => Self::EndOfStream,
            op @ (Opcode::Subscribe | Opcode::Unsubscribe) => {
                return Err(EmoteError::schema(
                    "7tv frame",
                    format!("client opcode {} sent by server", op as u8),
                ));
            }
        };

        Ok(message)
    }
}

/// Dispatch payload, selected by its `type` field
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "body")]
pub enum DispatchEvent {
    #[serde(rename = "emote_set.update")]
    EmoteSetUpdate(EmoteSetUpdate),
    #[serde(rename = "user.update")]
    UserUpdate(UserUpdate),
}

/// Incremental change to a subscribed emote set
#[derive(Debug, Default, Deserialize)]
pub struct EmoteSetUpdate {
    /// Set the diff belongs to
    pub id: String,
    #[serde(default)]
    pub pushed: Vec<PushedEmote>,
    #[serde(default)]
    pub pulled: Vec<PulledEmote>,
}

#[derive(Debug, Deserialize)]
pub struct PushedEmote {
    pub value: SevenTvEmote,
}

#[derive(Debug, Deserialize)]
pub struct PulledEmote {
    pub old_value: PulledValue,
}

#[derive(Debug, Deserialize)]
pub struct PulledValue {
    pub name: String,
}

impl EmoteSetUpdate {
    /// Names to delete, in event order
    pub fn removed_names(&self) -> impl Iterator<Item = &str> {
        self.pulled.iter().map(|p| p.old_value.name.as_str())
    }

    /// Emotes to upsert, in event order
    pub fn added(&self) -> impl Iterator<Item = &SevenTvEmote> {
        self.pushed.iter().map(|p| &p.value)
    }
}

/// Change to a subscribed user object
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub updated: Vec<ChangeField>,
}

/// One changed field; `value` may itself be a list of nested changes
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeField {
    pub key: String,
    #[serde(default)]
    pub old_value: serde_json::Value,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A user's active emote set moved from `old` to `new`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmoteSetChange {
    pub old: String,
    pub new: String,
}

impl UserUpdate {
    /// Extract the `connections → emote_set_id` change, if this update has one
    pub fn emote_set_change(&self) -> Option<EmoteSetChange> {
        self.updated
            .iter()
            .filter(|field| field.key == "connections")
            .filter_map(|field| field.value.as_array())
            .flatten()
            .filter_map(|nested| serde_json::from_value::<ChangeField>(nested.clone()).ok())
            .find(|nested| nested.key == "emote_set_id")
            .and_then(|nested| {
                Some(EmoteSetChange {
                    old: nested.old_value.as_str()?.to_string(),
                    new: nested.value.as_str()?.to_string(),
                })
            })
    }
}
