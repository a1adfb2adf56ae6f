//! Wire message types and serialization.
//!
//! Inbound intents and outbound events are closed tagged unions with fixed
//! schemas, serialized with [`postcard`] behind a protocol version byte.
//! Decoding failures are frame-local: the gateway drops the frame and keeps
//! the connection.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use plaza_world::{ObjectId, ObjectSpec, Player, PlayerId, Shape, WorldObject, WorldSnapshot};

/// Current wire-protocol version. Prepended to every serialized message.
pub const PROTOCOL_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Intent sent by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientMessage {
    /// Register a player for this connection.
    Register(Register),
    /// Update own position and/or yaw. No acknowledgment.
    PlayerMove(PlayerMove),
    /// Place an object. Result arrives via the `ObjectPlaced` broadcast.
    PlaceObject(PlaceObject),
    /// Remove an object by id. No acknowledgment.
    RemoveObject(RemoveObject),
    /// Generate a procedural city batch. No payload, no acknowledgment.
    GenerateCity,
}

/// Registration request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Register {
    /// Desired display name; blank or missing falls back to the placeholder.
    pub name: Option<String>,
}

/// Movement update. Only supplied fields are applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerMove {
    /// New position, if any.
    pub position: Option<Vec3>,
    /// New yaw in radians, if any.
    pub yaw: Option<f32>,
}

/// Object placement request. Everything except `position` is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceObject {
    /// Shape; defaults to cube.
    pub shape: Option<Shape>,
    /// Size; defaults to 1.
    pub size: Option<f32>,
    /// Color; defaults to gray.
    pub color: Option<String>,
    /// Opacity; clamped to `[0, 1]`, defaults to 1.
    pub alpha: Option<f32>,
    /// Requested position (snapped server-side).
    pub position: Vec3,
    /// Orientation; defaults to zero.
    pub rotation: Option<Vec3>,
}

impl From<PlaceObject> for ObjectSpec {
    fn from(msg: PlaceObject) -> Self {
        ObjectSpec {
            shape: msg.shape,
            size: msg.size,
            color: msg.color,
            alpha: msg.alpha,
            position: msg.position,
            rotation: msg.rotation,
        }
    }
}

/// Object removal request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RemoveObject {
    /// Target object id. Unknown ids are silently ignored.
    pub id: ObjectId,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Event pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMessage {
    /// Registration acknowledgment. Cannot signal failure.
    RegisterAck(RegisterAck),
    /// Full world snapshot, sent once to the newly registered connection.
    InitState(WorldSnapshot),
    /// Another player joined.
    PlayerJoined(Player),
    /// Another player moved.
    PlayerMoved(PlayerMoved),
    /// A player disconnected.
    PlayerDisconnected(PlayerDisconnected),
    /// An object was placed (echoed to the actor too).
    ObjectPlaced(WorldObject),
    /// An object was removed.
    ObjectRemoved(ObjectRemoved),
}

/// Registration acknowledgment payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterAck {
    /// Always `true`; registration cannot fail.
    pub ok: bool,
    /// The name actually stored (after defaulting).
    pub name: String,
    /// Player count after this registration.
    pub player_count: u32,
}

/// Movement broadcast payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlayerMoved {
    /// The player that moved.
    pub id: PlayerId,
    /// Stored position after clamping.
    pub position: Vec3,
    /// Stored yaw.
    pub yaw: f32,
}

/// Departure broadcast payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlayerDisconnected {
    /// The player that left.
    pub id: PlayerId,
}

/// Removal broadcast payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ObjectRemoved {
    /// The removed object's id.
    pub id: ObjectId,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding a message payload.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The payload carried no version byte.
    #[error("empty payload, no version byte")]
    EmptyPayload,

    /// The version byte does not match [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Postcard deserialization failed.
    #[error("deserialization error: {0}")]
    Postcard(#[from] postcard::Error),
}

/// Serialize a message into a versioned binary payload.
///
/// Wire format: `[version: u8] [postcard-encoded body]`.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, postcard::Error> {
    let body = postcard::to_allocvec(msg)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Deserialize a versioned binary payload.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, MessageError> {
    let (&version, body) = data.split_first().ok_or(MessageError::EmptyPayload)?;
    if version != PROTOCOL_VERSION {
        return Err(MessageError::UnsupportedVersion(version));
    }
    Ok(postcard::from_bytes(body)?)
}
