//! Networking core: wire protocol, length-prefixed framing, session
//! lifecycle, broadcast fan-out, and the TCP connection gateway.
//!
//! All world mutation funnels through the single-writer [`engine::Engine`]
//! task; the gateway only decodes frames into [`engine::Intent`]s and writes
//! outbound events, so slow or hostile connections can never stall the
//! authoritative store.

pub mod broadcast;
pub mod engine;
pub mod framing;
pub mod gateway;
pub mod messages;
pub mod session;

pub use broadcast::Fanout;
pub use engine::{Engine, Intent, intent_channel};
pub use framing::{FrameConfig, FrameError, read_frame, write_frame};
pub use gateway::{ConnectionId, Gateway, GatewayConfig, IdGenerator};
pub use messages::{
    ClientMessage, MessageError, PROTOCOL_VERSION, ServerMessage, decode, encode,
};
pub use session::{RegisterOutcome, SessionState, SessionTable};
