use serde::{Deserialize, Serialize};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::tilemap::LevelDocument;

// Macro to reduce boilerplate for structs
macro_rules! message {
    ($(#[$meta:meta])* struct $name:ident $body:tt) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[cfg_attr(feature = "bincode", derive(Encode, Decode))]
        $(#[$meta])*
        pub struct $name $body
    };
}

// ============================================================================
// Client Messages
// ============================================================================

message! {
// Client to Server: Generate a level. `hall_width` defaults to 1; without a
// seed the server draws one from OS entropy.
#[serde(rename_all = "camelCase")]
struct CGenerateLevel {
    pub height: i32,
    pub width: i32,
    #[serde(default)]
    pub hall_width: Option<i32>,
    #[serde(default)]
    pub seed: Option<u64>,
}
}

message! {
// Client to Server: Graceful disconnect notification.
struct CLogoff {}
}

// ============================================================================
// Server Messages
// ============================================================================

message! {
// Server to Client: A generated level.
struct SLevel {
    pub level: LevelDocument,
}
}

message! {
// Server to Client: The request failed.
struct SError {
    pub message: String,
}
}

// ============================================================================
// Message Envelopes
// ============================================================================

// All client to server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum ClientMessage {
    GenerateLevel(CGenerateLevel),
    Logoff(CLogoff),
}

// All server to client messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum ServerMessage {
    Level(SLevel),
    Error(SError),
}
