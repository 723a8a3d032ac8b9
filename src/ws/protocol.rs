//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::combat::StrikePhase;

/// Room lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Waiting for players to claim corners
    Lobby,
    /// Match in progress
    Playing,
    /// Match finished, waiting for restart
    Ended,
}

impl RoomPhase {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Playing,
            2 => Self::Ended,
            _ => Self::Lobby,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request the list of joinable rooms
    ListRooms,

    /// Create a new room and join it
    CreateRoom {
        #[serde(default)]
        name: Option<String>,
    },

    /// Join an existing room by code (case-insensitive)
    JoinRoom {
        room_id: String,
        #[serde(default)]
        name: Option<String>,
    },

    /// Claim a starting corner in the lobby
    SelectCorner { slot: usize },

    /// Start the match (needs at least 2 claimed corners)
    StartGame,

    /// Held-key input state, streamed at client frame rate
    Input {
        /// Forward input (-1.0 = reverse, 1.0 = forward)
        #[serde(default)]
        forward: f32,
        /// Rotation input (-1.0 = left, 1.0 = right)
        #[serde(default)]
        rotate: f32,
        /// Fire key held
        #[serde(default)]
        shoot: bool,
    },

    /// Trigger the one-shot airstrike ability
    Airstrike,

    /// Trigger the one-shot laser ability
    Laser,

    /// Reset an ended match back to the lobby
    Restart,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { player_id: Uuid },

    /// Joinable rooms (lobby phase only)
    RoomList { rooms: Vec<RoomSummary> },

    /// Confirmation of room join
    RoomJoined { room_id: String },

    /// Lobby roster, broadcast on every roster change
    LobbyState {
        room_id: String,
        slots: Vec<SlotInfo>,
        phase: RoomPhase,
    },

    /// Match started; carries the initial snapshot
    GameStart { state: GameSnapshot },

    /// Full state snapshot, sent every tick
    StateUpdate { state: GameSnapshot },

    /// Match finished; winner is a slot id, or -1 for a draw
    GameOver { winner: i32 },

    /// Error message
    Error { message: String },
}

/// Summary of a joinable room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub players: usize,
    pub max_players: usize,
}

/// One lobby slot as shown to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotInfo {
    pub slot: usize,
    pub corner: String,
    pub taken: bool,
    pub player_name: Option<String>,
}

/// Full game state snapshot (no delta compression)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub players: Vec<PlayerSnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub obstacles: Vec<ObstacleSnapshot>,
    pub airstrikes: Vec<StrikeSnapshot>,
    pub lasers: Vec<BeamSnapshot>,
    pub winner: Option<i32>,
    pub game_over: bool,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    /// Facing angle in radians
    pub angle: f32,
    pub hp: i32,
    pub alive: bool,
    pub color: String,
    pub glow_color: String,
    pub airstrike_used: bool,
    pub laser_used: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub owner: u8,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleSnapshot {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub owner: u8,
    pub color: String,
    pub ticks_left: i32,
    pub phase: StrikePhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamSnapshot {
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    pub owner: u8,
    pub color: String,
    pub glow_color: String,
    pub ticks_left: i32,
}
