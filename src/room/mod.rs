//! Room lifecycle - lobby roster, phase machine, and the authoritative
//! tick loop. One tokio task owns each room, so every command and every
//! tick runs to completion against exclusive state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;
use uuid::Uuid;

use crate::game::snapshot;
use crate::game::world::{GameState, DRAW, MAX_SLOTS};
use crate::game::TickInput;
use crate::util::time::{unix_millis, TICK_DURATION_MICROS};
use crate::ws::protocol::{RoomPhase, ServerMsg, SlotInfo};

pub mod registry;

/// Display names for the three starting corners
pub const CORNER_NAMES: [&str; MAX_SLOTS] = ["Top-Left", "Top-Right", "Bottom-Center"];

/// Outbound queue depth per client; slow clients drop frames
const CLIENT_BUFFER: usize = 256;

/// Commands delivered to a room's task from connection handlers
#[derive(Debug)]
pub enum RoomCmd {
    Join {
        player_id: Uuid,
        name: String,
        tx: mpsc::Sender<ServerMsg>,
    },
    Leave {
        player_id: Uuid,
    },
    SelectSlot {
        player_id: Uuid,
        slot: usize,
    },
    Start {
        player_id: Uuid,
    },
    Input {
        player_id: Uuid,
        input: TickInput,
    },
    Airstrike {
        player_id: Uuid,
    },
    Laser {
        player_id: Uuid,
    },
    Restart {
        player_id: Uuid,
    },
}

/// A connected client as seen by its room
struct RoomClient {
    tx: mpsc::Sender<ServerMsg>,
    name: String,
    slot: Option<usize>,
    input: TickInput,
}

impl RoomClient {
    /// Fire-and-forget send; a slow or dead connection drops messages
    /// rather than stalling the tick.
    fn send(&self, msg: ServerMsg) {
        let _ = self.tx.try_send(msg);
    }
}

/// Handle to a running room
#[derive(Clone)]
pub struct RoomHandle {
    pub code: String,
    pub cmd_tx: mpsc::Sender<RoomCmd>,
    phase: Arc<AtomicU8>,
    occupied: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn phase(&self) -> RoomPhase {
        RoomPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    pub fn occupied_slots(&self) -> usize {
        self.occupied.load(Ordering::Relaxed)
    }
}

/// One match's roster, phase, and simulation state (owned by its task)
pub struct Room {
    code: String,
    slots: [Option<Uuid>; MAX_SLOTS],
    clients: HashMap<Uuid, RoomClient>,
    /// Present iff phase is Playing or Ended
    state: Option<GameState>,
    phase: RoomPhase,
    shared_phase: Arc<AtomicU8>,
    shared_occupied: Arc<AtomicUsize>,
    cmd_rx: mpsc::Receiver<RoomCmd>,
    ever_joined: bool,
}

impl Room {
    pub fn new(code: String) -> (Self, RoomHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let phase = Arc::new(AtomicU8::new(RoomPhase::Lobby.as_u8()));
        let occupied = Arc::new(AtomicUsize::new(0));

        let handle = RoomHandle {
            code: code.clone(),
            cmd_tx,
            phase: phase.clone(),
            occupied: occupied.clone(),
        };

        let room = Self {
            code,
            slots: [None; MAX_SLOTS],
            clients: HashMap::new(),
            state: None,
            phase: RoomPhase::Lobby,
            shared_phase: phase,
            shared_occupied: occupied,
            cmd_rx,
            ever_joined: false,
        };

        (room, handle)
    }

    /// Drive the room until its last client leaves. Commands are handled
    /// as they arrive; the tick interval only fires while playing.
    pub async fn run(mut self) {
        info!(room = %self.code, "Room opened");

        let mut ticker = interval(Duration::from_micros(TICK_DURATION_MICROS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_cmd(cmd),
                    None => break,
                },
                _ = ticker.tick(), if self.phase == RoomPhase::Playing => self.run_tick(),
            }

            if self.ever_joined && self.clients.is_empty() {
                break;
            }
        }

        info!(room = %self.code, "Room closed");
    }

    fn handle_cmd(&mut self, cmd: RoomCmd) {
        match cmd {
            RoomCmd::Join {
                player_id,
                name,
                tx,
            } => self.handle_join(player_id, name, tx),
            RoomCmd::Leave { player_id } => self.handle_leave(player_id),
            RoomCmd::SelectSlot { player_id, slot } => self.handle_select_slot(player_id, slot),
            RoomCmd::Start { player_id } => self.handle_start(player_id),
            RoomCmd::Input { player_id, input } => self.handle_input(player_id, input),
            RoomCmd::Airstrike { player_id } => self.handle_airstrike(player_id),
            RoomCmd::Laser { player_id } => self.handle_laser(player_id),
            RoomCmd::Restart { player_id } => self.handle_restart(player_id),
        }
    }

    fn handle_join(&mut self, player_id: Uuid, name: String, tx: mpsc::Sender<ServerMsg>) {
        if self.phase != RoomPhase::Lobby {
            let _ = tx.try_send(ServerMsg::Error {
                message: "Room not found or game already started".to_string(),
            });
            return;
        }
        if self.clients.len() >= MAX_SLOTS {
            let _ = tx.try_send(ServerMsg::Error {
                message: "Room is full".to_string(),
            });
            return;
        }
        if self.clients.contains_key(&player_id) {
            return;
        }

        let client = RoomClient {
            tx,
            name,
            slot: None,
            input: TickInput::default(),
        };
        client.send(ServerMsg::RoomJoined {
            room_id: self.code.clone(),
        });
        self.clients.insert(player_id, client);
        self.ever_joined = true;

        info!(room = %self.code, player_id = %player_id, "Player joined room");
        self.broadcast_lobby_state();
    }

    fn handle_leave(&mut self, player_id: Uuid) {
        let Some(client) = self.clients.remove(&player_id) else {
            return;
        };

        if let Some(slot) = client.slot {
            self.slots[slot] = None;
            self.sync_occupied();
        }

        match self.phase {
            RoomPhase::Lobby => self.broadcast_lobby_state(),
            RoomPhase::Playing => {
                // The entity stays in the match so the win condition can
                // resolve naturally; it just stops being controllable.
                if let (Some(state), Some(slot)) = (self.state.as_mut(), client.slot) {
                    if let Some(player) = state.player_mut(slot as u8) {
                        player.hp = 0;
                        player.alive = false;
                    }
                }
            }
            RoomPhase::Ended => {}
        }

        info!(room = %self.code, player_id = %player_id, "Player left room");
    }

    fn handle_select_slot(&mut self, player_id: Uuid, slot: usize) {
        if self.phase != RoomPhase::Lobby || slot >= MAX_SLOTS {
            return;
        }
        if self.slots[slot].is_some_and(|holder| holder != player_id) {
            self.send_to(
                player_id,
                ServerMsg::Error {
                    message: "That corner is already taken!".to_string(),
                },
            );
            return;
        }
        let Some(client) = self.clients.get_mut(&player_id) else {
            return;
        };

        // Vacate the old corner atomically with claiming the new one
        if let Some(old) = client.slot.take() {
            self.slots[old] = None;
        }
        self.slots[slot] = Some(player_id);
        client.slot = Some(slot);

        self.sync_occupied();
        self.broadcast_lobby_state();
    }

    fn handle_start(&mut self, player_id: Uuid) {
        if self.phase != RoomPhase::Lobby || !self.clients.contains_key(&player_id) {
            return;
        }

        let occupied: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, holder)| holder.map(|_| i))
            .collect();
        if occupied.len() < 2 {
            self.send_to(
                player_id,
                ServerMsg::Error {
                    message: "Need at least 2 players to start!".to_string(),
                },
            );
            return;
        }

        let state = GameState::new(&occupied, rand::random());
        let snap = snapshot::build(&state);
        self.state = Some(state);
        self.set_phase(RoomPhase::Playing);

        self.broadcast(ServerMsg::GameStart { state: snap });
        info!(room = %self.code, players = occupied.len(), "Match started");
    }

    fn handle_input(&mut self, player_id: Uuid, input: TickInput) {
        if self.phase != RoomPhase::Playing {
            return;
        }
        if let Some(client) = self.clients.get_mut(&player_id) {
            client.input = input.clamped();
        }
    }

    fn handle_airstrike(&mut self, player_id: Uuid) {
        if self.phase != RoomPhase::Playing {
            return;
        }
        let Some(slot) = self.clients.get(&player_id).and_then(|c| c.slot) else {
            return;
        };
        let Some(state) = self.state.as_mut() else {
            return;
        };

        if !state.trigger_airstrike(slot as u8) {
            self.send_to(
                player_id,
                ServerMsg::Error {
                    message: "Airstrike already used!".to_string(),
                },
            );
        }
    }

    fn handle_laser(&mut self, player_id: Uuid) {
        if self.phase != RoomPhase::Playing {
            return;
        }
        let Some(slot) = self.clients.get(&player_id).and_then(|c| c.slot) else {
            return;
        };
        let Some(state) = self.state.as_mut() else {
            return;
        };

        if !state.trigger_laser(slot as u8) {
            self.send_to(
                player_id,
                ServerMsg::Error {
                    message: "Laser already used!".to_string(),
                },
            );
        }
    }

    fn handle_restart(&mut self, player_id: Uuid) {
        if self.phase != RoomPhase::Ended || !self.clients.contains_key(&player_id) {
            return;
        }

        // Roster and corner assignments survive the reset
        self.state = None;
        self.set_phase(RoomPhase::Lobby);
        self.broadcast_lobby_state();
        info!(room = %self.code, "Room reset to lobby");
    }

    /// One authoritative simulation step: apply every client's buffered
    /// input, advance projectiles and effects, broadcast the snapshot, and
    /// close the match out when the engine reports it over.
    fn run_tick(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let now = unix_millis();

        for client in self.clients.values() {
            if let Some(slot) = client.slot {
                state.apply_input(slot as u8, &client.input, now);
            }
        }

        state.advance_bullets();
        state.advance_strikes();
        state.advance_beams();

        let snap = snapshot::build(state);
        let over = state.game_over;
        let winner = state.winner.unwrap_or(DRAW);

        self.broadcast(ServerMsg::StateUpdate { state: snap });

        if over {
            self.set_phase(RoomPhase::Ended);
            self.broadcast(ServerMsg::GameOver { winner });
            info!(room = %self.code, winner, "Match ended");
        }
    }

    fn set_phase(&mut self, phase: RoomPhase) {
        self.phase = phase;
        self.shared_phase.store(phase.as_u8(), Ordering::Relaxed);
    }

    fn sync_occupied(&self) {
        let taken = self.slots.iter().filter(|slot| slot.is_some()).count();
        self.shared_occupied.store(taken, Ordering::Relaxed);
    }

    fn lobby_state(&self) -> ServerMsg {
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, holder)| SlotInfo {
                slot: i,
                corner: CORNER_NAMES[i].to_string(),
                taken: holder.is_some(),
                player_name: holder
                    .and_then(|pid| self.clients.get(&pid))
                    .map(|c| c.name.clone()),
            })
            .collect();

        ServerMsg::LobbyState {
            room_id: self.code.clone(),
            slots,
            phase: self.phase,
        }
    }

    fn broadcast_lobby_state(&self) {
        self.broadcast(self.lobby_state());
    }

    fn broadcast(&self, msg: ServerMsg) {
        for client in self.clients.values() {
            client.send(msg.clone());
        }
    }

    fn send_to(&self, player_id: Uuid, msg: ServerMsg) {
        if let Some(client) = self.clients.get(&player_id) {
            client.send(msg);
        }
    }
}

/// Create the outbound channel for one client connection
pub fn client_channel() -> (mpsc::Sender<ServerMsg>, mpsc::Receiver<ServerMsg>) {
    mpsc::channel(CLIENT_BUFFER)
}
