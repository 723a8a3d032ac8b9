//! Game simulation modules

pub mod combat;
pub mod physics;
pub mod snapshot;
pub mod world;

pub use world::GameState;

/// Latest held-key input for one player, applied every tick until replaced
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub forward: f32,
    pub rotate: f32,
    pub shoot: bool,
}

impl TickInput {
    /// Clamp the analog axes to the legal input range
    pub fn clamped(self) -> Self {
        Self {
            forward: self.forward.clamp(-1.0, 1.0),
            rotate: self.rotate.clamp(-1.0, 1.0),
            shoot: self.shoot,
        }
    }
}
