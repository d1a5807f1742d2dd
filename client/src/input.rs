//! Key state tracking and input sequencing

use shared::{InputKeys, PlayerInput, PlayerWeapon};

/// A control the player can hold down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Shoot,
}

/// Tracks held keys and turns them into sequenced [`PlayerInput`]s.
///
/// Opposing directions are exclusive: pressing left while right is held is
/// ignored until right is released.
pub struct InputManager {
    next_sequence: u32,
    keys: InputKeys,
    pending_weapon: Option<PlayerWeapon>,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            keys: InputKeys::none(),
            pending_weapon: None,
        }
    }

    pub fn press(&mut self, key: Key) {
        match key {
            Key::Up if !self.keys.down => self.keys.up = true,
            Key::Down if !self.keys.up => self.keys.down = true,
            Key::Left if !self.keys.right => self.keys.left = true,
            Key::Right if !self.keys.left => self.keys.right = true,
            Key::Shoot => self.keys.shoot = true,
            _ => {}
        }
    }

    pub fn release(&mut self, key: Key) {
        match key {
            Key::Up => self.keys.up = false,
            Key::Down => self.keys.down = false,
            Key::Left => self.keys.left = false,
            Key::Right => self.keys.right = false,
            Key::Shoot => self.keys.shoot = false,
        }
    }

    pub fn release_all(&mut self) {
        self.keys = InputKeys::none();
    }

    /// Requests a weapon switch with the next input.
    pub fn select_weapon(&mut self, weapon: PlayerWeapon) {
        self.pending_weapon = Some(weapon);
    }

    pub fn keys(&self) -> &InputKeys {
        &self.keys
    }

    /// Builds the input for this tick and advances the sequence.
    pub fn next_input(&mut self) -> PlayerInput {
        let input = PlayerInput {
            input_sequence_number: self.next_sequence,
            keys: self.keys,
            weapon: self.pending_weapon.take(),
        };
        self.next_sequence += 1;
        input
    }

    /// The server fills ticks we sent nothing for with synthetic inputs
    /// that use up sequence numbers. Skip past anything it acknowledged so
    /// our next input is not mistaken for one it already applied.
    pub fn skip_acknowledged(&mut self, acknowledged: u32) {
        if acknowledged >= self.next_sequence {
            self.next_sequence = acknowledged + 1;
        }
    }

    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
