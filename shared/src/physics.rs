//! Player movement rules.
//!
//! The server simulation and client prediction both run exactly this code,
//! so replaying the same inputs from the same baseline lands on the same
//! position on both sides.

use crate::protocol::InputKeys;

/// Momentum added per tick while a direction key is held.
pub const MOMENTUM_RAMP: f32 = 30.0;
pub const MAX_SIDE_SPEED: f32 = 70.0;
pub const MAX_FORWARD_SPEED: f32 = 70.0;
pub const MAX_REVERSE_SPEED: f32 = 50.0;
/// Multiplier applied to momentum on an axis with no input this tick.
pub const MOMENTUM_DECELERATION: f32 = 0.7;
/// Momentum below this magnitude snaps to zero.
pub const MOMENTUM_SNAP: f32 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerMotion {
    pub x: f32,
    pub y: f32,
    pub momentum_x: f32,
    pub momentum_y: f32,
    x_input_this_tick: bool,
    y_input_this_tick: bool,
}

impl PlayerMotion {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn with_momentum(x: f32, y: f32, momentum_x: f32, momentum_y: f32) -> Self {
        Self {
            x,
            y,
            momentum_x,
            momentum_y,
            ..Self::default()
        }
    }

    /// Ramps momentum for every held direction key.
    pub fn apply_keys(&mut self, keys: &InputKeys) {
        self.x_input_this_tick = false;
        self.y_input_this_tick = false;

        if keys.left {
            self.x_input_this_tick = true;
            self.momentum_x = (self.momentum_x - MOMENTUM_RAMP).max(-MAX_SIDE_SPEED);
        }
        if keys.right {
            self.x_input_this_tick = true;
            self.momentum_x = (self.momentum_x + MOMENTUM_RAMP).min(MAX_SIDE_SPEED);
        }
        if keys.up {
            self.y_input_this_tick = true;
            self.momentum_y = (self.momentum_y - MOMENTUM_RAMP).max(-MAX_FORWARD_SPEED);
        }
        if keys.down {
            self.y_input_this_tick = true;
            self.momentum_y = (self.momentum_y + MOMENTUM_RAMP).min(MAX_REVERSE_SPEED);
        }
    }

    /// Moves by the current momentum, then decays it and keeps the player
    /// inside the vertical play band.
    pub fn step(&mut self, world_height: f32) {
        self.x += self.momentum_x;
        self.y += self.momentum_y;

        if !self.x_input_this_tick {
            self.momentum_x *= MOMENTUM_DECELERATION;
        }
        if !self.y_input_this_tick {
            self.momentum_y *= MOMENTUM_DECELERATION;
        }
        if self.momentum_x.abs() < MOMENTUM_SNAP {
            self.momentum_x = 0.0;
        }
        if self.momentum_y.abs() < MOMENTUM_SNAP {
            self.momentum_y = 0.0;
        }

        let top = world_height * 0.1;
        let bottom = world_height * 1.1;
        if self.y < top {
            self.y = top;
            self.momentum_y = 0.0;
        }
        if self.y > bottom {
            self.y = bottom;
            self.momentum_y = 0.0;
        }
    }

    /// Pushes the player by an impulse (e.g. when hit).
    pub fn push(&mut self, dx: f32, dy: f32) {
        self.momentum_x += dx;
        self.momentum_y += dy;
    }
}
