//! A pilot that holds random keys, for load and soak testing.

use crate::input::{InputManager, Key};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::PlayerWeapon;

const KEYS: [Key; 5] = [Key::Up, Key::Down, Key::Left, Key::Right, Key::Shoot];
const WEAPONS: [PlayerWeapon; 4] = [
    PlayerWeapon::Laser1,
    PlayerWeapon::Laser2,
    PlayerWeapon::Rocket,
    PlayerWeapon::Torpedo,
];

pub struct RandomPilot {
    rng: StdRng,
    /// Chance per tick of flipping each key.
    flip_chance: f64,
}

impl RandomPilot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            flip_chance: 0.2,
        }
    }

    pub fn steer(&mut self, input: &mut InputManager) {
        for key in KEYS {
            if !self.rng.gen_bool(self.flip_chance) {
                continue;
            }
            if is_held(input, key) {
                input.release(key);
            } else {
                input.press(key);
            }
        }
        if self.rng.gen_bool(0.02) {
            input.select_weapon(WEAPONS[self.rng.gen_range(0..WEAPONS.len())]);
        }
    }
}

fn is_held(input: &InputManager, key: Key) -> bool {
    let keys = input.keys();
    match key {
        Key::Up => keys.up,
        Key::Down => keys.down,
        Key::Left => keys.left,
        Key::Right => keys.right,
        Key::Shoot => keys.shoot,
    }
}
