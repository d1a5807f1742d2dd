//! Client-side prediction and server reconciliation.
//!
//! Every input is applied to the local ship the moment it is submitted and
//! kept in a [`PendingInputBuffer`] until the server acknowledges it. When a
//! snapshot of our own ship arrives, the acknowledged prefix is dropped and
//! the rest is replayed on top of the server's position.

use shared::models::LivePlayerModel;
use shared::physics::PlayerMotion;
use shared::PlayerInput;
use std::collections::VecDeque;

/// Inputs sent to the server but not yet acknowledged, oldest first.
#[derive(Debug, Default)]
pub struct PendingInputBuffer {
    inputs: VecDeque<PlayerInput>,
}

impl PendingInputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an input. Returns false (and keeps the buffer unchanged) if
    /// its sequence number does not follow the last buffered one.
    pub fn push(&mut self, input: PlayerInput) -> bool {
        if let Some(last) = self.last_sequence() {
            if input.input_sequence_number <= last {
                return false;
            }
        }
        self.inputs.push_back(input);
        true
    }

    /// Drops every input up to and including `sequence`. Returns how many
    /// were dropped.
    pub fn acknowledge(&mut self, sequence: u32) -> usize {
        let mut dropped = 0;
        while let Some(front) = self.inputs.front() {
            if front.input_sequence_number > sequence {
                break;
            }
            self.inputs.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn last_sequence(&self) -> Option<u32> {
        self.inputs.back().map(|input| input.input_sequence_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerInput> {
        self.inputs.iter()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Predicted state of the locally controlled ship.
#[derive(Debug)]
pub struct Predictor {
    motion: PlayerMotion,
    world_height: f32,
    pending: PendingInputBuffer,
    last_acknowledged: u32,
}

impl Predictor {
    pub fn new(baseline: &LivePlayerModel, world_height: f32) -> Self {
        Self {
            motion: motion_from(baseline),
            world_height,
            pending: PendingInputBuffer::new(),
            last_acknowledged: baseline.last_processed_input_sequence_number,
        }
    }

    /// Applies an input locally and remembers it for replay.
    pub fn submit(&mut self, input: PlayerInput) {
        if !self.pending.push(input) {
            return;
        }
        self.advance(&input);
    }

    /// Conforms to an authoritative snapshot of our ship.
    ///
    /// Snapshots acknowledging less than one already applied are stale and
    /// ignored; returns whether the snapshot was applied.
    pub fn reconcile(&mut self, authoritative: &LivePlayerModel) -> bool {
        let acknowledged = authoritative.last_processed_input_sequence_number;
        if acknowledged < self.last_acknowledged {
            return false;
        }
        self.last_acknowledged = acknowledged;
        self.pending.acknowledge(acknowledged);

        self.motion = motion_from(authoritative);
        let replay: Vec<PlayerInput> = self.pending.iter().copied().collect();
        for input in &replay {
            self.advance(input);
        }
        true
    }

    fn advance(&mut self, input: &PlayerInput) {
        self.motion.apply_keys(&input.keys);
        self.motion.step(self.world_height);
    }

    pub fn position(&self) -> (f32, f32) {
        (self.motion.x, self.motion.y)
    }

    pub fn momentum(&self) -> (f32, f32) {
        (self.motion.momentum_x, self.motion.momentum_y)
    }

    pub fn last_acknowledged(&self) -> u32 {
        self.last_acknowledged
    }

    pub fn pending(&self) -> &PendingInputBuffer {
        &self.pending
    }
}

fn motion_from(model: &LivePlayerModel) -> PlayerMotion {
    PlayerMotion::with_momentum(model.x, model.y, model.momentum_x, model.momentum_y)
}
