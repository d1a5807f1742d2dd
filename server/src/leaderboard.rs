//! Per-player statistics and ranking.

use shared::protocol::LeaderboardEntryRanked;
use shared::{Keyed, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    /// Milliseconds alive.
    AliveTime,
    DamageGiven,
    DamageTaken,
    EnemiesKilled,
    EventsParticipatedIn,
    ShotsFired,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: u32,
    pub alive_time: u32,
    pub damage_given: u32,
    pub damage_taken: u32,
    pub enemies_killed: u32,
    pub events_participated_in: u32,
    pub shots_fired: u32,
}

impl Keyed for LeaderboardEntry {
    fn key(&self) -> u32 {
        self.user_id
    }
}

impl LeaderboardEntry {
    pub fn score(&self) -> u32 {
        (self.alive_time / 1000)
            .saturating_add(self.damage_given)
            .saturating_add(self.enemies_killed.saturating_mul(10))
            .saturating_add(self.events_participated_in.saturating_mul(100))
    }
}

/// Stats keyed by the player's entity id.
#[derive(Debug, Default)]
pub struct Leaderboard {
    entries: Registry<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&mut self, user_id: u32) {
        self.entries.push(LeaderboardEntry {
            user_id,
            ..LeaderboardEntry::default()
        });
    }

    pub fn remove_player(&mut self, user_id: u32) {
        self.entries.remove(user_id);
    }

    pub fn contains(&self, user_id: u32) -> bool {
        self.entries.contains(user_id)
    }

    pub fn entry(&self, user_id: u32) -> Option<&LeaderboardEntry> {
        self.entries.lookup(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds to a stat. Unknown players (e.g. already dead) are ignored.
    pub fn increase(&mut self, user_id: u32, stat: Stat, amount: u32) {
        let Some(entry) = self.entries.lookup_mut(user_id) else {
            return;
        };
        let field = match stat {
            Stat::AliveTime => &mut entry.alive_time,
            Stat::DamageGiven => &mut entry.damage_given,
            Stat::DamageTaken => &mut entry.damage_taken,
            Stat::EnemiesKilled => &mut entry.enemies_killed,
            Stat::EventsParticipatedIn => &mut entry.events_participated_in,
            Stat::ShotsFired => &mut entry.shots_fired,
        };
        *field = field.saturating_add(amount);
    }

    /// Ranked rows, best first. Equal scores rank by join order. Usernames
    /// are left empty for the caller to fill in.
    pub fn ranked(&self) -> Vec<LeaderboardEntryRanked> {
        let mut rows: Vec<&LeaderboardEntry> = self.entries.iter().collect();
        rows.sort_by(|a, b| b.score().cmp(&a.score()));
        rows.into_iter()
            .enumerate()
            .map(|(index, entry)| LeaderboardEntryRanked {
                alive_time: entry.alive_time,
                calculated_score: entry.score(),
                damage_given: entry.damage_given,
                damage_taken: entry.damage_taken,
                enemies_killed: entry.enemies_killed,
                events_participated_in: entry.events_participated_in,
                shots_fired: entry.shots_fired,
                user_id: entry.user_id,
                username: String::new(),
                rank: (index + 1).min(u16::MAX as usize) as u16,
            })
            .collect()
    }
}
