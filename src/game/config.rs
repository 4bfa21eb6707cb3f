use serde::{Deserialize, Serialize};

pub const MIN_DISKS: u8 = 3;
pub const MAX_DISKS: u8 = 9;
pub const MAX_CARDS: usize = 3;
pub const CARD_SPAWN_MIN: u32 = 4;
pub const CARD_SPAWN_MAX: u32 = 6;
pub const RARE_CARD_CHANCE: f64 = 0.5;
pub const TIME_WARP_MOVES: u8 = 3;
pub const LEVEL_ADVANCE_DELAY_MS: u32 = 1500;

/// What the spawner does when a rare card loses its rarity roll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RarityPolicy {
    /// The spawn slot is wasted; no card appears this time.
    #[default]
    Skip,
    /// Draw again until a card survives the roll.
    Reroll,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ConfigError {
    DiskRangeInverted { min: u8, max: u8 },
    DiskCountOutOfRange { value: u8, min: u8, max: u8 },
    SpawnWindowInverted { min: u32, max: u32 },
    SpawnWindowEmpty,
    EmptyHand,
    RareChanceOutOfRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub min_disks: u8,
    pub max_disks: u8,
    pub initial_disks: u8,
    pub max_hand: usize,
    pub spawn_min: u32,
    pub spawn_max: u32,
    pub rare_card_chance: f64,
    pub rarity_policy: RarityPolicy,
    pub time_warp_moves: u8,
    pub level_advance_delay_ms: u32,
}

impl GameConfig {
    pub fn with_initial_disks(mut self, disks: u8) -> Self {
        self.initial_disks = disks;
        self
    }

    pub fn with_rarity_policy(mut self, policy: RarityPolicy) -> Self {
        self.rarity_policy = policy;
        self
    }

    pub fn with_rare_card_chance(mut self, chance: f64) -> Self {
        self.rare_card_chance = chance;
        self
    }

    pub fn with_spawn_window(mut self, min: u32, max: u32) -> Self {
        self.spawn_min = min;
        self.spawn_max = max;
        self
    }

    pub fn with_level_advance_delay(mut self, delay_ms: u32) -> Self {
        self.level_advance_delay_ms = delay_ms;
        self
    }

    pub fn clamp_disks(&self, disks: u8) -> u8 {
        disks.clamp(self.min_disks, self.max_disks)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_disks > self.max_disks || self.min_disks == 0 {
            return Err(ConfigError::DiskRangeInverted {
                min: self.min_disks,
                max: self.max_disks,
            });
        }
        if !(self.min_disks..=self.max_disks).contains(&self.initial_disks) {
            return Err(ConfigError::DiskCountOutOfRange {
                value: self.initial_disks,
                min: self.min_disks,
                max: self.max_disks,
            });
        }
        if self.spawn_min > self.spawn_max {
            return Err(ConfigError::SpawnWindowInverted {
                min: self.spawn_min,
                max: self.spawn_max,
            });
        }
        // A zero gap would reschedule onto the move that just spawned.
        if self.spawn_min == 0 {
            return Err(ConfigError::SpawnWindowEmpty);
        }
        if self.max_hand == 0 {
            return Err(ConfigError::EmptyHand);
        }
        if !(0.0..=1.0).contains(&self.rare_card_chance) {
            return Err(ConfigError::RareChanceOutOfRange);
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_disks: MIN_DISKS,
            max_disks: MAX_DISKS,
            initial_disks: MIN_DISKS,
            max_hand: MAX_CARDS,
            spawn_min: CARD_SPAWN_MIN,
            spawn_max: CARD_SPAWN_MAX,
            rare_card_chance: RARE_CARD_CHANCE,
            rarity_policy: RarityPolicy::default(),
            time_warp_moves: TIME_WARP_MOVES,
            level_advance_delay_ms: LEVEL_ADVANCE_DELAY_MS,
        }
    }
}
