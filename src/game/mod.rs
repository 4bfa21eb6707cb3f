//! Puzzle rules: board, cards, effects and the controller that drives them.

pub mod cards;
pub mod config;
pub mod controller;
pub mod effects;
pub mod spawner;
pub mod state;

pub use cards::{catalog, definition, CardCategory, CardDefinition, CardKind, Rarity};
pub use config::{ConfigError, GameConfig, RarityPolicy};
pub use controller::{GameController, LevelAdvance, RuleError, RuleResolution, Selection};
pub use effects::{ActiveEffect, EffectEngine, EffectKind};
pub use spawner::{CardSpawner, IdSource, SequenceIds};
pub use state::{
    Board,
    Card,
    CardId,
    Disk,
    EffectView,
    GameEvent,
    GameSnapshot,
    IntegrityError,
    PegIndex,
    GOAL_PEG,
    PEG_COUNT,
};
