//! Static card catalog.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    GiantMode,
    TimeWarp,
    DoubleMove,
    ColorInvert,
    Scramble,
    TowerLock,
    TowerSwap,
    BlindMove,
    WildCard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
}

/// How a card leaves the hand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardCategory {
    /// Waits for the player to click it.
    Manual,
    /// Forces itself onto the player's next peg input.
    AutoNegative,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CardDefinition {
    pub kind: CardKind,
    pub name: &'static str,
    pub description: &'static str,
    pub rarity: Rarity,
    /// Moves the resulting effect stays active; `0` for instant cards.
    pub duration: u32,
    pub category: CardCategory,
    pub icon: &'static str,
}

impl CardDefinition {
    pub fn is_auto(&self) -> bool {
        self.category == CardCategory::AutoNegative
    }
}

static CATALOG: Lazy<Vec<CardDefinition>> = Lazy::new(|| {
    vec![
        CardDefinition {
            kind: CardKind::GiantMode,
            name: "Giant Mode",
            description: "Your next move ignores disk sizes.",
            rarity: Rarity::Rare,
            duration: 1,
            category: CardCategory::Manual,
            icon: "maximize",
        },
        CardDefinition {
            kind: CardKind::TimeWarp,
            name: "Time Warp",
            description: "Three free moves toward the goal peg.",
            rarity: Rarity::Rare,
            duration: 0,
            category: CardCategory::Manual,
            icon: "clock",
        },
        CardDefinition {
            kind: CardKind::DoubleMove,
            name: "Double Move",
            description: "Carry the top two disks together.",
            rarity: Rarity::Common,
            duration: 1,
            category: CardCategory::Manual,
            icon: "play",
        },
        CardDefinition {
            kind: CardKind::ColorInvert,
            name: "Color Invert",
            description: "The palette flips for three moves.",
            rarity: Rarity::Common,
            duration: 3,
            category: CardCategory::AutoNegative,
            icon: "contrast",
        },
        CardDefinition {
            kind: CardKind::Scramble,
            name: "Scramble",
            description: "All disks are reshuffled across the pegs.",
            rarity: Rarity::Rare,
            duration: 0,
            category: CardCategory::AutoNegative,
            icon: "shuffle",
        },
        CardDefinition {
            kind: CardKind::TowerLock,
            name: "Tower Lock",
            description: "A random peg is frozen until your next move.",
            rarity: Rarity::Common,
            duration: 1,
            category: CardCategory::AutoNegative,
            icon: "lock",
        },
        CardDefinition {
            kind: CardKind::TowerSwap,
            name: "Tower Swap",
            description: "Two random pegs trade places.",
            rarity: Rarity::Common,
            duration: 0,
            category: CardCategory::AutoNegative,
            icon: "repeat",
        },
        CardDefinition {
            kind: CardKind::BlindMove,
            name: "Blind Move",
            description: "The disks vanish for one move.",
            rarity: Rarity::Common,
            duration: 1,
            category: CardCategory::AutoNegative,
            icon: "eye-off",
        },
        CardDefinition {
            kind: CardKind::WildCard,
            name: "Wild Card",
            description: "Cancels a harmful card, or your newest card.",
            rarity: Rarity::Rare,
            duration: 0,
            category: CardCategory::Manual,
            icon: "wand",
        },
    ]
});

pub fn catalog() -> &'static [CardDefinition] {
    &CATALOG
}

pub fn definition(kind: CardKind) -> &'static CardDefinition {
    CATALOG
        .iter()
        .find(|definition| definition.kind == kind)
        .unwrap_or_else(|| unreachable!("{kind:?} missing from catalog"))
}

pub fn find_by_name(name: &str) -> Option<&'static CardDefinition> {
    CATALOG.iter().find(|definition| definition.name == name)
}
