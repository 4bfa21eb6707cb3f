use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use super::cards::{catalog, CardDefinition, CardKind, Rarity};
use super::config::{GameConfig, RarityPolicy};
use super::state::{Card, CardId};

const ROTATIONS: [u8; 5] = [0, 25, 50, 75, 100];
/// Upper bound on rerolls so a zero rare chance cannot spin forever.
const MAX_REROLLS: usize = 64;

/// Hands out card ids. Implementations must never repeat an id.
pub trait IdSource {
    fn next_id(&mut self) -> CardId;
}

/// Strictly increasing counter.
#[derive(Debug, Clone, Default)]
pub struct SequenceIds {
    last: CardId,
}

impl SequenceIds {
    pub fn starting_at(first: CardId) -> Self {
        Self {
            last: first.saturating_sub(1),
        }
    }
}

impl IdSource for SequenceIds {
    fn next_id(&mut self) -> CardId {
        self.last = self
            .last
            .checked_add(1)
            .unwrap_or_else(|| unreachable!("card id space exhausted"));
        self.last
    }
}

pub struct CardSpawner<I: IdSource = SequenceIds> {
    ids: I,
    next_spawn: u32,
    spawn_min: u32,
    spawn_max: u32,
    max_hand: usize,
    rare_chance: f64,
    policy: RarityPolicy,
}

impl CardSpawner<SequenceIds> {
    pub fn new<R: Rng>(config: &GameConfig, rng: &mut R) -> Self {
        Self::with_ids(config, SequenceIds::default(), rng)
    }
}

impl<I: IdSource> CardSpawner<I> {
    pub fn with_ids<R: Rng>(config: &GameConfig, ids: I, rng: &mut R) -> Self {
        let mut spawner = Self {
            ids,
            next_spawn: 0,
            spawn_min: config.spawn_min,
            spawn_max: config.spawn_max,
            max_hand: config.max_hand,
            rare_chance: config.rare_card_chance,
            policy: config.rarity_policy,
        };
        spawner.reschedule(0, rng);
        spawner
    }

    pub fn next_spawn_move(&self) -> u32 {
        self.next_spawn
    }

    /// Restarts the schedule for a fresh board. Ids keep counting.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        self.reschedule(0, rng);
    }

    fn reschedule<R: Rng>(&mut self, current_move: u32, rng: &mut R) {
        self.next_spawn = current_move + rng.gen_range(self.spawn_min..=self.spawn_max);
    }

    /// Called once per committed base move. A slot reached while the hand is
    /// full or the rarity roll fails is spent, not carried over.
    pub fn maybe_spawn<R: Rng>(
        &mut self,
        current_move: u32,
        hand_size: usize,
        won: bool,
        rng: &mut R,
    ) -> Option<Card> {
        if won || current_move != self.next_spawn {
            return None;
        }
        self.reschedule(current_move, rng);
        if hand_size >= self.max_hand {
            trace!(current_move, hand_size, "spawn slot skipped, hand full");
            return None;
        }
        let card = self.draw(rng);
        trace!(
            current_move,
            next_spawn = self.next_spawn,
            spawned = ?card.as_ref().map(|card| card.kind),
            "spawn slot reached"
        );
        card
    }

    /// Draws a card from the catalog, applying the rarity roll.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<Card> {
        let attempts = match self.policy {
            RarityPolicy::Skip => 1,
            RarityPolicy::Reroll => MAX_REROLLS,
        };
        for _ in 0..attempts {
            let definition = catalog().choose(rng)?;
            if self.survives_rarity(definition, rng) {
                return Some(self.instantiate(definition, rng));
            }
        }
        None
    }

    fn survives_rarity<R: Rng>(&self, definition: &CardDefinition, rng: &mut R) -> bool {
        if definition.kind == CardKind::WildCard || definition.rarity == Rarity::Common {
            return true;
        }
        rng.gen::<f64>() < self.rare_chance
    }

    pub fn instantiate<R: Rng>(&mut self, definition: &CardDefinition, rng: &mut R) -> Card {
        Card {
            id: self.ids.next_id(),
            kind: definition.kind,
            name: definition.name.to_owned(),
            description: definition.description.to_owned(),
            rarity: definition.rarity,
            category: definition.category,
            duration: definition.duration,
            icon: definition.icon.to_owned(),
            rotation: ROTATIONS.choose(rng).copied().unwrap_or_default(),
        }
    }
}
