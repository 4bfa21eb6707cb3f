use std::mem::discriminant;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::GreedyPlanner;

use super::cards::{definition, CardKind};
use super::controller::RuleError;
use super::state::{Board, Card, CardId, EffectView, GameEvent, PegIndex, PEG_COUNT};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum EffectKind {
    /// Next move ignores disk sizes.
    Giant,
    /// Cosmetic palette flip.
    Invert,
    Scramble,
    /// Moves touching `peg` are rejected.
    Lock { peg: PegIndex },
    /// Next move carries the top two disks.
    Double,
    Swap { first: PegIndex, second: PegIndex },
    /// Disks are hidden from the view.
    Blind,
    TimeWarp { moves: u8 },
}

impl EffectKind {
    /// One-shot effects act on activation and never enter the active list.
    pub fn is_one_shot(&self) -> bool {
        matches!(
            self,
            EffectKind::Scramble | EffectKind::Swap { .. } | EffectKind::TimeWarp { .. }
        )
    }

    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            EffectKind::Invert
                | EffectKind::Scramble
                | EffectKind::Lock { .. }
                | EffectKind::Swap { .. }
                | EffectKind::Blind
        )
    }

    pub fn card_kind(&self) -> CardKind {
        match self {
            EffectKind::Giant => CardKind::GiantMode,
            EffectKind::Invert => CardKind::ColorInvert,
            EffectKind::Scramble => CardKind::Scramble,
            EffectKind::Lock { .. } => CardKind::TowerLock,
            EffectKind::Double => CardKind::DoubleMove,
            EffectKind::Swap { .. } => CardKind::TowerSwap,
            EffectKind::Blind => CardKind::BlindMove,
            EffectKind::TimeWarp { .. } => CardKind::TimeWarp,
        }
    }

    fn same_variant(&self, other: &EffectKind) -> bool {
        discriminant(self) == discriminant(other)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveEffect {
    pub kind: EffectKind,
    pub source: CardId,
    pub moves_left: u32,
}

impl ActiveEffect {
    fn expired_event(&self) -> GameEvent {
        GameEvent::EffectExpired { effect: self.kind }
    }
}

/// Live effects plus the Time Warp forced-move counter.
#[derive(Debug, Clone, Default)]
pub struct EffectEngine {
    active: Vec<ActiveEffect>,
    forced_moves: u8,
    planner: GreedyPlanner,
}

impl EffectEngine {
    pub fn active(&self) -> &[ActiveEffect] {
        &self.active
    }

    pub fn forced_moves(&self) -> u8 {
        self.forced_moves
    }

    fn find(&self, kind: EffectKind) -> Option<&ActiveEffect> {
        self.active.iter().find(|effect| effect.kind.same_variant(&kind))
    }

    pub fn is_giant_active(&self) -> bool {
        self.find(EffectKind::Giant).is_some()
    }

    pub fn is_double_pending(&self) -> bool {
        self.find(EffectKind::Double).is_some()
    }

    pub fn is_blind(&self) -> bool {
        self.find(EffectKind::Blind).is_some()
    }

    pub fn is_inverted(&self) -> bool {
        self.find(EffectKind::Invert).is_some()
    }

    pub fn locked_peg(&self) -> Option<PegIndex> {
        self.active.iter().find_map(|effect| match effect.kind {
            EffectKind::Lock { peg } => Some(peg),
            _ => None,
        })
    }

    /// Rejects moves that touch a locked peg.
    pub fn check_move(&self, from: PegIndex, to: PegIndex) -> Result<(), RuleError> {
        match self.locked_peg() {
            Some(peg) if peg == from || peg == to => Err(RuleError::PegLocked { peg }),
            _ => Ok(()),
        }
    }

    /// Applies a played card. Wild Card is resolved against the hand by the
    /// controller and produces nothing here.
    pub fn activate<R: Rng>(
        &mut self,
        card: &Card,
        board: &mut Board,
        rng: &mut R,
        warp_limit: u8,
    ) -> Vec<GameEvent> {
        debug!(card_id = card.id, kind = ?card.kind, "activating card");
        match card.kind {
            CardKind::GiantMode => self.replace(EffectKind::Giant, card.id, 1),
            CardKind::DoubleMove => self.replace(EffectKind::Double, card.id, card.duration.max(1)),
            CardKind::ColorInvert => self.replace(EffectKind::Invert, card.id, card.duration),
            CardKind::BlindMove => self.replace(EffectKind::Blind, card.id, card.duration.max(1)),
            CardKind::TowerLock => {
                let peg = rng.gen_range(0..PEG_COUNT);
                self.replace(EffectKind::Lock { peg }, card.id, card.duration.max(1))
            }
            CardKind::Scramble => {
                scramble(board, rng);
                vec![GameEvent::EffectApplied {
                    effect: EffectKind::Scramble,
                    moves_left: 0,
                }]
            }
            CardKind::TowerSwap => {
                let (first, second) = swap_random_pegs(board, rng);
                vec![GameEvent::EffectApplied {
                    effect: EffectKind::Swap { first, second },
                    moves_left: 0,
                }]
            }
            CardKind::TimeWarp => self.time_warp(board, warp_limit),
            CardKind::WildCard => Vec::new(),
        }
    }

    fn replace(&mut self, kind: EffectKind, source: CardId, moves_left: u32) -> Vec<GameEvent> {
        self.active.retain(|effect| !effect.kind.same_variant(&kind));
        self.active.push(ActiveEffect {
            kind,
            source,
            moves_left,
        });
        vec![GameEvent::EffectApplied {
            effect: kind,
            moves_left,
        }]
    }

    /// Plays up to `limit` greedy moves without touching the player's move
    /// counter. The forced counter resets once the batch is done.
    fn time_warp(&mut self, board: &mut Board, limit: u8) -> Vec<GameEvent> {
        let mut events = vec![GameEvent::EffectApplied {
            effect: EffectKind::TimeWarp { moves: limit },
            moves_left: 0,
        }];
        self.forced_moves = 0;
        while self.forced_moves < limit {
            let Some(step) = self.planner.next_move(board) else {
                break;
            };
            let disk = board.apply_move(step.from, step.to);
            self.forced_moves += 1;
            events.push(GameEvent::ForcedMove {
                from: step.from,
                to: step.to,
                disk,
                forced_moves: self.forced_moves,
            });
        }
        events.push(GameEvent::TimeWarpFinished {
            moves: self.forced_moves,
        });
        self.forced_moves = 0;
        events
    }

    fn take(&mut self, kind: EffectKind) -> Option<ActiveEffect> {
        let index = self
            .active
            .iter()
            .position(|effect| effect.kind.same_variant(&kind))?;
        Some(self.active.remove(index))
    }

    pub fn consume_giant(&mut self) -> Option<GameEvent> {
        self.take(EffectKind::Giant).map(|effect| effect.expired_event())
    }

    pub fn consume_double(&mut self) -> Option<GameEvent> {
        self.take(EffectKind::Double).map(|effect| effect.expired_event())
    }

    /// Lock and blind only last until the next committed move.
    pub fn clear_per_move(&mut self) -> Vec<GameEvent> {
        self.drain_where(|effect| {
            matches!(effect.kind, EffectKind::Lock { .. } | EffectKind::Blind)
        })
    }

    /// One base-move tick: decrement everything, drop what hit zero.
    pub fn tick(&mut self) -> Vec<GameEvent> {
        for effect in &mut self.active {
            effect.moves_left = effect.moves_left.saturating_sub(1);
        }
        self.drain_where(|effect| effect.moves_left == 0)
    }

    pub fn release_lock(&mut self) -> Vec<GameEvent> {
        self.drain_where(|effect| matches!(effect.kind, EffectKind::Lock { .. }))
    }

    pub fn purge_negative(&mut self) -> Vec<GameEvent> {
        self.drain_where(|effect| effect.kind.is_negative())
    }

    pub fn remove_from_source(&mut self, source: CardId) -> Vec<GameEvent> {
        self.drain_where(|effect| effect.source == source)
    }

    fn drain_where<F>(&mut self, mut predicate: F) -> Vec<GameEvent>
    where
        F: FnMut(&ActiveEffect) -> bool,
    {
        let mut expired = Vec::new();
        self.active.retain(|effect| {
            if predicate(effect) {
                expired.push(effect.expired_event());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.forced_moves = 0;
    }

    pub fn views(&self) -> Vec<EffectView> {
        self.active
            .iter()
            .map(|effect| EffectView {
                effect: effect.kind,
                source: effect.source,
                moves_left: effect.moves_left,
                icon: definition(effect.kind.card_kind()).icon.to_owned(),
                negative: effect.kind.is_negative(),
            })
            .collect()
    }
}

/// Redistributes every disk at random while keeping each peg well stacked.
pub fn scramble<R: Rng>(board: &mut Board, rng: &mut R) {
    let mut disks = board.take_all();
    // Largest first, so every peg stays a candidate; the randomness is in
    // which peg each disk lands on.
    disks.sort_unstable_by(|a, b| b.cmp(a));
    for disk in disks {
        let candidates: Vec<PegIndex> = (0..PEG_COUNT)
            .filter(|&peg| board.top(peg).map_or(true, |top| top > disk))
            .collect();
        let peg = candidates.choose(rng).copied().unwrap_or(0);
        board.pegs[peg].push(disk);
    }
}

/// Swaps two distinct pegs picked uniformly.
pub fn swap_random_pegs<R: Rng>(board: &mut Board, rng: &mut R) -> (PegIndex, PegIndex) {
    let first = rng.gen_range(0..PEG_COUNT);
    let mut second = rng.gen_range(0..PEG_COUNT - 1);
    if second >= first {
        second += 1;
    }
    board.swap_pegs(first, second);
    (first, second)
}
