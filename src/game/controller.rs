use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cards::CardKind;
use super::config::{ConfigError, GameConfig};
use super::effects::EffectEngine;
use super::spawner::{CardSpawner, IdSource, SequenceIds};
use super::state::{
    Board, Card, CardId, GameEvent, GameSnapshot, IntegrityError, PegIndex, GOAL_PEG, PEG_COUNT,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    PegOutOfRange { peg: PegIndex },
    EmptyPeg { peg: PegIndex },
    PegLocked { peg: PegIndex },
    IllegalMove { from: PegIndex, to: PegIndex },
    BundleTooSmall { peg: PegIndex },
    BundleDoesNotFit { from: PegIndex, to: PegIndex },
    CardNotFound { card_id: CardId },
}

/// Outcome of one input event, as handed to the view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub snapshot: GameSnapshot,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<RuleError>,
}

impl RuleResolution {
    pub fn new(snapshot: GameSnapshot, outcome: Result<Vec<GameEvent>, RuleError>) -> Self {
        match outcome {
            Ok(events) => Self {
                snapshot,
                events,
                rejected: None,
            },
            Err(error) => Self {
                snapshot,
                events: Vec::new(),
                rejected: Some(error),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum Selection {
    #[default]
    Idle,
    Armed { peg: PegIndex, bundle: bool },
}

/// Deferred disk-count bump after a win. Only the most recent token fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelAdvance {
    pub token: u64,
    pub next_disks: u8,
    pub delay_ms: u32,
}

pub struct GameController<I: IdSource = SequenceIds> {
    config: GameConfig,
    board: Board,
    selection: Selection,
    hand: Vec<Card>,
    effects: EffectEngine,
    spawner: CardSpawner<I>,
    moves: u32,
    won: bool,
    palette_hue: u16,
    advance_generation: u64,
    pending_advance: Option<LevelAdvance>,
    rng: SmallRng,
}

impl GameController<SequenceIds> {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, SequenceIds::default(), SmallRng::from_entropy())
    }

    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_parts(config, SequenceIds::default(), SmallRng::seed_from_u64(seed))
    }
}

impl<I: IdSource> GameController<I> {
    pub fn with_parts(config: GameConfig, ids: I, mut rng: SmallRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let spawner = CardSpawner::with_ids(&config, ids, &mut rng);
        let palette_hue = rng.gen_range(0..360);
        Ok(Self {
            board: Board::new(config.initial_disks),
            config,
            selection: Selection::Idle,
            hand: Vec::new(),
            effects: EffectEngine::default(),
            spawner,
            moves: 0,
            won: false,
            palette_hue,
            advance_generation: 0,
            pending_advance: None,
            rng,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn effects(&self) -> &EffectEngine {
        &self.effects
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn won(&self) -> bool {
        self.won
    }

    pub fn disk_count(&self) -> u8 {
        self.board.disk_count
    }

    pub fn pending_advance(&self) -> Option<LevelAdvance> {
        self.pending_advance
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let (selected_peg, selected_disks) = match self.selection {
            Selection::Idle => (None, Vec::new()),
            Selection::Armed { peg, bundle } => {
                let height = self.board.height(peg);
                let count = if bundle { 2 } else { 1 };
                let disks = (height.saturating_sub(count)..height).rev().collect();
                (Some(peg), disks)
            }
        };

        GameSnapshot {
            pegs: self.board.pegs.clone(),
            disk_count: self.board.disk_count,
            goal_peg: GOAL_PEG,
            selected_peg,
            selected_disks,
            locked_peg: self.effects.locked_peg(),
            effects: self.effects.views(),
            hand: self.hand.clone(),
            moves: self.moves,
            forced_moves: self.effects.forced_moves(),
            giant_active: self.effects.is_giant_active(),
            double_pending: self.effects.is_double_pending(),
            blind: self.effects.is_blind(),
            palette_inverted: self.effects.is_inverted(),
            palette_hue: self.palette_hue,
            next_spawn_move: self.spawner.next_spawn_move(),
            won: self.won,
        }
    }

    fn ensure_playing(&self) -> Result<(), RuleError> {
        if self.won {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    fn ensure_peg(peg: PegIndex) -> Result<(), RuleError> {
        if peg >= PEG_COUNT {
            return Err(RuleError::PegOutOfRange { peg });
        }
        Ok(())
    }

    /// A click or tap on a peg.
    pub fn on_peg_input(&mut self, peg: PegIndex) -> Result<Vec<GameEvent>, RuleError> {
        self.ensure_playing()?;
        Self::ensure_peg(peg)?;

        if let Some(card_id) = self.hand.iter().find(|card| card.is_auto()).map(|card| card.id) {
            return self.play_card(card_id, true);
        }

        if self.effects.is_double_pending() {
            self.bundle_input(peg)
        } else {
            self.single_input(peg)
        }
    }

    /// A completed drag gesture, equivalent to two peg inputs.
    pub fn on_drag(&mut self, from: PegIndex, to: PegIndex) -> Result<Vec<GameEvent>, RuleError> {
        self.ensure_playing()?;
        Self::ensure_peg(from)?;
        Self::ensure_peg(to)?;
        if self.hand.iter().any(Card::is_auto) {
            return self.on_peg_input(from);
        }
        if from == to {
            return Ok(Vec::new());
        }

        let previous = std::mem::take(&mut self.selection);
        let mut events = match self.on_peg_input(from) {
            Ok(events) => events,
            Err(error) => {
                self.selection = previous;
                return Err(error);
            }
        };
        if let Selection::Armed { peg, .. } = previous {
            events.insert(0, GameEvent::SelectionCleared { peg });
        }
        if matches!(self.selection, Selection::Armed { peg, .. } if peg == from) {
            events.extend(self.on_peg_input(to)?);
        }
        Ok(events)
    }

    /// The player clicked a card in the hand.
    pub fn on_card_activate(&mut self, card_id: CardId) -> Result<Vec<GameEvent>, RuleError> {
        self.ensure_playing()?;
        self.play_card(card_id, false)
    }

    fn single_input(&mut self, peg: PegIndex) -> Result<Vec<GameEvent>, RuleError> {
        match self.selection {
            Selection::Idle => {
                if self.board.is_empty(peg) {
                    return Err(RuleError::EmptyPeg { peg });
                }
                if !self.effects.is_giant_active() && self.effects.locked_peg() == Some(peg) {
                    return Err(RuleError::PegLocked { peg });
                }
                self.selection = Selection::Armed { peg, bundle: false };
                Ok(vec![GameEvent::PegArmed { peg, bundle: false }])
            }
            Selection::Armed { peg: from, .. } if from == peg => Ok(self.clear_selection()),
            Selection::Armed { peg: from, .. } => {
                self.selection = Selection::Idle;
                self.try_move(from, peg)
            }
        }
    }

    fn bundle_input(&mut self, peg: PegIndex) -> Result<Vec<GameEvent>, RuleError> {
        match self.selection {
            Selection::Idle => {
                if self.board.height(peg) < 2 {
                    return Err(RuleError::BundleTooSmall { peg });
                }
                if self.effects.locked_peg() == Some(peg) {
                    return Err(RuleError::PegLocked { peg });
                }
                self.selection = Selection::Armed { peg, bundle: true };
                Ok(vec![GameEvent::PegArmed { peg, bundle: true }])
            }
            Selection::Armed { peg: from, .. } if from == peg => Ok(self.clear_selection()),
            Selection::Armed { peg: from, .. } => {
                self.selection = Selection::Idle;
                self.effects.check_move(from, peg)?;
                if !self.board.can_move_bundle(from, peg) {
                    return Err(RuleError::BundleDoesNotFit { from, to: peg });
                }
                let disks = self.board.apply_bundle_move(from, peg);
                debug!(from, to = peg, ?disks, "bundle moved");
                let mut events = vec![GameEvent::BundleMoved {
                    from,
                    to: peg,
                    disks,
                }];
                events.extend(self.effects.consume_double());
                Ok(self.finish_base_move(events))
            }
        }
    }

    /// Giant mode lifts both the size rule and the lock.
    fn try_move(&mut self, from: PegIndex, to: PegIndex) -> Result<Vec<GameEvent>, RuleError> {
        let giant = self.effects.is_giant_active();
        if !giant {
            self.effects.check_move(from, to)?;
        }
        if self.board.is_empty(from) {
            return Err(RuleError::EmptyPeg { peg: from });
        }
        if !self.board.is_legal_move(from, to, giant) {
            return Err(RuleError::IllegalMove { from, to });
        }

        let disk = self.board.apply_move(from, to);
        debug!(from, to, disk, giant, "disk moved");
        let mut events = vec![GameEvent::DiskMoved { from, to, disk }];
        if giant {
            events.extend(self.effects.consume_giant());
        }
        Ok(self.finish_base_move(events))
    }

    /// Counter, per-move clears, tick, win check, then spawn, in that order.
    fn finish_base_move(&mut self, mut events: Vec<GameEvent>) -> Vec<GameEvent> {
        self.moves += 1;
        events.extend(self.effects.clear_per_move());
        events.extend(self.effects.tick());
        self.settle_blockers(&mut events);
        self.check_solved(&mut events);

        if let Some(card) =
            self.spawner
                .maybe_spawn(self.moves, self.hand.len(), self.won, &mut self.rng)
        {
            debug_assert!(
                self.hand.iter().all(|held| held.id != card.id),
                "duplicate card id {}",
                card.id
            );
            self.hand.push(card.clone());
            events.push(GameEvent::CardSpawned { card });
        }
        events
    }

    fn clear_selection(&mut self) -> Vec<GameEvent> {
        match std::mem::take(&mut self.selection) {
            Selection::Idle => Vec::new(),
            Selection::Armed { peg, .. } => vec![GameEvent::SelectionCleared { peg }],
        }
    }

    fn play_card(&mut self, card_id: CardId, forced: bool) -> Result<Vec<GameEvent>, RuleError> {
        let index = self
            .hand
            .iter()
            .position(|card| card.id == card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;
        let card = self.hand.remove(index);

        let mut events = self.clear_selection();
        events.push(GameEvent::CardActivated {
            card_id,
            kind: card.kind,
            forced,
        });

        if card.kind == CardKind::WildCard {
            events.extend(self.resolve_wild_card());
        } else {
            events.extend(self.effects.activate(
                &card,
                &mut self.board,
                &mut self.rng,
                self.config.time_warp_moves,
            ));
            if card.kind == CardKind::ColorInvert {
                self.palette_hue = self.rng.gen_range(0..360);
            }
        }

        self.settle_blockers(&mut events);
        self.check_solved(&mut events);
        Ok(events)
    }

    /// Drops forced cards and harmful effects if there are any, otherwise the
    /// newest other card in hand.
    fn resolve_wild_card(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let has_negative_effect = self
            .effects
            .active()
            .iter()
            .any(|effect| effect.kind.is_negative());

        if has_negative_effect || self.hand.iter().any(Card::is_auto) {
            let (negative, kept): (Vec<Card>, Vec<Card>) =
                std::mem::take(&mut self.hand).into_iter().partition(Card::is_auto);
            self.hand = kept;
            events.extend(negative.into_iter().map(|card| GameEvent::CardDiscarded {
                card_id: card.id,
                kind: card.kind,
            }));
            events.extend(self.effects.purge_negative());
            return events;
        }

        let newest = self
            .hand
            .iter()
            .enumerate()
            .filter(|(_, card)| card.kind != CardKind::WildCard)
            .max_by_key(|(_, card)| card.id)
            .map(|(index, _)| index);
        if let Some(index) = newest {
            let card = self.hand.remove(index);
            events.push(GameEvent::CardDiscarded {
                card_id: card.id,
                kind: card.kind,
            });
            events.extend(self.effects.remove_from_source(card.id));
        }
        events
    }

    fn peg_pairs() -> impl Iterator<Item = (PegIndex, PegIndex)> {
        (0..PEG_COUNT).flat_map(|from| {
            (0..PEG_COUNT)
                .filter(move |&to| to != from)
                .map(move |to| (from, to))
        })
    }

    fn has_bundle_move(&self) -> bool {
        Self::peg_pairs().any(|(from, to)| {
            self.effects.check_move(from, to).is_ok() && self.board.can_move_bundle(from, to)
        })
    }

    fn has_single_move(&self) -> bool {
        let giant = self.effects.is_giant_active();
        Self::peg_pairs().any(|(from, to)| {
            (giant || self.effects.check_move(from, to).is_ok())
                && self.board.is_legal_move(from, to, giant)
        })
    }

    /// Drops whatever leaves the player with no committable move: a pending
    /// double move with no bundle that fits, then a lock over every move.
    fn settle_blockers(&mut self, events: &mut Vec<GameEvent>) {
        if self.effects.is_double_pending() && !self.has_bundle_move() {
            events.extend(self.effects.consume_double());
            events.push(GameEvent::DoubleMoveFizzled);
        }
        if !self.effects.is_double_pending()
            && self.effects.locked_peg().is_some()
            && !self.has_single_move()
        {
            debug!("lock released, no move left");
            events.extend(self.effects.release_lock());
        }
    }

    fn check_solved(&mut self, events: &mut Vec<GameEvent>) {
        if !self.won && self.board.is_solved(GOAL_PEG, self.board.disk_count) {
            events.extend(self.on_solved());
        }
    }

    fn on_solved(&mut self) -> Vec<GameEvent> {
        self.won = true;
        self.selection = Selection::Idle;
        let disk_count = self.board.disk_count;
        info!(disk_count, moves = self.moves, "puzzle solved");

        let mut events = vec![GameEvent::PuzzleSolved {
            disk_count,
            moves: self.moves,
        }];
        if disk_count < self.config.max_disks {
            self.advance_generation += 1;
            let advance = LevelAdvance {
                token: self.advance_generation,
                next_disks: disk_count + 1,
                delay_ms: self.config.level_advance_delay_ms,
            };
            self.pending_advance = Some(advance);
            events.push(GameEvent::LevelAdvanceScheduled {
                token: advance.token,
                next_disks: advance.next_disks,
                delay_ms: advance.delay_ms,
            });
        }
        events
    }

    /// Timer callback for a scheduled level advance. Stale tokens do nothing.
    pub fn fire_level_advance(&mut self, token: u64) -> Vec<GameEvent> {
        match self.pending_advance {
            Some(advance) if advance.token == token && self.won => {
                let mut events = vec![GameEvent::LevelAdvanced {
                    disk_count: advance.next_disks,
                }];
                events.extend(self.reset_to(advance.next_disks));
                events
            }
            _ => {
                debug!(token, "ignoring stale level advance");
                Vec::new()
            }
        }
    }

    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.reset_to(self.board.disk_count)
    }

    pub fn adjust_disk_count(&mut self, disks: u8) -> Vec<GameEvent> {
        self.reset_to(self.config.clamp_disks(disks))
    }

    fn reset_to(&mut self, disks: u8) -> Vec<GameEvent> {
        let disk_count = self.config.clamp_disks(disks);
        self.board = Board::new(disk_count);
        self.selection = Selection::Idle;
        self.hand.clear();
        self.effects.clear();
        self.moves = 0;
        self.won = false;
        self.palette_hue = self.rng.gen_range(0..360);
        self.spawner.reset(&mut self.rng);
        // Invalidate any timer still in flight.
        self.advance_generation += 1;
        self.pending_advance = None;
        info!(disk_count, "game reset");
        vec![GameEvent::GameReset { disk_count }]
    }

    /// Disk ownership and hand-id uniqueness.
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        self.board.disk_set_check()?;
        for (index, card) in self.hand.iter().enumerate() {
            if self.hand[..index].iter().any(|held| held.id == card.id) {
                return Err(IntegrityError::DuplicateCardId { card_id: card.id });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::cards::definition;
    use crate::game::effects::EffectKind;

    /// Spawning pushed far out so scripted move sequences are not interrupted.
    fn quiet_config() -> GameConfig {
        GameConfig::default().with_spawn_window(1000, 1000)
    }

    fn quiet_controller() -> GameController {
        GameController::with_seed(quiet_config(), 42).expect("valid config")
    }

    fn give(controller: &mut GameController, kind: CardKind) -> CardId {
        let card = controller
            .spawner
            .instantiate(definition(kind), &mut controller.rng);
        let id = card.id;
        controller.hand.push(card);
        id
    }

    /// Spreads the disks so every peg pair has a move, then forces a lock
    /// lasting `duration` moves. Returns the locked peg.
    fn force_lock(controller: &mut GameController, duration: u32) -> PegIndex {
        set_board(controller, [vec![3], vec![2], vec![1]]);
        let mut lock = controller
            .spawner
            .instantiate(definition(CardKind::TowerLock), &mut controller.rng);
        lock.duration = duration;
        controller.hand.push(lock);
        controller.on_peg_input(0).expect("forced lock");
        controller.effects().locked_peg().expect("a peg is locked")
    }

    fn set_board(controller: &mut GameController, pegs: [Vec<u8>; PEG_COUNT]) {
        let disks = controller.board.disk_count;
        controller.board = Board::from_pegs(pegs, disks).expect("valid board");
    }

    fn click_move(
        controller: &mut GameController,
        from: PegIndex,
        to: PegIndex,
    ) -> Result<Vec<GameEvent>, RuleError> {
        controller.on_peg_input(from)?;
        controller.on_peg_input(to)
    }

    const CLASSIC: [(PegIndex, PegIndex); 7] =
        [(0, 2), (0, 1), (2, 1), (0, 2), (1, 0), (1, 2), (0, 2)];

    #[test]
    fn classic_solve_wins_exactly_once() {
        let mut controller = quiet_controller();
        let mut solved_events = 0;
        for (from, to) in CLASSIC {
            let events = click_move(&mut controller, from, to).expect("classic move is legal");
            solved_events += events
                .iter()
                .filter(|event| matches!(event, GameEvent::PuzzleSolved { .. }))
                .count();
        }
        assert_eq!(controller.board().peg(GOAL_PEG), &[3, 2, 1]);
        assert_eq!(controller.moves(), 7);
        assert!(controller.won());
        assert_eq!(solved_events, 1);
        assert_eq!(
            controller.on_peg_input(0),
            Err(RuleError::GameFinished),
            "input after a win is ignored"
        );
    }

    #[test]
    fn illegal_move_is_rejected_without_mutation() {
        let mut controller = quiet_controller();
        click_move(&mut controller, 0, 2).expect("legal");
        let before = controller.board().clone();
        assert_eq!(
            click_move(&mut controller, 0, 2),
            Err(RuleError::IllegalMove { from: 0, to: 2 })
        );
        assert_eq!(controller.board(), &before);
        assert_eq!(controller.moves(), 1);
        assert_eq!(controller.selection(), Selection::Idle);
    }

    #[test]
    fn empty_peg_cannot_be_armed_and_same_peg_cancels() {
        let mut controller = quiet_controller();
        assert_eq!(
            controller.on_peg_input(1),
            Err(RuleError::EmptyPeg { peg: 1 })
        );
        controller.on_peg_input(0).expect("arm");
        assert_eq!(
            controller.on_peg_input(0),
            Ok(vec![GameEvent::SelectionCleared { peg: 0 }])
        );
        assert_eq!(controller.moves(), 0);
        assert_eq!(
            controller.on_peg_input(3),
            Err(RuleError::PegOutOfRange { peg: 3 })
        );
    }

    #[test]
    fn drag_is_a_two_peg_move() {
        let mut controller = quiet_controller();
        let events = controller.on_drag(0, 1).expect("legal drag");
        assert!(events.contains(&GameEvent::DiskMoved {
            from: 0,
            to: 1,
            disk: 1
        }));
        assert_eq!(controller.moves(), 1);
        assert!(controller.on_drag(2, 0).is_err(), "dragging from empty peg");
    }

    #[test]
    fn giant_mode_allows_one_oversized_move() {
        let mut controller = quiet_controller();
        set_board(&mut controller, [vec![3], vec![2], vec![1]]);
        let giant = give(&mut controller, CardKind::GiantMode);
        controller.on_card_activate(giant).expect("giant plays");
        assert!(controller.effects().is_giant_active());

        let events = click_move(&mut controller, 0, 2).expect("giant ignores sizes");
        assert!(events.contains(&GameEvent::EffectExpired {
            effect: EffectKind::Giant
        }));
        assert_eq!(controller.board().peg(2), &[1, 3]);
        assert!(!controller.effects().is_giant_active(), "consumed after one use");

        assert_eq!(
            click_move(&mut controller, 2, 1),
            Err(RuleError::IllegalMove { from: 2, to: 1 })
        );
    }

    #[test]
    fn auto_card_is_forced_before_any_move() {
        let mut controller = quiet_controller();
        let blind = give(&mut controller, CardKind::BlindMove);

        let events = controller.on_peg_input(0).expect("forced activation");
        assert!(events.contains(&GameEvent::CardActivated {
            card_id: blind,
            kind: CardKind::BlindMove,
            forced: true
        }));
        assert_eq!(controller.selection(), Selection::Idle, "input was consumed");
        assert!(controller.snapshot().blind);

        click_move(&mut controller, 0, 2).expect("legal");
        assert!(!controller.snapshot().blind, "blind clears after one move");
    }

    #[test]
    fn lock_blocks_touching_moves_then_clears() {
        let mut controller = quiet_controller();
        let locked = force_lock(&mut controller, 1);
        let a = (locked + 1) % PEG_COUNT;
        let b = (locked + 2) % PEG_COUNT;

        let mut pegs: [Vec<u8>; PEG_COUNT] = Default::default();
        pegs[a] = vec![3, 2];
        pegs[b] = vec![1];
        set_board(&mut controller, pegs);

        assert_eq!(
            controller.on_drag(b, locked),
            Err(RuleError::PegLocked { peg: locked })
        );
        controller.on_drag(b, a).expect("unrelated move is fine");
        assert!(controller.effects().locked_peg().is_none());
        assert_eq!(controller.moves(), 1);
    }

    #[test]
    fn long_lock_still_clears_after_one_move() {
        let mut controller = quiet_controller();
        let locked = force_lock(&mut controller, 3);
        assert_eq!(controller.effects().active()[0].moves_left, 3);

        let a = (locked + 1) % PEG_COUNT;
        let b = (locked + 2) % PEG_COUNT;
        let (from, to) = if controller.board().is_legal_move(a, b, false) {
            (a, b)
        } else {
            (b, a)
        };
        controller.on_drag(from, to).expect("unrelated move is fine");
        assert!(controller.effects().locked_peg().is_none());
        assert!(controller.effects().active().is_empty());
    }

    #[test]
    fn giant_mode_reaches_through_a_lock() {
        let mut controller = quiet_controller();
        let locked = force_lock(&mut controller, 1);
        let giant = give(&mut controller, CardKind::GiantMode);
        controller.on_card_activate(giant).expect("giant plays");

        assert_eq!(
            controller.on_peg_input(locked),
            Ok(vec![GameEvent::PegArmed {
                peg: locked,
                bundle: false
            }])
        );
        let target = (locked + 1) % PEG_COUNT;
        controller.on_peg_input(target).expect("giant ignores the lock");
        assert_eq!(controller.moves(), 1);
        assert!(!controller.effects().is_giant_active());
        assert!(controller.effects().locked_peg().is_none());
    }

    #[test]
    fn lock_over_the_whole_tower_is_released() {
        // A full tower on the goal peg would already be a win.
        let (mut controller, locked) = (0..)
            .map(|seed| {
                let mut controller =
                    GameController::with_seed(quiet_config(), seed).expect("valid config");
                let locked = force_lock(&mut controller, 1);
                (controller, locked)
            })
            .find(|(_, locked)| *locked != GOAL_PEG)
            .expect("some seed locks a side peg");
        let mut pegs: [Vec<u8>; PEG_COUNT] = Default::default();
        pegs[locked] = vec![3, 2, 1];
        set_board(&mut controller, pegs);

        give(&mut controller, CardKind::ColorInvert);
        let events = controller.on_peg_input(locked).expect("forced invert");
        assert!(events.contains(&GameEvent::EffectExpired {
            effect: EffectKind::Lock { peg: locked }
        }));
        assert!(controller.effects().locked_peg().is_none());
        controller
            .on_drag(locked, (locked + 1) % PEG_COUNT)
            .expect("the tower can move again");
    }

    #[test]
    fn double_move_fizzles_when_no_bundle_fits() {
        let mut controller = quiet_controller();
        controller.adjust_disk_count(5);
        set_board(&mut controller, [vec![5, 1], vec![4, 3], vec![2]]);
        let double = give(&mut controller, CardKind::DoubleMove);
        let events = controller.on_card_activate(double).expect("double plays");
        assert!(events.contains(&GameEvent::DoubleMoveFizzled));
        assert!(!controller.effects().is_double_pending());
        controller.on_drag(0, 2).expect("single moves work again");
    }

    #[test]
    fn double_move_fizzles_when_only_bundle_is_locked() {
        let mut controller = quiet_controller();
        let locked = force_lock(&mut controller, 1);
        let a = (locked + 1) % PEG_COUNT;
        let mut pegs: [Vec<u8>; PEG_COUNT] = Default::default();
        pegs[locked] = vec![3, 2];
        pegs[a] = vec![1];
        set_board(&mut controller, pegs);

        let double = give(&mut controller, CardKind::DoubleMove);
        let events = controller.on_card_activate(double).expect("double plays");
        assert!(events.contains(&GameEvent::DoubleMoveFizzled));
        assert_eq!(
            controller.effects().locked_peg(),
            Some(locked),
            "a single move is still open, so the lock stays"
        );
    }

    #[test]
    fn failed_drag_keeps_existing_selection() {
        let mut controller = quiet_controller();
        controller.on_peg_input(0).expect("arm");
        assert_eq!(controller.on_drag(2, 1), Err(RuleError::EmptyPeg { peg: 2 }));
        assert_eq!(
            controller.selection(),
            Selection::Armed {
                peg: 0,
                bundle: false
            }
        );
    }

    #[test]
    fn same_peg_drag_still_forces_auto_card() {
        let mut controller = quiet_controller();
        let blind = give(&mut controller, CardKind::BlindMove);
        let events = controller.on_drag(1, 1).expect("forced activation");
        assert!(events.contains(&GameEvent::CardActivated {
            card_id: blind,
            kind: CardKind::BlindMove,
            forced: true
        }));
        assert!(controller.hand().is_empty());
    }

    #[test]
    fn double_move_carries_two_disks_for_one_move() {
        let mut controller = quiet_controller();
        let double = give(&mut controller, CardKind::DoubleMove);
        controller.on_card_activate(double).expect("double plays");

        let events = controller.on_peg_input(0).expect("arm bundle");
        assert_eq!(events, vec![GameEvent::PegArmed { peg: 0, bundle: true }]);
        assert_eq!(controller.snapshot().selected_disks, vec![2, 1]);

        controller.on_peg_input(1).expect("bundle fits on empty peg");
        assert_eq!(controller.board().peg(1), &[2, 1]);
        assert_eq!(controller.moves(), 1, "a double move counts once");
        assert!(!controller.effects().is_double_pending());
    }

    #[test]
    fn double_move_needs_two_disks_and_room() {
        let mut controller = quiet_controller();
        set_board(&mut controller, [vec![3, 2], vec![1], vec![]]);
        let double = give(&mut controller, CardKind::DoubleMove);
        controller.on_card_activate(double).expect("double plays");

        assert_eq!(
            controller.on_peg_input(1),
            Err(RuleError::BundleTooSmall { peg: 1 })
        );
        controller.on_peg_input(0).expect("arm bundle");
        assert_eq!(
            controller.on_peg_input(1),
            Err(RuleError::BundleDoesNotFit { from: 0, to: 1 })
        );
        assert!(controller.effects().is_double_pending(), "still armed for a retry");
    }

    #[test]
    fn double_move_fizzles_when_no_peg_has_two_disks() {
        let mut controller = quiet_controller();
        set_board(&mut controller, [vec![3], vec![2], vec![1]]);
        let double = give(&mut controller, CardKind::DoubleMove);
        let events = controller.on_card_activate(double).expect("double plays");
        assert!(events.contains(&GameEvent::DoubleMoveFizzled));
        assert!(!controller.effects().is_double_pending());
    }

    #[test]
    fn time_warp_moves_without_counting() {
        let mut controller = quiet_controller();
        let warp = give(&mut controller, CardKind::TimeWarp);
        let events = controller.on_card_activate(warp).expect("warp plays");

        let forced = events
            .iter()
            .filter(|event| matches!(event, GameEvent::ForcedMove { .. }))
            .count();
        assert_eq!(forced, 3);
        assert_eq!(controller.moves(), 0);
        assert_eq!(controller.snapshot().forced_moves, 0);
        assert_ne!(controller.board(), &Board::new(3));
    }

    #[test]
    fn wild_card_prefers_negative_cards() {
        let mut controller = quiet_controller();
        let swap = give(&mut controller, CardKind::TowerSwap);
        let double = give(&mut controller, CardKind::DoubleMove);
        let wild = give(&mut controller, CardKind::WildCard);

        let events = controller.on_card_activate(wild).expect("wild plays");
        assert!(events.contains(&GameEvent::CardDiscarded {
            card_id: swap,
            kind: CardKind::TowerSwap
        }));
        let remaining: Vec<CardId> = controller.hand().iter().map(|card| card.id).collect();
        assert_eq!(remaining, vec![double]);
    }

    #[test]
    fn wild_card_clears_active_harm() {
        let mut controller = quiet_controller();
        give(&mut controller, CardKind::ColorInvert);
        controller.on_peg_input(0).expect("forced invert");
        assert!(controller.snapshot().palette_inverted);

        let giant = give(&mut controller, CardKind::GiantMode);
        let wild = give(&mut controller, CardKind::WildCard);
        controller.on_card_activate(wild).expect("wild plays");
        assert!(!controller.snapshot().palette_inverted);
        assert_eq!(controller.hand().len(), 1);
        assert_eq!(controller.hand()[0].id, giant, "positive card survives");
    }

    #[test]
    fn wild_card_otherwise_drops_newest_card() {
        let mut controller = quiet_controller();
        let giant = give(&mut controller, CardKind::GiantMode);
        let wild = give(&mut controller, CardKind::WildCard);
        let double = give(&mut controller, CardKind::DoubleMove);

        let events = controller.on_card_activate(wild).expect("wild plays");
        assert!(events.contains(&GameEvent::CardDiscarded {
            card_id: double,
            kind: CardKind::DoubleMove
        }));
        let remaining: Vec<CardId> = controller.hand().iter().map(|card| card.id).collect();
        assert_eq!(remaining, vec![giant]);
    }

    #[test]
    fn activating_missing_card_is_rejected() {
        let mut controller = quiet_controller();
        assert_eq!(
            controller.on_card_activate(99),
            Err(RuleError::CardNotFound { card_id: 99 })
        );
    }

    #[test]
    fn win_schedules_level_advance_and_stale_tokens_are_ignored() {
        let mut controller = quiet_controller();
        let mut scheduled = None;
        for (from, to) in CLASSIC {
            for event in click_move(&mut controller, from, to).expect("legal") {
                if let GameEvent::LevelAdvanceScheduled { token, .. } = event {
                    scheduled = Some(token);
                }
            }
        }
        let token = scheduled.expect("level advance scheduled");
        assert_eq!(controller.pending_advance().map(|a| a.next_disks), Some(4));

        assert!(controller.fire_level_advance(token + 1).is_empty());
        assert_eq!(controller.disk_count(), 3);

        let events = controller.fire_level_advance(token);
        assert_eq!(events[0], GameEvent::LevelAdvanced { disk_count: 4 });
        assert_eq!(controller.disk_count(), 4);
        assert!(!controller.won());
        assert_eq!(controller.moves(), 0);
        assert_eq!(controller.board().peg(0), &[4, 3, 2, 1]);
    }

    #[test]
    fn manual_reset_cancels_pending_advance() {
        let mut controller = quiet_controller();
        for (from, to) in CLASSIC {
            click_move(&mut controller, from, to).expect("legal");
        }
        let token = controller.pending_advance().expect("scheduled").token;
        controller.reset();
        assert!(controller.fire_level_advance(token).is_empty());
        assert_eq!(controller.disk_count(), 3);
        assert!(!controller.won());
    }

    #[test]
    fn top_level_win_does_not_advance() {
        let mut controller = quiet_controller();
        controller.adjust_disk_count(9);
        set_board(&mut controller, [vec![1], vec![], (2..=9).rev().collect()]);
        let events = click_move(&mut controller, 0, 2).expect("final move");
        assert!(controller.won());
        assert!(controller.pending_advance().is_none());
        assert!(!events
            .iter()
            .any(|event| matches!(event, GameEvent::LevelAdvanceScheduled { .. })));
    }

    #[test]
    fn no_spawn_on_winning_move() {
        let config = GameConfig::default().with_spawn_window(1, 1);
        let mut controller = GameController::with_seed(config, 3).expect("valid config");
        set_board(&mut controller, [vec![1], vec![], vec![3, 2]]);
        let events = click_move(&mut controller, 0, 2).expect("winning move");
        assert!(controller.won());
        assert!(controller.hand().is_empty());
        assert!(!events
            .iter()
            .any(|event| matches!(event, GameEvent::CardSpawned { .. })));
    }

    #[test]
    fn spawn_follows_schedule() {
        let config = GameConfig::default()
            .with_spawn_window(1, 1)
            .with_rarity_policy(crate::game::RarityPolicy::Reroll);
        let mut controller = GameController::with_seed(config, 11).expect("valid config");
        let events = click_move(&mut controller, 0, 1).expect("legal");
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::CardSpawned { .. })));
        assert_eq!(controller.hand().len(), 1);
        assert_eq!(controller.snapshot().next_spawn_move, 2);
    }

    #[test]
    fn adjust_disk_count_clamps_and_resets() {
        let mut controller = quiet_controller();
        click_move(&mut controller, 0, 2).expect("legal");
        controller.adjust_disk_count(20);
        assert_eq!(controller.disk_count(), 9);
        assert_eq!(controller.moves(), 0);
        controller.adjust_disk_count(0);
        assert_eq!(controller.disk_count(), 3);
        assert!(controller.integrity_check().is_ok());
    }
}
