use serde::{Deserialize, Serialize};

use super::cards::{CardCategory, CardKind, Rarity};
use super::effects::EffectKind;

/// Number of pegs on every board.
pub const PEG_COUNT: usize = 3;
/// The peg the player must stack the tower onto.
pub const GOAL_PEG: PegIndex = 2;

/// Disk size, `1` being the smallest.
pub type Disk = u8;
/// Peg position, `0..PEG_COUNT`.
pub type PegIndex = usize;
/// Globally unique card identity; later spawns always get larger ids.
pub type CardId = u64;

/// A drawn card sitting in the hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub kind: CardKind,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub category: CardCategory,
    pub duration: u32,
    pub icon: String,
    #[serde(default)]
    pub rotation: u8,
}

impl Card {
    pub fn is_auto(&self) -> bool {
        self.category == CardCategory::AutoNegative
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    DiskCountOutOfRange { disk_count: u8 },
    MissingDisk { disk: Disk },
    DuplicateDisk { disk: Disk },
    DiskOutOfRange { disk: Disk },
    StackingViolation { peg: PegIndex, position: usize },
    DuplicateCardId { card_id: CardId },
}

/// Three pegs holding disks, bottom-to-top.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    pub pegs: [Vec<Disk>; PEG_COUNT],
    pub disk_count: u8,
}

impl Board {
    /// Full tower on peg 0, largest disk at the bottom.
    pub fn new(disk_count: u8) -> Self {
        Self {
            pegs: [(1..=disk_count).rev().collect(), Vec::new(), Vec::new()],
            disk_count,
        }
    }

    pub fn from_pegs(pegs: [Vec<Disk>; PEG_COUNT], disk_count: u8) -> Result<Self, IntegrityError> {
        let board = Self { pegs, disk_count };
        board.integrity_check()?;
        Ok(board)
    }

    pub fn peg(&self, index: PegIndex) -> &[Disk] {
        self.pegs.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn top(&self, index: PegIndex) -> Option<Disk> {
        self.pegs.get(index).and_then(|peg| peg.last().copied())
    }

    pub fn height(&self, index: PegIndex) -> usize {
        self.peg(index).len()
    }

    pub fn is_empty(&self, index: PegIndex) -> bool {
        self.height(index) == 0
    }

    /// Base legality. `giant` bypasses only the size rule.
    pub fn is_legal_move(&self, from: PegIndex, to: PegIndex, giant: bool) -> bool {
        if from == to || from >= PEG_COUNT || to >= PEG_COUNT {
            return false;
        }
        let Some(disk) = self.top(from) else {
            return false;
        };
        if giant {
            return true;
        }
        self.top(to).map_or(true, |target| disk < target)
    }

    /// Pops the top of `from` onto `to`. Callers validate first.
    pub fn apply_move(&mut self, from: PegIndex, to: PegIndex) -> Disk {
        debug_assert!(from != to && from < PEG_COUNT && to < PEG_COUNT);
        let disk = self.pegs[from]
            .pop()
            .unwrap_or_else(|| unreachable!("apply_move from empty peg {from}"));
        self.pegs[to].push(disk);
        disk
    }

    /// Whether the top two disks of `from` may travel to `to` together.
    pub fn can_move_bundle(&self, from: PegIndex, to: PegIndex) -> bool {
        if from == to || from >= PEG_COUNT || to >= PEG_COUNT {
            return false;
        }
        let source = self.peg(from);
        if source.len() < 2 {
            return false;
        }
        let largest = source[source.len() - 2].max(source[source.len() - 1]);
        self.top(to).map_or(true, |target| largest < target)
    }

    /// Moves the top two disks of `from` onto `to`, keeping their order.
    /// Returns them as `[lower, upper]`.
    pub fn apply_bundle_move(&mut self, from: PegIndex, to: PegIndex) -> [Disk; 2] {
        debug_assert!(self.height(from) >= 2);
        let split = self.pegs[from].len() - 2;
        let bundle: Vec<Disk> = self.pegs[from].drain(split..).collect();
        self.pegs[to].extend_from_slice(&bundle);
        [bundle[0], bundle[1]]
    }

    /// True iff `goal` holds all `disk_count` disks, largest at the bottom.
    pub fn is_solved(&self, goal: PegIndex, disk_count: u8) -> bool {
        let peg = self.peg(goal);
        peg.len() == disk_count as usize && peg.windows(2).all(|pair| pair[0] > pair[1])
    }

    pub fn swap_pegs(&mut self, first: PegIndex, second: PegIndex) {
        self.pegs.swap(first, second);
    }

    /// Removes every disk from every peg.
    pub fn take_all(&mut self) -> Vec<Disk> {
        self.pegs.iter_mut().flat_map(std::mem::take).collect()
    }

    pub fn is_well_stacked(&self) -> bool {
        self.pegs
            .iter()
            .all(|peg| peg.windows(2).all(|pair| pair[0] > pair[1]))
    }

    /// Checks the disk multiset is exactly `1..=disk_count` and every peg is
    /// strictly decreasing bottom-to-top.
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        self.disk_set_check()?;
        for (peg, disks) in self.pegs.iter().enumerate() {
            if let Some(position) = disks.windows(2).position(|pair| pair[0] < pair[1]) {
                return Err(IntegrityError::StackingViolation {
                    peg,
                    position: position + 1,
                });
            }
        }
        Ok(())
    }

    /// Disk ownership only; tolerates out-of-order stacks left by giant moves.
    pub fn disk_set_check(&self) -> Result<(), IntegrityError> {
        if self.disk_count == 0 {
            return Err(IntegrityError::DiskCountOutOfRange {
                disk_count: self.disk_count,
            });
        }
        let mut seen = vec![false; self.disk_count as usize + 1];
        for disk in self.pegs.iter().flatten().copied() {
            if disk == 0 || disk > self.disk_count {
                return Err(IntegrityError::DiskOutOfRange { disk });
            }
            if std::mem::replace(&mut seen[disk as usize], true) {
                return Err(IntegrityError::DuplicateDisk { disk });
            }
        }
        if let Some(disk) = (1..=self.disk_count).find(|disk| !seen[*disk as usize]) {
            return Err(IntegrityError::MissingDisk { disk });
        }
        Ok(())
    }
}

/// Everything the core reports back to the view, in order of occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    PegArmed {
        peg: PegIndex,
        bundle: bool,
    },
    SelectionCleared {
        peg: PegIndex,
    },
    DiskMoved {
        from: PegIndex,
        to: PegIndex,
        disk: Disk,
    },
    BundleMoved {
        from: PegIndex,
        to: PegIndex,
        disks: [Disk; 2],
    },
    ForcedMove {
        from: PegIndex,
        to: PegIndex,
        disk: Disk,
        forced_moves: u8,
    },
    TimeWarpFinished {
        moves: u8,
    },
    CardSpawned {
        card: Card,
    },
    CardActivated {
        card_id: CardId,
        kind: CardKind,
        forced: bool,
    },
    CardDiscarded {
        card_id: CardId,
        kind: CardKind,
    },
    EffectApplied {
        effect: EffectKind,
        moves_left: u32,
    },
    EffectExpired {
        effect: EffectKind,
    },
    DoubleMoveFizzled,
    PuzzleSolved {
        disk_count: u8,
        moves: u32,
    },
    LevelAdvanceScheduled {
        token: u64,
        next_disks: u8,
        delay_ms: u32,
    },
    LevelAdvanced {
        disk_count: u8,
    },
    GameReset {
        disk_count: u8,
    },
}

/// An active effect as the view shows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectView {
    pub effect: EffectKind,
    pub source: CardId,
    pub moves_left: u32,
    pub icon: String,
    pub negative: bool,
}

/// Plain-data copy of the game for the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSnapshot {
    pub pegs: [Vec<Disk>; PEG_COUNT],
    pub disk_count: u8,
    pub goal_peg: PegIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_peg: Option<PegIndex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_disks: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_peg: Option<PegIndex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hand: Vec<Card>,
    pub moves: u32,
    pub forced_moves: u8,
    pub giant_active: bool,
    pub double_pending: bool,
    pub blind: bool,
    pub palette_inverted: bool,
    pub palette_hue: u16,
    pub next_spawn_move: u32,
    pub won: bool,
}
