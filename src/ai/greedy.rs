use serde::{Deserialize, Serialize};

use crate::game::{Board, PegIndex, GOAL_PEG};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: PegIndex,
    pub to: PegIndex,
}

/// One-step lookahead toward the goal peg, as used by Time Warp.
///
/// Prefers dropping a top disk straight onto the goal; otherwise shuffles
/// between the two side pegs in whichever direction is legal. It is not an
/// optimal solver and may undo its own previous step.
#[derive(Debug, Clone, Copy)]
pub struct GreedyPlanner {
    goal: PegIndex,
}

impl Default for GreedyPlanner {
    fn default() -> Self {
        Self { goal: GOAL_PEG }
    }
}

impl GreedyPlanner {
    fn side_pegs(&self) -> [PegIndex; 2] {
        match self.goal {
            0 => [1, 2],
            1 => [0, 2],
            _ => [0, 1],
        }
    }

    pub fn next_move(&self, board: &Board) -> Option<PlannedMove> {
        let [left, right] = self.side_pegs();

        for from in [left, right] {
            if board.is_legal_move(from, self.goal, false) {
                return Some(PlannedMove {
                    from,
                    to: self.goal,
                });
            }
        }

        [(left, right), (right, left)]
            .into_iter()
            .find(|(from, to)| board.is_legal_move(*from, *to, false))
            .map(|(from, to)| PlannedMove { from, to })
    }

    /// Up to `limit` planned moves, each applied to a scratch copy.
    pub fn plan(&self, board: &Board, limit: usize) -> Vec<PlannedMove> {
        let mut scratch = board.clone();
        let mut moves = Vec::with_capacity(limit);
        while moves.len() < limit {
            let Some(step) = self.next_move(&scratch) else {
                break;
            };
            scratch.apply_move(step.from, step.to);
            moves.push(step);
        }
        moves
    }
}
