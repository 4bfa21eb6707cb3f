//! Automatic move selection (Time Warp).

pub mod greedy;

pub use greedy::{GreedyPlanner, PlannedMove};
