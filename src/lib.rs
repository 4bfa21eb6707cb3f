pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use tracing::Level;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{GreedyPlanner, PlannedMove};
pub use game::{
    catalog, Board, Card, CardCategory, CardDefinition, CardId, CardKind, ConfigError,
    EffectEngine, EffectKind, EffectView, GameConfig, GameController, GameEvent, GameSnapshot,
    IntegrityError, LevelAdvance, PegIndex, Rarity, RarityPolicy, RuleError, RuleResolution,
    Selection, GOAL_PEG, PEG_COUNT,
};

use utils::set_panic_hook;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

/// Routes `tracing` output to the browser console. Defaults to `info`.
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging(level: Option<String>) {
    let level = level
        .as_deref()
        .and_then(|value| Level::from_str(value).ok())
        .unwrap_or(Level::INFO);
    utils::init_logging(level);
}

fn to_js_error<E: Serialize + std::fmt::Debug>(error: &E) -> JsValue {
    to_value(error).unwrap_or_else(|_| JsValue::from_str(&format!("{error:?}")))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[wasm_bindgen]
pub struct HanoiGame {
    controller: GameController,
}

#[wasm_bindgen]
impl HanoiGame {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, seed: Option<u64>) -> Result<HanoiGame, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => GameConfig::default(),
        };
        let controller = match seed {
            Some(seed) => GameController::with_seed(config, seed),
            None => GameController::new(config),
        }
        .map_err(|error| to_js_error(&error))?;
        Ok(HanoiGame { controller })
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_value(&self.controller.snapshot()).map_err(JsValue::from)
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.controller.snapshot()).map_err(serde_to_js_error)
    }

    /// Rule rejections come back inside the resolution, not as a thrown error.
    fn resolve(&self, outcome: Result<Vec<GameEvent>, RuleError>) -> Result<JsValue, JsValue> {
        let resolution = RuleResolution::new(self.controller.snapshot(), outcome);
        to_value(&resolution).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = "selectPeg")]
    pub fn select_peg(&mut self, peg: usize) -> Result<JsValue, JsValue> {
        let outcome = self.controller.on_peg_input(peg);
        self.resolve(outcome)
    }

    #[wasm_bindgen(js_name = "dragMove")]
    pub fn drag_move(&mut self, from: usize, to: usize) -> Result<JsValue, JsValue> {
        let outcome = self.controller.on_drag(from, to);
        self.resolve(outcome)
    }

    #[wasm_bindgen(js_name = "activateCard")]
    pub fn activate_card(&mut self, card_id: u64) -> Result<JsValue, JsValue> {
        let outcome = self.controller.on_card_activate(card_id);
        self.resolve(outcome)
    }

    pub fn reset(&mut self) -> Result<JsValue, JsValue> {
        let events = self.controller.reset();
        self.resolve(Ok(events))
    }

    #[wasm_bindgen(js_name = "adjustDiskCount")]
    pub fn adjust_disk_count(&mut self, disks: u8) -> Result<JsValue, JsValue> {
        let events = self.controller.adjust_disk_count(disks);
        self.resolve(Ok(events))
    }

    #[wasm_bindgen(js_name = "fireLevelAdvance")]
    pub fn fire_level_advance(&mut self, token: u64) -> Result<JsValue, JsValue> {
        let events = self.controller.fire_level_advance(token);
        self.resolve(Ok(events))
    }

    /// Resolves with the pending advance token once its delay has elapsed,
    /// or immediately with `null` when nothing is scheduled. The caller
    /// passes the token to `fireLevelAdvance`; stale tokens are ignored.
    #[wasm_bindgen(js_name = "waitLevelAdvance")]
    pub fn wait_level_advance(&self) -> Promise {
        let pending = self.controller.pending_advance();
        future_to_promise(async move {
            let Some(advance) = pending else {
                return Ok(JsValue::NULL);
            };
            if advance.delay_ms > 0 {
                TimeoutFuture::new(advance.delay_ms).await;
            }
            Ok(JsValue::from(advance.token))
        })
    }
}

#[wasm_bindgen(js_name = "cardCatalog")]
pub fn card_catalog() -> Result<JsValue, JsValue> {
    to_value(catalog()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "isLegalMove")]
pub fn is_legal_move(board: JsValue, from: usize, to: usize, giant: bool) -> Result<bool, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    Ok(board.is_legal_move(from, to, giant))
}

#[wasm_bindgen(js_name = "validateBoard")]
pub fn validate_board(board: JsValue) -> Result<(), JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    board.integrity_check().map_err(|error| to_js_error(&error))
}

#[wasm_bindgen(js_name = "planTimeWarp")]
pub fn plan_time_warp(board: JsValue, limit: usize) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let plan = GreedyPlanner::default().plan(&board, limit);
    to_value(&plan).map_err(JsValue::from)
}
