//! Browser smoke tests. Run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use hanoi_cards::{card_catalog, is_legal_move, Board, GameSnapshot, HanoiGame, RuleResolution};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const QUIET: &str = r#"{"spawn_min": 1000, "spawn_max": 1000}"#;

#[wasm_bindgen_test]
fn drag_returns_resolution() {
    let mut game = HanoiGame::new(Some(QUIET.to_owned()), Some(1)).expect("game builds");
    let value = game.drag_move(0, 2).expect("resolution serializes");
    let resolution: RuleResolution = from_value(value).expect("resolution decodes");
    assert!(resolution.rejected.is_none());
    assert_eq!(resolution.snapshot.moves, 1);
    assert_eq!(resolution.snapshot.pegs[2], vec![1]);
}

#[wasm_bindgen_test]
fn illegal_move_is_reported_not_thrown() {
    let mut game = HanoiGame::new(Some(QUIET.to_owned()), Some(1)).expect("game builds");
    let value = game.drag_move(1, 2).expect("resolution serializes");
    let resolution: RuleResolution = from_value(value).expect("resolution decodes");
    assert!(resolution.rejected.is_some());
    assert_eq!(resolution.snapshot.moves, 0);
}

#[wasm_bindgen_test]
fn snapshot_json_round_trips() {
    let game = HanoiGame::new(None, Some(9)).expect("game builds");
    let json = game.snapshot_json().expect("snapshot serializes");
    let snapshot: GameSnapshot = serde_json::from_str(&json).expect("snapshot decodes");
    assert_eq!(snapshot.disk_count, 3);
    assert!(!snapshot.won);
}

#[wasm_bindgen_test]
fn bad_config_is_an_error() {
    assert!(HanoiGame::new(Some(r#"{"spawn_min": 0}"#.to_owned()), None).is_err());
}

#[wasm_bindgen_test]
fn free_functions_work_on_plain_values() {
    let board = to_value(&Board::new(3)).expect("board serializes");
    assert!(is_legal_move(board.clone(), 0, 1, false).expect("board decodes"));
    assert!(!is_legal_move(board, 1, 0, false).expect("board decodes"));

    let catalog = card_catalog().expect("catalog serializes");
    assert!(js_sys_array_len(&catalog) >= 9);
}

fn js_sys_array_len(value: &wasm_bindgen::JsValue) -> u32 {
    web_sys::js_sys::Array::from(value).length()
}

#[wasm_bindgen_test]
async fn level_advance_promise_resolves_null_when_idle() {
    let game = HanoiGame::new(None, Some(2)).expect("game builds");
    let value = wasm_bindgen_futures::JsFuture::from(game.wait_level_advance())
        .await
        .expect("promise resolves");
    assert!(value.is_null());
}
