//! Contract tests for `NodeManager`, `TokenManager`, and
//! `WaitPointManager` in isolation from the runner.

mod support;

use infra_sim_core::managers::{NodeManager, TokenError, TokenManager, WaitPointManager};
use infra_sim_core::model::{NodeStatus, Token, TokenStatus, WaitPointConfig, WaitStrategy};
use infra_sim_core::state::{SimulationState, StateStore};

fn store() -> StateStore {
    StateStore::new(SimulationState::default())
}

fn token(id: &str, path: &[&str]) -> Token {
    Token::emit(
        id.to_string(),
        "http-request".to_string(),
        path.iter().map(|s| s.to_string()).collect(),
        0,
        500,
    )
}

#[test]
fn node_absent_is_implicitly_available() {
    let store = store();
    assert!(NodeManager::is_available(&store, "ghost"));
    assert!(!NodeManager::has(&store, "ghost"));
    assert_eq!(NodeManager::effective(&store, "ghost").status, NodeStatus::Available);
}

#[test]
fn node_fail_recover_degrade_round_trip() {
    let mut store = store();
    NodeManager::fail(&mut store, "n1", 10, Some("boom".to_string()));
    assert!(NodeManager::is_unavailable(&store, "n1"));
    assert_eq!(NodeManager::get(&store, "n1").unwrap().sublabel.as_deref(), Some("boom"));

    NodeManager::degrade(&mut store, "n1", 20, None);
    assert_eq!(NodeManager::get(&store, "n1").unwrap().status, NodeStatus::Degraded);
    assert_eq!(NodeManager::get(&store, "n1").unwrap().sublabel.as_deref(), Some("Degraded"));

    NodeManager::recover(&mut store, "n1", 30);
    assert!(NodeManager::is_available(&store, "n1"));
    assert!(NodeManager::get(&store, "n1").unwrap().sublabel.is_none());
    assert_eq!(NodeManager::get(&store, "n1").unwrap().last_state_change_ms, 30);
}

#[test]
fn node_remove_is_a_no_op_when_absent() {
    let mut store = store();
    NodeManager::remove(&mut store, "ghost");
    assert_eq!(NodeManager::count(&store), 0);
}

#[test]
fn token_add_rejects_duplicate_id() {
    let mut store = store();
    TokenManager::add(&mut store, token("t1", &["a", "b"])).unwrap();
    let err = TokenManager::add(&mut store, token("t1", &["a", "b"])).unwrap_err();
    assert!(matches!(err, TokenError::DuplicateId { id } if id == "t1"));
}

#[test]
fn token_update_is_a_no_op_when_absent() {
    let mut store = store();
    TokenManager::update(&mut store, "ghost", |t| t.progress = 0.9);
    assert!(TokenManager::get(&store, "ghost").is_none());
}

#[test]
fn token_remove_is_a_no_op_when_absent() {
    let mut store = store();
    TokenManager::remove(&mut store, "ghost");
    assert_eq!(TokenManager::count(&store), 0);
}

#[test]
fn token_queries_by_status_active_and_on_edge() {
    let mut store = store();
    TokenManager::add(&mut store, token("t1", &["a", "b", "c"])).unwrap();
    TokenManager::add(&mut store, token("t2", &["a", "b", "c"])).unwrap();
    TokenManager::update(&mut store, "t2", |t| t.status = TokenStatus::Completed);

    assert_eq!(TokenManager::by_status(&store, TokenStatus::Traveling).len(), 1);
    assert_eq!(TokenManager::by_status(&store, TokenStatus::Completed).len(), 1);
    assert_eq!(TokenManager::active(&store).len(), 1);
    assert_eq!(TokenManager::on_edge(&store, "a", "b").len(), 1);
    assert_eq!(TokenManager::on_edge(&store, "b", "c").len(), 0);
}

#[test]
fn token_waiting_at_is_sorted_by_wait_position() {
    let mut store = store();
    TokenManager::add(&mut store, token("t1", &["a", "b"])).unwrap();
    TokenManager::add(&mut store, token("t2", &["a", "b"])).unwrap();
    TokenManager::update(&mut store, "t1", |t| {
        t.status = TokenStatus::Waiting;
        t.waiting_at_node = Some("b".to_string());
        t.wait_position = Some(1);
    });
    TokenManager::update(&mut store, "t2", |t| {
        t.status = TokenStatus::Waiting;
        t.waiting_at_node = Some("b".to_string());
        t.wait_position = Some(0);
    });

    let waiting = TokenManager::waiting_at(&store, "b");
    assert_eq!(waiting.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["t2", "t1"]);
}

#[test]
fn fail_tokens_at_node_fails_waiting_and_incoming_travelers() {
    let mut store = store();
    TokenManager::add(&mut store, token("waiter", &["a", "n", "c"])).unwrap();
    TokenManager::update(&mut store, "waiter", |t| {
        t.status = TokenStatus::Waiting;
        t.waiting_at_node = Some("n".to_string());
        t.current_edge_index = 1;
    });
    TokenManager::add(&mut store, token("traveler", &["a", "n"])).unwrap();
    TokenManager::add(&mut store, token("unrelated", &["x", "y"])).unwrap();

    TokenManager::fail_tokens_at_node(&mut store, "n", 1000);

    assert_eq!(TokenManager::get(&store, "waiter").unwrap().status, TokenStatus::Failed);
    assert_eq!(TokenManager::get(&store, "traveler").unwrap().status, TokenStatus::Failed);
    assert_eq!(TokenManager::get(&store, "unrelated").unwrap().status, TokenStatus::Traveling);
}

#[test]
fn wait_point_enqueue_is_idempotent_and_positions_are_stable() {
    let mut store = store();
    WaitPointManager::setup(
        &mut store,
        WaitPointConfig {
            node_id: "alb".to_string(),
            process_interval_ms: 800,
            strategy: WaitStrategy::Fifo,
            capacity: None,
        },
    );
    assert_eq!(WaitPointManager::enqueue(&mut store, "alb", "t1"), Some(0));
    assert_eq!(WaitPointManager::enqueue(&mut store, "alb", "t2"), Some(1));
    // Re-enqueuing an already-queued token returns its existing position.
    assert_eq!(WaitPointManager::enqueue(&mut store, "alb", "t1"), Some(0));
    assert_eq!(WaitPointManager::get(&store, "alb").unwrap().token_ids.len(), 2);
}

#[test]
fn wait_point_enqueue_on_unconfigured_node_returns_none() {
    let mut store = store();
    assert_eq!(WaitPointManager::enqueue(&mut store, "nope", "t1"), None);
}

#[test]
fn wait_point_dequeue_respects_process_interval() {
    let mut store = store();
    WaitPointManager::setup(
        &mut store,
        WaitPointConfig {
            node_id: "alb".to_string(),
            process_interval_ms: 800,
            strategy: WaitStrategy::Fifo,
            capacity: None,
        },
    );
    WaitPointManager::enqueue(&mut store, "alb", "t1");

    assert!(!WaitPointManager::can_release(&store, "alb", 799));
    assert!(WaitPointManager::can_release(&store, "alb", 800));
    assert_eq!(WaitPointManager::dequeue(&mut store, "alb", 800), Some("t1".to_string()));
    assert_eq!(WaitPointManager::get(&store, "alb").unwrap().last_processed_ms, 800);
    assert!(!WaitPointManager::can_release(&store, "alb", 1000));
}

#[test]
fn wait_point_reset_queue_clears_tokens_but_keeps_config() {
    let mut store = store();
    WaitPointManager::setup(
        &mut store,
        WaitPointConfig {
            node_id: "alb".to_string(),
            process_interval_ms: 800,
            strategy: WaitStrategy::Fifo,
            capacity: None,
        },
    );
    WaitPointManager::enqueue(&mut store, "alb", "t1");
    WaitPointManager::reset_queue(&mut store, "alb");
    assert!(WaitPointManager::get(&store, "alb").unwrap().token_ids.is_empty());
    assert!(WaitPointManager::has(&store, "alb"));
}
