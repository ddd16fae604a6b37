//! # Claim Scenarios
//!
//! End-to-end games with human-driven players, a scripted oracle and a
//! recording presentation. Every wait is bounded so a broken handshake
//! fails the test instead of hanging it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use setgame::{DealerPhase, Game, GameHandle, PlayerState, Press};
use setgame_shared::{Card, GameConfig, PlayerId, Presentation, SetOracle, Slot, TableEvent};

const PATIENCE: Duration = Duration::from_secs(5);

// =============================================================================
// Test doubles
// =============================================================================

/// Oracle whose answers the test controls.
struct ScriptedOracle {
    valid: AtomicBool,
    /// Sets still "available"; `find_sets` reports none once this hits zero.
    sets_left: AtomicUsize,
    gate_open: Mutex<bool>,
    gate: Condvar,
    judged: AtomicUsize,
}

impl ScriptedOracle {
    fn new(valid: bool, sets_left: usize) -> Arc<Self> {
        Arc::new(Self {
            valid: AtomicBool::new(valid),
            sets_left: AtomicUsize::new(sets_left),
            gate_open: Mutex::new(true),
            gate: Condvar::new(),
            judged: AtomicUsize::new(0),
        })
    }

    fn close_gate(&self) {
        *self.gate_open.lock() = false;
    }

    fn open_gate(&self) {
        *self.gate_open.lock() = true;
        self.gate.notify_all();
    }
}

impl SetOracle for ScriptedOracle {
    fn is_valid_set(&self, _cards: &[Card]) -> bool {
        self.judged.fetch_add(1, Ordering::SeqCst);
        {
            let deadline = Instant::now() + PATIENCE;
            let mut open = self.gate_open.lock();
            while !*open {
                if self.gate.wait_until(&mut open, deadline).timed_out() {
                    break;
                }
            }
        }
        let valid = self.valid.load(Ordering::SeqCst);
        if valid {
            let _ = self
                .sets_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        }
        valid
    }

    fn find_sets(&self, cards: &[Card], limit: usize) -> Vec<Vec<Card>> {
        if limit == 0 || cards.len() < 3 || self.sets_left.load(Ordering::SeqCst) == 0 {
            return Vec::new();
        }
        vec![cards[..3].to_vec()]
    }

    fn cards_to_features(&self, cards: &[Card]) -> Vec<Vec<usize>> {
        cards.iter().map(|&card| vec![card]).collect()
    }
}

/// Presentation that keeps every event.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<TableEvent>>,
    changed: Condvar,
}

impl Recorder {
    fn push(&self, event: TableEvent) {
        self.events.lock().push(event);
        self.changed.notify_all();
    }

    /// Waits until an event matching `predicate` has been recorded.
    fn wait_for(&self, predicate: impl Fn(&TableEvent) -> bool) -> bool {
        let deadline = Instant::now() + PATIENCE;
        let mut events = self.events.lock();
        loop {
            if events.iter().any(&predicate) {
                return true;
            }
            if self.changed.wait_until(&mut events, deadline).timed_out() {
                return events.iter().any(&predicate);
            }
        }
    }

    fn count(&self, predicate: impl Fn(&TableEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    fn snapshot(&self) -> Vec<TableEvent> {
        self.events.lock().clone()
    }
}

impl Presentation for Recorder {
    fn place_card(&self, card: Card, slot: Slot) {
        self.push(TableEvent::CardPlaced { card, slot });
    }
    fn remove_card(&self, slot: Slot) {
        self.push(TableEvent::CardRemoved { slot });
    }
    fn place_marker(&self, player: PlayerId, slot: Slot) {
        self.push(TableEvent::MarkerPlaced { player, slot });
    }
    fn remove_marker(&self, player: PlayerId, slot: Slot) {
        self.push(TableEvent::MarkerRemoved { player, slot });
    }
    fn remove_markers(&self, slot: Slot) {
        self.push(TableEvent::MarkersCleared { slot });
    }
    fn set_score(&self, player: PlayerId, score: u32) {
        self.push(TableEvent::ScoreChanged { player, score });
    }
    fn set_countdown(&self, remaining: Duration, warn: bool) {
        self.push(TableEvent::Countdown { remaining, warn });
    }
    fn set_freeze(&self, player: PlayerId, remaining: Duration) {
        self.push(TableEvent::Freeze { player, remaining });
    }
    fn announce_winners(&self, players: &[PlayerId]) {
        self.push(TableEvent::Winners {
            players: players.to_vec(),
        });
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn human_config(players: usize) -> GameConfig {
    GameConfig {
        players,
        human_players: players,
        table_delay_ms: 0,
        point_freeze_ms: 50,
        penalty_freeze_ms: 100,
        seed: Some(9),
        ..GameConfig::default()
    }
}

fn start(config: GameConfig, oracle: &Arc<ScriptedOracle>) -> (GameHandle, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let game = Game::start(config, oracle.clone(), recorder.clone()).unwrap();
    (game, recorder)
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + PATIENCE;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached");
        thread::sleep(Duration::from_millis(1));
    }
}

fn wait_for_deal(game: &GameHandle) {
    wait_until(|| game.dealer_phase() == DealerPhase::CountingDown);
    assert_eq!(game.context().board.card_count(), 12);
}

fn press_all(game: &GameHandle, player: PlayerId, slots: &[Slot]) {
    let sender = game.sender(player).unwrap();
    for &slot in slots {
        assert_eq!(sender.press(slot), Press::Queued);
    }
}

/// Remaining time of every countdown event, with its warning flag.
fn countdowns(events: &[TableEvent]) -> Vec<(Duration, bool)> {
    events
        .iter()
        .filter_map(|event| match *event {
            TableEvent::Countdown { remaining, warn } => Some((remaining, warn)),
            _ => None,
        })
        .collect()
}

fn is_freeze_of(player: PlayerId) -> impl Fn(&TableEvent) -> bool {
    move |event| {
        matches!(event, TableEvent::Freeze { player: p, remaining } if *p == player && !remaining.is_zero())
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_valid_claim_scores_and_refills() {
    let oracle = ScriptedOracle::new(true, usize::MAX);
    let (game, recorder) = start(human_config(2), &oracle);
    wait_for_deal(&game);
    let board = Arc::clone(&game.context().board);
    let before: Vec<_> = (0..3).map(|slot| board.card_at(slot)).collect();

    press_all(&game, 0, &[0, 1, 2]);

    assert!(recorder.wait_for(|e| *e == TableEvent::ScoreChanged { player: 0, score: 1 }));
    assert!(recorder.wait_for(is_freeze_of(0)));
    for slot in 0..3 {
        assert_eq!(recorder.count(|e| *e == TableEvent::CardRemoved { slot }), 1);
        assert!(board.card_at(slot).is_some());
        assert_ne!(board.card_at(slot), before[slot]);
    }
    assert_eq!(board.card_count(), 12);
    assert_eq!(board.marker_count(0), 0);

    game.terminate();
    let summary = game.join().unwrap();
    assert_eq!(summary.scores, vec![1, 0]);
    assert_eq!(summary.winners, vec![0]);
}

#[test]
fn test_invalid_claim_penalizes_without_touching_the_board() {
    let oracle = ScriptedOracle::new(false, usize::MAX);
    let (game, recorder) = start(human_config(2), &oracle);
    wait_for_deal(&game);
    let board = Arc::clone(&game.context().board);
    let before = board.cards();

    press_all(&game, 1, &[4, 5, 6]);

    assert!(recorder.wait_for(|e| {
        *e == TableEvent::Freeze {
            player: 1,
            remaining: Duration::from_millis(100),
        }
    }));
    assert_eq!(board.cards(), before);
    assert_eq!(board.marker_count(1), 3);
    assert_eq!(recorder.count(|e| matches!(e, TableEvent::CardRemoved { .. })), 0);
    assert_eq!(recorder.count(|e| matches!(e, TableEvent::ScoreChanged { .. })), 0);
    wait_until(|| game.player_state(1) == Some(PlayerState::Collecting));

    game.terminate();
    let summary = game.join().unwrap();
    assert_eq!(summary.scores, vec![0, 0]);
    assert_eq!(summary.winners, vec![0, 1]);
}

#[test]
fn test_claim_losing_a_card_to_an_earlier_claim_is_abandoned() {
    let oracle = ScriptedOracle::new(true, usize::MAX);
    let (game, recorder) = start(human_config(2), &oracle);
    wait_for_deal(&game);
    let ctx = game.context().clone();

    // Player 1 claims first and is held inside the oracle.
    oracle.close_gate();
    press_all(&game, 1, &[0, 3, 4]);
    wait_until(|| oracle.judged.load(Ordering::SeqCst) == 1);

    // Player 0 marks slot 0 too and queues behind player 1.
    press_all(&game, 0, &[0, 1, 2]);
    wait_until(|| ctx.board.marker_count(0) == 3 && ctx.desk.waiting() == 1);
    assert_eq!(game.player_state(0), Some(PlayerState::AwaitingClaim));

    oracle.open_gate();
    assert!(recorder.wait_for(|e| *e == TableEvent::ScoreChanged { player: 1, score: 1 }));
    wait_until(|| game.player_state(0) == Some(PlayerState::Collecting));

    assert_eq!(oracle.judged.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.board.marker_count(0), 2);
    assert_eq!(recorder.count(is_freeze_of(0)), 0);

    game.terminate();
    let summary = game.join().unwrap();
    assert_eq!(summary.scores, vec![0, 1]);
    assert_eq!(summary.winners, vec![1]);
}

#[test]
fn test_no_set_anywhere_ends_with_everyone_tied() {
    let oracle = ScriptedOracle::new(true, 0);
    let (game, recorder) = start(human_config(3), &oracle);

    let summary = game.join().unwrap();

    assert_eq!(summary.rounds, 0);
    assert_eq!(summary.scores, vec![0, 0, 0]);
    assert_eq!(summary.winners, vec![0, 1, 2]);
    assert!(recorder.wait_for(|e| *e == TableEvent::Winners { players: vec![0, 1, 2] }));
}

#[test]
fn test_claiming_the_last_set_ends_the_game() {
    let oracle = ScriptedOracle::new(true, 1);
    let (game, recorder) = start(human_config(2), &oracle);
    wait_for_deal(&game);

    press_all(&game, 1, &[7, 8, 9]);

    let summary = game.join().unwrap();
    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.scores, vec![0, 1]);
    assert_eq!(summary.winners, vec![1]);
    assert!(recorder.wait_for(|e| *e == TableEvent::Winners { players: vec![1] }));
}

#[test]
fn test_round_timeout_reshuffles_the_board() {
    let oracle = ScriptedOracle::new(true, usize::MAX);
    let config = GameConfig {
        turn_timeout_ms: 40,
        turn_timeout_warning_ms: 10,
        ..human_config(1)
    };
    let (game, recorder) = start(config, &oracle);

    // Every slot is dealt once per round.
    wait_until(|| recorder.count(|e| matches!(e, TableEvent::CardPlaced { slot: 0, .. })) >= 3);

    game.terminate();
    let summary = game.join().unwrap();
    assert!(summary.rounds >= 3);
    assert_eq!(summary.scores, vec![0]);
}

#[test]
fn test_countdown_warns_below_the_threshold() {
    let oracle = ScriptedOracle::new(true, usize::MAX);
    let timeout = Duration::from_millis(300);
    let warning = Duration::from_millis(100);
    let config = GameConfig {
        turn_timeout_ms: 300,
        turn_timeout_warning_ms: 100,
        tick_ms: 10,
        ..human_config(1)
    };
    let (game, recorder) = start(config, &oracle);

    // The first round has run out once it deals a second time.
    wait_until(|| recorder.count(|e| matches!(e, TableEvent::CardPlaced { slot: 0, .. })) >= 2);
    game.terminate();
    game.join().unwrap();

    let ticks = countdowns(&recorder.snapshot());
    assert!(ticks.iter().any(|&(remaining, warn)| !warn && remaining > warning));
    assert!(ticks
        .iter()
        .any(|&(remaining, warn)| warn && !remaining.is_zero() && remaining <= warning));
    for (remaining, warn) in ticks {
        assert!(remaining <= timeout);
        assert_eq!(warn, remaining <= warning, "{remaining:?}");
    }
}

#[test]
fn test_valid_claim_resets_the_countdown() {
    let oracle = ScriptedOracle::new(true, usize::MAX);
    let timeout = Duration::from_millis(2_000);
    let config = GameConfig {
        turn_timeout_ms: 2_000,
        turn_timeout_warning_ms: 500,
        tick_ms: 10,
        ..human_config(1)
    };
    let (game, recorder) = start(config, &oracle);
    wait_for_deal(&game);

    // Let a good part of the round run down first.
    assert!(recorder.wait_for(|e| {
        matches!(e, TableEvent::Countdown { remaining, .. } if *remaining < Duration::from_millis(1_400))
    }));
    press_all(&game, 0, &[0, 1, 2]);
    assert!(recorder.wait_for(|e| *e == TableEvent::ScoreChanged { player: 0, score: 1 }));

    let is_score = |e: &TableEvent| matches!(e, TableEvent::ScoreChanged { .. });
    wait_until(|| {
        let events = recorder.snapshot();
        events
            .iter()
            .position(is_score)
            .is_some_and(|at| !countdowns(&events[at..]).is_empty())
    });
    let events = recorder.snapshot();
    let Some(at) = events.iter().position(is_score) else {
        panic!("score event vanished");
    };
    let before = countdowns(&events[..at]);
    let after = countdowns(&events[at..]);

    let (last_before, _) = *before.last().unwrap();
    let (first_after, warn) = after[0];
    assert!(last_before < Duration::from_millis(1_400));
    assert!(first_after > Duration::from_millis(1_500), "{first_after:?}");
    assert!(first_after <= timeout);
    assert!(!warn);

    game.terminate();
    game.join().unwrap();
}
