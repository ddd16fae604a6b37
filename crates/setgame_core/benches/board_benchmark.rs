//! # Board Benchmark
//!
//! Marker toggles are the hot path: every key press of every player
//! goes through one. Bulk sweeps only happen on claims and reshuffles.
//!
//! Run with: `cargo bench --package setgame_core`

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use setgame_core::{Board, BoardLayout, Deck};
use setgame_shared::{FeatureOracle, NullPresentation, SetOracle};

fn dealt_board(players: usize) -> Board {
    let board = Board::new(
        BoardLayout {
            table_size: 12,
            deck_size: 81,
            players,
            feature_size: 3,
        },
        Duration::ZERO,
        Arc::new(NullPresentation),
    );
    for slot in 0..12 {
        board.place_card(slot, slot);
    }
    board
}

/// Benchmark: uncontended toggle.
fn bench_toggle_marker(c: &mut Criterion) {
    let board = dealt_board(1);
    let mut slot = 0;
    c.bench_function("toggle_marker", |b| {
        b.iter(|| {
            slot = (slot + 1) % 12;
            black_box(board.toggle_marker(0, slot))
        });
    });
}

/// Benchmark: full drain and re-deal under the exclusive guard.
fn bench_sweep(c: &mut Criterion) {
    let board = dealt_board(4);
    let mut deck = Deck::new(81, 1);
    c.bench_function("drain_and_redeal", |b| {
        b.iter(|| {
            let mut writer = board.exclusive();
            let cards = writer.clear();
            deck.return_cards(cards);
            for slot in writer.empty_slots() {
                if let Some(card) = deck.draw() {
                    writer.place_card(card, slot);
                }
            }
        });
    });
}

/// Benchmark: set search on a table and on a full deck.
fn bench_find_sets(c: &mut Criterion) {
    let oracle = FeatureOracle::new(3, 4);
    let mut group = c.benchmark_group("find_sets");
    for size in [12, 81] {
        let cards: Vec<usize> = (0..size).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &cards, |b, cards| {
            b.iter(|| black_box(oracle.find_sets(cards, 1)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_toggle_marker, bench_sweep, bench_find_sets);
criterion_main!(benches);
