use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stackduel::battle::{best_placement, Battle, PlayerId, Weights};
use stackduel::core::{Board, Engine, Piece};
use stackduel::net::throttle::snapshot_fingerprint;
use stackduel::net::{encode, Message, NetworkMessage};
use stackduel::types::{Action, Cell, PieceKind, Settings};

fn bench_tick(c: &mut Criterion) {
    let mut engine = Engine::default();
    engine.start();

    c.bench_function("engine_tick_16ms", |b| {
        b.iter(|| {
            if engine.is_stopped() {
                engine.start();
            }
            engine.tick(black_box(16));
        })
    });
}

fn bench_line_clear(c: &mut Criterion) {
    c.bench_function("clear_4_lines", |b| {
        b.iter(|| {
            let mut board = Board::new();
            for y in 16..20 {
                for x in 0..10 {
                    board.set(x, y, Cell::Block(PieceKind::I));
                }
            }
            board.clear_full_rows();
        })
    });
}

fn bench_attack_lines(c: &mut Criterion) {
    c.bench_function("add_attack_lines_to_cap", |b| {
        b.iter(|| {
            let mut board = Board::new();
            for gap in 0..12 {
                board.add_attack_lines(black_box(1), gap % 10);
            }
            board.attack_line_count()
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let board = Board::from_rows(&[
        "....#.....",
        "#..###...#",
        "##.####.##",
        "####.#####",
    ]);
    let piece = Piece::new(PieceKind::T);
    let weights = Weights::default();

    c.bench_function("best_placement_t", |b| {
        b.iter(|| best_placement(black_box(&board), black_box(&piece), &weights))
    });
}

fn bench_battle_input(c: &mut Criterion) {
    let mut battle = Battle::new(Settings::default(), [1, 2]);
    battle.start();

    c.bench_function("battle_hard_drop", |b| {
        b.iter(|| {
            if !battle.is_running() {
                battle.start();
            }
            battle.apply_input(PlayerId::One, Action::HardDrop);
        })
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let mut engine = Engine::default();
    engine.start();

    c.bench_function("snapshot_fingerprint", |b| {
        b.iter(|| snapshot_fingerprint(&engine.snapshot()))
    });

    let msg = NetworkMessage::now(Message::StateUpdate(Box::new(engine.snapshot())));
    c.bench_function("encode_state_update", |b| b.iter(|| encode(black_box(&msg))));
}

criterion_group!(
    benches,
    bench_tick,
    bench_line_clear,
    bench_attack_lines,
    bench_search,
    bench_battle_input,
    bench_snapshot
);
criterion_main!(benches);
