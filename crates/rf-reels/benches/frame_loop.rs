//! Frame loop benchmarks

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rf_core::{CellPos, Diagnostics, ResultGrid, RoundResult, WinLine};
use rf_reels::{
    GridCoordinator, MotionPreferences, MotionSettings, PresenterConfig, RoundPhase,
    SlotPresenter,
};

const FRAME_MS: f64 = 1000.0 / 60.0;

fn result_grid() -> ResultGrid {
    ResultGrid::new([[0, 1, 2], [3, 4, 5], [6, 7, 8], [9, 0, 1], [2, 3, 4]])
}

fn bench_spinning_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("spinning_tick");

    for fast_mode in [false, true] {
        let preferences = MotionPreferences {
            fast_mode,
            ..MotionPreferences::default()
        };
        let config = PresenterConfig::default().with_motion(preferences);
        let mut grid = GridCoordinator::new(
            &config,
            MotionSettings::new(preferences),
            Diagnostics::new(),
        );
        let mut events = Vec::with_capacity(64);
        let mut now = 0.0;
        let _ = grid.start_all(now, &mut events);

        group.bench_with_input(
            BenchmarkId::from_parameter(if fast_mode { "fast" } else { "normal" }),
            &fast_mode,
            |b, _| {
                b.iter(|| {
                    now += FRAME_MS;
                    events.clear();
                    grid.tick(black_box(now), &mut events);
                })
            },
        );
    }

    group.finish();
}

fn bench_full_round(c: &mut Criterion) {
    let middle: Vec<CellPos> = (0..5).map(|col| CellPos::new(col, 1)).collect();
    let result = RoundResult::new(result_grid(), 1.0).with_line(WinLine::new(0, middle, 5.0));
    let config = PresenterConfig::default()
        .with_motion(MotionPreferences {
            fast_mode: true,
            ..MotionPreferences::default()
        })
        .with_verify(true);

    c.bench_function("full_round_fast", |b| {
        b.iter(|| {
            let mut presenter = SlotPresenter::new(config.clone());
            let mut now = 0.0;
            presenter.tick(now);
            let _ = presenter.start_spin(now);
            let _ = presenter.receive_result(result.clone(), now);
            while presenter.round_phase() != RoundPhase::Complete {
                now += FRAME_MS;
                presenter.tick(now);
            }
            black_box(presenter.take_trace())
        })
    });
}

criterion_group!(benches, bench_spinning_tick, bench_full_round);
criterion_main!(benches);
