//! Criterion benchmarks for the menu pipeline.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use kikiwake::catalog::Card;
use kikiwake::menu::hierarchy::group_candidates;
use kikiwake::menu::layout::{layout_root, Wedge};
use kikiwake::menu::{MenuController, MenuEvent};
use kikiwake::rng::{fnv1a, SeededRng};

/// Synthetic catalog: `n` cards spread over a handful of kana prefixes so the
/// grouping pass produces a realistic branch/leaf mix.
fn make_cards(n: u32) -> Vec<Card> {
    let heads = ['あ', 'か', 'さ', 'た', 'な', 'は', 'ま', 'や', 'ら', 'わ'];
    let tails = ['き', 'く', 'け', 'こ', 'さ'];
    (1..=n)
        .map(|id| {
            let head = heads[(id as usize) % heads.len()];
            let tail = tails[(id as usize / heads.len()) % tails.len()];
            Card {
                id,
                label: format!("{id:03}"),
                kimariji: format!("{head}{tail}のうた{id}"),
                audio_path: format!("I-{id:03}A.ogg"),
            }
        })
        .collect()
}

fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouping");

    for size in [10u32, 50, 100].iter() {
        let cards = make_cards(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("prefix", size), size, |b, _| {
            b.iter(|| black_box(group_candidates(&cards)).len());
        });
    }

    group.finish();
}

fn bench_ring_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_layout");

    for n in [4usize, 12, 25, 50].iter() {
        group.throughput(Throughput::Elements(*n as u64));

        group.bench_with_input(BenchmarkId::new("root", n), n, |b, &n| {
            let mut counter = 0u32;
            b.iter(|| {
                counter = counter.wrapping_add(1);
                black_box(layout_root(n, 1, counter)).len()
            });
        });
    }

    group.finish();
}

/// Full per-trial path: fresh controller, initial selection, sector snapshot.
fn bench_menu_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("menu_open");

    let cards = make_cards(100);
    let mut trial = 0u32;

    group.bench_function("select_and_snapshot", |b| {
        b.iter(|| {
            trial = trial.wrapping_add(1);
            let seed = fnv1a(&format!("p01|{trial}|1|1"));
            let mut menu = MenuController::new(seed);
            menu.apply(MenuEvent::SelectInitial { initial: 'は' }, &cards);
            black_box(menu.sectors()).len()
        });
    });

    group.finish();
}

fn bench_shuffle(c: &mut Criterion) {
    let mut group = c.benchmark_group("shuffle");

    for size in [100usize, 600].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("fisher_yates", size), size, |b, &size| {
            let base: Vec<u32> = (0..size as u32).collect();
            let mut rng = SeededRng::new(42);
            b.iter(|| {
                let mut deck = base.clone();
                kikiwake::rng::shuffle(&mut deck, &mut rng);
                black_box(deck[0])
            });
        });
    }

    group.finish();
}

fn bench_wedge_span(c: &mut Criterion) {
    c.bench_function("wedge_span", |b| {
        let wedge = Wedge {
            start_angle: -std::f64::consts::FRAC_PI_2,
            end_angle: std::f64::consts::FRAC_PI_2,
        };
        b.iter(|| black_box(wedge.span()));
    });
}

criterion_group!(
    benches,
    bench_grouping,
    bench_ring_layout,
    bench_menu_open,
    bench_shuffle,
    bench_wedge_span,
);

criterion_main!(benches);
